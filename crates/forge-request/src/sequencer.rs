//! Request sequencing
//!
//! Flattens a block tree into HTTP requests. Each object block goes through
//! four states:
//!
//! ```text
//! PRE            send childFirstBodyId children, record their ids
//!   ↓
//! BUILD          merge recorded ids, strip parent-first children
//!   ↓
//! SEND           send the block itself, capture its id
//!   ↓
//! POST_CHILDREN  send parent-first children with the new id
//! ```
//!
//! Children run the same four states recursively. Requests are awaited one
//! after another, so a dependent request is never dispatched before the one
//! whose id it needs.

use crate::auth::{request_headers, Authenticator};
use crate::billing::{tokens_for_bytes, TokenDebit};
use crate::config::ForgeConfig;
use crate::error::{ConfigError, SendError, TransportError};
use crate::report::{RequestOutcome, RequestRecord, Role, SendReport};
use crate::resolver::classify;
use crate::route::{infer_resource_type, RouteComposer};
use crate::transform::{merge_child_ids, strip_child_fields, IdLedger};
use crate::transport::{HttpRequest, HttpResponse, Method, ReqwestTransport, Transport};
use forge_block::{lift, Block, BlockError, ARRAY_SUFFIX};
use forge_schema::{Link, SchemaRegistry};
use futures::future::{BoxFuture, FutureExt};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

/// Id answered in mock mode for child-first requests
pub const MOCK_CHILD_ID: &str = "2f02372d-a590-4c4b-b3e2-c070025a3b8e";

/// Id answered in mock mode for every other request
pub const MOCK_ID: &str = "3302372d-a590-4c4b-b3e2-c070025a3b8e";

/// Operation name used for token debits
const DEBIT_OPERATION: &str = "request";

/// Result of a GET on a root route
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchResult {
    /// Route fetched
    pub url: String,
    /// Resource type inferred from the route
    pub resource_type: String,
    /// Root type to rebuild a block tree with: `{resource}_array` for lists
    pub root_type: String,
    /// Parsed response
    pub body: Value,
}

impl FetchResult {
    /// Check if the response was a list
    #[inline]
    #[must_use]
    pub fn is_list(&self) -> bool {
        self.body.is_array()
    }
}

/// One object block waiting to be sent
struct Job<'a> {
    role: Role,
    method: Method,
    type_name: String,
    block: &'a Block,
    payload: Value,
    prefix: String,
    with_path_id: bool,
}

/// Drives sends of whole block trees
pub struct RequestSequencer {
    config: ForgeConfig,
    registry: Arc<SchemaRegistry>,
    transport: Arc<dyn Transport>,
    auth: Authenticator,
    debit: Option<TokenDebit>,
}

impl std::fmt::Debug for RequestSequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSequencer")
            .field("base_url", &self.config.base_url)
            .field("schemas", &self.registry.len())
            .field("mock", &self.config.mock_responses)
            .finish_non_exhaustive()
    }
}

impl RequestSequencer {
    /// Create sequencer over a transport
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the base URL or auth settings are invalid.
    pub fn new(
        config: ForgeConfig,
        registry: Arc<SchemaRegistry>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let auth = Authenticator::new(config.auth_method()?);
        let debit = config
            .debit
            .lambda_url
            .as_deref()
            .filter(|url| config.debit.enabled && !url.is_empty())
            .map(|url| TokenDebit::new(url, Arc::clone(&transport)));

        tracing::debug!(
            base_url = %config.base_url,
            schemas = registry.len(),
            mock = config.mock_responses,
            "request sequencer ready"
        );

        Ok(Self {
            config,
            registry,
            transport,
            auth,
            debit,
        })
    }

    /// Create sequencer over HTTP, with the configured timeout
    ///
    /// # Errors
    /// Returns [`SendError`] if the config is invalid or the HTTP client
    /// cannot be built.
    pub fn over_http(config: ForgeConfig, registry: Arc<SchemaRegistry>) -> Result<Self, SendError> {
        let transport = ReqwestTransport::new(Duration::from_secs(config.request_timeout_secs))?;
        Ok(Self::new(config, registry, Arc::new(transport))?)
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ForgeConfig {
        &self.config
    }

    /// Schemas in use
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Route builder for the current config
    #[inline]
    #[must_use]
    pub fn routes(&self) -> RouteComposer<'_> {
        RouteComposer::new(&self.config, &self.registry)
    }

    /// Send a block tree rooted at `root`
    ///
    /// The root goes out with `method`; every child request is a POST. An
    /// array root sends each element as its own root. Failures are recorded
    /// per request in the report and never stop unrelated requests.
    pub async fn send(&self, method: Method, root: &Block) -> SendReport {
        let span = tracing::info_span!("send", root = root.kind(), method = %method);
        async move {
            let mut report = SendReport::new(root.kind(), method);

            match root {
                Block::Object { kind, .. } => {
                    let job = Job {
                        role: Role::Root,
                        method,
                        type_name: kind.clone(),
                        block: root,
                        payload: root.to_raw_object(),
                        prefix: String::new(),
                        with_path_id: true,
                    };
                    let root_id = self.send_block(job, &mut report).await;
                    report.root_id = root_id;
                }
                Block::Array { items, .. } => {
                    for item in items.iter().filter(|i| i.is_object()) {
                        let job = Job {
                            role: Role::Root,
                            method,
                            type_name: item.kind().to_string(),
                            block: item,
                            payload: item.to_raw_object(),
                            prefix: String::new(),
                            with_path_id: false,
                        };
                        self.send_block(job, &mut report).await;
                    }
                }
                Block::Scalar { kind, .. } => {
                    tracing::warn!(kind = %kind, "root block is a plain value; nothing to send");
                    report.push(RequestRecord::new(
                        Role::Root,
                        kind.as_str(),
                        method,
                        "",
                        None,
                        RequestOutcome::Skipped {
                            reason: SendError::serialization("root block is a plain value"),
                        },
                    ));
                }
            }

            self.debit_for(&report);
            tracing::info!(
                requests = report.records.len(),
                failures = report.failures().count(),
                root_id = report.root_id.as_deref().unwrap_or(""),
                "send finished"
            );
            report
        }
        .instrument(span)
        .await
    }

    /// Lift a JSON document into a block tree and send it
    ///
    /// # Errors
    /// Returns [`BlockError`] if the document does not fit `type_name`.
    pub async fn send_payload(
        &self,
        method: Method,
        type_name: &str,
        payload: &Value,
    ) -> Result<SendReport, BlockError> {
        let root = lift(payload, type_name, &self.registry)?;
        Ok(self.send(method, &root).await)
    }

    /// GET the root route of `type_name` and infer what came back
    ///
    /// # Errors
    /// Returns [`SendError`] on transport failure, a non-2xx status or a
    /// body that is not JSON.
    pub async fn fetch(&self, type_name: &str) -> Result<FetchResult, SendError> {
        let routes = self.routes();
        let route = routes.route(type_name, "", true);
        let url = routes.with_query(route.clone());

        let response = if self.config.mock_responses {
            mock_response(MOCK_ID)
        } else {
            let authorization = self.auth.authorization(self.transport.as_ref()).await?;
            let request = HttpRequest::new(Method::Get, url.as_str())
                .with_headers(request_headers(&self.config, authorization));
            self.transport
                .execute(request)
                .instrument(tracing::info_span!("request", type_name, method = "GET"))
                .await?
        };
        let response = check_response(&url, response)?;

        let body = response.json()?;
        let resource_type = infer_resource_type(&route, &routes.base());
        let root_type = if body.is_array() {
            format!("{resource_type}{ARRAY_SUFFIX}")
        } else {
            resource_type.clone()
        };

        tracing::info!(url = %url, root_type = %root_type, "fetched resource");
        Ok(FetchResult {
            url,
            resource_type,
            root_type,
            body,
        })
    }

    fn send_block<'a>(&'a self, job: Job<'a>, report: &'a mut SendReport) -> BoxFuture<'a, Option<String>> {
        async move {
            let Some(schema) = self.registry.get(&job.type_name) else {
                tracing::warn!(type_name = %job.type_name, "no schema registered; request not sent");
                report.push(RequestRecord::new(
                    job.role,
                    job.type_name.as_str(),
                    job.method,
                    "",
                    None,
                    RequestOutcome::Skipped {
                        reason: SendError::UnknownSchema {
                            type_name: job.type_name.clone(),
                        },
                    },
                ));
                return None;
            };

            // PRE
            let mut ledger = IdLedger::new();
            for child in classify(&schema, job.block).into_iter().filter(|c| !c.is_parent_first()) {
                tracing::debug!(parent = %job.type_name, key = %child.key, "sending child-first child");
                let child_job = Job {
                    role: Role::ChildFirst,
                    method: Method::Post,
                    payload: child.block.to_raw_object(),
                    type_name: child.type_name,
                    block: child.block,
                    prefix: String::new(),
                    with_path_id: false,
                };
                match self.send_block(child_job, &mut *report).await {
                    Some(id) => ledger.record(child.key, id),
                    None => tracing::warn!(
                        parent = %job.type_name,
                        key = %child.key,
                        "child-first child has no id; parent sent without it"
                    ),
                }
            }

            // BUILD
            let merged = merge_child_ids(&job.payload, &ledger);
            let (body, specs) = strip_child_fields(&merged, &schema, job.block);
            tracing::debug!(
                type_name = %job.type_name,
                merged = ledger.len(),
                stripped = specs.len(),
                "body assembled"
            );
            if self.config.validate_before_send {
                self.warn_if_invalid(&job.type_name, &body);
            }

            // SEND
            let url = self
                .routes()
                .compose(&job.type_name, &job.prefix, job.with_path_id);
            let outcome = self.dispatch(&job, &url, &body).await;
            let id = outcome.id().map(str::to_string);
            let failed = !outcome.is_completed();
            report.push(RequestRecord::new(
                job.role,
                job.type_name.as_str(),
                job.method,
                url,
                job.method.has_body().then_some(body),
                outcome,
            ));

            // POST_CHILDREN
            let Some(parent_id) = id.clone() else {
                for spec in specs {
                    let reason = if failed {
                        SendError::DependencyFailed {
                            parent: job.type_name.clone(),
                        }
                    } else {
                        SendError::MissingId {
                            type_name: job.type_name.clone(),
                        }
                    };
                    tracing::warn!(parent = %job.type_name, key = %spec.key, error = %reason, "child not sent");
                    report.push(RequestRecord::new(
                        Role::ParentFirst,
                        spec.type_name,
                        Method::Post,
                        "",
                        Some(spec.payload),
                        RequestOutcome::Skipped { reason },
                    ));
                }
                return id;
            };

            for spec in specs {
                let (prefix, payload) = match &spec.link {
                    Link::ParentBody { child_ref_to_parent } => {
                        let mut payload = spec.payload;
                        if let Value::Object(map) = &mut payload {
                            map.insert(child_ref_to_parent.clone(), Value::String(parent_id.clone()));
                        }
                        (String::new(), payload)
                    }
                    Link::ParentRoute | Link::ChildBody => (
                        self.routes().child_prefix(&job.prefix, &job.type_name, &parent_id),
                        spec.payload,
                    ),
                };
                tracing::debug!(parent = %job.type_name, key = %spec.key, "sending parent-first child");
                let child_job = Job {
                    role: Role::ParentFirst,
                    method: Method::Post,
                    type_name: spec.type_name,
                    block: spec.block,
                    payload,
                    prefix,
                    with_path_id: false,
                };
                self.send_block(child_job, &mut *report).await;
            }

            id
        }
        .boxed()
    }

    async fn dispatch(&self, job: &Job<'_>, url: &str, body: &Value) -> RequestOutcome {
        let span = tracing::info_span!(
            "request",
            role = ?job.role,
            type_name = %job.type_name,
            method = %job.method,
            url,
        );

        async {
            let response = if self.config.mock_responses {
                let id = if job.role == Role::ChildFirst {
                    MOCK_CHILD_ID
                } else {
                    MOCK_ID
                };
                mock_response(id)
            } else {
                match self.execute(job.method, url, body).await {
                    Ok(response) => response,
                    Err(error) => {
                        tracing::warn!(error = %error, "request failed");
                        return RequestOutcome::Failed { error };
                    }
                }
            };

            match check_response(url, response) {
                Ok(response) => {
                    let id = response.id();
                    tracing::info!(status = response.status, id = id.as_deref().unwrap_or(""), "request completed");
                    RequestOutcome::Completed {
                        status: response.status,
                        body: response.body,
                        id,
                    }
                }
                Err(error) => {
                    tracing::warn!(error = %error, "request failed");
                    RequestOutcome::Failed { error }
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, method: Method, url: &str, body: &Value) -> Result<HttpResponse, SendError> {
        let authorization = self.auth.authorization(self.transport.as_ref()).await?;
        let mut request =
            HttpRequest::new(method, url).with_headers(request_headers(&self.config, authorization));
        if method.has_body() {
            request = request.with_body(serde_json::to_string(body)?);
        }
        Ok(self.transport.execute(request).await?)
    }

    fn warn_if_invalid(&self, type_name: &str, body: &Value) {
        match self.registry.validate(type_name, body) {
            Ok(report) if report.valid => {}
            Ok(report) => {
                tracing::warn!(type_name, errors = ?report.errors, "body does not match schema; sending anyway");
            }
            Err(e) => tracing::warn!(type_name, error = %e, "cannot validate body"),
        }
    }

    fn debit_for(&self, report: &SendReport) {
        if self.config.mock_responses {
            return;
        }
        let (Some(debit), Some((_, tenant))) = (self.debit.as_ref(), self.config.debit_target()) else {
            return;
        };
        let tokens = tokens_for_bytes(report.body_bytes());
        debit.fire(tenant, tokens, DEBIT_OPERATION);
    }
}

fn mock_response(id: &str) -> HttpResponse {
    HttpResponse::new(200, json!({"id": id, "fakeRequest": true}).to_string())
}

/// Classify a raw response: status 0 with no body is a transport failure,
/// any other non-2xx an application failure
fn check_response(url: &str, response: HttpResponse) -> Result<HttpResponse, SendError> {
    if response.is_no_response() {
        return Err(TransportError::NoResponse {
            url: url.to_string(),
        }
        .into());
    }
    if !response.is_success() {
        return Err(SendError::Application {
            status: response.status,
            body: response.body,
        });
    }
    Ok(response)
}
