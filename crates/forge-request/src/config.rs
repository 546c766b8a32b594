//! Sequencer configuration
//!
//! Keys are camelCase so an existing `serverConfig.json` loads unchanged.
//! Tenant `.properties` maps overlay the file: tenant values win, file values
//! are the fallback.

use crate::auth::AuthMethod;
use crate::error::ConfigError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tenant property overriding the base URL
pub const TENANT_ROUTE: &str = "route";

/// Tenant property overriding the CORS proxy
pub const TENANT_CORS_PROXY: &str = "corsProxy";

/// Tenant property toggling the type segment in routes
pub const TENANT_APPEND_TYPE: &str = "change_route_suffix_for_block";

/// Token debit settings
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DebitConfig {
    /// Billing API base; debits post to `{lambdaUrl}/debit_tokens`
    pub lambda_url: Option<String>,
    /// Whether sends are debited
    pub enabled: bool,
}

/// Request sequencer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ForgeConfig {
    /// Tenant API base URL
    pub base_url: String,
    /// Proxy prefixed to the scheme-less base URL
    pub cors_proxy: Option<String>,
    /// Append `/{endpoint}` of the request's type to its route
    pub append_block_type: bool,
    /// Resource id appended to the root route when editing an existing object
    pub path_id: Option<String>,
    /// `none`, `basic` or `client_credentials`
    pub auth_type: Option<String>,
    /// Basic auth user
    pub user: Option<String>,
    /// Basic auth password
    pub pass: Option<String>,
    /// Token endpoint for client credentials
    pub authorization_server: Option<String>,
    /// Client credentials id
    #[serde(rename = "client_id")]
    pub client_id: Option<String>,
    /// Client credentials secret
    #[serde(rename = "client_secret")]
    pub client_secret: Option<String>,
    /// Answer every request with a canned success instead of sending it
    pub mock_responses: bool,
    /// Extra request headers
    pub headers: IndexMap<String, String>,
    /// Query parameters appended to every route
    pub query_params: IndexMap<String, String>,
    /// Tenant id
    pub tenant: Option<String>,
    /// Sent as `X-Billing-User` for the `meta` tenant
    pub billing_user: Option<String>,
    /// Token debit settings
    pub debit: DebitConfig,
    /// Per-request timeout
    pub request_timeout_secs: u64,
    /// Validate each body against its schema before sending (warnings only)
    pub validate_before_send: bool,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            cors_proxy: None,
            append_block_type: true,
            path_id: None,
            auth_type: None,
            user: None,
            pass: None,
            authorization_server: None,
            client_id: None,
            client_secret: None,
            mock_responses: false,
            headers: IndexMap::new(),
            query_params: IndexMap::new(),
            tenant: None,
            billing_user: None,
            debit: DebitConfig::default(),
            request_timeout_secs: 30,
            validate_before_send: false,
        }
    }
}

impl ForgeConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a `.json`, `.yaml`/`.yml` or `.toml` file
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or its
    /// extension is not supported.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let parse_error = |message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        };

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&text).map_err(|e| parse_error(e.to_string())),
            Some("yaml" | "yml") => serde_yaml::from_str(&text).map_err(|e| parse_error(e.to_string())),
            Some("toml") => toml::from_str(&text).map_err(|e| parse_error(e.to_string())),
            _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    /// With base URL
    #[inline]
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// With CORS proxy
    #[inline]
    #[must_use]
    pub fn with_cors_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.cors_proxy = Some(proxy.into());
        self
    }

    /// With or without the type segment in routes
    #[inline]
    #[must_use]
    pub fn with_append_block_type(mut self, append: bool) -> Self {
        self.append_block_type = append;
        self
    }

    /// With path id for the root request
    #[inline]
    #[must_use]
    pub fn with_path_id(mut self, id: impl Into<String>) -> Self {
        self.path_id = Some(id.into());
        self
    }

    /// With mock responses
    #[inline]
    #[must_use]
    pub fn with_mock_responses(mut self, mock: bool) -> Self {
        self.mock_responses = mock;
        self
    }

    /// With tenant
    #[inline]
    #[must_use]
    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }

    /// With an extra header
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// With an extra query parameter
    #[must_use]
    pub fn with_query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.insert(name.into(), value.into());
        self
    }

    /// With basic auth
    #[must_use]
    pub fn with_basic_auth(mut self, user: impl Into<String>, pass: impl Into<String>) -> Self {
        self.auth_type = Some("basic".to_string());
        self.user = Some(user.into());
        self.pass = Some(pass.into());
        self
    }

    /// With client credentials auth
    #[must_use]
    pub fn with_client_credentials(
        mut self,
        authorization_server: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.auth_type = Some("client_credentials".to_string());
        self.authorization_server = Some(authorization_server.into());
        self.client_id = Some(client_id.into());
        self.client_secret = Some(client_secret.into());
        self
    }

    /// With token debit posting to `lambda_url`
    #[must_use]
    pub fn with_debit(mut self, lambda_url: impl Into<String>) -> Self {
        self.debit = DebitConfig {
            lambda_url: Some(lambda_url.into()),
            enabled: true,
        };
        self
    }

    /// Overlay tenant properties
    ///
    /// Non-empty `route` and `corsProxy` replace the configured values;
    /// `change_route_suffix_for_block` sets [`Self::append_block_type`].
    #[must_use]
    pub fn with_tenant_properties(mut self, properties: &IndexMap<String, String>) -> Self {
        let non_empty = |key: &str| properties.get(key).filter(|v| !v.is_empty()).cloned();

        if let Some(route) = non_empty(TENANT_ROUTE) {
            self.base_url = route;
        }
        if let Some(proxy) = non_empty(TENANT_CORS_PROXY) {
            self.cors_proxy = Some(proxy);
        }
        if let Some(flag) = properties.get(TENANT_APPEND_TYPE) {
            self.append_block_type = flag == "true";
        }
        self
    }

    /// Check the base URL and auth settings
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the base URL does not parse or the auth
    /// type lacks a required field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        url::Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidUrl {
            url: self.base_url.clone(),
            message: e.to_string(),
        })?;
        self.auth_method()?;
        Ok(())
    }

    /// Resolve the configured auth method
    ///
    /// An unrecognised `authType` falls back to no auth with a warning.
    ///
    /// # Errors
    /// Returns [`ConfigError::MissingAuthField`] if a credential is unset.
    pub fn auth_method(&self) -> Result<AuthMethod, ConfigError> {
        let require = |auth_type: &str, field: &'static str, value: &Option<String>| {
            value.clone().ok_or_else(|| ConfigError::MissingAuthField {
                auth_type: auth_type.to_string(),
                field,
            })
        };

        match self.auth_type.as_deref() {
            Some("basic") => Ok(AuthMethod::Basic {
                user: require("basic", "user", &self.user)?,
                pass: require("basic", "pass", &self.pass)?,
            }),
            Some("client_credentials") => Ok(AuthMethod::ClientCredentials {
                authorization_server: require(
                    "client_credentials",
                    "authorizationServer",
                    &self.authorization_server,
                )?,
                client_id: require("client_credentials", "client_id", &self.client_id)?,
                client_secret: require("client_credentials", "client_secret", &self.client_secret)?,
            }),
            None | Some("none" | "") => Ok(AuthMethod::None),
            Some(other) => {
                tracing::warn!(auth_type = other, "invalid authType configured, inferring none");
                Ok(AuthMethod::None)
            }
        }
    }

    /// Whether debit calls should be fired, with the target URL
    #[must_use]
    pub fn debit_target(&self) -> Option<(&str, &str)> {
        if !self.debit.enabled {
            return None;
        }
        match (self.debit.lambda_url.as_deref(), self.tenant.as_deref()) {
            (Some(url), Some(tenant)) if !url.is_empty() && !tenant.is_empty() => Some((url, tenant)),
            _ => None,
        }
    }
}
