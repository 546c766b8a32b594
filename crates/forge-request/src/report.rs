//! Per-send request log

use crate::error::SendError;
use crate::transport::Method;
use serde::{Serialize, Serializer};
use serde_json::Value;
use ulid::Ulid;

/// Position of a request in the dependency graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    /// The top-level block
    Root,
    /// Sent before its parent; its id goes into the parent body
    ChildFirst,
    /// Sent after its parent, using the parent id
    ParentFirst,
}

/// What happened to one request
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum RequestOutcome {
    /// Server answered 2xx (or mock mode answered)
    Completed {
        /// HTTP status
        status: u16,
        /// Response body
        body: String,
        /// Generated id from the response
        id: Option<String>,
    },
    /// Request was sent and failed
    Failed {
        /// Failure
        #[serde(serialize_with = "error_text")]
        error: SendError,
    },
    /// Request was never sent
    Skipped {
        /// Reason
        #[serde(serialize_with = "error_text")]
        reason: SendError,
    },
}

fn error_text<S: Serializer>(error: &SendError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&error.to_string())
}

impl RequestOutcome {
    /// Generated id of a completed request
    #[inline]
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Completed { id, .. } => id.as_deref(),
            _ => None,
        }
    }

    /// Check for a completed request
    #[inline]
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Failure or skip reason
    #[must_use]
    pub fn error(&self) -> Option<&SendError> {
        match self {
            Self::Completed { .. } => None,
            Self::Failed { error } => Some(error),
            Self::Skipped { reason } => Some(reason),
        }
    }
}

/// One request of a send
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestRecord {
    /// Record id
    pub id: Ulid,
    /// Role in the graph
    pub role: Role,
    /// Schema type
    #[serde(rename = "type")]
    pub type_name: String,
    /// HTTP method
    pub method: Method,
    /// Target URL; empty for skipped requests
    pub url: String,
    /// Body sent
    pub body: Option<Value>,
    /// Result
    #[serde(flatten)]
    pub outcome: RequestOutcome,
}

impl RequestRecord {
    /// Create record with a fresh id
    #[must_use]
    pub fn new(
        role: Role,
        type_name: impl Into<String>,
        method: Method,
        url: impl Into<String>,
        body: Option<Value>,
        outcome: RequestOutcome,
    ) -> Self {
        Self {
            id: Ulid::new(),
            role,
            type_name: type_name.into(),
            method,
            url: url.into(),
            body,
            outcome,
        }
    }
}

/// Everything that happened during one top-level send, in dispatch order
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendReport {
    /// Root block type
    pub root_type: String,
    /// Method of the root request
    pub method: Method,
    /// Records in dispatch order
    pub records: Vec<RequestRecord>,
    /// Id generated for the root object
    pub root_id: Option<String>,
}

impl SendReport {
    /// Create empty report
    #[must_use]
    pub fn new(root_type: impl Into<String>, method: Method) -> Self {
        Self {
            root_type: root_type.into(),
            method,
            records: Vec::new(),
            root_id: None,
        }
    }

    /// Append a record
    pub fn push(&mut self, record: RequestRecord) {
        self.records.push(record);
    }

    /// Check that every request completed
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.records.iter().all(|r| r.outcome.is_completed())
    }

    /// Records that failed or were skipped
    pub fn failures(&self) -> impl Iterator<Item = &RequestRecord> {
        self.records.iter().filter(|r| !r.outcome.is_completed())
    }

    /// Records of a given type
    pub fn of_type<'a>(&'a self, type_name: &'a str) -> impl Iterator<Item = &'a RequestRecord> {
        self.records.iter().filter(move |r| r.type_name == type_name)
    }

    /// Total bytes of all request bodies
    #[must_use]
    pub fn body_bytes(&self) -> usize {
        self.records
            .iter()
            .filter_map(|r| r.body.as_ref())
            .map(|b| b.to_string().len())
            .sum()
    }

    /// Response log, one `status: …` / `response: …` pair per request
    #[must_use]
    pub fn transcript(&self) -> String {
        self.records
            .iter()
            .map(|record| match &record.outcome {
                RequestOutcome::Completed { status, body, .. }
                | RequestOutcome::Failed {
                    error: SendError::Application { status, body },
                } => format!("status: {status}\nresponse: {body}"),
                RequestOutcome::Failed { error } => format!("error: {error}"),
                RequestOutcome::Skipped { reason } => {
                    format!("skipped {}: {reason}", record.type_name)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn report() -> SendReport {
        let mut report = SendReport::new("Order", Method::Post);
        report.push(RequestRecord::new(
            Role::Root,
            "Order",
            Method::Post,
            "https://x/orders",
            Some(json!({"name": "A"})),
            RequestOutcome::Completed {
                status: 201,
                body: r#"{"id":"O1"}"#.into(),
                id: Some("O1".into()),
            },
        ));
        report.push(RequestRecord::new(
            Role::ParentFirst,
            "LineItem",
            Method::Post,
            "https://x/orders/O1/LineItem",
            Some(json!({"sku": "s"})),
            RequestOutcome::Failed {
                error: SendError::Application {
                    status: 422,
                    body: "bad sku".into(),
                },
            },
        ));
        report
    }

    #[test]
    fn transcript_format() {
        assert_eq!(
            report().transcript(),
            "status: 201\nresponse: {\"id\":\"O1\"}\nstatus: 422\nresponse: bad sku"
        );
    }

    #[test]
    fn success_and_failures() {
        let report = report();
        assert!(!report.is_success());
        assert_eq!(report.failures().count(), 1);
        assert_eq!(report.of_type("Order").count(), 1);
        assert_eq!(report.records[0].outcome.id(), Some("O1"));
    }

    #[test]
    fn serialises_flat_outcome() {
        let json = serde_json::to_value(report()).unwrap();
        assert_eq!(json["records"][0]["outcome"], "completed");
        assert_eq!(json["records"][0]["type"], "Order");
        assert_eq!(json["records"][1]["outcome"], "failed");
        assert!(json["records"][1]["error"].as_str().unwrap().contains("422"));
    }
}
