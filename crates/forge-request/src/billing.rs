//! Token debit accounting
//!
//! Debits are fire-and-forget: they run on a detached task and their
//! failures are logged, never returned.

use crate::transport::{HttpRequest, Method, Transport};
use serde_json::json;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Bytes per extra token
pub const BYTES_PER_TOKEN: usize = 1024 * 1024;

/// Tokens charged for a payload: one, plus one per full MiB
#[inline]
#[must_use]
pub fn tokens_for_bytes(bytes: usize) -> u64 {
    1 + (bytes / BYTES_PER_TOKEN) as u64
}

/// Posts debits to the billing API
#[derive(Clone)]
pub struct TokenDebit {
    lambda_url: String,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for TokenDebit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenDebit")
            .field("lambda_url", &self.lambda_url)
            .finish_non_exhaustive()
    }
}

impl TokenDebit {
    /// Create debit client for a billing API base
    #[must_use]
    pub fn new(lambda_url: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            lambda_url: lambda_url.into(),
            transport,
        }
    }

    /// Debit endpoint
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}/debit_tokens", self.lambda_url.trim_end_matches('/'))
    }

    /// Build the debit request
    #[must_use]
    pub fn request(&self, tenant: &str, tokens: u64, operation: &str) -> HttpRequest {
        let body = json!({
            "type": "debit_tokens",
            "body": {
                "extension": tenant,
                "tokens": tokens,
                "operation_type": operation,
            }
        });
        HttpRequest::new(Method::Post, self.endpoint())
            .with_header("Content-Type", "application/json")
            .with_body(body.to_string())
    }

    /// Post a debit on a detached task
    ///
    /// Must be called from within a tokio runtime.
    pub fn fire(&self, tenant: &str, tokens: u64, operation: &str) -> JoinHandle<()> {
        let request = self.request(tenant, tokens, operation);
        let transport = Arc::clone(&self.transport);
        let tenant = tenant.to_string();

        tokio::spawn(async move {
            match transport.execute(request).await {
                Ok(response) if response.is_success() => {
                    tracing::info!(tenant = %tenant, tokens, "debited tokens");
                }
                Ok(response) => {
                    tracing::warn!(
                        tenant = %tenant,
                        status = response.status,
                        body = %response.body,
                        "debit API failed"
                    );
                }
                Err(e) => {
                    tracing::warn!(tenant = %tenant, error = %e, "error calling debit tokens API");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::transport::{HttpResponse, MockTransport};

    #[test]
    fn token_calculation() {
        assert_eq!(tokens_for_bytes(0), 1);
        assert_eq!(tokens_for_bytes(BYTES_PER_TOKEN - 1), 1);
        assert_eq!(tokens_for_bytes(BYTES_PER_TOKEN), 2);
        assert_eq!(tokens_for_bytes(5 * BYTES_PER_TOKEN + 3), 6);
    }

    #[test]
    fn request_shape() {
        let debit = TokenDebit::new("https://billing.example.com/", Arc::new(MockTransport::new()));
        let request = debit.request("acme", 3, "request");
        assert_eq!(request.url, "https://billing.example.com/debit_tokens");

        let body: serde_json::Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(
            body,
            json!({
                "type": "debit_tokens",
                "body": {"extension": "acme", "tokens": 3, "operation_type": "request"}
            })
        );
    }

    #[tokio::test]
    async fn failures_are_swallowed() {
        let mut transport = MockTransport::new();
        transport
            .expect_execute()
            .times(1)
            .returning(|req| Err(TransportError::NoResponse { url: req.url }));

        let debit = TokenDebit::new("https://billing.example.com", Arc::new(transport));
        debit.fire("acme", 1, "request").await.unwrap();
    }

    #[tokio::test]
    async fn success_is_posted() {
        let mut transport = MockTransport::new();
        transport
            .expect_execute()
            .withf(|req| req.url.ends_with("/debit_tokens") && req.method == Method::Post)
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200, "{}")));

        let debit = TokenDebit::new("https://billing.example.com", Arc::new(transport));
        debit.fire("acme", 2, "request").await.unwrap();
    }
}
