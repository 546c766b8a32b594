//! Request headers and authorisation
//!
//! `Authorization` values always carry their RFC 7617 / RFC 6750 scheme
//! (`Basic <base64>` or `Bearer <token>`). The bare credential or token,
//! without a scheme, is never sent.

use crate::config::ForgeConfig;
use crate::error::SendError;
use crate::transport::{HttpRequest, Method, Transport};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tokio::sync::OnceCell;

/// Tenant whose requests carry `X-Billing-User`
pub const BILLING_TENANT: &str = "meta";

/// Resolved authorisation scheme
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMethod {
    /// No `Authorization` header
    None,
    /// `Authorization: Basic base64(user:pass)`
    Basic {
        /// User name
        user: String,
        /// Password
        pass: String,
    },
    /// Bearer token from a client-credentials grant
    ClientCredentials {
        /// Token endpoint
        authorization_server: String,
        /// Client id
        client_id: String,
        /// Client secret
        client_secret: String,
    },
}

/// Produces the `Authorization` header, fetching and caching tokens
#[derive(Debug)]
pub struct Authenticator {
    method: AuthMethod,
    token: OnceCell<String>,
}

impl Authenticator {
    /// Create authenticator for a method
    #[must_use]
    pub fn new(method: AuthMethod) -> Self {
        Self {
            method,
            token: OnceCell::new(),
        }
    }

    /// Configured method
    #[inline]
    #[must_use]
    pub fn method(&self) -> &AuthMethod {
        &self.method
    }

    /// `Authorization` header value, if the method uses one
    ///
    /// A client-credentials token is fetched on first use and reused after;
    /// a failed fetch is not cached.
    ///
    /// # Errors
    /// Returns [`SendError::Auth`] if the token endpoint fails or answers
    /// without `access_token`.
    pub async fn authorization(&self, transport: &dyn Transport) -> Result<Option<String>, SendError> {
        match &self.method {
            AuthMethod::None => Ok(None),
            AuthMethod::Basic { user, pass } => Ok(Some(basic_credentials(user, pass))),
            AuthMethod::ClientCredentials {
                authorization_server,
                client_id,
                client_secret,
            } => {
                let token = self
                    .token
                    .get_or_try_init(|| {
                        fetch_token(transport, authorization_server, client_id, client_secret)
                    })
                    .await?;
                Ok(Some(format!("Bearer {token}")))
            }
        }
    }
}

/// `Basic` header value for a user and password
#[must_use]
pub fn basic_credentials(user: &str, pass: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{user}:{pass}")))
}

async fn fetch_token(
    transport: &dyn Transport,
    authorization_server: &str,
    client_id: &str,
    client_secret: &str,
) -> Result<String, SendError> {
    let body = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("grant_type", "client_credentials")
        .append_pair("client_id", client_id)
        .append_pair("client_secret", client_secret)
        .finish();

    let request = HttpRequest::new(Method::Post, authorization_server)
        .with_header("Content-type", "application/x-www-form-urlencoded")
        .with_body(body);

    let response = transport
        .execute(request)
        .await
        .map_err(|e| SendError::Auth(e.to_string()))?;
    if !response.is_success() {
        return Err(SendError::Auth(format!(
            "token endpoint returned {}: {}",
            response.status, response.body
        )));
    }

    let token = response
        .json()
        .ok()
        .and_then(|json| json.get("access_token").and_then(|t| t.as_str()).map(str::to_string))
        .ok_or_else(|| SendError::Auth("token response has no access_token".to_string()))?;
    tracing::debug!(server = authorization_server, "fetched access token");
    Ok(token)
}

/// Headers every request carries, in order
///
/// `Content-type` and `Authorization` come first, then `X-Billing-User` for
/// the billing tenant, then configured headers with empty names or values
/// skipped.
#[must_use]
pub fn request_headers(config: &ForgeConfig, authorization: Option<String>) -> Vec<(String, String)> {
    let mut headers = vec![("Content-type".to_string(), "application/json".to_string())];
    if let Some(value) = authorization {
        headers.push(("Authorization".to_string(), value));
    }

    let tenant = config
        .tenant
        .as_deref()
        .or_else(|| config.query_params.get("tenant").map(String::as_str))
        .or_else(|| config.query_params.get("extension").map(String::as_str));
    if tenant == Some(BILLING_TENANT) {
        if let Some(user) = config.billing_user.as_deref().filter(|u| !u.is_empty()) {
            headers.push(("X-Billing-User".to_string(), user.to_string()));
        }
    }

    headers.extend(
        config
            .headers
            .iter()
            .filter(|(k, v)| !k.is_empty() && !v.is_empty())
            .map(|(k, v)| (k.clone(), v.clone())),
    );
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::transport::{HttpResponse, MockTransport};

    #[test]
    fn basic_header_value() {
        assert_eq!(basic_credentials("user", "pass"), "Basic dXNlcjpwYXNz");
    }

    #[tokio::test]
    async fn none_and_basic_need_no_network() {
        let transport = MockTransport::new();

        let none = Authenticator::new(AuthMethod::None);
        assert_eq!(none.authorization(&transport).await.unwrap(), None);

        let basic = Authenticator::new(AuthMethod::Basic {
            user: "user".into(),
            pass: "pass".into(),
        });
        assert_eq!(
            basic.authorization(&transport).await.unwrap().as_deref(),
            Some("Basic dXNlcjpwYXNz")
        );
    }

    fn client_credentials() -> Authenticator {
        Authenticator::new(AuthMethod::ClientCredentials {
            authorization_server: "https://auth.example.com/token".into(),
            client_id: "abc".into(),
            client_secret: "s3cret".into(),
        })
    }

    #[tokio::test]
    async fn token_fetched_once() {
        let mut transport = MockTransport::new();
        transport
            .expect_execute()
            .withf(|req| {
                req.method == Method::Post
                    && req.url == "https://auth.example.com/token"
                    && req.body.as_deref()
                        == Some("grant_type=client_credentials&client_id=abc&client_secret=s3cret")
            })
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200, r#"{"access_token":"tok"}"#)));

        let auth = client_credentials();
        for _ in 0..2 {
            assert_eq!(
                auth.authorization(&transport).await.unwrap().as_deref(),
                Some("Bearer tok")
            );
        }
    }

    #[tokio::test]
    async fn failed_fetch_is_not_cached() {
        let mut transport = MockTransport::new();
        let mut seq = mockall::Sequence::new();
        transport
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|req| Err(TransportError::NoResponse { url: req.url }));
        transport
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(HttpResponse::new(200, r#"{"access_token":"tok"}"#)));

        let auth = client_credentials();
        assert!(matches!(
            auth.authorization(&transport).await,
            Err(SendError::Auth(_))
        ));
        assert_eq!(
            auth.authorization(&transport).await.unwrap().as_deref(),
            Some("Bearer tok")
        );
    }

    #[test]
    fn billing_and_custom_headers() {
        let mut config = ForgeConfig::new()
            .with_tenant("meta")
            .with_header("X-Trace", "1")
            .with_header("X-Empty", "");
        config.billing_user = Some("ada@example.com".into());

        let headers = request_headers(&config, Some("Basic x".into()));
        let names: Vec<_> = headers.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            names,
            vec!["Content-type", "Authorization", "X-Billing-User", "X-Trace"]
        );
    }

    #[test]
    fn no_billing_header_for_other_tenants() {
        let mut config = ForgeConfig::new().with_tenant("acme");
        config.billing_user = Some("ada@example.com".into());
        let headers = request_headers(&config, None);
        assert_eq!(headers.len(), 1);
    }
}
