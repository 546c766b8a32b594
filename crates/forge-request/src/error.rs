//! Error types for request sequencing
//!
//! Every failure is attached to the request it happened on; none of them
//! aborts the whole send. [`SendError::category`] maps a failure onto the
//! taxonomy the caller reports on:
//! - Configuration: bad config or unregistered schema
//! - Transport: network failure, status 0, timeouts
//! - Application: non-2xx responses, surfaced verbatim
//! - Serialization: malformed bodies or responses
//! - Dependency: request never sent because its parent has no id

use serde::Serialize;
use std::path::PathBuf;

/// Broad failure class used for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    /// Registry or configuration problem
    Configuration,
    /// No usable response from the network
    Transport,
    /// Server answered with a non-2xx status
    Application,
    /// Body or response could not be (de)serialised
    Serialization,
    /// Skipped because a request it depends on failed
    Dependency,
}

/// Failure of one request in a send
#[derive(Debug, Clone, thiserror::Error)]
pub enum SendError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Transport failure
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Non-2xx response
    #[error("request failed with status {status}: {body}")]
    Application {
        /// HTTP status
        status: u16,
        /// Response body, verbatim
        body: String,
    },

    /// Body or response failed to (de)serialise
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Response carried no `id` although dependents need one
    #[error("response for {type_name} has no id")]
    MissingId {
        /// Type of the request whose response lacked an id
        type_name: String,
    },

    /// Parent request failed, so this one was never sent
    #[error("not sent: parent {parent} failed")]
    DependencyFailed {
        /// Type of the failed parent
        parent: String,
    },

    /// Access token could not be obtained
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Block type has no registered schema
    #[error("no schema registered for {type_name}")]
    UnknownSchema {
        /// Block type
        type_name: String,
    },
}

impl SendError {
    /// Failure class of this error
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) | Self::UnknownSchema { .. } => ErrorCategory::Configuration,
            Self::Transport(_) | Self::Auth(_) => ErrorCategory::Transport,
            Self::Application { .. } => ErrorCategory::Application,
            Self::Serialization(_) | Self::MissingId { .. } => ErrorCategory::Serialization,
            Self::DependencyFailed { .. } => ErrorCategory::Dependency,
        }
    }

    /// Check if a manual retry may succeed
    ///
    /// Only transport failures qualify. Nothing is retried automatically.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Transport
    }

    /// Create serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }
}

impl From<serde_json::Error> for SendError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Network-level failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Status 0 with an empty body: blocked cross-origin call or dropped connection
    #[error("no response from {url}; likely a cross-origin or network failure")]
    NoResponse {
        /// Target URL
        url: String,
    },

    /// Request exceeded the configured timeout
    #[error("request to {url} timed out")]
    Timeout {
        /// Target URL
        url: String,
    },

    /// Connection could not be established or was interrupted
    #[error("request to {url} failed: {message}")]
    Connect {
        /// Target URL
        url: String,
        /// Client message
        message: String,
    },

    /// Request could not be built (bad URL or header)
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Configuration loading and validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("cannot read config {path}: {message}")]
    Read {
        /// Config path
        path: PathBuf,
        /// IO message
        message: String,
    },

    /// Config file failed to parse
    #[error("cannot parse config {path}: {message}")]
    Parse {
        /// Config path
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// Extension is not json, yaml, yml or toml
    #[error("unsupported config format: {0}")]
    UnsupportedFormat(PathBuf),

    /// Base URL is empty or does not parse
    #[error("invalid base url '{url}': {message}")]
    InvalidUrl {
        /// Offending URL
        url: String,
        /// Parser message
        message: String,
    },

    /// Auth type needs a field that is not set
    #[error("auth type '{auth_type}' requires '{field}'")]
    MissingAuthField {
        /// Configured auth type
        auth_type: String,
        /// Missing field
        field: &'static str,
    },
}
