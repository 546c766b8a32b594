//! Blockforge Request Orchestration
//!
//! Turns a nested block tree into an ordered series of HTTP requests. Each
//! schema property that references another type carries a creation strategy
//! deciding whether the referenced object is created before its parent (its
//! id goes into the parent body) or after it (the parent id goes into its
//! route or body).
//!
//! # Architecture
//!
//! ```text
//! Block tree ──► resolver::classify ──► transform (merge ids, strip children)
//!                                              │
//!                  RouteComposer + headers ◄───┘
//!                              │
//!                    RequestSequencer ──► Transport ──► SendReport
//!                              └──► TokenDebit (detached)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use forge_request::prelude::*;
//!
//! let sequencer = RequestSequencer::over_http(config, registry)?;
//! let report = sequencer.send(Method::Post, &root).await;
//! println!("{}", report.transcript());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod auth;
pub mod billing;
pub mod config;
pub mod error;
pub mod report;
pub mod resolver;
pub mod route;
pub mod sequencer;
pub mod transform;
pub mod transport;

// Re-exports for convenience
pub use auth::{basic_credentials, request_headers, AuthMethod, Authenticator, BILLING_TENANT};
pub use billing::{tokens_for_bytes, TokenDebit, BYTES_PER_TOKEN};
pub use config::{DebitConfig, ForgeConfig};
pub use error::{ConfigError, ErrorCategory, SendError, TransportError};
pub use report::{RequestOutcome, RequestRecord, Role, SendReport};
pub use resolver::{classify, ChildKey, PlannedChild};
pub use route::{infer_resource_type, RouteComposer};
pub use sequencer::{FetchResult, RequestSequencer, MOCK_CHILD_ID, MOCK_ID};
pub use transform::{merge_child_ids, strip_child_fields, ChildRequestSpec, IdLedger};
pub use transport::{HttpRequest, HttpResponse, Method, ReqwestTransport, Transport};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for sending block trees
    pub use crate::config::ForgeConfig;
    pub use crate::error::{SendError, TransportError};
    pub use crate::report::{RequestOutcome, SendReport};
    pub use crate::sequencer::RequestSequencer;
    pub use crate::transport::{HttpRequest, HttpResponse, Method, Transport};
}
