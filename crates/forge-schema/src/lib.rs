//! Blockforge Schema Registry
//!
//! Holds the tenant's object type descriptions and answers the questions the
//! request orchestrator asks about them: which endpoint a type is posted to,
//! which properties reference other types, and in which order those
//! referenced objects must be created.
//!
//! # Architecture
//!
//! ```text
//! bundle dir → BundleMetadata → SchemaBundle → SchemaRegistry
//!                   ↓ fingerprint                  ↓
//!               SchemaCache (per tenant)     Schema / PropertyDef / Relation
//! ```
//!
//! Each registered schema is kept twice: the raw document with its extension
//! fields (`endpoint`, `routeSuffix`, `apiCreationStrategy`, ...) for
//! orchestration, and a sanitised copy for the JSON Schema validator.
//!
//! # Example
//!
//! ```rust,ignore
//! use forge_schema::SchemaRegistry;
//! use serde_json::json;
//!
//! let mut registry = SchemaRegistry::new();
//! registry.register("Order", json!({
//!     "endpoint": "orders",
//!     "properties": {
//!         "customer": {
//!             "$ref": "Customer.json",
//!             "apiCreationStrategy": "childFirstBodyId"
//!         }
//!     }
//! }));
//! assert_eq!(registry.resolve_endpoint("Order"), "orders");
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod bundle;
pub mod cache;
pub mod error;
pub mod property;
pub mod registry;
pub mod sanitize;
pub mod schema;
pub mod strategy;

// Re-exports for convenience
pub use bundle::{parse_endpoints, parse_properties, BundleMetadata, FileMeta, SchemaBundle};
pub use cache::{cache_key, CacheStats, CachedSchemas, SchemaCache};
pub use error::SchemaError;
pub use property::{PropertyDef, PropertyType, Relation};
pub use registry::{SchemaRegistry, ValidationReport};
pub use sanitize::{convert_custom_types, sanitize_for_validator};
pub use schema::{ref_type_name, Schema};
pub use strategy::{CreationStrategy, Link, UnknownStrategy};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with schemas
    pub use crate::error::SchemaError;
    pub use crate::property::{PropertyDef, Relation};
    pub use crate::registry::SchemaRegistry;
    pub use crate::schema::Schema;
    pub use crate::strategy::{CreationStrategy, Link};
}
