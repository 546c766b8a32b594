//! Blockforge Block Tree
//!
//! Immutable model of the editor's block tree. The editor (or the JSON
//! adapter in [`lift`]) produces a [`Block`] once; request orchestration only
//! reads it.
//!
//! # Shape
//!
//! ```text
//! Object "Order"
//!   ├─ Input ["name", ":"]      → Scalar "A"
//!   ├─ Input ["-", "customer"]  → Object "Customer" …
//!   └─ Input ["lines", ":"]     → Array "LineItem_array"
//!                                   ├─ Object "LineItem"
//!                                   └─ Object "LineItem"
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod block;
pub mod error;
pub mod lift;
pub mod walker;

pub use block::{scalar_kind, Block, Input, OPTIONAL_MARKER, REQUIRED_SEPARATOR};
pub use error::BlockError;
pub use lift::{lift, ARRAY_SUFFIX, DICTIONARY, DYNARRAY};
pub use walker::{find_child_by_property, find_repeated_children};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
