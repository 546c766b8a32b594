//! Strategy resolution
//!
//! Pairs each linked schema property with the blocks connected under it.
//! The result is ordered by schema declaration order, then by connected
//! order within an array; that order is the dispatch order of the
//! resulting requests.

use forge_block::Block;
use forge_schema::{Link, Relation, Schema};
use std::fmt;

/// Identity of one child id in the ledger: property name plus array position
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChildKey {
    /// Property name
    pub base: String,
    /// Position in the array, for array-valued properties
    pub index: Option<usize>,
}

impl ChildKey {
    /// Key of a single-valued property
    #[must_use]
    pub fn direct(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            index: None,
        }
    }

    /// Key of an array element
    #[must_use]
    pub fn indexed(base: impl Into<String>, index: usize) -> Self {
        Self {
            base: base.into(),
            index: Some(index),
        }
    }
}

/// Renders the wire form: `items` or `items3_idx`
impl fmt::Display for ChildKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "{}{index}_idx", self.base),
            None => f.write_str(&self.base),
        }
    }
}

/// A connected child block that needs its own request
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedChild<'a> {
    /// Ledger key
    pub key: ChildKey,
    /// Child schema type (`$ref` without `.json`)
    pub type_name: String,
    /// Dependency direction
    pub link: Link,
    /// Connected block
    pub block: &'a Block,
}

impl PlannedChild<'_> {
    /// Property the child hangs off
    #[inline]
    #[must_use]
    pub fn property(&self) -> &str {
        &self.key.base
    }

    /// Check if the parent is dispatched first
    #[inline]
    #[must_use]
    pub fn is_parent_first(&self) -> bool {
        self.link.is_parent_first()
    }
}

/// Find every child of `block` that `schema` wants sent separately
///
/// Only object blocks become requests; a scalar connected under a reference
/// property is treated as an already-known value.
#[must_use]
pub fn classify<'a>(schema: &Schema, block: &'a Block) -> Vec<PlannedChild<'a>> {
    let mut planned = Vec::new();

    for (property, def) in schema.linked_properties() {
        match def.relation() {
            Relation::Embedded => {}
            Relation::Single { target, link } => {
                let Some(child) = block.child_by_property(property) else {
                    continue;
                };
                if !child.is_object() {
                    tracing::debug!(schema = schema.name(), property, "reference holds a plain value; not sent");
                    continue;
                }
                planned.push(PlannedChild {
                    key: ChildKey::direct(property),
                    type_name: target.clone(),
                    link: link.clone(),
                    block: child,
                });
            }
            Relation::Repeated { target, link } => {
                for (index, child) in block.repeated_children(property).iter().enumerate() {
                    if !child.is_object() {
                        tracing::debug!(schema = schema.name(), property, index, "array element is a plain value; not sent");
                        continue;
                    }
                    planned.push(PlannedChild {
                        key: ChildKey::indexed(property, index),
                        type_name: target.clone(),
                        link: link.clone(),
                        block: child,
                    });
                }
            }
        }
    }

    planned
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn order_schema() -> Schema {
        Schema::from_value(
            "Order",
            json!({
                "properties": {
                    "customer": {
                        "$ref": "Customer.json",
                        "apiCreationStrategy": "childFirstBodyId"
                    },
                    "name": {"type": "string"},
                    "lines": {
                        "type": "array",
                        "items": {"$ref": "LineItem.json"},
                        "apiCreationStrategy": "parentFirstRouteId"
                    },
                    "note": {
                        "$ref": "Note.json",
                        "apiCreationStrategy": "parentFirstBodyId",
                        "childRefToParent": "orderId"
                    }
                }
            }),
        )
        .unwrap()
    }

    fn line(sku: &str) -> Block {
        Block::object("LineItem").with_required("sku", Block::scalar(json!(sku)))
    }

    #[test]
    fn key_display() {
        assert_eq!(ChildKey::direct("customer").to_string(), "customer");
        assert_eq!(ChildKey::indexed("items", 3).to_string(), "items3_idx");
    }

    #[test]
    fn declaration_then_connected_order() {
        let block = Block::object("Order")
            .with_required("note", Block::object("Note"))
            .with_required("lines", Block::array("LineItem_array", vec![line("a"), line("b"), line("c")]))
            .with_required("customer", Block::object("Customer"));

        let planned = classify(&order_schema(), &block);
        let keys: Vec<_> = planned.iter().map(|p| p.key.to_string()).collect();
        assert_eq!(
            keys,
            vec!["customer", "lines0_idx", "lines1_idx", "lines2_idx", "note"]
        );
        assert_eq!(planned[1].type_name, "LineItem");
        assert!(!planned[0].is_parent_first());
        assert!(planned[4].is_parent_first());
    }

    #[test]
    fn missing_children_are_skipped() {
        let block = Block::object("Order").with_required("name", Block::scalar(json!("A")));
        assert!(classify(&order_schema(), &block).is_empty());
    }

    #[test]
    fn scalar_values_are_not_requests() {
        let block = Block::object("Order")
            .with_required("customer", Block::scalar(json!("C1")))
            .with_required(
                "lines",
                Block::array("LineItem_array", vec![Block::scalar(json!("L0")), line("b")]),
            );
        let planned = classify(&order_schema(), &block);
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].key, ChildKey::indexed("lines", 1));
    }
}
