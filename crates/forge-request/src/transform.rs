//! Body transformation
//!
//! Before a block is sent its payload goes through two steps, in this
//! order: ids of already-created children are merged in, then parent-first
//! child fields are cut out and turned into their own requests.

use crate::resolver::{classify, ChildKey};
use forge_block::Block;
use forge_schema::{Link, Schema};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};

/// Ids generated by child requests, keyed by where they belong in the parent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdLedger {
    ids: IndexMap<ChildKey, String>,
}

impl IdLedger {
    /// Create empty ledger
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an id, replacing any earlier one for the key
    pub fn record(&mut self, key: ChildKey, id: impl Into<String>) {
        self.ids.insert(key, id.into());
    }

    /// Look up an id
    #[inline]
    #[must_use]
    pub fn get(&self, key: &ChildKey) -> Option<&str> {
        self.ids.get(key).map(String::as_str)
    }

    /// Number of recorded ids
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Check if no id was recorded
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Iterate in recording order
    pub fn iter(&self) -> impl Iterator<Item = (&ChildKey, &str)> {
        self.ids.iter().map(|(k, v)| (k, v.as_str()))
    }
}

impl FromIterator<(ChildKey, String)> for IdLedger {
    fn from_iter<I: IntoIterator<Item = (ChildKey, String)>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

/// One extra request needed to create a parent-first child
#[derive(Debug, Clone, PartialEq)]
pub struct ChildRequestSpec<'a> {
    /// Ledger key of the child
    pub key: ChildKey,
    /// Child schema type
    pub type_name: String,
    /// Dependency direction
    pub link: Link,
    /// Connected block
    pub block: &'a Block,
    /// Child body, taken from the parent payload
    pub payload: Value,
}

impl ChildRequestSpec<'_> {
    /// Name deciding how the parent id flows into the child
    ///
    /// The property name for route-id children, the `childRefToParent`
    /// field for body-id children.
    #[must_use]
    pub fn strategy_key(&self) -> &str {
        match &self.link {
            Link::ParentBody {
                child_ref_to_parent,
            } => child_ref_to_parent,
            Link::ParentRoute | Link::ChildBody => &self.key.base,
        }
    }
}

/// Remove parent-first child fields from `object`
///
/// Returns the stripped object and one spec per removed child, in dispatch
/// order. A parent-first field is removed whenever an object or array block
/// is connected under it, even an empty array. Plain values inside such an
/// array are already ids and stay in the parent body. Objects whose schema
/// has no parent-first references come back unchanged with no specs.
#[must_use]
pub fn strip_child_fields<'a>(
    object: &Value,
    schema: &Schema,
    block: &'a Block,
) -> (Value, Vec<ChildRequestSpec<'a>>) {
    let Value::Object(map) = object else {
        return (object.clone(), Vec::new());
    };

    let mut specs = Vec::new();
    let stripped: HashSet<String> = schema
        .linked_properties()
        .filter(|(_, def)| def.relation().link().is_some_and(Link::is_parent_first))
        .filter(|(property, _)| {
            block
                .child_by_property(property)
                .is_some_and(|c| c.is_object() || c.is_array())
        })
        .map(|(property, _)| property.to_string())
        .collect();

    for child in classify(schema, block).into_iter().filter(|c| c.is_parent_first()) {
        let field = map.get(child.property());
        let payload = match child.key.index {
            Some(index) => field.and_then(|v| v.get(index)),
            None => field,
        };

        let Some(payload) = payload.filter(|p| p.is_object()) else {
            tracing::warn!(
                schema = schema.name(),
                key = %child.key,
                "no payload for child block; not sent"
            );
            continue;
        };

        specs.push(ChildRequestSpec {
            payload: payload.clone(),
            key: child.key,
            type_name: child.type_name,
            link: child.link,
            block: child.block,
        });
    }

    if stripped.is_empty() {
        return (object.clone(), specs);
    }

    let mut kept = map.clone();
    kept.retain(|key, value| {
        if !stripped.contains(key) {
            return true;
        }
        let Value::Array(items) = value else {
            return false;
        };
        items.retain(is_known_value);
        !items.is_empty()
    });
    (Value::Object(kept), specs)
}

/// Array element that already is an id rather than a body to send
fn is_known_value(value: &Value) -> bool {
    !value.is_object() && !value.is_null()
}

/// Write recorded child ids into `object`
///
/// Indexed keys overwrite their positions in the array field. Elements with
/// no recorded id stay as they were, and positions past the end of the field
/// are padded with nulls. A direct key overwrites its field only when that
/// field is present and not null.
#[must_use]
pub fn merge_child_ids(object: &Value, ledger: &IdLedger) -> Value {
    let Value::Object(map) = object else {
        return object.clone();
    };
    if ledger.is_empty() {
        return object.clone();
    }

    let mut merged: Map<String, Value> = map.clone();
    let mut arrays: BTreeMap<&str, Vec<(usize, &str)>> = BTreeMap::new();

    for (key, id) in ledger.iter() {
        match key.index {
            Some(index) => arrays.entry(key.base.as_str()).or_default().push((index, id)),
            None => {
                if let Some(field) = merged.get_mut(&key.base) {
                    if !field.is_null() {
                        *field = Value::String(id.to_string());
                    }
                }
            }
        }
    }

    for (base, entries) in arrays {
        let mut values = match merged.get(base) {
            Some(Value::Array(existing)) => existing.clone(),
            _ => Vec::new(),
        };
        let len = entries.iter().map(|(i, _)| i + 1).max().unwrap_or(0);
        if values.len() < len {
            values.resize(len, Value::Null);
        }
        for (index, id) in entries {
            values[index] = Value::String(id.to_string());
        }
        merged.insert(base.to_string(), Value::Array(values));
    }

    Value::Object(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::from_value(
            "Order",
            json!({
                "properties": {
                    "name": {"type": "string"},
                    "customer": {
                        "$ref": "Customer.json",
                        "apiCreationStrategy": "parentFirstBodyId",
                        "childRefToParent": "orderId"
                    },
                    "items": {
                        "type": "array",
                        "items": {"$ref": "LineItem.json"},
                        "apiCreationStrategy": "parentFirstRouteId"
                    },
                    "product": {
                        "$ref": "Product.json",
                        "apiCreationStrategy": "childFirstBodyId"
                    }
                }
            }),
        )
        .unwrap()
    }

    fn block() -> Block {
        Block::object("Order")
            .with_required("name", Block::scalar(json!("A")))
            .with_required(
                "customer",
                Block::object("Customer").with_required("name", Block::scalar(json!("B"))),
            )
            .with_required(
                "items",
                Block::array(
                    "LineItem_array",
                    vec![
                        Block::object("LineItem").with_required("sku", Block::scalar(json!("s1"))),
                        Block::object("LineItem").with_required("sku", Block::scalar(json!("s2"))),
                    ],
                ),
            )
            .with_required(
                "product",
                Block::object("Product").with_required("code", Block::scalar(json!("P"))),
            )
    }

    #[test]
    fn strip_removes_parent_first_fields() {
        let block = block();
        let (stripped, specs) = strip_child_fields(&block.to_raw_object(), &schema(), &block);

        assert_eq!(stripped, json!({"name": "A", "product": {"code": "P"}}));
        let keys: Vec<_> = specs.iter().map(|s| s.key.to_string()).collect();
        assert_eq!(keys, vec!["customer", "items0_idx", "items1_idx"]);
        assert_eq!(specs[0].payload, json!({"name": "B"}));
        assert_eq!(specs[0].strategy_key(), "orderId");
        assert_eq!(specs[2].payload, json!({"sku": "s2"}));
        assert_eq!(specs[2].strategy_key(), "items");
        assert_eq!(specs[2].type_name, "LineItem");
    }

    #[test]
    fn strip_takes_payload_from_merged_object() {
        let block = block();
        let mut raw = block.to_raw_object();
        raw["customer"]["name"] = json!("patched");
        let (_, specs) = strip_child_fields(&raw, &schema(), &block);
        assert_eq!(specs[0].payload, json!({"name": "patched"}));
    }

    #[test]
    fn strip_without_references_is_identity() {
        let schema = Schema::from_value(
            "Plain",
            json!({"properties": {"a": {"type": "string"}, "b": {"$ref": "B.json"}}}),
        )
        .unwrap();
        let object = json!({"a": "x", "b": {"c": 1}});
        let block = Block::object("Plain").with_required("b", Block::object("B"));
        let (stripped, specs) = strip_child_fields(&object, &schema, &block);
        assert_eq!(stripped, object);
        assert!(specs.is_empty());
    }

    #[test]
    fn strip_removes_connected_empty_array() {
        let block = Block::object("Order")
            .with_required("name", Block::scalar(json!("A")))
            .with_required("items", Block::array("LineItem_array", Vec::new()));
        let (stripped, specs) = strip_child_fields(&block.to_raw_object(), &schema(), &block);
        assert_eq!(stripped, json!({"name": "A"}));
        assert!(specs.is_empty());
    }

    #[test]
    fn strip_keeps_plain_ids_in_parent_first_array() {
        let block = Block::object("Order")
            .with_required("name", Block::scalar(json!("A")))
            .with_required(
                "items",
                Block::array(
                    "LineItem_array",
                    vec![
                        Block::scalar(json!("existing")),
                        Block::object("LineItem").with_required("sku", Block::scalar(json!("s1"))),
                    ],
                ),
            );
        let (stripped, specs) = strip_child_fields(&block.to_raw_object(), &schema(), &block);

        assert_eq!(stripped, json!({"name": "A", "items": ["existing"]}));
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].key, ChildKey::indexed("items", 1));
        assert_eq!(specs[0].payload, json!({"sku": "s1"}));
    }

    #[test]
    fn merge_keeps_existing_ids_beside_new_ones() {
        let mut ledger = IdLedger::new();
        ledger.record(ChildKey::indexed("products", 1), "new-id");

        let merged = merge_child_ids(
            &json!({"products": ["old-id", {"code": "P"}, {"code": "Q"}]}),
            &ledger,
        );
        assert_eq!(merged, json!({"products": ["old-id", "new-id", {"code": "Q"}]}));
    }

    #[test]
    fn merge_indexed_keys_into_array() {
        let ledger: IdLedger = [
            (ChildKey::indexed("items", 0), "a".to_string()),
            (ChildKey::indexed("items", 1), "b".to_string()),
        ]
        .into_iter()
        .collect();
        let merged = merge_child_ids(&json!({"items": [{"sku": 1}, {"sku": 2}]}), &ledger);
        assert_eq!(merged, json!({"items": ["a", "b"]}));
    }

    #[test]
    fn merge_keeps_holes() {
        let ledger: IdLedger = [(ChildKey::indexed("items", 2), "c".to_string())]
            .into_iter()
            .collect();
        let merged = merge_child_ids(&json!({}), &ledger);
        assert_eq!(merged, json!({"items": [null, null, "c"]}));
    }

    #[test]
    fn merge_direct_keys_only_when_present() {
        let mut ledger = IdLedger::new();
        ledger.record(ChildKey::direct("product"), "P1");
        ledger.record(ChildKey::direct("absent"), "X");
        ledger.record(ChildKey::direct("empty"), "Y");

        let merged = merge_child_ids(
            &json!({"product": {"code": "P"}, "empty": null, "name": "A"}),
            &ledger,
        );
        assert_eq!(merged, json!({"product": "P1", "empty": null, "name": "A"}));
    }

    #[test]
    fn merge_then_strip_order() {
        let block = block();
        let mut ledger = IdLedger::new();
        ledger.record(ChildKey::direct("product"), "P1");

        let merged = merge_child_ids(&block.to_raw_object(), &ledger);
        let (body, _) = strip_child_fields(&merged, &schema(), &block);
        assert_eq!(body, json!({"name": "A", "product": "P1"}));
    }

    #[test]
    fn merge_restores_stripped_keys() {
        let block = Block::object("Order")
            .with_required("name", Block::scalar(json!("A")))
            .with_required(
                "items",
                Block::array(
                    "LineItem_array",
                    vec![Block::object("LineItem"), Block::object("LineItem")],
                ),
            );
        let raw = block.to_raw_object();
        let (stripped, specs) = strip_child_fields(&raw, &schema(), &block);
        let ledger: IdLedger = specs
            .into_iter()
            .enumerate()
            .map(|(i, spec)| (spec.key, format!("id{i}")))
            .collect();

        let restored = merge_child_ids(&stripped, &ledger);

        let keys = |v: &Value| v.as_object().unwrap().keys().cloned().collect::<Vec<_>>();
        assert_eq!(keys(&restored), keys(&raw));
        assert_eq!(restored["name"], raw["name"]);
        assert_eq!(restored["items"], json!(["id0", "id1"]));
    }

    proptest! {
        #[test]
        fn merged_array_is_index_ordered(indices in prop::collection::btree_set(0usize..16, 1..8)) {
            let ledger: IdLedger = indices
                .iter()
                .map(|i| (ChildKey::indexed("items", *i), format!("id{i}")))
                .collect();
            let merged = merge_child_ids(&json!({"items": []}), &ledger);
            let items = merged["items"].as_array().unwrap();

            let max = *indices.iter().max().unwrap();
            prop_assert_eq!(items.len(), max + 1);
            for (position, value) in items.iter().enumerate() {
                if indices.contains(&position) {
                    prop_assert_eq!(value, &json!(format!("id{position}")));
                } else {
                    prop_assert!(value.is_null());
                }
            }
        }
    }
}
