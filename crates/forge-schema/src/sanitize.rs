//! Validator sanitisation
//!
//! The editor's schemas carry extension keys and a custom `dictionary` type
//! that a standard JSON Schema validator rejects or misreads. The cleaned
//! copy produced here is the only form handed to the validator; the original
//! stays in the registry for orchestration.

use crate::property::INVALID_REF;
use serde_json::{Map, Value};

/// Extension keys removed from the schema root
pub const EXTENSION_KEYS: [&str; 10] = [
    "color",
    "apiCreationStrategy",
    "endpoint",
    "childRefToParent",
    "stringify",
    "format",
    "uri",
    "routeSuffix",
    "endpoints",
    "endpointDescriptions",
];

/// Extension keys removed from each entry of `properties`
pub const PROPERTY_EXTENSION_KEYS: [&str; 4] = [
    "stringify",
    "routeSuffix",
    "apiCreationStrategy",
    "childRefToParent",
];

/// Produce the validator form of a raw schema
#[must_use]
pub fn sanitize_for_validator(raw: &Value) -> Value {
    let mut clean = raw.clone();

    if let Value::Object(root) = &mut clean {
        root.retain(|key, _| !EXTENSION_KEYS.contains(&key.as_str()));

        if let Some(Value::Object(props)) = root.get_mut("properties") {
            for (name, def) in props.iter_mut() {
                let Value::Object(def) = def else { continue };
                if def.get("$ref").and_then(Value::as_str) == Some(INVALID_REF) {
                    tracing::warn!(property = %name, "removed invalid $ref value");
                }
                def.retain(|key, value| {
                    !PROPERTY_EXTENSION_KEYS.contains(&key.as_str())
                        && !(key == "$ref" && value.as_str() == Some(INVALID_REF))
                });
            }
        }
    }

    convert_custom_types(&clean)
}

/// Map custom types onto standard JSON Schema recursively
///
/// `dictionary` becomes `object`, the placeholder type `$ref` becomes
/// `string`, and placeholder `$ref` values are dropped.
#[must_use]
pub fn convert_custom_types(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(convert_custom_types).collect()),
        Value::Object(map) => {
            let mut converted = Map::with_capacity(map.len());
            for (key, value) in map {
                if key == "type" {
                    let mapped = match value.as_str() {
                        Some("dictionary") => Value::String("object".to_string()),
                        Some(INVALID_REF) => {
                            tracing::warn!("converted invalid $ref type to string");
                            Value::String("string".to_string())
                        }
                        _ => value.clone(),
                    };
                    converted.insert(key.clone(), mapped);
                } else if key == "$ref" && value.as_str() == Some(INVALID_REF) {
                    continue;
                } else {
                    converted.insert(key.clone(), convert_custom_types(value));
                }
            }
            Value::Object(converted)
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;

    fn schema_tree() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(json!({"type": "dictionary"})),
            Just(json!({"type": "$ref"})),
            Just(json!({"type": "string"})),
            Just(json!({"$ref": "$ref"})),
            Just(json!({"$ref": "Other.json"})),
        ];
        leaf.prop_recursive(4, 32, 4, |inner| {
            prop_oneof![
                inner.clone().prop_map(|items| json!({"type": "array", "items": items})),
                prop::collection::btree_map("p[a-z]{1,3}", inner, 1..4).prop_map(|props| {
                    json!({"type": "dictionary", "properties": props})
                }),
            ]
        })
    }

    fn has_custom_type(value: &Value) -> bool {
        match value {
            Value::Array(items) => items.iter().any(has_custom_type),
            Value::Object(map) => map.iter().any(|(key, value)| {
                (key == "type" && matches!(value.as_str(), Some("dictionary" | "$ref")))
                    || (key == "$ref" && value.as_str() == Some("$ref"))
                    || has_custom_type(value)
            }),
            _ => false,
        }
    }

    #[test]
    fn strips_root_extensions() {
        let raw = json!({
            "type": "object",
            "color": 120,
            "endpoint": "orders",
            "routeSuffix": "/v2",
            "endpoints": ["IN POST: /orders"],
            "properties": {}
        });
        assert_eq!(
            sanitize_for_validator(&raw),
            json!({"type": "object", "properties": {}})
        );
    }

    #[test]
    fn strips_property_extensions_and_placeholder_refs() {
        let raw = json!({
            "properties": {
                "customer": {
                    "$ref": "Customer.json",
                    "apiCreationStrategy": "parentFirstBodyId",
                    "childRefToParent": "orderId",
                    "stringify": true
                },
                "broken": {"$ref": "$ref", "type": "$ref"}
            }
        });
        assert_eq!(
            sanitize_for_validator(&raw),
            json!({
                "properties": {
                    "customer": {"$ref": "Customer.json"},
                    "broken": {"type": "string"}
                }
            })
        );
    }

    #[test]
    fn dictionary_becomes_object_at_any_depth() {
        let raw = json!({
            "type": "dictionary",
            "properties": {
                "meta": {
                    "type": "array",
                    "items": {"type": "dictionary"}
                }
            }
        });
        let clean = sanitize_for_validator(&raw);
        assert_eq!(clean["type"], "object");
        assert_eq!(clean["properties"]["meta"]["items"]["type"], "object");
    }

    #[test]
    fn keeps_original_untouched() {
        let raw = json!({"color": 1, "type": "dictionary"});
        let _ = sanitize_for_validator(&raw);
        assert_eq!(raw["color"], 1);
        assert_eq!(raw["type"], "dictionary");
    }

    #[test]
    fn nested_property_format_is_kept() {
        let raw = json!({"properties": {"site": {"type": "string", "format": "uri"}}});
        let clean = sanitize_for_validator(&raw);
        assert_eq!(clean["properties"]["site"]["format"], "uri");
    }

    proptest! {
        #[test]
        fn no_custom_type_survives(tree in schema_tree()) {
            let clean = convert_custom_types(&tree);
            prop_assert!(!has_custom_type(&clean));
            prop_assert_eq!(convert_custom_types(&clean), clean);
        }
    }
}
