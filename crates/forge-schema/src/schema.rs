//! Schema definitions
//!
//! A [`Schema`] keeps the raw JSON (extension fields included) next to the
//! typed property map used by request orchestration.

use crate::error::SchemaError;
use crate::property::{PropertyDef, Relation};
use indexmap::IndexMap;
use serde_json::Value;

/// Strip the `.json` suffix from a `$ref` to get the schema type name
#[inline]
#[must_use]
pub fn ref_type_name(reference: &str) -> &str {
    reference.strip_suffix(".json").unwrap_or(reference)
}

/// Object type description with orchestration metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    name: String,
    properties: IndexMap<String, PropertyDef>,
    required: Vec<String>,
    endpoint: Option<String>,
    route_suffix: Option<String>,
    raw: Value,
}

impl Schema {
    /// Parse a schema, validating every property definition
    ///
    /// Property order follows the declaration order of the source document.
    ///
    /// # Errors
    /// Returns [`SchemaError`] if the value is null, not an object, or holds
    /// a malformed property.
    pub fn from_value(name: impl Into<String>, raw: Value) -> Result<Self, SchemaError> {
        let name = name.into();
        let map = match &raw {
            Value::Null => return Err(SchemaError::Undefined(name)),
            Value::Object(map) => map,
            _ => return Err(SchemaError::NotAnObject(name)),
        };

        let mut properties = IndexMap::new();
        if let Some(Value::Object(props)) = map.get("properties") {
            for (prop_name, prop) in props {
                let def = PropertyDef::from_value(&name, prop_name, prop)?;
                properties.insert(prop_name.clone(), def);
            }
        }

        let required = map
            .get("required")
            .and_then(Value::as_array)
            .map(|r| r.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default();

        let non_empty = |key: &str| {
            map.get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let endpoint = non_empty("endpoint");
        let route_suffix = non_empty("routeSuffix");

        Ok(Self {
            name,
            properties,
            required,
            endpoint,
            route_suffix,
            raw,
        })
    }

    /// Registry name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Properties in declaration order
    #[inline]
    #[must_use]
    pub fn properties(&self) -> &IndexMap<String, PropertyDef> {
        &self.properties
    }

    /// Look up one property
    #[inline]
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.get(name)
    }

    /// Check if a property is listed in `required`
    #[inline]
    #[must_use]
    pub fn is_required(&self, property: &str) -> bool {
        self.required.iter().any(|r| r == property)
    }

    /// Endpoint override
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// Path segment used in URLs: `endpoint` if set, else the schema name
    #[inline]
    #[must_use]
    pub fn endpoint_name(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(&self.name)
    }

    /// Suffix appended to the route after the type segment
    #[inline]
    #[must_use]
    pub fn route_suffix(&self) -> Option<&str> {
        self.route_suffix.as_deref()
    }

    /// Original document including extension fields
    #[inline]
    #[must_use]
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Properties that need their own request, in declaration order
    pub fn linked_properties(&self) -> impl Iterator<Item = (&str, &PropertyDef)> {
        self.properties
            .iter()
            .filter(|(_, def)| !matches!(def.relation(), Relation::Embedded))
            .map(|(name, def)| (name.as_str(), def))
    }

    /// Check if any property needs its own request
    #[inline]
    #[must_use]
    pub fn has_links(&self) -> bool {
        self.linked_properties().next().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn order() -> Schema {
        Schema::from_value(
            "Order",
            json!({
                "type": "object",
                "endpoint": "orders",
                "routeSuffix": "",
                "required": ["name"],
                "properties": {
                    "name": {"type": "string"},
                    "customer": {
                        "$ref": "Customer.json",
                        "apiCreationStrategy": "parentFirstBodyId",
                        "childRefToParent": "orderId"
                    },
                    "notes": {"type": "string"}
                }
            }),
        )
        .unwrap()
    }

    #[test]
    fn ref_type_name_strips_suffix() {
        assert_eq!(ref_type_name("Customer.json"), "Customer");
        assert_eq!(ref_type_name("Customer"), "Customer");
    }

    #[test]
    fn preserves_declaration_order() {
        let schema = order();
        let names: Vec<_> = schema.properties().keys().map(String::as_str).collect();
        assert_eq!(names, vec!["name", "customer", "notes"]);
    }

    #[test]
    fn endpoint_override() {
        let schema = order();
        assert_eq!(schema.endpoint_name(), "orders");
        assert!(schema.route_suffix().is_none(), "empty suffix is unset");
    }

    #[test]
    fn endpoint_defaults_to_name() {
        let schema = Schema::from_value("Customer", json!({"properties": {}})).unwrap();
        assert_eq!(schema.endpoint_name(), "Customer");
        assert!(!schema.has_links());
    }

    #[test]
    fn linked_properties_filter() {
        let schema = order();
        let linked: Vec<_> = schema.linked_properties().map(|(n, _)| n).collect();
        assert_eq!(linked, vec!["customer"]);
        assert!(schema.is_required("name"));
        assert!(!schema.is_required("notes"));
    }

    #[test]
    fn rejects_null_and_scalars() {
        assert!(matches!(
            Schema::from_value("X", Value::Null),
            Err(SchemaError::Undefined(_))
        ));
        assert!(matches!(
            Schema::from_value("X", json!(3)),
            Err(SchemaError::NotAnObject(_))
        ));
    }
}
