//! Schema registry
//!
//! Provides [`SchemaRegistry`] for registering, looking up and validating
//! tenant schemas by type name.

use crate::error::SchemaError;
use crate::sanitize::sanitize_for_validator;
use crate::schema::Schema;
use indexmap::IndexMap;
use jsonschema::JSONSchema;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Result of validating an object against a cleaned schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Whether the object passed
    pub valid: bool,
    /// One line per failure: `{instance path}: {message}`
    pub errors: Vec<String>,
}

impl ValidationReport {
    /// Passing report
    #[inline]
    #[must_use]
    pub fn passed() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }
}

/// Registry of tenant schemas
///
/// Holds each schema twice: the typed original used for orchestration and
/// the sanitised copy given to the validator.
#[derive(Debug, Default, Clone)]
pub struct SchemaRegistry {
    schemas: IndexMap<String, Arc<Schema>>,
    cleaned: IndexMap<String, Value>,
}

impl SchemaRegistry {
    /// Create new empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a schema
    ///
    /// Invalid or undefined schemas are skipped with a warning.
    /// Returns whether the schema was registered.
    pub fn register(&mut self, name: &str, raw: Value) -> bool {
        match self.try_register(name, raw) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(schema = name, error = %e, "cannot add schema");
                false
            }
        }
    }

    /// Insert or replace a schema, surfacing load errors
    ///
    /// # Errors
    /// Returns [`SchemaError`] if the definition is malformed; the registry
    /// is left unchanged.
    pub fn try_register(&mut self, name: &str, raw: Value) -> Result<(), SchemaError> {
        let cleaned = sanitize_for_validator(&raw);
        let schema = Schema::from_value(name, raw)?;
        self.schemas.insert(name.to_string(), Arc::new(schema));
        self.cleaned.insert(name.to_string(), cleaned);
        tracing::debug!(schema = name, "registered schema");
        Ok(())
    }

    /// Look up a schema by name
    #[inline]
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name).map(Arc::as_ref)
    }

    /// Shared handle to a schema
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<Schema>> {
        self.schemas.get(name).cloned()
    }

    /// URL path segment for a type: its `endpoint` override, else the name
    #[must_use]
    pub fn resolve_endpoint<'a>(&'a self, name: &'a str) -> &'a str {
        self.lookup(name).map_or(name, Schema::endpoint_name)
    }

    /// Route suffix declared by a type, if any
    #[inline]
    #[must_use]
    pub fn route_suffix(&self, name: &str) -> Option<&str> {
        self.lookup(name).and_then(Schema::route_suffix)
    }

    /// Validator form of a schema
    #[inline]
    #[must_use]
    pub fn cleaned(&self, name: &str) -> Option<&Value> {
        self.cleaned.get(name)
    }

    /// Validate an object against a registered schema
    ///
    /// Every other registered schema is resolvable as `Name.json`.
    ///
    /// # Errors
    /// - [`SchemaError::NotFound`] if `name` is not registered
    /// - [`SchemaError::Compile`] if the cleaned schema does not compile
    pub fn validate(&self, name: &str, instance: &Value) -> Result<ValidationReport, SchemaError> {
        let schema = self
            .cleaned
            .get(name)
            .ok_or_else(|| SchemaError::NotFound(name.to_string()))?;

        let mut options = JSONSchema::options();
        for (other, document) in &self.cleaned {
            options.with_document(format!("{other}.json"), document.clone());
            options.with_document(format!("json-schema:///{other}.json"), document.clone());
        }

        let compiled = options.compile(schema).map_err(|e| SchemaError::Compile {
            name: name.to_string(),
            message: e.to_string(),
        })?;

        let errors: Vec<String> = match compiled.validate(instance) {
            Ok(()) => Vec::new(),
            Err(errors) => errors
                .map(|e| format!("{}: {}", e.instance_path, e))
                .collect(),
        };

        Ok(ValidationReport {
            valid: errors.is_empty(),
            errors,
        })
    }

    /// Check if schema exists
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Remove a schema
    #[inline]
    pub fn remove(&mut self, name: &str) -> bool {
        self.cleaned.shift_remove(name);
        self.schemas.shift_remove(name).is_some()
    }

    /// Registered names in insertion order
    #[inline]
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.schemas.keys().map(String::as_str).collect()
    }

    /// Get number of registered schemas
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Iterate over all schemas
    pub fn iter(&self) -> impl Iterator<Item = &Schema> {
        self.schemas.values().map(Arc::as_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> SchemaRegistry {
        let mut registry = SchemaRegistry::new();
        assert!(registry.register(
            "Customer",
            json!({
                "type": "object",
                "endpoint": "customers",
                "required": ["name"],
                "properties": {"name": {"type": "string"}}
            })
        ));
        registry
    }

    #[test]
    fn registry_new_empty() {
        let registry = SchemaRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn register_and_lookup() {
        let registry = registry();
        assert!(registry.contains("Customer"));
        assert_eq!(registry.lookup("Customer").unwrap().name(), "Customer");
        assert!(registry.lookup("Missing").is_none());
    }

    #[test]
    fn register_undefined_is_noop() {
        let mut registry = registry();
        assert!(!registry.register("Ghost", Value::Null));
        assert!(!registry.contains("Ghost"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn register_malformed_keeps_previous_version() {
        let mut registry = registry();
        let bad = json!({
            "properties": {"x": {"$ref": "X.json", "apiCreationStrategy": "parentFirstBodyId"}}
        });
        assert!(!registry.register("Customer", bad));
        assert_eq!(registry.resolve_endpoint("Customer"), "customers");
    }

    #[test]
    fn register_replaces() {
        let mut registry = registry();
        assert!(registry.register("Customer", json!({"properties": {}})));
        assert_eq!(registry.resolve_endpoint("Customer"), "Customer");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn resolve_endpoint_falls_back_to_name() {
        let registry = registry();
        assert_eq!(registry.resolve_endpoint("Customer"), "customers");
        assert_eq!(registry.resolve_endpoint("Unknown"), "Unknown");
    }

    #[test]
    fn cleaned_copy_drops_extensions() {
        let registry = registry();
        let cleaned = registry.cleaned("Customer").unwrap();
        assert!(cleaned.get("endpoint").is_none());
        assert!(registry.lookup("Customer").unwrap().raw().get("endpoint").is_some());
    }

    #[test]
    fn validate_pass_and_fail() {
        let registry = registry();
        let ok = registry.validate("Customer", &json!({"name": "B"})).unwrap();
        assert!(ok.valid);
        assert!(ok.errors.is_empty());

        let bad = registry.validate("Customer", &json!({"name": 7})).unwrap();
        assert!(!bad.valid);
        assert_eq!(bad.errors.len(), 1);
    }

    #[test]
    fn validate_unknown_schema() {
        let registry = registry();
        let err = registry.validate("Nope", &json!({})).unwrap_err();
        assert!(matches!(err, SchemaError::NotFound(_)));
    }

    #[test]
    fn remove_schema() {
        let mut registry = registry();
        assert!(registry.remove("Customer"));
        assert!(registry.cleaned("Customer").is_none());
        assert!(!registry.remove("Customer"));
    }
}
