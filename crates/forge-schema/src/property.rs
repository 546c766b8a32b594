//! Typed property definitions
//!
//! A [`PropertyDef`] is parsed once from the raw schema JSON. Its
//! [`Relation`] tells traversal code whether the property is plain data or a
//! reference that needs its own request.

use crate::error::SchemaError;
use crate::strategy::{CreationStrategy, Link};
use serde_json::Value;

/// Placeholder written by the editor for an unset reference
pub(crate) const INVALID_REF: &str = "$ref";

/// JSON type of a property
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyType {
    /// Fixed-shape object
    Object,
    /// Ordered list
    Array,
    /// Free-form key/value map (validated as `object`)
    Dictionary,
    /// String scalar
    String,
    /// Floating point scalar
    Number,
    /// Integer scalar
    Integer,
    /// Boolean scalar
    Boolean,
    /// Null
    Null,
    /// Editor placeholder type `$ref` (validated as `string`)
    Ref,
    /// Anything else
    Other(String),
}

impl PropertyType {
    /// Parse a JSON Schema type name
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "object" => Self::Object,
            "array" => Self::Array,
            "dictionary" => Self::Dictionary,
            "string" => Self::String,
            "number" => Self::Number,
            "integer" => Self::Integer,
            "boolean" => Self::Boolean,
            "null" => Self::Null,
            INVALID_REF => Self::Ref,
            other => Self::Other(other.to_string()),
        }
    }

    /// Check for a scalar type
    #[inline]
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Self::String | Self::Number | Self::Integer | Self::Boolean | Self::Null
        )
    }
}

/// How a property relates to another schema
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Relation {
    /// Ordinary embedded data, never split into its own request
    #[default]
    Embedded,

    /// Single referenced object (`$ref`)
    Single {
        /// Referenced schema name, `.json` suffix stripped
        target: String,
        /// Dependency direction
        link: Link,
    },

    /// Array of referenced objects (`items.$ref`)
    Repeated {
        /// Element schema name, `.json` suffix stripped
        target: String,
        /// Dependency direction
        link: Link,
    },
}

impl Relation {
    /// Dependency link, if any
    #[inline]
    #[must_use]
    pub fn link(&self) -> Option<&Link> {
        match self {
            Self::Embedded => None,
            Self::Single { link, .. } | Self::Repeated { link, .. } => Some(link),
        }
    }

    /// Referenced schema name, if any
    #[inline]
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Embedded => None,
            Self::Single { target, .. } | Self::Repeated { target, .. } => Some(target),
        }
    }
}

/// One field of a schema
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PropertyDef {
    /// Declared `type`
    pub kind: Option<PropertyType>,
    /// Declared `$ref` (raw, suffix intact)
    pub reference: Option<String>,
    /// Element definition for arrays
    pub items: Option<Box<PropertyDef>>,
    /// Declared `apiCreationStrategy`
    pub api_creation_strategy: Option<CreationStrategy>,
    /// Declared `childRefToParent`
    pub child_ref_to_parent: Option<String>,
    relation: Relation,
}

impl PropertyDef {
    /// Parse from raw schema JSON
    ///
    /// # Errors
    /// - [`SchemaError::InvalidProperty`] if `raw` is not an object
    /// - [`SchemaError::UnknownStrategy`] for an unrecognised strategy
    /// - [`SchemaError::MissingChildRef`] for `parentFirstBodyId` without `childRefToParent`
    pub fn from_value(schema: &str, property: &str, raw: &Value) -> Result<Self, SchemaError> {
        let map = raw.as_object().ok_or_else(|| SchemaError::InvalidProperty {
            schema: schema.to_string(),
            property: property.to_string(),
        })?;

        let kind = match map.get("type") {
            Some(Value::String(name)) => Some(PropertyType::from_name(name)),
            // ["string", "null"] style unions: first non-null member wins
            Some(Value::Array(names)) => names
                .iter()
                .filter_map(Value::as_str)
                .find(|n| *n != "null")
                .map(PropertyType::from_name),
            _ => None,
        };

        let reference = map
            .get("$ref")
            .and_then(Value::as_str)
            .filter(|r| *r != INVALID_REF && !r.is_empty())
            .map(str::to_string);

        let items = match map.get("items") {
            Some(items @ Value::Object(_)) => Some(Box::new(Self::from_value(
                schema,
                &format!("{property}.items"),
                items,
            )?)),
            _ => None,
        };

        let api_creation_strategy = match map.get("apiCreationStrategy") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() => None,
            Some(value) => {
                let text = value.as_str().map_or_else(|| value.to_string(), str::to_string);
                Some(text.parse::<CreationStrategy>().map_err(|e| {
                    SchemaError::UnknownStrategy {
                        schema: schema.to_string(),
                        property: property.to_string(),
                        value: e.0,
                    }
                })?)
            }
        };

        let child_ref_to_parent = map
            .get("childRefToParent")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let mut def = Self {
            kind,
            reference,
            items,
            api_creation_strategy,
            child_ref_to_parent,
            relation: Relation::Embedded,
        };
        def.relation = def.resolve_relation(schema, property)?;
        Ok(def)
    }

    fn resolve_relation(&self, schema: &str, property: &str) -> Result<Relation, SchemaError> {
        let Some(strategy) = self.api_creation_strategy else {
            return Ok(Relation::Embedded);
        };

        let link = match strategy {
            CreationStrategy::ParentFirstRouteId => Link::ParentRoute,
            CreationStrategy::ChildFirstBodyId => Link::ChildBody,
            CreationStrategy::ParentFirstBodyId => Link::ParentBody {
                child_ref_to_parent: self.child_ref_to_parent.clone().ok_or_else(|| {
                    SchemaError::MissingChildRef {
                        schema: schema.to_string(),
                        property: property.to_string(),
                    }
                })?,
            },
        };

        let item_ref = self.items.as_ref().and_then(|i| i.reference.as_deref());
        if self.kind == Some(PropertyType::Array) {
            if let Some(item_ref) = item_ref {
                return Ok(Relation::Repeated {
                    target: crate::schema::ref_type_name(item_ref).to_string(),
                    link,
                });
            }
        }

        if let Some(reference) = &self.reference {
            return Ok(Relation::Single {
                target: crate::schema::ref_type_name(reference).to_string(),
                link,
            });
        }

        tracing::debug!(
            schema,
            property,
            strategy = %strategy,
            "apiCreationStrategy without a reference; treating as embedded data"
        );
        Ok(Relation::Embedded)
    }

    /// Resolved relation to other schemas
    #[inline]
    #[must_use]
    pub fn relation(&self) -> &Relation {
        &self.relation
    }

    /// Check if the property is an array
    #[inline]
    #[must_use]
    pub fn is_array(&self) -> bool {
        self.kind == Some(PropertyType::Array)
    }
}
