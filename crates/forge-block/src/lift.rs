//! JSON to block tree adapter
//!
//! Builds the block tree an editor would show for a JSON document. Block
//! types come from the registry: a property with `$ref` gets the referenced
//! type, an array with `items.$ref` gets `{item}_array` containing blocks of
//! the item type. Anything the registry does not describe falls back to the
//! generic `dictionary` / `dynarray` / scalar blocks.

use crate::block::Block;
use crate::error::BlockError;
use forge_schema::{ref_type_name, Schema, SchemaRegistry};
use serde_json::Value;

/// Generic object block type
pub const DICTIONARY: &str = "dictionary";

/// Generic array block type
pub const DYNARRAY: &str = "dynarray";

/// Suffix of array container types (`LineItem_array`)
pub const ARRAY_SUFFIX: &str = "_array";

const GENERIC_TYPES: [&str; 6] = [DICTIONARY, DYNARRAY, "string", "number", "boolean", "null"];

/// Build the block tree for `value` rooted at `type_name`
///
/// # Errors
/// - [`BlockError::UnknownType`] if `type_name` is neither registered, an
///   `_array` of a registered type, nor a generic block type
/// - [`BlockError::ShapeMismatch`] if a registered root type is given a
///   value of the wrong JSON shape
pub fn lift(value: &Value, type_name: &str, registry: &SchemaRegistry) -> Result<Block, BlockError> {
    if registry.contains(type_name) {
        expect_shape(type_name, value, "object")?;
        return Ok(lift_value(value, Some(type_name), None, registry));
    }

    if let Some(item) = type_name.strip_suffix(ARRAY_SUFFIX) {
        if registry.contains(item) {
            expect_shape(type_name, value, "array")?;
            return Ok(lift_value(value, Some(type_name), Some(item), registry));
        }
    }

    if GENERIC_TYPES.contains(&type_name) {
        tracing::debug!(type_name, "lifting generic root");
        return Ok(lift_value(value, None, None, registry));
    }

    Err(BlockError::UnknownType(type_name.to_string()))
}

fn expect_shape(type_name: &str, value: &Value, expected: &'static str) -> Result<(), BlockError> {
    let found = shape_name(value);
    if found == expected {
        Ok(())
    } else {
        Err(BlockError::ShapeMismatch {
            type_name: type_name.to_string(),
            expected,
            found,
        })
    }
}

fn shape_name(value: &Value) -> &'static str {
    match value {
        Value::Object(_) => "object",
        Value::Array(_) => "array",
        _ => "scalar",
    }
}

fn lift_value(
    value: &Value,
    kind: Option<&str>,
    item_kind: Option<&str>,
    registry: &SchemaRegistry,
) -> Block {
    match value {
        Value::Object(map) => {
            let kind = kind.unwrap_or(DICTIONARY);
            let schema = registry.lookup(kind);
            if schema.is_none() {
                tracing::debug!(kind, fields = map.len(), "no schema for object; lifted as generic fields");
            }
            let mut block = Block::object(kind);
            for (name, child) in map {
                let (child_kind, child_item) = child_types(schema, name);
                let target = lift_value(child, child_kind.as_deref(), child_item.as_deref(), registry);
                block = if schema.map_or(true, |s| s.is_required(name)) {
                    block.with_required(name.clone(), target)
                } else {
                    block.with_optional(name.clone(), target)
                };
            }
            block
        }
        Value::Array(items) => {
            let kind = match (kind, item_kind) {
                (Some(kind), _) => kind.to_string(),
                (None, Some(item)) => format!("{item}{ARRAY_SUFFIX}"),
                (None, None) => {
                    tracing::debug!(len = items.len(), "untyped array lifted as dynarray");
                    DYNARRAY.to_string()
                }
            };
            let items = items
                .iter()
                .map(|item| lift_value(item, item_kind, None, registry))
                .collect();
            Block::array(kind, items)
        }
        scalar => Block::scalar(scalar.clone()),
    }
}

/// Block type for a property and, for arrays, for its elements
fn child_types(schema: Option<&Schema>, property: &str) -> (Option<String>, Option<String>) {
    let Some(def) = schema.and_then(|s| s.property(property)) else {
        return (None, None);
    };

    let item = def
        .items
        .as_ref()
        .and_then(|items| items.reference.as_deref())
        .map(|r| ref_type_name(r).to_string());
    let kind = match (&def.reference, &item) {
        (Some(reference), _) => Some(ref_type_name(reference).to_string()),
        (None, Some(item)) => Some(format!("{item}{ARRAY_SUFFIX}")),
        (None, None) => None,
    };
    (kind, item)
}
