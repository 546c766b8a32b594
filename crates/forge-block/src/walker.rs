//! Block tree walker
//!
//! Read-only traversal: serialise a subtree to plain JSON and locate the
//! blocks connected under a named property.

use crate::block::Block;
use serde_json::{Map, Value};

impl Block {
    /// Serialise this block and everything connected below it
    ///
    /// Slots with no connected block, or without a property name, are left
    /// out of the object.
    #[must_use]
    pub fn to_raw_object(&self) -> Value {
        match self {
            Self::Scalar { value, .. } => value.clone(),
            Self::Array { items, .. } => Value::Array(items.iter().map(Self::to_raw_object).collect()),
            Self::Object { inputs, .. } => {
                let mut map = Map::with_capacity(inputs.len());
                for input in inputs {
                    let (Some(name), Some(target)) = (input.property_name(), &input.target) else {
                        continue;
                    };
                    map.insert(name.to_string(), target.to_raw_object());
                }
                Value::Object(map)
            }
        }
    }

    /// Block connected at the slot labelled `property`
    #[inline]
    #[must_use]
    pub fn child_by_property(&self, property: &str) -> Option<&Block> {
        find_child_by_property(Some(self), property)
    }

    /// Element blocks of the array container connected at `property`
    #[inline]
    #[must_use]
    pub fn repeated_children(&self, property: &str) -> &[Block] {
        find_repeated_children(Some(self), property)
    }
}

/// Find the block connected at the first slot labelled `property`
///
/// Slots with fewer than two labels, and matching slots with nothing
/// connected, are passed over.
#[must_use]
pub fn find_child_by_property<'a>(block: Option<&'a Block>, property: &str) -> Option<&'a Block> {
    block?
        .inputs()
        .iter()
        .filter(|input| input.labels.len() >= 2)
        .find_map(|input| match &input.target {
            Some(target) if input.matches(property) => Some(target),
            _ => None,
        })
}

/// Element blocks under an array-valued property, in connected order
///
/// Empty when the property has no container or the connected block is not
/// an array container.
#[must_use]
pub fn find_repeated_children<'a>(block: Option<&'a Block>, property: &str) -> &'a [Block] {
    find_child_by_property(block, property)
        .map(Block::items)
        .unwrap_or_default()
}
