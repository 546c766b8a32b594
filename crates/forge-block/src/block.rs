//! Block tree model
//!
//! A [`Block`] is a read-only snapshot of one node of the editor's block
//! tree. The editor layer builds it once per send; nothing downstream
//! mutates it.

use crate::error::BlockError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Label marking an optional property slot; the property name follows it
pub const OPTIONAL_MARKER: &str = "-";

/// Separator label drawn after a required property name
pub const REQUIRED_SEPARATOR: &str = ":";

/// One node of the block tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum Block {
    /// Leaf value
    Scalar {
        /// Block type (`string`, `number`, `boolean`, `null`)
        #[serde(rename = "type")]
        kind: String,
        /// Literal value
        value: Value,
    },

    /// Object with one input slot per property
    Object {
        /// Block type; a schema name or `dictionary`
        #[serde(rename = "type")]
        kind: String,
        /// Input slots in display order
        #[serde(default)]
        inputs: Vec<Input>,
    },

    /// Container whose children are the array elements, in connected order
    Array {
        /// Block type; `{item}_array` or `dynarray`
        #[serde(rename = "type")]
        kind: String,
        /// Connected element blocks
        #[serde(default)]
        items: Vec<Block>,
    },
}

impl Block {
    /// Leaf block whose type follows the JSON kind of `value`
    #[must_use]
    pub fn scalar(value: Value) -> Self {
        Self::Scalar {
            kind: scalar_kind(&value).to_string(),
            value,
        }
    }

    /// Object block without inputs
    #[must_use]
    pub fn object(kind: impl Into<String>) -> Self {
        Self::Object {
            kind: kind.into(),
            inputs: Vec::new(),
        }
    }

    /// Array container block
    #[must_use]
    pub fn array(kind: impl Into<String>, items: Vec<Block>) -> Self {
        Self::Array {
            kind: kind.into(),
            items,
        }
    }

    /// Append an input slot (object blocks only; ignored otherwise)
    #[must_use]
    pub fn with_input(mut self, input: Input) -> Self {
        if let Self::Object { inputs, .. } = &mut self {
            inputs.push(input);
        }
        self
    }

    /// Add a required property connected to `target`
    #[must_use]
    pub fn with_required(self, name: impl Into<String>, target: Block) -> Self {
        self.with_input(Input::required(name, target))
    }

    /// Add an optional property connected to `target`
    #[must_use]
    pub fn with_optional(self, name: impl Into<String>, target: Block) -> Self {
        self.with_input(Input::optional(name, target))
    }

    /// Block type
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Scalar { kind, .. } | Self::Object { kind, .. } | Self::Array { kind, .. } => {
                kind
            }
        }
    }

    /// Input slots; empty unless this is an object block
    #[inline]
    #[must_use]
    pub fn inputs(&self) -> &[Input] {
        match self {
            Self::Object { inputs, .. } => inputs,
            _ => &[],
        }
    }

    /// Element blocks; empty unless this is an array block
    #[inline]
    #[must_use]
    pub fn items(&self) -> &[Block] {
        match self {
            Self::Array { items, .. } => items,
            _ => &[],
        }
    }

    /// Check for an object block
    #[inline]
    #[must_use]
    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object { .. })
    }

    /// Check for an array block
    #[inline]
    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array { .. })
    }

    /// Parse a serialised block tree
    ///
    /// # Errors
    /// Returns [`BlockError::Parse`] if the text is not a block document.
    pub fn from_json_str(text: &str) -> Result<Self, BlockError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// An input slot: its label fields and the block connected to it, if any
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Input {
    /// Label texts in display order
    pub labels: Vec<String>,
    /// Connected block
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Block>,
}

impl Input {
    /// Required slot: labels `[name, ":"]`
    #[must_use]
    pub fn required(name: impl Into<String>, target: Block) -> Self {
        Self {
            labels: vec![name.into(), REQUIRED_SEPARATOR.to_string()],
            target: Some(target),
        }
    }

    /// Optional slot: labels `["-", name]`
    #[must_use]
    pub fn optional(name: impl Into<String>, target: Block) -> Self {
        Self {
            labels: vec![OPTIONAL_MARKER.to_string(), name.into()],
            target: Some(target),
        }
    }

    /// Slot with no connected block
    #[must_use]
    pub fn empty(labels: Vec<String>) -> Self {
        Self {
            labels,
            target: None,
        }
    }

    /// Property named by this slot
    ///
    /// Needs at least two labels; the second one is the name when the first
    /// is the optional marker.
    #[must_use]
    pub fn property_name(&self) -> Option<&str> {
        match self.labels.as_slice() {
            [first, second, ..] if first == OPTIONAL_MARKER => Some(second),
            [first, _, ..] => Some(first),
            _ => None,
        }
    }

    /// Check whether either of the first two labels reads `property`
    #[must_use]
    pub fn matches(&self, property: &str) -> bool {
        match self.labels.as_slice() {
            [first, second, ..] => first == property || second == property,
            _ => false,
        }
    }
}

/// Block type used for a JSON scalar
#[must_use]
pub fn scalar_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "dynarray",
        Value::Object(_) => "dictionary",
    }
}
