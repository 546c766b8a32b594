//! Error types for building block trees

/// Errors raised while turning a JSON document into a block tree
#[derive(Debug, thiserror::Error)]
pub enum BlockError {
    /// Root type is neither registered nor a generic block type
    #[error("unknown root type '{0}'")]
    UnknownType(String),

    /// Value shape does not fit the schema type
    #[error("type '{type_name}' expects {expected}, found {found}")]
    ShapeMismatch {
        /// Schema type name
        type_name: String,
        /// Expected JSON shape
        expected: &'static str,
        /// Actual JSON shape
        found: &'static str,
    },

    /// Block document failed to parse
    #[error("invalid block document: {0}")]
    Parse(#[from] serde_json::Error),
}
