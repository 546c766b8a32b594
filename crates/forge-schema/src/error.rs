//! Error types for the schema registry
//!
//! Covers schema loading (malformed definitions, unknown strategies),
//! validator compilation, and bundle IO.

use std::path::PathBuf;

/// Schema loading and validation errors
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// Schema value is null or missing
    #[error("schema '{0}' is undefined")]
    Undefined(String),

    /// Schema value is not a JSON object
    #[error("schema '{0}' is not a JSON object")]
    NotAnObject(String),

    /// Property definition is not a JSON object
    #[error("schema '{schema}': property '{property}' is not an object")]
    InvalidProperty {
        /// Owning schema
        schema: String,
        /// Offending property
        property: String,
    },

    /// `apiCreationStrategy` carries an unrecognised value
    #[error("schema '{schema}': property '{property}' has unknown apiCreationStrategy '{value}'")]
    UnknownStrategy {
        /// Owning schema
        schema: String,
        /// Offending property
        property: String,
        /// Raw strategy value
        value: String,
    },

    /// `parentFirstBodyId` declared without `childRefToParent`
    #[error("schema '{schema}': property '{property}' uses parentFirstBodyId without childRefToParent")]
    MissingChildRef {
        /// Owning schema
        schema: String,
        /// Offending property
        property: String,
    },

    /// Schema is not registered
    #[error("schema not found: {0}")]
    NotFound(String),

    /// Validator could not compile the cleaned schema
    #[error("failed to compile schema '{name}': {message}")]
    Compile {
        /// Schema name
        name: String,
        /// Compiler message
        message: String,
    },

    /// IO error while reading a bundle directory
    #[error("io error reading {path}: {source}")]
    Io {
        /// Path being read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Schema or properties file failed to parse
    #[error("syntax error in {path}: {message}")]
    Syntax {
        /// Path being parsed
        path: PathBuf,
        /// Parser message
        message: String,
    },
}

impl SchemaError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create syntax error for path
    pub fn syntax_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Syntax {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether the error comes from a malformed definition rather than IO
    #[inline]
    #[must_use]
    pub fn is_definition_error(&self) -> bool {
        matches!(
            self,
            Self::Undefined(_)
                | Self::NotAnObject(_)
                | Self::InvalidProperty { .. }
                | Self::UnknownStrategy { .. }
                | Self::MissingChildRef { .. }
        )
    }
}
