//! Schema registry errors

use thiserror::Error;

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors raised while loading or registering collection schemas
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Schema file or directory could not be read
    #[error("Failed to read schema '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Schema file is not valid JSON for a collection schema
    #[error("Malformed schema file '{path}': {reason}")]
    Malformed { path: String, reason: String },

    /// Schema parsed but its structure is invalid
    #[error("Invalid schema for collection '{collection}': {reason}")]
    InvalidStructure { collection: String, reason: String },

    /// A schema for the collection is already registered
    #[error("Schema for collection '{0}' is already registered")]
    Duplicate(String),
}

impl SchemaError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaError::Io { .. } => "DOCSQL_SCHEMA_IO",
            SchemaError::Malformed { .. } => "DOCSQL_SCHEMA_MALFORMED",
            SchemaError::InvalidStructure { .. } => "DOCSQL_SCHEMA_INVALID",
            SchemaError::Duplicate(_) => "DOCSQL_SCHEMA_DUPLICATE",
        }
    }
}
