//! Translator configuration
//!
//! Column names are spliced into every fragment, so they are validated as
//! plain identifiers before a translator will use them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::Severity;
use crate::translate::is_identifier;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid {name} column '{value}': must match [A-Za-z_][A-Za-z0-9_]*")]
    InvalidColumn { name: &'static str, value: String },

    #[error("Malformed translator config: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::InvalidColumn { .. } => "DOCSQL_CONFIG_INVALID_COLUMN",
            ConfigError::Parse(_) => "DOCSQL_CONFIG_MALFORMED",
        }
    }
}

/// Translator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatorConfig {
    /// Column holding the jsonb document (default: "json")
    #[serde(default = "default_json_column")]
    pub json_column: String,

    /// Column holding the document id (default: "id")
    #[serde(default = "default_id_column")]
    pub id_column: String,

    /// Minimum severity to log; `None` disables logging (default)
    #[serde(default)]
    pub log_level: Option<Severity>,
}

fn default_json_column() -> String {
    "json".to_string()
}

fn default_id_column() -> String {
    "id".to_string()
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            json_column: default_json_column(),
            id_column: default_id_column(),
            log_level: None,
        }
    }
}

impl TranslatorConfig {
    /// Parses and validates a JSON config document
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [("json", &self.json_column), ("id", &self.id_column)] {
            if !is_identifier(value) {
                return Err(ConfigError::InvalidColumn {
                    name,
                    value: value.clone(),
                });
            }
        }
        Ok(())
    }
}
