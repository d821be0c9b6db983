//! Translation error types
//!
//! Error codes:
//! - DOCSQL_UNSUPPORTED_OPERATOR (REJECT)
//! - DOCSQL_INVALID_OPERAND_TYPE (REJECT)
//! - DOCSQL_TYPE_INFERENCE_FAILED (REJECT)
//! - DOCSQL_SCHEMA_FIELD_MISSING (REJECT)
//! - DOCSQL_INVALID_FIELD_NAME (REJECT)
//!
//! Every translation error means the caller built an invalid query. None of
//! them is transient, so retrying the same input always fails the same way.

use std::fmt;

/// Translation error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TranslateErrorCode {
    /// Operator or modifier key this translator does not implement
    UnsupportedOperator,
    /// Operand has the wrong shape for its operator
    InvalidOperandType,
    /// No declared type and the literal is not a recognized primitive
    TypeInferenceFailed,
    /// Field must be declared in the collection schema
    SchemaFieldMissing,
    /// Field name cannot be spliced into SQL
    InvalidFieldName,
}

impl TranslateErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            TranslateErrorCode::UnsupportedOperator => "DOCSQL_UNSUPPORTED_OPERATOR",
            TranslateErrorCode::InvalidOperandType => "DOCSQL_INVALID_OPERAND_TYPE",
            TranslateErrorCode::TypeInferenceFailed => "DOCSQL_TYPE_INFERENCE_FAILED",
            TranslateErrorCode::SchemaFieldMissing => "DOCSQL_SCHEMA_FIELD_MISSING",
            TranslateErrorCode::InvalidFieldName => "DOCSQL_INVALID_FIELD_NAME",
        }
    }
}

impl fmt::Display for TranslateErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Translation error with context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslateError {
    code: TranslateErrorCode,
    message: String,
    field: Option<String>,
}

impl TranslateError {
    /// Operator, selector key or modifier key that is not implemented
    pub fn unsupported_operator(field: Option<&str>, operator: &str) -> Self {
        let message = match field {
            Some(f) => format!("Unsupported operator '{}' on field '{}'", operator, f),
            None => format!("Unsupported operator '{}'", operator),
        };
        Self {
            code: TranslateErrorCode::UnsupportedOperator,
            message,
            field: field.map(str::to_owned),
        }
    }

    /// Operand shape not accepted by its operator
    pub fn invalid_operand(field: Option<&str>, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let message = match field {
            Some(f) => format!("Invalid operand for field '{}': {}", f, reason),
            None => format!("Invalid operand: {}", reason),
        };
        Self {
            code: TranslateErrorCode::InvalidOperandType,
            message,
            field: field.map(str::to_owned),
        }
    }

    /// Literal of a JSON type that carries no SQL type
    pub fn type_inference(field: &str, json_type: &str) -> Self {
        Self {
            code: TranslateErrorCode::TypeInferenceFailed,
            message: format!(
                "Cannot infer a SQL type for field '{}' from a {} literal",
                field, json_type
            ),
            field: Some(field.to_owned()),
        }
    }

    /// Field absent from a schema that must declare it
    pub fn schema_field_missing(collection: &str, field: &str) -> Self {
        Self {
            code: TranslateErrorCode::SchemaFieldMissing,
            message: format!("Field not in schema: {}.{}", collection, field),
            field: Some(field.to_owned()),
        }
    }

    /// Field name that fails identifier validation
    pub fn invalid_field_name(field: &str, reason: &str) -> Self {
        Self {
            code: TranslateErrorCode::InvalidFieldName,
            message: format!("Invalid field name '{}': {}", field.escape_debug(), reason),
            field: Some(field.to_owned()),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> TranslateErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the field name if applicable
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }
}

impl fmt::Display for TranslateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REJECT] {}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for TranslateError {}

/// Result type for translation
pub type TranslateResult<T> = Result<T, TranslateError>;
