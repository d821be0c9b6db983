//! docsql - document queries over a PostgreSQL jsonb column
//!
//! Translates document-store selectors, update modifiers and find options
//! into parameterized SQL fragments.

pub mod config;
pub mod observability;
pub mod schema;
pub mod translate;

pub use config::{ConfigError, TranslatorConfig};
pub use translate::{
    compile_field, compile_find_options, compile_modifier, compile_selector, Fragment, Param,
    TranslateError, TranslateErrorCode, TranslateResult, Translator,
};
