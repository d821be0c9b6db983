//! Collection schemas for docsql
//!
//! Schemas are supplied by the data-access layer and are read-only to the
//! translator. They map top-level field names to declared types; a field
//! with no declaration has its type inferred from the literal it is
//! compared against.

mod errors;
mod loader;
mod types;

pub use errors::{SchemaError, SchemaResult};
pub use loader::SchemaRegistry;
pub use types::{CollectionSchema, FieldDef, FieldType, SchemaLookup, Schemaless};
