//! Collection schema types
//!
//! A collection schema declares, per top-level field, the type the field's
//! JSON value is expected to hold. The translator only needs this to pick a
//! SQL cast when extracting a field from the document column:
//! - string: UTF-8 string
//! - int: 64-bit signed integer
//! - float: 64-bit floating point
//! - bool: Boolean
//! - date: RFC 3339 timestamp stored as a JSON string
//! - object: opaque nested document (blackbox)
//! - array: JSON array

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Declared field types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// UTF-8 string
    String,
    /// 64-bit signed integer
    Int,
    /// 64-bit floating point
    Float,
    /// Boolean
    Bool,
    /// Timestamp serialized as an RFC 3339 string
    Date,
    /// Nested document, treated as opaque JSON
    Object,
    /// JSON array
    Array,
}

impl FieldType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Bool => "bool",
            FieldType::Date => "date",
            FieldType::Object => "object",
            FieldType::Array => "array",
        }
    }

    /// Returns true for int and float
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Int | FieldType::Float)
    }
}

/// Field definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field data type
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Free-form description, ignored by the translator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldDef {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            description: None,
        }
    }
}

impl From<FieldType> for FieldDef {
    fn from(field_type: FieldType) -> Self {
        Self::new(field_type)
    }
}

/// Read-only view of a collection's declared field types.
///
/// Implementations must not change while a compilation that borrows them is
/// in progress; the translator never mutates a schema.
pub trait SchemaLookup {
    /// Collection name, used in error messages
    fn collection_name(&self) -> &str;

    /// Declared type of a top-level field, if any
    fn field_type(&self, field: &str) -> Option<FieldType>;

    /// Returns true if the field is declared
    fn has_field(&self, field: &str) -> bool {
        self.field_type(field).is_some()
    }
}

/// Schema for one document collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSchema {
    /// Collection name
    pub collection: String,
    /// Field definitions
    #[serde(default)]
    pub fields: HashMap<String, FieldDef>,
}

impl CollectionSchema {
    /// Create a schema with no declared fields
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            fields: HashMap::new(),
        }
    }

    /// Adds a field definition
    pub fn with_field(mut self, name: impl Into<String>, def: impl Into<FieldDef>) -> Self {
        self.fields.insert(name.into(), def.into());
        self
    }

    /// Returns the field definition for a name
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.get(name)
    }

    /// Validates the schema structure itself (not a document)
    pub fn validate_structure(&self) -> Result<(), String> {
        if self.collection.trim().is_empty() {
            return Err("Schema must name its collection".into());
        }

        // _id is implicit and always maps to the identity column
        if self.fields.contains_key("_id") {
            return Err("'_id' is implicit and must not be declared".into());
        }

        let mut names: Vec<_> = self.fields.keys().collect();
        names.sort();
        for name in names {
            if name.is_empty() || name.contains('.') || name.starts_with('$') {
                return Err(format!("Invalid field name '{}'", name));
            }
        }

        Ok(())
    }
}

impl SchemaLookup for CollectionSchema {
    fn collection_name(&self) -> &str {
        &self.collection
    }

    fn field_type(&self, field: &str) -> Option<FieldType> {
        self.field(field).map(|def| def.field_type)
    }
}

impl<S: SchemaLookup + ?Sized> SchemaLookup for &S {
    fn collection_name(&self) -> &str {
        (**self).collection_name()
    }

    fn field_type(&self, field: &str) -> Option<FieldType> {
        (**self).field_type(field)
    }
}

/// A schema that declares nothing; every field type is inferred from its
/// literal operand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Schemaless;

impl SchemaLookup for Schemaless {
    fn collection_name(&self) -> &str {
        "<schemaless>"
    }

    fn field_type(&self, _field: &str) -> Option<FieldType> {
        None
    }
}
