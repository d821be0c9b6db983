//! Field paths and type resolution
//!
//! Field names are the only user-influenced text spliced into SQL. A
//! [`FieldPath`] can only be built from dot-separated segments matching
//! `[A-Za-z_][A-Za-z0-9_]*`, so quoting it inside `'...'` literals or a
//! jsonpath is always safe. Literal values never take this route; they are
//! bound as parameters.
//!
//! Extraction casts come from a two-tier lookup: the schema's declared type
//! if the field has one, otherwise the type of the literal it is compared
//! against.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use super::ast::Literal;
use super::errors::{TranslateError, TranslateResult};
use crate::schema::{FieldType, SchemaLookup};

fn identifier_regex() -> &'static Regex {
    static IDENTIFIER: OnceLock<Regex> = OnceLock::new();
    IDENTIFIER.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap_or_else(|e| panic!("identifier regex: {e}"))
    })
}

/// Returns true if `name` can be used verbatim as a SQL identifier or JSON key
pub fn is_identifier(name: &str) -> bool {
    identifier_regex().is_match(name)
}

/// A validated, dot-separated document path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Parses and validates a dotted path
    pub fn parse(name: &str) -> TranslateResult<Self> {
        if name.is_empty() {
            return Err(TranslateError::invalid_field_name(name, "empty field name"));
        }

        let segments: Vec<String> = name.split('.').map(str::to_owned).collect();
        if let Some(bad) = segments.iter().find(|s| !is_identifier(s)) {
            let reason = if bad.is_empty() {
                "empty path segment".to_owned()
            } else {
                "segments must match [A-Za-z_][A-Za-z0-9_]*".to_owned()
            };
            return Err(TranslateError::invalid_field_name(name, &reason));
        }

        Ok(Self { segments })
    }

    /// Parses a path that must be a single top-level key
    pub fn parse_top_level(name: &str) -> TranslateResult<Self> {
        let path = Self::parse(name)?;
        if path.is_nested() {
            return Err(TranslateError::invalid_field_name(
                name,
                "dotted paths are not supported here",
            ));
        }
        Ok(path)
    }

    /// First segment, the key declared in the schema
    pub fn root(&self) -> &str {
        &self.segments[0]
    }

    pub fn is_nested(&self) -> bool {
        self.segments.len() > 1
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn as_dotted(&self) -> String {
        self.segments.join(".")
    }

    /// `json->'a'->'b'`: the field as jsonb
    pub fn json(&self, column: &str) -> String {
        let mut out = column.to_owned();
        for segment in &self.segments {
            out.push_str(&format!("->'{}'", segment));
        }
        out
    }

    /// `json->'a'->>'b'`: the field as text
    pub fn text(&self, column: &str) -> String {
        let (last, parents) = self.split_last();
        let mut out = column.to_owned();
        for segment in parents {
            out.push_str(&format!("->'{}'", segment));
        }
        out.push_str(&format!("->>'{}'", last));
        out
    }

    /// Predicate true iff the key is present (even if JSON null)
    pub fn presence(&self, column: &str) -> String {
        let (last, parents) = self.split_last();
        if parents.is_empty() {
            return format!("{} ? '{}'", column, last);
        }
        let mut parent = column.to_owned();
        for segment in parents {
            parent.push_str(&format!("->'{}'", segment));
        }
        // A missing parent yields NULL; presence must still be a boolean
        format!("COALESCE({} ? '{}', FALSE)", parent, last)
    }

    /// `$.a.b`
    pub fn jsonpath(&self) -> String {
        format!("$.{}", self.as_dotted())
    }

    /// `{a,b,-1}`: Postgres text-array path to the end of the array at
    /// this field, as taken by `jsonb_insert`
    pub fn pg_append_path(&self) -> String {
        format!("{{{},-1}}", self.segments.join(","))
    }

    fn split_last(&self) -> (&str, &[String]) {
        match self.segments.split_last() {
            Some((last, parents)) => (last.as_str(), parents),
            None => ("", &[]),
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_dotted())
    }
}

/// SQL types inferred from a literal operand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferredType {
    Text,
    Integer,
    Numeric,
    Boolean,
    /// Dates are stored as RFC 3339 strings; compared as text
    Date,
}

/// How a field's SQL type was decided
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeResolution {
    Declared(FieldType),
    Inferred(InferredType),
}

impl TypeResolution {
    /// Resolves a field's type, preferring the schema declaration.
    ///
    /// Nested paths are never declared; the schema only types top-level keys.
    pub fn resolve<S: SchemaLookup + ?Sized>(
        schema: &S,
        path: &FieldPath,
        literal: Option<&Literal>,
    ) -> TranslateResult<Self> {
        if !path.is_nested() {
            if let Some(declared) = schema.field_type(path.root()) {
                return Ok(TypeResolution::Declared(declared));
            }
        }

        match literal {
            Some(literal) => Ok(TypeResolution::Inferred(Self::infer(literal))),
            None => Err(TranslateError::type_inference(&path.as_dotted(), "null")),
        }
    }

    /// Resolves a type that must come from the schema
    pub fn declared<S: SchemaLookup + ?Sized>(schema: &S, path: &FieldPath) -> TranslateResult<FieldType> {
        let field = path.as_dotted();
        if path.is_nested() {
            return Err(TranslateError::schema_field_missing(schema.collection_name(), &field));
        }
        schema
            .field_type(path.root())
            .ok_or_else(|| TranslateError::schema_field_missing(schema.collection_name(), &field))
    }

    /// Inference table for undeclared fields
    pub fn infer(literal: &Literal) -> InferredType {
        match literal {
            Literal::String(_) => InferredType::Text,
            Literal::Integer(_) => InferredType::Integer,
            Literal::Float(_) => InferredType::Numeric,
            Literal::Bool(_) => InferredType::Boolean,
            Literal::Date(_) => InferredType::Date,
        }
    }

    /// SQL expression extracting the field with this type's cast
    pub fn extraction(&self, path: &FieldPath, column: &str) -> String {
        match self {
            TypeResolution::Declared(declared) => match declared {
                FieldType::String | FieldType::Date => format!("({})", path.text(column)),
                FieldType::Int => format!("({})::bigint", path.json(column)),
                FieldType::Float => format!("({})::double precision", path.json(column)),
                FieldType::Bool => format!("({})::boolean", path.json(column)),
                FieldType::Object | FieldType::Array => format!("({})", path.json(column)),
            },
            TypeResolution::Inferred(inferred) => match inferred {
                InferredType::Text | InferredType::Date => format!("({})", path.text(column)),
                InferredType::Integer => format!("({})::bigint", path.json(column)),
                InferredType::Numeric => format!("({})::numeric", path.json(column)),
                InferredType::Boolean => format!("({})::boolean", path.json(column)),
            },
        }
    }

    /// Checks a literal can be bound against this type.
    ///
    /// Only declared types can disagree with a literal; inferred ones came
    /// from the literal in the first place.
    pub fn accepts(&self, literal: &Literal) -> bool {
        match self {
            TypeResolution::Inferred(_) => true,
            TypeResolution::Declared(declared) => matches!(
                (declared, literal),
                (FieldType::String, Literal::String(_))
                    | (FieldType::Int, Literal::Integer(_))
                    | (FieldType::Float, Literal::Integer(_) | Literal::Float(_))
                    | (FieldType::Bool, Literal::Bool(_))
                    | (FieldType::Date, Literal::Date(_) | Literal::String(_))
            ),
        }
    }

    /// Name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            TypeResolution::Declared(declared) => declared.type_name(),
            TypeResolution::Inferred(InferredType::Text) => "string",
            TypeResolution::Inferred(InferredType::Integer) => "int",
            TypeResolution::Inferred(InferredType::Numeric) => "float",
            TypeResolution::Inferred(InferredType::Boolean) => "bool",
            TypeResolution::Inferred(InferredType::Date) => "date",
        }
    }
}
