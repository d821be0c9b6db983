//! Find options: sort and limit
//!
//! Sort keys and limits never bind parameters. Sort fields must be
//! declared in the schema so their extraction gets a real SQL type, and
//! the limit is embedded as a validated integer.

use serde_json::Value;

use super::ast::{json_type_name, ID_FIELD};
use super::errors::{TranslateError, TranslateResult};
use super::expression::CompileContext;
use super::field::{FieldPath, TypeResolution};
use super::fragment::Fragment;
use crate::schema::SchemaLookup;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// Parses `1` or `-1`; `1.0` and `-1.0` are accepted as the same numbers
    pub fn from_value(field: &str, value: &Value) -> TranslateResult<Self> {
        match value.as_f64() {
            Some(d) if d == 1.0 => Ok(SortDirection::Ascending),
            Some(d) if d == -1.0 => Ok(SortDirection::Descending),
            _ => Err(TranslateError::invalid_operand(
                Some(field),
                format!("sort direction must be 1 or -1, got {}", value),
            )),
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

/// One ORDER BY term
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    /// `_id` or a validated top-level field name
    pub field: String,
    pub direction: SortDirection,
}

/// Parsed `{sort, limit}` options
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FindOptions {
    /// Sort terms in source key order
    pub sort: Vec<SortSpec>,
    pub limit: Option<u64>,
}

impl FindOptions {
    pub fn parse(value: &Value) -> TranslateResult<Self> {
        let map = match value {
            Value::Null => return Ok(Self::default()),
            Value::Object(map) => map,
            other => {
                return Err(TranslateError::invalid_operand(
                    None,
                    format!("find options must be an object, got {}", json_type_name(other)),
                ))
            }
        };

        let mut options = Self::default();
        for (key, value) in map {
            match key.as_str() {
                "sort" => options.sort = parse_sort(value)?,
                "limit" => options.limit = parse_limit(value)?,
                _ => return Err(TranslateError::unsupported_operator(None, key)),
            }
        }
        Ok(options)
    }

    pub fn with_sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort.push(SortSpec {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

fn parse_sort(value: &Value) -> TranslateResult<Vec<SortSpec>> {
    let map = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Object(map) => map,
        other => {
            return Err(TranslateError::invalid_operand(
                Some("sort"),
                format!("sort must be an object, got {}", json_type_name(other)),
            ))
        }
    };

    map.iter()
        .map(|(field, direction)| {
            Ok(SortSpec {
                field: field.clone(),
                direction: SortDirection::from_value(field, direction)?,
            })
        })
        .collect()
}

fn parse_limit(value: &Value) -> TranslateResult<Option<u64>> {
    match value {
        Value::Null => Ok(None),
        _ => match value.as_u64() {
            Some(limit) if limit > 0 => Ok(Some(limit)),
            _ => Err(TranslateError::invalid_operand(
                Some("limit"),
                "limit must be a positive integer",
            )),
        },
    }
}

/// Compiles options to `ORDER BY ... LIMIT n`; either part may be absent
pub fn compile_find_options<S: SchemaLookup + ?Sized>(
    ctx: CompileContext<'_, S>,
    options: &FindOptions,
) -> TranslateResult<Fragment> {
    let mut clauses = Vec::new();

    if options.limit == Some(0) {
        return Err(TranslateError::invalid_operand(
            Some("limit"),
            "limit must be a positive integer",
        ));
    }

    if !options.sort.is_empty() {
        let mut terms = Vec::with_capacity(options.sort.len());
        for spec in &options.sort {
            let column = if spec.field == ID_FIELD {
                ctx.id_column.to_owned()
            } else {
                let path = FieldPath::parse_top_level(&spec.field)?;
                let declared = TypeResolution::declared(ctx.schema, &path)?;
                TypeResolution::Declared(declared).extraction(&path, ctx.json_column)
            };
            terms.push(format!("{} {}", column, spec.direction.as_sql()));
        }
        clauses.push(format!("ORDER BY {}", terms.join(", ")));
    }

    if let Some(limit) = options.limit {
        clauses.push(format!("LIMIT {}", limit));
    }

    Ok(Fragment::sql(clauses.join(" ")))
}

/// Parses and compiles a find-options document
pub fn compile_find_options_value<S: SchemaLookup + ?Sized>(
    ctx: CompileContext<'_, S>,
    options: &Value,
) -> TranslateResult<Fragment> {
    compile_find_options(ctx, &FindOptions::parse(options)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CollectionSchema, FieldType};
    use crate::translate::errors::TranslateErrorCode;
    use serde_json::json;

    fn compile(options: Value) -> TranslateResult<Fragment> {
        let schema = CollectionSchema::new("comments")
            .with_field("createdAt", FieldType::Date)
            .with_field("baseScore", FieldType::Int);
        let ctx = CompileContext {
            schema: &schema,
            json_column: "json",
            id_column: "id",
        };
        compile_find_options_value(ctx, &options)
    }

    #[test]
    fn test_sort_and_limit() {
        let fragment = compile(json!({"sort": {"createdAt": -1}, "limit": 10})).unwrap();
        assert_eq!(fragment.sql, "ORDER BY (json->>'createdAt') DESC LIMIT 10");
        assert!(fragment.args.is_empty());
    }

    #[test]
    fn test_sort_key_order_kept() {
        let fragment = compile(json!({"sort": {"baseScore": -1, "_id": 1}})).unwrap();
        assert_eq!(
            fragment.sql,
            "ORDER BY (json->'baseScore')::bigint DESC, id ASC"
        );
    }

    #[test]
    fn test_empty_options() {
        assert_eq!(compile(json!({})).unwrap().sql, "");
        assert_eq!(compile(json!({"sort": {}})).unwrap().sql, "");
        assert_eq!(compile(Value::Null).unwrap().sql, "");
        assert_eq!(compile(json!({"limit": 5})).unwrap().sql, "LIMIT 5");
    }

    #[test]
    fn test_direction_validation() {
        assert_eq!(
            SortDirection::from_value("a", &json!(1.0)).unwrap(),
            SortDirection::Ascending
        );
        for bad in [json!(0), json!(2), json!("desc"), json!(null), json!(-0.5)] {
            let err = compile(json!({"sort": {"createdAt": bad}})).unwrap_err();
            assert_eq!(err.code(), TranslateErrorCode::InvalidOperandType);
        }
    }

    #[test]
    fn test_sort_requires_declared_field() {
        let err = compile(json!({"sort": {"postedAt": 1}})).unwrap_err();
        assert_eq!(err.code(), TranslateErrorCode::SchemaFieldMissing);

        let err = compile(json!({"sort": {"meta.rank": 1}})).unwrap_err();
        assert_eq!(err.code(), TranslateErrorCode::InvalidFieldName);
    }

    #[test]
    fn test_limit_validation() {
        for bad in [json!(0), json!(-3), json!(2.5), json!("10")] {
            let err = compile(json!({"limit": bad})).unwrap_err();
            assert_eq!(err.code(), TranslateErrorCode::InvalidOperandType);
        }
    }

    #[test]
    fn test_unknown_option() {
        let err = compile(json!({"skip": 5})).unwrap_err();
        assert_eq!(err.code(), TranslateErrorCode::UnsupportedOperator);
    }

    #[test]
    fn test_builder() {
        let options = FindOptions::default()
            .with_sort("_id", SortDirection::Descending)
            .with_limit(3);
        let schema = CollectionSchema::new("c");
        let ctx = CompileContext {
            schema: &schema,
            json_column: "doc",
            id_column: "pk",
        };
        let fragment = compile_find_options(ctx, &options).unwrap();
        assert_eq!(fragment.sql, "ORDER BY pk DESC LIMIT 3");
    }
}
