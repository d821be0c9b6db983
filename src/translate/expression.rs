//! Expression compiler: one selector clause to one SQL predicate

use serde_json::json;

use super::ast::{Clause, Condition, Literal, Selector};
use super::errors::{TranslateError, TranslateResult};
use super::field::{FieldPath, TypeResolution};
use super::fragment::{Fragment, Param, ParamCounter};
use super::selector::compile_selector;
use crate::schema::SchemaLookup;

/// Everything a compile step reads besides its input
pub struct CompileContext<'a, S: SchemaLookup + ?Sized> {
    pub schema: &'a S,
    /// Document column, `json` by default
    pub json_column: &'a str,
    /// Identity column, `id` by default
    pub id_column: &'a str,
}

impl<'a, S: SchemaLookup + ?Sized> Clone for CompileContext<'a, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, S: SchemaLookup + ?Sized> Copy for CompileContext<'a, S> {}

/// Compiles one clause.
///
/// Returns `None` for clauses that constrain nothing (`$or: []`,
/// `$and: []`); callers leave those out of their conjunction.
pub fn compile_clause<S: SchemaLookup + ?Sized>(
    ctx: CompileContext<'_, S>,
    clause: &Clause,
    counter: ParamCounter,
) -> TranslateResult<(Option<Fragment>, ParamCounter)> {
    match clause {
        Clause::IdEquals(id) => {
            let (placeholder, counter) = counter.take()?;
            let fragment = Fragment::new(
                format!("{} = {}", ctx.id_column, placeholder),
                vec![Param::Text(id.clone())],
            );
            Ok((Some(fragment), counter))
        }
        Clause::IdIn(ids) if ids.is_empty() => Ok((Some(Fragment::always_false()), counter)),
        Clause::IdIn(ids) => {
            let (placeholders, counter) = counter.take_n(ids.len())?;
            let fragment = Fragment::new(
                format!("{} IN ({})", ctx.id_column, placeholders.join(", ")),
                ids.iter().cloned().map(Param::Text).collect(),
            );
            Ok((Some(fragment), counter))
        }
        Clause::Disjunction(selectors) => compile_boolean(ctx, selectors, " OR ", counter),
        Clause::Conjunction(selectors) => compile_boolean(ctx, selectors, " AND ", counter),
        Clause::Field { path, conditions } => {
            let mut counter = counter;
            let mut fragments = Vec::with_capacity(conditions.len());
            for condition in conditions {
                let (fragment, next) = compile_condition(ctx, path, condition, counter)?;
                fragments.push(fragment);
                counter = next;
            }

            let fragment = match fragments.len() {
                0 => None,
                1 => fragments.pop(),
                _ => Some(Fragment::join(fragments, " AND ").parenthesized()),
            };
            Ok((fragment, counter))
        }
    }
}

/// `$or` / `$and`: every sub-selector starts where the previous one ended
fn compile_boolean<S: SchemaLookup + ?Sized>(
    ctx: CompileContext<'_, S>,
    selectors: &[Selector],
    separator: &str,
    counter: ParamCounter,
) -> TranslateResult<(Option<Fragment>, ParamCounter)> {
    if selectors.is_empty() {
        return Ok((None, counter));
    }

    let mut counter = counter;
    let mut fragments = Vec::with_capacity(selectors.len());
    for selector in selectors {
        let (fragment, next) = compile_selector(ctx, selector, counter)?;
        fragments.push(fragment);
        counter = next;
    }

    Ok((Some(Fragment::join(fragments, separator).parenthesized()), counter))
}

/// Compiles one condition on a document field
pub fn compile_condition<S: SchemaLookup + ?Sized>(
    ctx: CompileContext<'_, S>,
    path: &FieldPath,
    condition: &Condition,
    counter: ParamCounter,
) -> TranslateResult<(Fragment, ParamCounter)> {
    let column = ctx.json_column;

    match condition {
        Condition::Null => {
            let typeof_expr = format!("jsonb_typeof({})", path.json(column));
            let sql = format!("({0} IS NULL OR {0} = 'null')", typeof_expr);
            Ok((Fragment::sql(sql), counter))
        }
        Condition::Equality(Literal::Bool(b)) => {
            // Only two possible values and the path is validated, so inline
            let sql = format!("({})::boolean = {}", path.json(column), if *b { "TRUE" } else { "FALSE" });
            Ok((Fragment::sql(sql), counter))
        }
        Condition::Equality(literal) => jsonpath_predicate(column, path, "==", literal, counter),
        Condition::Range(op, literal) => {
            jsonpath_predicate(column, path, op.symbol(), literal, counter)
        }
        Condition::Membership(literals) if literals.is_empty() => {
            Ok((Fragment::always_false(), counter))
        }
        Condition::Membership(literals) => {
            // Mixed integers and floats must share a numeric cast
            let representative = literals
                .iter()
                .find(|l| matches!(l, Literal::Float(_)))
                .or_else(|| literals.first());
            let resolution = TypeResolution::resolve(ctx.schema, path, representative)?;
            check_accepts(&resolution, path, literals)?;

            let (placeholders, counter) = counter.take_n(literals.len())?;
            let sql = format!(
                "{} IN ({})",
                resolution.extraction(path, column),
                placeholders.join(", ")
            );
            let args = literals.iter().map(Literal::to_param).collect();
            Ok((Fragment::new(sql, args), counter))
        }
        Condition::Existence(true) => Ok((Fragment::sql(path.presence(column)), counter)),
        Condition::Existence(false) => {
            Ok((Fragment::sql(format!("NOT ({})", path.presence(column))), counter))
        }
        Condition::Negation(None) => {
            let sql = format!(
                "({} AND jsonb_typeof({}) != 'null')",
                path.presence(column),
                path.json(column)
            );
            Ok((Fragment::sql(sql), counter))
        }
        Condition::Negation(Some(literal)) => {
            let resolution = TypeResolution::resolve(ctx.schema, path, Some(literal))?;
            check_accepts(&resolution, path, std::slice::from_ref(literal))?;

            let (placeholder, counter) = counter.take()?;
            let sql = format!("{} != {}", resolution.extraction(path, column), placeholder);
            Ok((Fragment::new(sql, vec![literal.to_param()]), counter))
        }
    }
}

/// `jsonb_path_match(json, '$.f <op> $value', $n::jsonb)` with the literal
/// bound through the jsonpath variables object
fn jsonpath_predicate(
    column: &str,
    path: &FieldPath,
    op: &str,
    literal: &Literal,
    counter: ParamCounter,
) -> TranslateResult<(Fragment, ParamCounter)> {
    let (placeholder, counter) = counter.take()?;
    let sql = format!(
        "jsonb_path_match({}, '{} {} $value', {}::jsonb)",
        column,
        path.jsonpath(),
        op,
        placeholder
    );
    let vars = json!({ "value": literal.to_json() });
    Ok((Fragment::new(sql, vec![Param::Json(vars)]), counter))
}

fn check_accepts(
    resolution: &TypeResolution,
    path: &FieldPath,
    literals: &[Literal],
) -> TranslateResult<()> {
    if literals.iter().all(|l| resolution.accepts(l)) {
        return Ok(());
    }
    Err(TranslateError::invalid_operand(
        Some(&path.as_dotted()),
        format!("operand does not match declared type {}", resolution.type_name()),
    ))
}

/// Compiles a single `field: value` selector entry starting at `arg_offset`.
///
/// `None` means the entry adds no constraint.
pub fn compile_field<S: SchemaLookup + ?Sized>(
    ctx: CompileContext<'_, S>,
    field: &str,
    value: &serde_json::Value,
    arg_offset: usize,
) -> TranslateResult<Option<Fragment>> {
    let clause = super::ast::parse_clause(field, value)?;
    let (fragment, _) = compile_clause(ctx, &clause, ParamCounter::starting_at(arg_offset))?;
    Ok(fragment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CollectionSchema, FieldType, Schemaless};
    use crate::translate::errors::TranslateErrorCode;
    use serde_json::{json, Value};

    fn ctx<S: SchemaLookup + ?Sized>(schema: &S) -> CompileContext<'_, S> {
        CompileContext {
            schema,
            json_column: "json",
            id_column: "id",
        }
    }

    fn field(name: &str, value: Value, offset: usize) -> TranslateResult<Option<Fragment>> {
        compile_field(ctx(&Schemaless), name, &value, offset)
    }

    #[test]
    fn test_id_equality() {
        let fragment = field("_id", json!("abc"), 4).unwrap().unwrap();
        assert_eq!(fragment.sql, "id = $4");
        assert_eq!(fragment.args, vec![Param::Text("abc".into())]);
    }

    #[test]
    fn test_id_in() {
        let fragment = field("_id", json!({"$in": ["a", "b"]}), 1).unwrap().unwrap();
        assert_eq!(fragment.sql, "id IN ($1, $2)");
        assert_eq!(fragment.args.len(), 2);

        let empty = field("_id", json!({"$in": []}), 1).unwrap().unwrap();
        assert_eq!(empty, Fragment::always_false());
    }

    #[test]
    fn test_null_equality() {
        let fragment = field("deletedAt", json!(null), 1).unwrap().unwrap();
        assert_eq!(
            fragment.sql,
            "(jsonb_typeof(json->'deletedAt') IS NULL OR jsonb_typeof(json->'deletedAt') = 'null')"
        );
        assert!(fragment.args.is_empty());
    }

    #[test]
    fn test_boolean_inlined() {
        let fragment = field("draft", json!(false), 1).unwrap().unwrap();
        assert_eq!(fragment.sql, "(json->'draft')::boolean = FALSE");
        assert!(fragment.args.is_empty());
    }

    #[test]
    fn test_scalar_equality_bound() {
        let fragment = field("meta.title", json!("it's"), 2).unwrap().unwrap();
        assert_eq!(
            fragment.sql,
            "jsonb_path_match(json, '$.meta.title == $value', $2::jsonb)"
        );
        assert_eq!(fragment.args, vec![Param::Json(json!({"value": "it's"}))]);
    }

    #[test]
    fn test_range() {
        let fragment = field("baseScore", json!({"$gte": 10}), 1).unwrap().unwrap();
        assert_eq!(
            fragment.sql,
            "jsonb_path_match(json, '$.baseScore >= $value', $1::jsonb)"
        );
        assert_eq!(fragment.args, vec![Param::Json(json!({"value": 10}))]);
    }

    #[test]
    fn test_date_range() {
        let fragment = field("postedAt", json!({"$lt": {"$date": "2022-01-01T00:00:00Z"}}), 1)
            .unwrap()
            .unwrap();
        assert_eq!(
            fragment.args,
            vec![Param::Json(json!({"value": "2022-01-01T00:00:00.000Z"}))]
        );
    }

    #[test]
    fn test_combined_range() {
        let fragment = field("score", json!({"$gt": 1, "$lte": 5}), 3).unwrap().unwrap();
        assert_eq!(
            fragment.sql,
            "(jsonb_path_match(json, '$.score > $value', $3::jsonb) AND jsonb_path_match(json, '$.score <= $value', $4::jsonb))"
        );
        assert_eq!(fragment.placeholders(), vec![3, 4]);
    }

    #[test]
    fn test_in_strings_use_text_extraction() {
        let fragment = field("userId", json!({"$in": ["u1", "u2", "u3"]}), 5).unwrap().unwrap();
        assert_eq!(fragment.sql, "(json->>'userId') IN ($5, $6, $7)");
        assert_eq!(fragment.args.len(), 3);
        assert_eq!(fragment.placeholders(), vec![5, 6, 7]);
    }

    #[test]
    fn test_in_numbers() {
        let fragment = field("rank", json!({"$in": [1, 2]}), 1).unwrap().unwrap();
        assert_eq!(fragment.sql, "(json->'rank')::bigint IN ($1, $2)");
        assert_eq!(fragment.args, vec![Param::Integer(1), Param::Integer(2)]);

        let mixed = field("rank", json!({"$in": [1, 2.5]}), 1).unwrap().unwrap();
        assert_eq!(mixed.sql, "(json->'rank')::numeric IN ($1, $2)");
    }

    #[test]
    fn test_in_empty_never_matches() {
        let fragment = field("tags", json!({"$in": []}), 1).unwrap().unwrap();
        assert_eq!(fragment, Fragment::always_false());
    }

    #[test]
    fn test_in_declared_type() {
        let schema = CollectionSchema::new("votes").with_field("power", FieldType::Int);
        let fragment = compile_field(ctx(&schema), "power", &json!({"$in": [1, 2]}), 1)
            .unwrap()
            .unwrap();
        assert_eq!(fragment.sql, "(json->'power')::bigint IN ($1, $2)");

        let err = compile_field(ctx(&schema), "power", &json!({"$in": ["1"]}), 1).unwrap_err();
        assert_eq!(err.code(), TranslateErrorCode::InvalidOperandType);
    }

    #[test]
    fn test_exists_complementary() {
        let yes = field("af", json!({"$exists": true}), 1).unwrap().unwrap();
        let no = field("af", json!({"$exists": false}), 1).unwrap().unwrap();
        assert_eq!(yes.sql, "json ? 'af'");
        assert_eq!(no.sql, "NOT (json ? 'af')");
        assert!(yes.args.is_empty() && no.args.is_empty());
    }

    #[test]
    fn test_ne_null() {
        let fragment = field("reviewedAt", json!({"$ne": null}), 1).unwrap().unwrap();
        assert_eq!(
            fragment.sql,
            "(json ? 'reviewedAt' AND jsonb_typeof(json->'reviewedAt') != 'null')"
        );
        assert!(fragment.args.is_empty());
    }

    #[test]
    fn test_ne_value() {
        let fragment = field("status", json!({"$ne": "deleted"}), 9).unwrap().unwrap();
        assert_eq!(fragment.sql, "(json->>'status') != $9");
        assert_eq!(fragment.args, vec![Param::Text("deleted".into())]);
    }

    #[test]
    fn test_empty_boolean_lists() {
        assert_eq!(field("$or", json!([]), 1).unwrap(), None);
        assert_eq!(field("$and", json!([]), 1).unwrap(), None);
    }

    #[test]
    fn test_or_offsets() {
        let fragment = field("$or", json!([{"a": 1}, {"b": 2}]), 1).unwrap().unwrap();
        assert_eq!(fragment.sql, "(json @> $1::jsonb OR json @> $2::jsonb)");
        assert_eq!(
            fragment.args,
            vec![Param::Json(json!({"a": 1})), Param::Json(json!({"b": 2}))]
        );
    }

    #[test]
    fn test_not_rejected() {
        let err = field("$not", json!({"a": 1}), 1).unwrap_err();
        assert_eq!(err.code(), TranslateErrorCode::UnsupportedOperator);
    }

    #[test]
    fn test_custom_columns() {
        let context = CompileContext {
            schema: &Schemaless,
            json_column: "doc",
            id_column: "pk",
        };
        let fragment = compile_field(context, "_id", &json!("x"), 1).unwrap().unwrap();
        assert_eq!(fragment.sql, "pk = $1");
        let fragment = compile_field(context, "a", &json!({"$exists": true}), 1).unwrap().unwrap();
        assert_eq!(fragment.sql, "doc ? 'a'");
    }
}
