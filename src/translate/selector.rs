//! Selector compiler
//!
//! Plain top-level equalities are batched into one containment predicate
//! (`json @> $n::jsonb`), which a GIN index on the document column can
//! serve. Everything else compiles clause by clause in document order and
//! the parts are ANDed.

use serde_json::{Map, Value};

use super::ast::Selector;
use super::expression::{compile_clause, CompileContext};
use super::errors::TranslateResult;
use super::fragment::{Fragment, Param, ParamCounter};
use crate::schema::SchemaLookup;

/// Compiles a parsed selector.
///
/// An empty selector, or one whose clauses all constrain nothing, compiles
/// to `TRUE`.
pub fn compile_selector<S: SchemaLookup + ?Sized>(
    ctx: CompileContext<'_, S>,
    selector: &Selector,
    counter: ParamCounter,
) -> TranslateResult<(Fragment, ParamCounter)> {
    if selector.is_empty() {
        return Ok((Fragment::always_true(), counter));
    }

    let mut counter = counter;
    let mut parts = Vec::new();

    let mut batch = Map::new();
    for clause in &selector.clauses {
        if let Some((path, literal)) = clause.simple_equality() {
            batch.insert(path.root().to_owned(), literal.to_json());
        }
    }
    if !batch.is_empty() {
        let (placeholder, next) = counter.take()?;
        parts.push(Fragment::new(
            format!("{} @> {}::jsonb", ctx.json_column, placeholder),
            vec![Param::Json(Value::Object(batch))],
        ));
        counter = next;
    }

    for clause in selector.clauses.iter().filter(|c| c.simple_equality().is_none()) {
        let (fragment, next) = compile_clause(ctx, clause, counter)?;
        parts.extend(fragment);
        counter = next;
    }

    let fragment = match parts.len() {
        0 => Fragment::always_true(),
        1 => parts.remove(0),
        _ => Fragment::join(parts, " AND ").parenthesized(),
    };
    Ok((fragment, counter))
}

/// Parses and compiles a selector document starting at `$arg_offset`
pub fn compile_selector_value<S: SchemaLookup + ?Sized>(
    ctx: CompileContext<'_, S>,
    selector: &Value,
    arg_offset: usize,
) -> TranslateResult<Fragment> {
    let selector = Selector::parse(selector)?;
    let (fragment, _) = compile_selector(ctx, &selector, ParamCounter::starting_at(arg_offset))?;
    Ok(fragment)
}
