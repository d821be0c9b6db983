//! Whole-statement assembly
//!
//! Fragments are concatenated into complete statements with one shared
//! placeholder sequence. In an UPDATE the SET assignment comes first in
//! the text, so modifier parameters are numbered first and the WHERE
//! clause continues where they stop.

use super::ast::Selector;
use super::errors::{TranslateError, TranslateResult};
use super::expression::CompileContext;
use super::fragment::{Fragment, ParamCounter};
use super::modifier::{compile_modifier, Modifier};
use super::options::{compile_find_options, FindOptions};
use super::selector::compile_selector;
use crate::schema::SchemaLookup;

/// Double-quotes a table name, doubling embedded quotes
pub fn quote_identifier(name: &str) -> TranslateResult<String> {
    if name.is_empty() || name.contains('\0') {
        return Err(TranslateError::invalid_field_name(name, "not a valid table name"));
    }
    Ok(format!("\"{}\"", name.replace('"', "\"\"")))
}

/// `SELECT * FROM "table" WHERE ... [ORDER BY ...] [LIMIT n]`
pub fn select_statement<S: SchemaLookup + ?Sized>(
    ctx: CompileContext<'_, S>,
    table: &str,
    selector: &Selector,
    options: &FindOptions,
) -> TranslateResult<Fragment> {
    let table = quote_identifier(table)?;
    let (predicate, _) = compile_selector(ctx, selector, ParamCounter::default())?;
    let tail = compile_find_options(ctx, options)?;

    let mut sql = format!("SELECT * FROM {} WHERE {}", table, predicate.sql);
    if !tail.is_empty() {
        sql.push(' ');
        sql.push_str(&tail.sql);
    }
    Ok(Fragment::new(sql, predicate.args))
}

/// `SELECT count(*) FROM "table" WHERE ...`
pub fn count_statement<S: SchemaLookup + ?Sized>(
    ctx: CompileContext<'_, S>,
    table: &str,
    selector: &Selector,
) -> TranslateResult<Fragment> {
    let table = quote_identifier(table)?;
    let (predicate, _) = compile_selector(ctx, selector, ParamCounter::default())?;
    Ok(Fragment::new(
        format!("SELECT count(*) FROM {} WHERE {}", table, predicate.sql),
        predicate.args,
    ))
}

/// `UPDATE "table" SET json = ... WHERE ...`
pub fn update_statement<S: SchemaLookup + ?Sized>(
    ctx: CompileContext<'_, S>,
    table: &str,
    selector: &Selector,
    modifier: &Modifier,
) -> TranslateResult<Fragment> {
    let table = quote_identifier(table)?;
    let (assignment, counter) = compile_modifier(ctx, modifier, ParamCounter::default())?;
    let (predicate, _) = compile_selector(ctx, selector, counter)?;

    let sql = format!("UPDATE {} SET {} WHERE {}", table, assignment.sql, predicate.sql);
    let mut args = assignment.args;
    args.extend(predicate.args);
    Ok(Fragment::new(sql, args))
}

/// `DELETE FROM "table" WHERE ...`
pub fn delete_statement<S: SchemaLookup + ?Sized>(
    ctx: CompileContext<'_, S>,
    table: &str,
    selector: &Selector,
) -> TranslateResult<Fragment> {
    let table = quote_identifier(table)?;
    let (predicate, _) = compile_selector(ctx, selector, ParamCounter::default())?;
    Ok(Fragment::new(
        format!("DELETE FROM {} WHERE {}", table, predicate.sql),
        predicate.args,
    ))
}
