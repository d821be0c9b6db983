//! Modifier AST and compiler
//!
//! An update modifier compiles to one `json = <expr>` assignment. The four
//! supported operators always layer in the same order, each wrapping the
//! expression produced so far: `$set`, `$unset`, `$inc`, `$addToSet`. That
//! order is fixed regardless of key order in the input, so
//! `{$unset: {b: ""}, $set: {b: 1}}` still leaves `b` absent.

use serde_json::{Map, Value};

use super::ast::{json_type_name, Literal};
use super::errors::{TranslateError, TranslateResult};
use super::expression::CompileContext;
use super::field::{FieldPath, TypeResolution};
use super::fragment::{Fragment, Param, ParamCounter};
use crate::schema::{FieldType, SchemaLookup};

/// Supported modifier operators, in composition order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ModifierOp {
    Set,
    Unset,
    Inc,
    AddToSet,
}

impl ModifierOp {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "$set" => Some(ModifierOp::Set),
            "$unset" => Some(ModifierOp::Unset),
            "$inc" => Some(ModifierOp::Inc),
            "$addToSet" => Some(ModifierOp::AddToSet),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModifierOp::Set => "$set",
            ModifierOp::Unset => "$unset",
            ModifierOp::Inc => "$inc",
            ModifierOp::AddToSet => "$addToSet",
        }
    }
}

/// A parsed update modifier. Entries keep their source key order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Modifier {
    pub set: Vec<(FieldPath, Value)>,
    pub unset: Vec<FieldPath>,
    pub inc: Vec<(FieldPath, Literal)>,
    pub add_to_set: Vec<(FieldPath, Value)>,
}

impl Modifier {
    /// Parses a modifier document.
    ///
    /// Every top-level key is checked before any operand is looked at, so
    /// an unsupported operator is reported even when another operand is
    /// also malformed.
    pub fn parse(value: &Value) -> TranslateResult<Self> {
        let map = value
            .as_object()
            .ok_or_else(|| TranslateError::invalid_operand(None, "modifier must be an object"))?;

        let mut ops = Vec::with_capacity(map.len());
        for (key, operand) in map {
            let op = ModifierOp::from_key(key)
                .ok_or_else(|| TranslateError::unsupported_operator(None, key))?;
            ops.push((op, operand));
        }

        let mut modifier = Modifier::default();
        for (op, operand) in ops {
            let entries = match operand {
                Value::Null => continue,
                Value::Object(entries) => entries,
                other => {
                    return Err(TranslateError::invalid_operand(
                        Some(op.as_str()),
                        format!("{} requires an object, got {}", op.as_str(), json_type_name(other)),
                    ))
                }
            };
            modifier.parse_entries(op, entries)?;
        }

        Ok(modifier)
    }

    fn parse_entries(&mut self, op: ModifierOp, entries: &Map<String, Value>) -> TranslateResult<()> {
        for (key, value) in entries {
            match op {
                ModifierOp::Set => {
                    let path = FieldPath::parse_top_level(key)?;
                    self.set.push((path, document_value(key, value)?));
                }
                ModifierOp::Unset => self.unset.push(FieldPath::parse_top_level(key)?),
                ModifierOp::Inc => {
                    let path = FieldPath::parse_top_level(key)?;
                    let amount = match Literal::from_value(key, value)? {
                        Some(literal @ (Literal::Integer(_) | Literal::Float(_))) => literal,
                        _ => {
                            return Err(TranslateError::invalid_operand(
                                Some(key),
                                format!("$inc requires a number, got {}", json_type_name(value)),
                            ))
                        }
                    };
                    self.inc.push((path, amount));
                }
                ModifierOp::AddToSet => {
                    let path = FieldPath::parse(key)?;
                    if let Value::Object(element) = value {
                        if let Some(op) = element.keys().find(|k| k.starts_with('$') && *k != "$date") {
                            return Err(TranslateError::unsupported_operator(Some(key), op));
                        }
                    }
                    self.add_to_set.push((path, document_value(key, value)?));
                }
            }
        }
        Ok(())
    }

    /// Returns true if the modifier changes nothing
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.unset.is_empty() && self.inc.is_empty() && self.add_to_set.is_empty()
    }
}

/// Value as it will be stored: `{"$date": ...}` becomes its string form
fn document_value(field: &str, value: &Value) -> TranslateResult<Value> {
    match value {
        Value::Object(map) if map.contains_key("$date") => match Literal::from_value(field, value)? {
            Some(literal) => Ok(literal.to_json()),
            None => Ok(value.clone()),
        },
        _ => Ok(value.clone()),
    }
}

/// Compiles a parsed modifier into `json = <expr>`
pub fn compile_modifier<S: SchemaLookup + ?Sized>(
    ctx: CompileContext<'_, S>,
    modifier: &Modifier,
    counter: ParamCounter,
) -> TranslateResult<(Fragment, ParamCounter)> {
    let column = ctx.json_column;
    if modifier.is_empty() {
        return Ok((Fragment::sql(format!("{0} = {0}", column)), counter));
    }

    let mut counter = counter;
    let mut expr = column.to_owned();
    let mut args = Vec::new();

    if !modifier.set.is_empty() {
        let mut pairs = Vec::with_capacity(modifier.set.len());
        for (path, value) in &modifier.set {
            let (placeholder, next) = counter.take()?;
            pairs.push(format!("'{}', {}::jsonb", path.root(), placeholder));
            args.push(Param::Json(value.clone()));
            counter = next;
        }
        expr = format!("{} || jsonb_build_object({})", expr, pairs.join(", "));
    }

    if !modifier.unset.is_empty() {
        let mut removals = Vec::with_capacity(modifier.unset.len());
        for path in &modifier.unset {
            removals.push(format!("'{}'", path.root()));
        }
        expr = format!("(({}) - {})", expr, removals.join(" - "));
    }

    // $inc reads the stored value, not the result of $set/$unset above
    if !modifier.inc.is_empty() {
        let mut pairs = Vec::with_capacity(modifier.inc.len());
        for (path, amount) in &modifier.inc {
            let declared = TypeResolution::declared(ctx.schema, path)?;
            let resolution = TypeResolution::Declared(declared);
            if !declared.is_numeric() || !resolution.accepts(amount) {
                return Err(TranslateError::invalid_operand(
                    Some(path.root()),
                    format!("cannot increment a field declared as {}", declared.type_name()),
                ));
            }
            let (placeholder, next) = counter.take()?;
            pairs.push(format!(
                "'{}', COALESCE({}, 0) + {}",
                path.root(),
                resolution.extraction(path, column),
                placeholder
            ));
            args.push(amount.to_param());
            counter = next;
        }
        expr = format!("{} || jsonb_build_object({})", expr, pairs.join(", "));
    }

    for (path, value) in &modifier.add_to_set {
        match ctx.schema.field_type(path.root()) {
            Some(declared) if !path.is_nested() && declared != FieldType::Array => {
                return Err(TranslateError::invalid_operand(
                    Some(path.root()),
                    format!("$addToSet target is declared as {}", declared.type_name()),
                ))
            }
            _ => {}
        }

        let (placeholder, next) = counter.take()?;
        expr = format!(
            "jsonb_insert({}, '{}', {}::jsonb, true)",
            expr,
            path.pg_append_path(),
            placeholder
        );
        args.push(Param::Json(value.clone()));
        counter = next;
    }

    Ok((Fragment::new(format!("{} = {}", column, expr), args), counter))
}

/// Parses and compiles a modifier document starting at `$arg_offset`
pub fn compile_modifier_value<S: SchemaLookup + ?Sized>(
    ctx: CompileContext<'_, S>,
    modifier: &Value,
    arg_offset: usize,
) -> TranslateResult<Fragment> {
    let modifier = Modifier::parse(modifier)?;
    let (fragment, _) = compile_modifier(ctx, &modifier, ParamCounter::starting_at(arg_offset))?;
    Ok(fragment)
}
