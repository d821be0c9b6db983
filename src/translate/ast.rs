//! Selector AST
//!
//! Selectors arrive as JSON documents (`{"field": value, "$or": [...]}`) and
//! are parsed into a closed grammar before any SQL is produced. Parsing
//! rejects unknown operators, malformed operands and unsafe field names, so
//! the compilers downstream only see shapes they know how to translate.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use super::errors::{TranslateError, TranslateResult};
use super::field::FieldPath;
use super::fragment::Param;

/// Key of the identity pseudo-field
pub const ID_FIELD: &str = "_id";

/// A scalar operand
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// Written as `{"$date": "<RFC 3339>"}` or `{"$date": <epoch millis>}`
    Date(DateTime<Utc>),
}

/// Literal categories used to check `$in` homogeneity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    String,
    Number,
    Bool,
    Date,
}

impl Literal {
    /// Parses a scalar JSON value.
    ///
    /// Returns `Ok(None)` for null, arrays and plain objects; those carry no
    /// scalar type.
    pub fn from_value(field: &str, value: &Value) -> TranslateResult<Option<Literal>> {
        let literal = match value {
            Value::String(s) => Literal::String(s.clone()),
            Value::Bool(b) => Literal::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Literal::Integer(i),
                // A u64 above i64::MAX would silently round through f64
                None if n.is_u64() => {
                    return Err(TranslateError::invalid_operand(
                        Some(field),
                        "integer exceeds the signed 64-bit range",
                    ))
                }
                None => match n.as_f64() {
                    Some(f) => Literal::Float(f),
                    None => {
                        return Err(TranslateError::invalid_operand(
                            Some(field),
                            "number is not representable as a 64-bit value",
                        ))
                    }
                },
            },
            Value::Object(map) => match date_literal(field, map)? {
                Some(date) => Literal::Date(date),
                None => return Ok(None),
            },
            Value::Null | Value::Array(_) => return Ok(None),
        };
        Ok(Some(literal))
    }

    pub fn kind(&self) -> LiteralKind {
        match self {
            Literal::String(_) => LiteralKind::String,
            Literal::Integer(_) | Literal::Float(_) => LiteralKind::Number,
            Literal::Bool(_) => LiteralKind::Bool,
            Literal::Date(_) => LiteralKind::Date,
        }
    }

    /// JSON form, as stored in documents. Dates become RFC 3339 strings.
    pub fn to_json(&self) -> Value {
        match self {
            Literal::String(s) => Value::String(s.clone()),
            Literal::Integer(i) => Value::from(*i),
            Literal::Float(f) => Value::from(*f),
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Date(d) => Value::String(format_date(d)),
        }
    }

    /// Typed bound parameter
    pub fn to_param(&self) -> Param {
        match self {
            Literal::String(s) => Param::Text(s.clone()),
            Literal::Integer(i) => Param::Integer(*i),
            Literal::Float(f) => Param::Float(*f),
            Literal::Bool(b) => Param::Bool(*b),
            Literal::Date(d) => Param::Text(format_date(d)),
        }
    }
}

fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Recognizes `{"$date": ...}`; any other object is not a literal
fn date_literal(field: &str, map: &Map<String, Value>) -> TranslateResult<Option<DateTime<Utc>>> {
    let raw = match map.get("$date") {
        Some(raw) if map.len() == 1 => raw,
        Some(_) => {
            return Err(TranslateError::invalid_operand(
                Some(field),
                "$date must be the only key of its object",
            ))
        }
        None => return Ok(None),
    };

    let parsed = match raw {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|d| d.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    };

    parsed.map(Some).ok_or_else(|| {
        TranslateError::invalid_operand(
            Some(field),
            "$date must be an RFC 3339 string or epoch milliseconds",
        )
    })
}

/// Comparison operators that translate to jsonpath comparisons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOp {
    Gt,
    Gte,
    Lt,
    Lte,
}

impl RangeOp {
    pub fn from_operator(op: &str) -> Option<Self> {
        match op {
            "$gt" => Some(RangeOp::Gt),
            "$gte" => Some(RangeOp::Gte),
            "$lt" => Some(RangeOp::Lt),
            "$lte" => Some(RangeOp::Lte),
            _ => None,
        }
    }

    /// jsonpath comparison symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            RangeOp::Gt => ">",
            RangeOp::Gte => ">=",
            RangeOp::Lt => "<",
            RangeOp::Lte => "<=",
        }
    }
}

/// One constraint on a field
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `{field: literal}`
    Equality(Literal),
    /// `{field: null}`: absent or JSON null
    Null,
    /// `{field: {$in: [...]}}`, elements all of one kind
    Membership(Vec<Literal>),
    /// `{field: {$gt|$gte|$lt|$lte: literal}}`
    Range(RangeOp, Literal),
    /// `{field: {$exists: bool}}`
    Existence(bool),
    /// `{field: {$ne: literal|null}}`
    Negation(Option<Literal>),
}

/// One top-level selector entry
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// Constraints on a document field, ANDed together
    Field {
        path: FieldPath,
        conditions: Vec<Condition>,
    },
    /// `{_id: "..."}`
    IdEquals(String),
    /// `{_id: {$in: [...]}}`
    IdIn(Vec<String>),
    /// `{$and: [...]}`
    Conjunction(Vec<Selector>),
    /// `{$or: [...]}`
    Disjunction(Vec<Selector>),
}

impl Clause {
    /// Plain scalar equality on a top-level field, eligible for the batched
    /// containment predicate. Dates are excluded: they are stored as strings
    /// but written as objects, so containment would compare the wrong shape.
    pub fn simple_equality(&self) -> Option<(&FieldPath, &Literal)> {
        match self {
            Clause::Field { path, conditions } if !path.is_nested() => match conditions.as_slice() {
                [Condition::Equality(literal)] if literal.kind() != LiteralKind::Date => {
                    Some((path, literal))
                }
                _ => None,
            },
            _ => None,
        }
    }
}

/// A parsed selector; clause order follows the source document
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Selector {
    pub clauses: Vec<Clause>,
}

impl Selector {
    /// Parses a selector document
    pub fn parse(value: &Value) -> TranslateResult<Self> {
        let map = value
            .as_object()
            .ok_or_else(|| TranslateError::invalid_operand(None, "selector must be an object"))?;

        let clauses = map
            .iter()
            .map(|(key, value)| parse_clause(key, value))
            .collect::<TranslateResult<Vec<_>>>()?;

        Ok(Self { clauses })
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

/// Parses one `key: value` entry of a selector
pub fn parse_clause(key: &str, value: &Value) -> TranslateResult<Clause> {
    match key {
        ID_FIELD => parse_id(value),
        "$or" => Ok(Clause::Disjunction(parse_subselectors(key, value)?)),
        "$and" => Ok(Clause::Conjunction(parse_subselectors(key, value)?)),
        _ if key.starts_with('$') => Err(TranslateError::unsupported_operator(None, key)),
        _ => {
            let path = FieldPath::parse(key)?;
            let conditions = parse_conditions(key, value)?;
            Ok(Clause::Field { path, conditions })
        }
    }
}

fn parse_id(value: &Value) -> TranslateResult<Clause> {
    match value {
        Value::String(id) => Ok(Clause::IdEquals(id.clone())),
        Value::Object(map) if map.len() == 1 && map.contains_key("$in") => {
            let ids = map["$in"].as_array().ok_or_else(|| {
                TranslateError::invalid_operand(Some(ID_FIELD), "argument to $in must be an array")
            })?;
            let ids = ids
                .iter()
                .map(|id| {
                    id.as_str().map(str::to_owned).ok_or_else(|| {
                        TranslateError::invalid_operand(Some(ID_FIELD), "$in ids must be strings")
                    })
                })
                .collect::<TranslateResult<Vec<_>>>()?;
            Ok(Clause::IdIn(ids))
        }
        Value::Object(map) => {
            let op = map
                .keys()
                .find(|k| k.as_str() != "$in")
                .map_or("{}", String::as_str);
            Err(TranslateError::unsupported_operator(Some(ID_FIELD), op))
        }
        _ => Err(TranslateError::invalid_operand(
            Some(ID_FIELD),
            format!("{} is not a selectable id", json_type_name(value)),
        )),
    }
}

fn parse_subselectors(key: &str, value: &Value) -> TranslateResult<Vec<Selector>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items.iter().map(Selector::parse).collect(),
        _ => Err(TranslateError::invalid_operand(
            Some(key),
            format!("{} requires an array of selectors", key),
        )),
    }
}

fn parse_conditions(field: &str, value: &Value) -> TranslateResult<Vec<Condition>> {
    if let Some(literal) = Literal::from_value(field, value)? {
        return Ok(vec![Condition::Equality(literal)]);
    }

    match value {
        Value::Null => Ok(vec![Condition::Null]),
        Value::Array(_) => Err(TranslateError::invalid_operand(
            Some(field),
            "array equality is not supported",
        )),
        Value::Object(ops) if ops.is_empty() => Err(TranslateError::invalid_operand(
            Some(field),
            "empty operator object",
        )),
        Value::Object(ops) => ops
            .iter()
            .map(|(op, operand)| parse_operator(field, op, operand))
            .collect(),
        // Scalars were handled by Literal::from_value
        _ => Err(TranslateError::type_inference(field, json_type_name(value))),
    }
}

fn parse_operator(field: &str, op: &str, operand: &Value) -> TranslateResult<Condition> {
    if let Some(range) = RangeOp::from_operator(op) {
        let literal = Literal::from_value(field, operand)?.ok_or_else(|| {
            TranslateError::invalid_operand(
                Some(field),
                format!("{} requires a scalar, got {}", op, json_type_name(operand)),
            )
        })?;
        return Ok(Condition::Range(range, literal));
    }

    match op {
        "$in" => parse_membership(field, operand),
        "$exists" => match operand {
            Value::Bool(b) => Ok(Condition::Existence(*b)),
            Value::Number(n) => Ok(Condition::Existence(n.as_f64().map_or(false, |f| f != 0.0))),
            _ => Err(TranslateError::invalid_operand(
                Some(field),
                "$exists requires a boolean",
            )),
        },
        "$ne" => match operand {
            Value::Null => Ok(Condition::Negation(None)),
            _ => match Literal::from_value(field, operand)? {
                Some(literal) => Ok(Condition::Negation(Some(literal))),
                None => Err(TranslateError::type_inference(field, json_type_name(operand))),
            },
        },
        _ => Err(TranslateError::unsupported_operator(Some(field), op)),
    }
}

fn parse_membership(field: &str, operand: &Value) -> TranslateResult<Condition> {
    let items = operand.as_array().ok_or_else(|| {
        TranslateError::invalid_operand(Some(field), "argument to $in must be an array")
    })?;

    let mut literals = Vec::with_capacity(items.len());
    for item in items {
        let literal = Literal::from_value(field, item)?.ok_or_else(|| {
            TranslateError::invalid_operand(
                Some(field),
                format!("$in elements must be scalars, got {}", json_type_name(item)),
            )
        })?;
        if let Some(first) = literals.first().map(Literal::kind) {
            if literal.kind() != first {
                return Err(TranslateError::invalid_operand(
                    Some(field),
                    "$in elements must all have the same type",
                ));
            }
        }
        literals.push(literal);
    }

    Ok(Condition::Membership(literals))
}

/// JSON type name for error messages; never includes the value itself
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
