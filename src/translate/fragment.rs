//! SQL fragments and bound parameters
//!
//! A [`Fragment`] is partial SQL text plus the values bound to its `$N`
//! placeholders. Placeholder numbers are handed out by a [`ParamCounter`],
//! which is threaded by value through every compile step: each step takes
//! the counter it should start from and returns the counter after its last
//! placeholder. Nothing is captured or shared, so nested `$or`/`$and`
//! compilation and statement assembly stay contiguous and collision free.

use serde::Serialize;
use serde_json::Value;

use super::errors::{TranslateError, TranslateResult};

/// A value bound to one placeholder
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Param {
    /// Binds as `text`
    Text(String),
    /// Binds as `bigint`
    Integer(i64),
    /// Binds as `double precision`
    Float(f64),
    /// Binds as `boolean`
    Bool(bool),
    /// Binds as `jsonb`; the SQL side always casts with `::jsonb`
    Json(Value),
}

/// Partial SQL plus its positional arguments
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fragment {
    /// SQL text
    pub sql: String,
    /// Values for the placeholders, in placeholder order
    pub args: Vec<Param>,
}

impl Fragment {
    pub fn new(sql: impl Into<String>, args: Vec<Param>) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }

    /// Fragment with no placeholders
    pub fn sql(sql: impl Into<String>) -> Self {
        Self::new(sql, Vec::new())
    }

    /// Predicate that matches every row
    pub fn always_true() -> Self {
        Self::sql("TRUE")
    }

    /// Predicate that matches no row
    pub fn always_false() -> Self {
        Self::sql("FALSE")
    }

    /// Returns true if the fragment is empty text
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    /// Placeholder numbers in order of appearance.
    ///
    /// Text inside single-quoted SQL literals is skipped, so jsonpath
    /// variables such as `'$.a == $value'` are not counted.
    pub fn placeholders(&self) -> Vec<usize> {
        let mut found = Vec::new();
        let mut in_literal = false;
        let mut chars = self.sql.char_indices().peekable();

        while let Some((i, c)) = chars.next() {
            match c {
                '\'' => in_literal = !in_literal,
                '$' if !in_literal => {
                    let digits: String = self.sql[i + 1..]
                        .chars()
                        .take_while(char::is_ascii_digit)
                        .collect();
                    if let Ok(n) = digits.parse() {
                        found.push(n);
                        for _ in 0..digits.len() {
                            chars.next();
                        }
                    }
                }
                _ => {}
            }
        }

        found
    }

    /// Joins fragments with a SQL operator, concatenating arguments in order
    pub fn join(fragments: Vec<Fragment>, separator: &str) -> Fragment {
        let mut sql = Vec::with_capacity(fragments.len());
        let mut args = Vec::new();
        for fragment in fragments {
            sql.push(fragment.sql);
            args.extend(fragment.args);
        }
        Fragment::new(sql.join(separator), args)
    }

    /// Wraps the SQL in parentheses
    pub fn parenthesized(self) -> Fragment {
        Fragment::new(format!("({})", self.sql), self.args)
    }
}

/// Next placeholder number to hand out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamCounter {
    next: usize,
}

impl ParamCounter {
    /// Counter whose first placeholder is `$offset`; 0 is treated as 1
    pub fn starting_at(offset: usize) -> Self {
        Self {
            next: offset.max(1),
        }
    }

    /// Number the next placeholder will get
    pub fn next_index(&self) -> usize {
        self.next
    }

    /// Hands out one placeholder, returning its text and the advanced counter
    pub fn take(self) -> TranslateResult<(String, ParamCounter)> {
        Ok((format!("${}", self.next), self.advanced_by(1)?))
    }

    /// Hands out `n` consecutive placeholders
    pub fn take_n(self, n: usize) -> TranslateResult<(Vec<String>, ParamCounter)> {
        let advanced = self.advanced_by(n)?;
        let placeholders = (self.next..advanced.next).map(|i| format!("${}", i)).collect();
        Ok((placeholders, advanced))
    }

    /// Counter after `n` placeholders were used
    pub fn advanced_by(self, n: usize) -> TranslateResult<ParamCounter> {
        let next = self.next.checked_add(n).ok_or_else(|| {
            TranslateError::invalid_operand(None, "placeholder index overflows usize")
        })?;
        Ok(Self { next })
    }
}

impl Default for ParamCounter {
    fn default() -> Self {
        Self::starting_at(1)
    }
}
