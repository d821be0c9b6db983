//! Document query translation for docsql
//!
//! Compiles document-store selectors, update modifiers and find options
//! into PostgreSQL fragments over a jsonb document column:
//!
//! - Selectors become boolean predicates for a WHERE clause
//! - Modifiers become a single `json = <expr>` assignment
//! - Find options become `ORDER BY ... LIMIT n`
//!
//! Field names are validated identifiers; every user value is a bound
//! parameter. Compilation is pure: the only state is the schema it reads
//! and the placeholder counter it threads.
//!
//! ```ignore
//! use docsql::schema::{CollectionSchema, FieldType};
//! use docsql::translate::Translator;
//! use serde_json::json;
//!
//! let schema = CollectionSchema::new("posts").with_field("postedAt", FieldType::Date);
//! let translator = Translator::default();
//! let wh = translator.compile_selector(&schema, &json!({"userId": "u1"}), 1)?;
//! assert_eq!(wh.sql, "json @> $1::jsonb");
//! ```

mod ast;
mod errors;
mod expression;
mod field;
mod fragment;
mod modifier;
mod options;
mod selector;
mod statement;

pub use ast::{Clause, Condition, Literal, RangeOp, Selector, ID_FIELD};
pub use errors::{TranslateError, TranslateErrorCode, TranslateResult};
pub use expression::CompileContext;
pub use field::{is_identifier, FieldPath, InferredType, TypeResolution};
pub use fragment::{Fragment, Param, ParamCounter};
pub use modifier::{Modifier, ModifierOp};
pub use options::{FindOptions, SortDirection, SortSpec};
pub use statement::quote_identifier;

use std::path::Path;

use serde_json::Value;

use crate::config::{ConfigError, TranslatorConfig};
use crate::observability::{log_event, Event, Logger};
use crate::schema::{SchemaLookup, SchemaRegistry, SchemaResult};

/// Entry point for every compilation.
///
/// Holds only configuration and a logger, so one translator can be shared
/// freely across threads.
#[derive(Debug, Clone)]
pub struct Translator {
    config: TranslatorConfig,
    logger: Logger,
}

impl Default for Translator {
    fn default() -> Self {
        Self {
            config: TranslatorConfig::default(),
            logger: Logger::disabled(),
        }
    }
}

impl Translator {
    /// Creates a translator, validating the configured column names
    pub fn new(config: TranslatorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let logger = Logger::new(config.log_level);
        Ok(Self { config, logger })
    }

    /// Replaces the logger
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    fn context<'a, S: SchemaLookup + ?Sized>(&'a self, schema: &'a S) -> CompileContext<'a, S> {
        CompileContext {
            schema,
            json_column: &self.config.json_column,
            id_column: &self.config.id_column,
        }
    }

    /// Compiles a selector to a WHERE predicate whose first placeholder is
    /// `$arg_offset`
    pub fn compile_selector<S: SchemaLookup + ?Sized>(
        &self,
        schema: &S,
        selector: &Value,
        arg_offset: usize,
    ) -> TranslateResult<Fragment> {
        let result = selector::compile_selector_value(self.context(schema), selector, arg_offset);
        self.observe(Event::SelectorCompiled, schema, result)
    }

    /// Compiles one `field: value` selector entry.
    ///
    /// Returns `None` when the entry constrains nothing (`$or: []`).
    pub fn compile_field<S: SchemaLookup + ?Sized>(
        &self,
        schema: &S,
        field: &str,
        value: &Value,
        arg_offset: usize,
    ) -> TranslateResult<Option<Fragment>> {
        let result = expression::compile_field(self.context(schema), field, value, arg_offset);
        match result {
            Ok(Some(fragment)) => self
                .observe(Event::SelectorCompiled, schema, Ok(fragment))
                .map(Some),
            Ok(None) => Ok(None),
            Err(err) => self.observe(Event::SelectorCompiled, schema, Err(err)).map(Some),
        }
    }

    /// Compiles a modifier to a `json = <expr>` assignment
    pub fn compile_modifier<S: SchemaLookup + ?Sized>(
        &self,
        schema: &S,
        modifier: &Value,
        arg_offset: usize,
    ) -> TranslateResult<Fragment> {
        let result = modifier::compile_modifier_value(self.context(schema), modifier, arg_offset);
        self.observe(Event::ModifierCompiled, schema, result)
    }

    /// Compiles find options to `ORDER BY ... LIMIT n`; never binds parameters
    pub fn compile_find_options<S: SchemaLookup + ?Sized>(
        &self,
        schema: &S,
        options: &Value,
    ) -> TranslateResult<Fragment> {
        let result = options::compile_find_options_value(self.context(schema), options);
        self.observe(Event::FindOptionsCompiled, schema, result)
    }

    /// Full `SELECT` for `table`
    pub fn select_statement<S: SchemaLookup + ?Sized>(
        &self,
        schema: &S,
        table: &str,
        selector: &Value,
        options: &Value,
    ) -> TranslateResult<Fragment> {
        let result = Selector::parse(selector).and_then(|selector| {
            let options = FindOptions::parse(options)?;
            statement::select_statement(self.context(schema), table, &selector, &options)
        });
        self.observe(Event::SelectorCompiled, schema, result)
    }

    /// Full `SELECT count(*)` for `table`
    pub fn count_statement<S: SchemaLookup + ?Sized>(
        &self,
        schema: &S,
        table: &str,
        selector: &Value,
    ) -> TranslateResult<Fragment> {
        let result = Selector::parse(selector).and_then(|selector| {
            statement::count_statement(self.context(schema), table, &selector)
        });
        self.observe(Event::SelectorCompiled, schema, result)
    }

    /// Full `UPDATE` for `table`; modifier parameters come first
    pub fn update_statement<S: SchemaLookup + ?Sized>(
        &self,
        schema: &S,
        table: &str,
        selector: &Value,
        modifier: &Value,
    ) -> TranslateResult<Fragment> {
        let result = Modifier::parse(modifier).and_then(|modifier| {
            let selector = Selector::parse(selector)?;
            statement::update_statement(self.context(schema), table, &selector, &modifier)
        });
        self.observe(Event::ModifierCompiled, schema, result)
    }

    /// Full `DELETE` for `table`
    pub fn delete_statement<S: SchemaLookup + ?Sized>(
        &self,
        schema: &S,
        table: &str,
        selector: &Value,
    ) -> TranslateResult<Fragment> {
        let result = Selector::parse(selector).and_then(|selector| {
            statement::delete_statement(self.context(schema), table, &selector)
        });
        self.observe(Event::SelectorCompiled, schema, result)
    }

    /// Loads every collection schema in `dir`
    pub fn load_schemas(&self, dir: &Path) -> SchemaResult<SchemaRegistry> {
        let registry = SchemaRegistry::load_dir(dir)?;
        let count = registry.len().to_string();
        let dir = dir.display().to_string();
        log_event(
            &self.logger,
            Event::SchemasLoaded,
            &[("count", &count), ("dir", &dir)],
        );
        Ok(registry)
    }

    /// Logs the outcome of a compilation. Parameter values are never logged.
    fn observe<S: SchemaLookup + ?Sized>(
        &self,
        event: Event,
        schema: &S,
        result: TranslateResult<Fragment>,
    ) -> TranslateResult<Fragment> {
        match &result {
            Ok(fragment) => {
                if self.logger.enabled(event.severity()) {
                    let params = fragment.args.len().to_string();
                    let sql_len = fragment.sql.len().to_string();
                    log_event(
                        &self.logger,
                        event,
                        &[
                            ("collection", schema.collection_name()),
                            ("params", &params),
                            ("sql_len", &sql_len),
                        ],
                    );
                }
            }
            Err(err) => log_event(
                &self.logger,
                Event::CompileRejected,
                &[
                    ("code", err.code().code()),
                    ("collection", schema.collection_name()),
                    ("message", err.message()),
                    ("stage", event.as_str()),
                ],
            ),
        }
        result
    }
}

/// [`Translator::compile_selector`] with the default configuration
pub fn compile_selector<S: SchemaLookup + ?Sized>(
    schema: &S,
    selector: &Value,
    arg_offset: usize,
) -> TranslateResult<Fragment> {
    Translator::default().compile_selector(schema, selector, arg_offset)
}

/// [`Translator::compile_field`] with the default configuration
pub fn compile_field<S: SchemaLookup + ?Sized>(
    schema: &S,
    field: &str,
    value: &Value,
    arg_offset: usize,
) -> TranslateResult<Option<Fragment>> {
    Translator::default().compile_field(schema, field, value, arg_offset)
}

/// [`Translator::compile_modifier`] with the default configuration
pub fn compile_modifier<S: SchemaLookup + ?Sized>(
    schema: &S,
    modifier: &Value,
    arg_offset: usize,
) -> TranslateResult<Fragment> {
    Translator::default().compile_modifier(schema, modifier, arg_offset)
}

/// [`Translator::compile_find_options`] with the default configuration
pub fn compile_find_options<S: SchemaLookup + ?Sized>(
    schema: &S,
    options: &Value,
) -> TranslateResult<Fragment> {
    Translator::default().compile_find_options(schema, options)
}
