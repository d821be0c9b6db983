//! Observability for docsql
//!
//! Compilation is pure, so the only observable output is structured
//! logging of compile outcomes. Bound parameter values are never logged.
//!
//! ```ignore
//! use docsql::observability::{log_event, Event, Logger, Severity};
//!
//! let logger = Logger::new(Some(Severity::Trace));
//! log_event(&logger, Event::SelectorCompiled, &[("params", "2")]);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{LogSink, Logger, Severity};

/// Log an event at its own severity
pub fn log_event(logger: &Logger, event: Event, fields: &[(&str, &str)]) {
    logger.log(event.severity(), event.as_str(), fields);
}
