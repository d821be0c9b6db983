//! Structured JSON logger for docsql
//!
//! - One log line = one event
//! - `event` first, `severity` second, remaining keys sorted
//! - Synchronous, no buffering
//! - Filtered by a minimum severity; no threshold means no output

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Per-compilation detail
    Trace = 0,
    /// Normal operations
    Info = 1,
    /// Rejected input
    Warn = 2,
    /// Operation failures
    Error = 3,
}

impl Severity {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where log lines go
#[derive(Debug, Clone, Default)]
pub enum LogSink {
    /// stdout, with ERROR lines on stderr
    #[default]
    Stdio,
    /// In-memory lines, one entry per event
    Memory(Arc<Mutex<Vec<String>>>),
}

/// A structured logger that outputs JSON lines
#[derive(Debug, Clone, Default)]
pub struct Logger {
    threshold: Option<Severity>,
    sink: LogSink,
}

impl Logger {
    /// Logger that writes events at or above `threshold` to stdio
    pub fn new(threshold: Option<Severity>) -> Self {
        Self {
            threshold,
            sink: LogSink::Stdio,
        }
    }

    /// Logger that drops every event
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Replaces the sink
    pub fn with_sink(mut self, sink: LogSink) -> Self {
        self.sink = sink;
        self
    }

    /// Logger that records lines in memory, returning the shared buffer
    pub fn memory(threshold: Severity) -> (Self, Arc<Mutex<Vec<String>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let logger = Self::new(Some(threshold)).with_sink(LogSink::Memory(Arc::clone(&lines)));
        (logger, lines)
    }

    /// Returns true if events of this severity are written
    pub fn enabled(&self, severity: Severity) -> bool {
        self.threshold.map_or(false, |min| severity >= min)
    }

    /// Log an event with the given severity and fields
    pub fn log(&self, severity: Severity, event: &str, fields: &[(&str, &str)]) {
        if !self.enabled(severity) {
            return;
        }

        let line = format_line(severity, event, fields);
        match &self.sink {
            LogSink::Stdio if severity >= Severity::Error => {
                write_line(&mut io::stderr(), &line);
            }
            LogSink::Stdio => write_line(&mut io::stdout(), &line),
            LogSink::Memory(lines) => {
                // A poisoned buffer only means another test thread panicked
                if let Ok(mut lines) = lines.lock() {
                    lines.push(line);
                }
            }
        }
    }
}

fn write_line<W: Write>(writer: &mut W, line: &str) {
    // Logging must never fail a compilation
    let _ = writer.write_all(line.as_bytes());
    let _ = writer.write_all(b"\n");
    let _ = writer.flush();
}

/// Renders one event as a JSON object without a trailing newline
fn format_line(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
    let mut output = String::with_capacity(128);

    output.push_str("{\"event\":\"");
    escape_json_string(&mut output, event);
    output.push_str("\",\"severity\":\"");
    output.push_str(severity.as_str());
    output.push('"');

    let mut sorted_fields: Vec<_> = fields.iter().collect();
    sorted_fields.sort_by_key(|(k, _)| *k);

    for (key, value) in sorted_fields {
        output.push_str(",\"");
        escape_json_string(&mut output, key);
        output.push_str("\":\"");
        escape_json_string(&mut output, value);
        output.push('"');
    }

    output.push('}');
    output
}

fn escape_json_string(output: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '"' => output.push_str("\\\""),
            '\\' => output.push_str("\\\\"),
            '\n' => output.push_str("\\n"),
            '\r' => output.push_str("\\r"),
            '\t' => output.push_str("\\t"),
            c if c.is_control() => {
                output.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => output.push(c),
        }
    }
}
