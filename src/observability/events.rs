//! Observable translator events

use std::fmt;

use super::logger::Severity;

/// Events emitted by the translator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A selector compiled to a WHERE fragment
    SelectorCompiled,
    /// A modifier compiled to a SET fragment
    ModifierCompiled,
    /// Find options compiled to ORDER BY / LIMIT
    FindOptionsCompiled,
    /// Input rejected with a translation error
    CompileRejected,
    /// Schemas loaded from disk
    SchemasLoaded,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::SelectorCompiled => "SELECTOR_COMPILED",
            Event::ModifierCompiled => "MODIFIER_COMPILED",
            Event::FindOptionsCompiled => "FIND_OPTIONS_COMPILED",
            Event::CompileRejected => "COMPILE_REJECTED",
            Event::SchemasLoaded => "SCHEMAS_LOADED",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::CompileRejected => Severity::Warn,
            Event::SchemasLoaded => Severity::Info,
            _ => Severity::Trace,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_unique() {
        let events = [
            Event::SelectorCompiled,
            Event::ModifierCompiled,
            Event::FindOptionsCompiled,
            Event::CompileRejected,
            Event::SchemasLoaded,
        ];
        let mut names: Vec<_> = events.iter().map(Event::as_str).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), events.len());
    }

    #[test]
    fn test_rejection_is_warn() {
        assert_eq!(Event::CompileRejected.severity(), Severity::Warn);
        assert_eq!(Event::SelectorCompiled.severity(), Severity::Trace);
    }
}
