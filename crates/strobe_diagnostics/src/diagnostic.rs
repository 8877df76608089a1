//! Structured diagnostic messages.

use crate::code::DiagnosticCode;
use crate::severity::Severity;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where in a simulation run a diagnostic was raised.
///
/// Both parts are optional: a scoreboard mismatch has a time but no single
/// signal, a configuration warning has neither.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Simulation time in the run's precision steps.
    pub time: Option<u64>,
    /// Hierarchical signal name.
    pub signal: Option<String>,
}

impl Location {
    /// A location with neither time nor signal.
    pub const NONE: Location = Location {
        time: None,
        signal: None,
    };

    /// Creates a location at a time on a signal.
    pub fn at(time: u64, signal: impl Into<String>) -> Self {
        Self {
            time: Some(time),
            signal: Some(signal.into()),
        }
    }

    /// Creates a location at a time only.
    pub fn at_time(time: u64) -> Self {
        Self {
            time: Some(time),
            signal: None,
        }
    }

    /// Returns `true` if neither part is set.
    pub fn is_none(&self) -> bool {
        self.time.is_none() && self.signal.is_none()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.signal, self.time) {
            (Some(sig), Some(t)) => write!(f, "{sig} @ {t}"),
            (Some(sig), None) => write!(f, "{sig}"),
            (None, Some(t)) => write!(f, "@ {t}"),
            (None, None) => Ok(()),
        }
    }
}

/// A diagnostic message with severity, code, location and notes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The severity level.
    pub severity: Severity,
    /// The code identifying the kind of diagnostic.
    pub code: DiagnosticCode,
    /// The main message.
    pub message: String,
    /// Where the problem was observed.
    pub location: Location,
    /// Explanatory footnotes.
    pub notes: Vec<String>,
}

impl Diagnostic {
    /// Creates an error diagnostic.
    pub fn error(code: DiagnosticCode, message: impl Into<String>, location: Location) -> Self {
        Self::new(Severity::Error, code, message, location)
    }

    /// Creates a warning diagnostic.
    pub fn warning(code: DiagnosticCode, message: impl Into<String>, location: Location) -> Self {
        Self::new(Severity::Warning, code, message, location)
    }

    fn new(
        severity: Severity,
        code: DiagnosticCode,
        message: impl Into<String>,
        location: Location,
    ) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            location,
            notes: Vec::new(),
        }
    }

    /// Adds a note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_warning() {
        let diag = Diagnostic::warning(
            DiagnosticCode::WIDTH_OVERFLOW,
            "value 0x100 does not fit in 8 bits",
            Location::at(5, "TOP.data_in"),
        );
        assert_eq!(diag.severity, Severity::Warning);
        assert_eq!(diag.location.signal.as_deref(), Some("TOP.data_in"));
        assert!(diag.notes.is_empty());
    }

    #[test]
    fn with_note_appends() {
        let diag = Diagnostic::error(DiagnosticCode::CHECK_FAILED, "mismatch", Location::NONE)
            .with_note("expected 0x5a")
            .with_note("got 0x00");
        assert_eq!(diag.notes, vec!["expected 0x5a", "got 0x00"]);
    }

    #[test]
    fn location_display() {
        assert_eq!(Location::at(10, "TOP.clk").to_string(), "TOP.clk @ 10");
        assert_eq!(Location::at_time(3).to_string(), "@ 3");
        assert!(Location::NONE.is_none());
        assert_eq!(Location::NONE.to_string(), "");
    }
}
