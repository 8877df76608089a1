//! Rendering diagnostics for terminals and machines.

use crate::diagnostic::Diagnostic;
use crate::severity::Severity;

/// Formats a single diagnostic for output.
pub trait DiagnosticRenderer {
    /// Renders one diagnostic into a string (including trailing newline).
    fn render(&self, diag: &Diagnostic) -> String;
}

/// rustc-style terminal output:
///
/// ```text
/// warning[W101]: value 0x1ff does not fit in 8 bits
///   --> TOP.data_in @ 1500
///    = note: stored value truncated to 8'hff
/// ```
pub struct TerminalRenderer {
    /// Whether to emit ANSI color codes.
    pub color: bool,
}

impl TerminalRenderer {
    /// Creates a terminal renderer.
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint(&self, severity: Severity, text: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        let ansi = match severity {
            Severity::Error => "\x1b[1;31m",
            Severity::Warning => "\x1b[1;33m",
            Severity::Note => "\x1b[1;36m",
        };
        format!("{ansi}{text}\x1b[0m")
    }
}

impl DiagnosticRenderer for TerminalRenderer {
    fn render(&self, diag: &Diagnostic) -> String {
        let header = format!("{}[{}]", diag.severity, diag.code);
        let mut out = format!("{}: {}\n", self.paint(diag.severity, &header), diag.message);
        if !diag.location.is_none() {
            out.push_str(&format!("  --> {}\n", diag.location));
        }
        for note in &diag.notes {
            out.push_str(&format!("   = note: {note}\n"));
        }
        out
    }
}

/// One JSON object per diagnostic, newline-terminated.
pub struct JsonRenderer;

impl DiagnosticRenderer for JsonRenderer {
    fn render(&self, diag: &Diagnostic) -> String {
        // Diagnostic only holds strings, integers and enums, so this cannot fail.
        let mut line = serde_json::to_string(diag).unwrap_or_default();
        line.push('\n');
        line
    }
}
