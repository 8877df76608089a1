//! Diagnostic codes with category prefixes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The category of a diagnostic code, determining its prefix letter.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Category {
    /// Failed checks, prefixed with `E`.
    Error,
    /// Modeling problems, prefixed with `W`.
    Warning,
}

impl Category {
    /// Returns the single-character prefix for this category.
    pub fn prefix(self) -> char {
        match self {
            Category::Error => 'E',
            Category::Warning => 'W',
        }
    }
}

/// A category prefix plus a number, displayed like `W101`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct DiagnosticCode {
    /// The category of this diagnostic.
    pub category: Category,
    /// The numeric identifier within the category.
    pub number: u16,
}

impl DiagnosticCode {
    /// A value was assigned to a signal that does not fit its declared width.
    pub const WIDTH_OVERFLOW: DiagnosticCode = DiagnosticCode::new(Category::Warning, 101);
    /// A testbench scoreboard saw a different word than was sent.
    pub const SCOREBOARD_MISMATCH: DiagnosticCode = DiagnosticCode::new(Category::Error, 301);
    /// A directed scenario check failed.
    pub const CHECK_FAILED: DiagnosticCode = DiagnosticCode::new(Category::Error, 302);

    /// Creates a new diagnostic code.
    pub const fn new(category: Category, number: u16) -> Self {
        Self { category, number }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:03}", self.category.prefix(), self.number)
    }
}
