//! Structured diagnostics for simulation runs.
//!
//! Advisory findings (width overflows, scoreboard mismatches) are collected
//! as [`Diagnostic`]s in a thread-safe [`DiagnosticSink`] and rendered at the
//! end of a run by a [`DiagnosticRenderer`].

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::{Diagnostic, Location};
pub use renderer::{DiagnosticRenderer, JsonRenderer, TerminalRenderer};
pub use severity::Severity;
pub use sink::DiagnosticSink;
