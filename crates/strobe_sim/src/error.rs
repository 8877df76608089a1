//! Simulation error types.
//!
//! Convergence failures are fatal: once a region fails to settle the
//! simulator refuses further evaluation and reports [`SimError::Poisoned`].

use std::fmt;
use std::io;

/// One of the three scheduling regions evaluated every time step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Region {
    /// Input-combinational region: propagates stimulus through combinational logic.
    Ico,
    /// Active region: detects clock and reset edges.
    Act,
    /// Next-state-assignment region: runs clocked logic on pending edges.
    Nba,
}

impl Region {
    /// Short tag used in trigger dumps.
    pub fn tag(self) -> &'static str {
        match self {
            Region::Ico => "ico",
            Region::Act => "act",
            Region::Nba => "nba",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Region::Ico => write!(f, "Input combinational region"),
            Region::Act => write!(f, "Active region"),
            Region::Nba => write!(f, "NBA region"),
        }
    }
}

/// Errors that can occur during elaboration or evaluation.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// A scheduling region kept producing work past the iteration cap.
    #[error("{region} did not converge after {limit} tries")]
    NonConvergence {
        /// The region that failed to settle.
        region: Region,
        /// The configured iteration cap.
        limit: u32,
    },

    /// Evaluation was attempted after a fatal convergence failure.
    #[error("simulation aborted by an earlier convergence failure")]
    Poisoned,

    /// No signal with the given hierarchical name exists.
    #[error("no signal named '{0}'")]
    UnknownSignal(String),

    /// Two signals were declared with the same hierarchical name.
    #[error("signal '{0}' declared twice")]
    DuplicateSignal(String),

    /// The stimulus interface tried to drive a signal that is not an input.
    #[error("signal '{0}' is not an input")]
    NotAnInput(String),

    /// A signal was declared with an unsupported width.
    #[error("signal '{name}' has unsupported width {width} (expected 1..=64)")]
    InvalidWidth {
        /// Hierarchical signal name.
        name: String,
        /// The rejected width.
        width: u32,
    },

    /// The caller asked to evaluate at a time earlier than the current one.
    #[error("time went backwards: now {now}, requested {requested}")]
    TimeWentBackwards {
        /// Current simulation time in precision steps.
        now: u64,
        /// Requested time in precision steps.
        requested: u64,
    },

    /// A clock period that cannot be split into two half-periods.
    #[error("clock period of {0} steps is too short")]
    InvalidClockPeriod(u64),

    /// Writing the change trace failed.
    #[error("trace I/O error: {0}")]
    TraceIo(#[from] io::Error),

    /// Encoding a trace record failed.
    #[error("trace encoding error: {0}")]
    TraceFormat(#[from] serde_json::Error),
}
