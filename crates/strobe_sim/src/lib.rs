//! Trigger-driven cycle evaluation engine for valid/ready pipeline stages.
//!
//! A hardware model implements [`Model`]: it declares 2-state signals of
//! 1 to 64 bits in a tree of scopes, names the clock and reset edges it reacts
//! to, and provides a combinational function and a clocked function.
//! [`Simulator`] evaluates such a model one time step at a time using three
//! nested convergence regions (input-combinational, active, next-state) with
//! a configurable iteration cap.
//!
//! # Architecture
//!
//! Signals live in a [`SignalBank`] keyed by flat [`SignalId`]s. A
//! [`TriggerEvaluator`] compares watched signals with their previous values to
//! build [`TriggerSet`]s. [`CombinationalStage`] re-runs combinational logic
//! to a fixed point; [`SequentialStage`] runs clocked logic with deferred
//! register writes. Settled steps are streamed to an optional [`TraceSink`].
//!
//! # Usage
//!
//! ```ignore
//! use strobe_sim::{simulate, SimConfig, StreamConfig};
//!
//! let result = simulate(&SimConfig::default(), &StreamConfig::default(), 1)?;
//! assert!(result.report.passed());
//! ```
//!
//! # Modules
//!
//! - `error`: simulation error types
//! - `time`: step-counted time and declared time scale
//! - `value`: signal storage
//! - `trigger`: trigger bit-vectors and edge detection
//! - `model`: the model trait and its evaluation contexts
//! - `stage`: combinational fixed point and deferred sequential update
//! - `scheduler`: the ico/act/nba evaluation loop
//! - `valid_ready`: the valid/ready pipeline stage model
//! - `trace`: change trace sinks
//! - `testbench`: clock driver, directed scenarios, random stream

#![warn(missing_docs)]

pub mod error;
pub mod model;
pub mod scheduler;
pub mod stage;
pub mod testbench;
pub mod time;
pub mod trace;
pub mod trigger;
pub mod valid_ready;
pub mod value;

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::Arc;

use strobe_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink, Location};

pub use error::{Region, SimError};
pub use model::{CombContext, Input, InstanceBuilder, Model, Reg, SeqContext, Wire};
pub use scheduler::{EvalStats, Simulator};
pub use stage::{CombinationalStage, SequentialStage};
pub use testbench::{
    run_scenarios, EdgeSample, Mismatch, Scenario, ScenarioOutcome, StreamConfig, StreamReport,
    Testbench, ValidReadyBench, SCENARIOS,
};
pub use time::{SimTime, TimeScale};
pub use trace::{ChangeBuffer, JsonTraceWriter, TickRecord, TraceSink, TracedSignal};
pub use trigger::{Edge, TriggerEvaluator, TriggerId, TriggerSet};
pub use valid_ready::{ValidReadyPorts, ValidReadyStage};
pub use value::{Direction, SignalBank, SignalId, SignalKind, SignalState};

/// Default per-region iteration cap.
pub const DEFAULT_MAX_ITERATIONS: u32 = 100;

/// Configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Iteration cap for each scheduling region.
    pub max_iterations: u32,
    /// Report values that overflow a signal's declared width.
    pub debug_checks: bool,
    /// Declared time unit and precision.
    pub timescale: TimeScale,
    /// Clock period in precision steps.
    pub clock_period: u64,
    /// Optional path for a JSON-lines change trace.
    pub trace_path: Option<PathBuf>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            debug_checks: false,
            timescale: TimeScale::default(),
            // 10 ns at 1 ps precision
            clock_period: 10_000,
            trace_path: None,
        }
    }
}

/// The result of a random stream run.
#[derive(Debug, Clone)]
pub struct SimResult {
    /// The scoreboard.
    pub report: StreamReport,
    /// Width warnings and scoreboard errors raised during the run.
    pub diagnostics: Vec<Diagnostic>,
    /// Simulation time when the run ended.
    pub final_time: SimTime,
    /// Statistics of the last evaluation.
    pub last_stats: EvalStats,
    /// Triggers that fired in the last evaluation.
    pub last_triggers: Vec<String>,
}

/// High-level entry point: runs a seeded random stream through a fresh
/// valid/ready stage and scoreboards it.
///
/// Attaches a JSON trace writer when `config.trace_path` is set.
pub fn simulate(
    config: &SimConfig,
    stream: &StreamConfig,
    seed: u64,
) -> Result<SimResult, SimError> {
    let sink = Arc::new(DiagnosticSink::new());
    let mut sim = Simulator::<ValidReadyStage>::new(config)?.with_diagnostics(Arc::clone(&sink));

    if let Some(path) = &config.trace_path {
        let file = File::create(path)?;
        let writer = JsonTraceWriter::new(BufWriter::new(file), config.timescale);
        sim.attach_trace(Box::new(writer))?;
    }

    let mut bench = ValidReadyBench::from_simulator(sim, config.clock_period)?;
    let report = bench.stream_random(stream, seed)?;
    let mut sim = bench.into_simulator();
    sim.finish()?;

    report_mismatches(&report, &sink, sim.time());
    Ok(SimResult {
        diagnostics: sink.take_all(),
        final_time: sim.time(),
        last_stats: sim.last_stats(),
        last_triggers: sim.last_triggers(),
        report,
    })
}

fn report_mismatches(report: &StreamReport, sink: &DiagnosticSink, end: SimTime) {
    if report.sent.len() != report.received.len() {
        sink.emit(Diagnostic::error(
            DiagnosticCode::SCOREBOARD_MISMATCH,
            format!(
                "transaction count mismatch: sent {}, received {}",
                report.sent.len(),
                report.received.len()
            ),
            Location::at_time(end.steps()),
        ));
    }
    for m in report.mismatches() {
        if let (Some(expected), Some(got)) = (m.expected, m.got) {
            sink.emit(Diagnostic::error(
                DiagnosticCode::SCOREBOARD_MISMATCH,
                format!(
                    "transaction {} mismatch: expected {expected:#04x}, got {got:#04x}",
                    m.index
                ),
                Location::at_time(end.steps()),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = SimConfig::default();
        assert_eq!(config.max_iterations, 100);
        assert!(!config.debug_checks);
        assert_eq!(config.clock_period, 10_000);
        assert!(config.trace_path.is_none());
    }

    #[test]
    fn simulate_default_stream_passes() {
        let result = simulate(&SimConfig::default(), &StreamConfig::default(), 1).unwrap();
        assert!(result.report.passed());
        assert!(result.diagnostics.is_empty());
        assert_eq!(
            result.final_time.steps(),
            (result.report.cycles + 4) * 10_000
        );
    }

    #[test]
    fn simulate_writes_trace_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.jsonl");
        let config = SimConfig {
            trace_path: Some(path.clone()),
            ..SimConfig::default()
        };
        let stream = StreamConfig {
            transactions: 10,
            ..StreamConfig::default()
        };
        simulate(&config, &stream, 9).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let first: serde_json::Value = serde_json::from_str(text.lines().next().unwrap()).unwrap();
        assert_eq!(first["kind"], "header");
        assert!(text.lines().any(|l| l.contains("\"valid_reg\"")));
        assert!(text.lines().filter(|l| l.contains("\"tick\"")).count() > 10);
    }

    #[test]
    fn simulate_bad_trace_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = SimConfig {
            trace_path: Some(dir.path().join("missing").join("run.jsonl")),
            ..SimConfig::default()
        };
        let err = simulate(&config, &StreamConfig::default(), 1).unwrap_err();
        assert!(matches!(err, SimError::TraceIo(_)));
    }

    #[test]
    fn mismatches_become_errors() {
        let sink = DiagnosticSink::new();
        let report = StreamReport {
            sent: vec![1, 2, 3],
            received: vec![1, 5],
            ..StreamReport::default()
        };
        report_mismatches(&report, &sink, SimTime::from_steps(7));
        let diags = sink.take_all();
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].message, "transaction count mismatch: sent 3, received 2");
        assert_eq!(
            diags[1].message,
            "transaction 1 mismatch: expected 0x02, got 0x05"
        );
    }
}
