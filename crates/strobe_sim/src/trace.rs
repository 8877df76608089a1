//! Change tracing for simulation output.
//!
//! The [`TraceSink`] trait receives the signal table once, grouped by scope,
//! and then one batch of changed values per recorded tick. [`ChangeBuffer`]
//! keeps everything in memory; [`JsonTraceWriter`] streams one JSON object
//! per line.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use serde::Serialize;
use strobe_common::Bits;

use crate::error::SimError;
use crate::time::{SimTime, TimeScale};
use crate::value::Direction;

/// Receiver for the signal table and per-tick value changes.
pub trait TraceSink {
    /// Opens a scope nested in the current one.
    fn begin_scope(&mut self, name: &str) -> Result<(), SimError>;

    /// Publishes one signal of the current scope.
    fn register_signal(
        &mut self,
        index: u32,
        name: &str,
        width: u32,
        direction: Direction,
    ) -> Result<(), SimError>;

    /// Closes the current scope.
    fn end_scope(&mut self) -> Result<(), SimError>;

    /// Records the signals that changed since the previous recorded tick.
    fn record_tick(&mut self, time: SimTime, changes: &[(u32, Bits)]) -> Result<(), SimError>;

    /// Flushes any buffered output.
    fn finalize(&mut self) -> Result<(), SimError>;
}

/// A signal as published to a trace sink.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TracedSignal {
    /// Signal index used in tick records.
    pub index: u32,
    /// Dotted scope path, e.g. `TOP.valid_ready`.
    pub scope: String,
    /// Name within the scope.
    pub name: String,
    /// Declared width.
    pub width: u32,
    /// Port direction.
    pub direction: Direction,
}

/// One recorded tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TickRecord {
    /// When the tick was recorded.
    pub time: SimTime,
    /// Changed signals and their new values, in index order.
    pub changes: Vec<(u32, Bits)>,
}

#[derive(Debug, Default)]
struct ChangeLog {
    scopes: Vec<String>,
    signals: Vec<TracedSignal>,
    ticks: Vec<TickRecord>,
    finalized: bool,
}

/// In-memory trace sink.
///
/// Clones share the same log, so a caller can keep one handle and give the
/// other to the simulator.
#[derive(Clone, Debug, Default)]
pub struct ChangeBuffer {
    log: Rc<RefCell<ChangeLog>>,
}

impl ChangeBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the published signal table.
    pub fn signals(&self) -> Vec<TracedSignal> {
        self.log.borrow().signals.clone()
    }

    /// Returns every recorded tick.
    pub fn ticks(&self) -> Vec<TickRecord> {
        self.log.borrow().ticks.clone()
    }

    /// Returns the number of recorded ticks.
    pub fn tick_count(&self) -> usize {
        self.log.borrow().ticks.len()
    }

    /// Returns `true` once the simulator has finalized the trace.
    pub fn is_finalized(&self) -> bool {
        self.log.borrow().finalized
    }

    /// Returns the most recently recorded value of a signal.
    pub fn last_value(&self, index: u32) -> Option<Bits> {
        self.log.borrow().ticks.iter().rev().find_map(|tick| {
            tick.changes
                .iter()
                .find(|(i, _)| *i == index)
                .map(|&(_, v)| v)
        })
    }

    /// Returns how many ticks recorded a change of the given signal.
    pub fn change_count(&self, index: u32) -> usize {
        self.log
            .borrow()
            .ticks
            .iter()
            .filter(|tick| tick.changes.iter().any(|(i, _)| *i == index))
            .count()
    }
}

impl TraceSink for ChangeBuffer {
    fn begin_scope(&mut self, name: &str) -> Result<(), SimError> {
        self.log.borrow_mut().scopes.push(name.to_string());
        Ok(())
    }

    fn register_signal(
        &mut self,
        index: u32,
        name: &str,
        width: u32,
        direction: Direction,
    ) -> Result<(), SimError> {
        let mut log = self.log.borrow_mut();
        let scope = log.scopes.join(".");
        log.signals.push(TracedSignal {
            index,
            scope,
            name: name.to_string(),
            width,
            direction,
        });
        Ok(())
    }

    fn end_scope(&mut self) -> Result<(), SimError> {
        self.log.borrow_mut().scopes.pop();
        Ok(())
    }

    fn record_tick(&mut self, time: SimTime, changes: &[(u32, Bits)]) -> Result<(), SimError> {
        self.log.borrow_mut().ticks.push(TickRecord {
            time,
            changes: changes.to_vec(),
        });
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), SimError> {
        self.log.borrow_mut().finalized = true;
        Ok(())
    }
}

/// One line of a JSON trace.
#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum TraceLine<'a> {
    Header {
        version: &'a str,
        timescale: String,
    },
    Scope {
        name: &'a str,
    },
    Upscope,
    Var {
        index: u32,
        scope: String,
        name: &'a str,
        width: u32,
        direction: Direction,
    },
    Tick {
        time: u64,
        changes: Vec<(u32, u64)>,
    },
}

/// Streams a trace as JSON lines.
///
/// The first line is a header carrying the time scale; `scope`/`upscope`
/// and `var` lines describe the signal table; each `tick` line lists
/// `[index, value]` pairs.
pub struct JsonTraceWriter<W: Write> {
    writer: W,
    timescale: TimeScale,
    scopes: Vec<String>,
    header_written: bool,
}

impl<W: Write> JsonTraceWriter<W> {
    /// Creates a writer. Nothing is written until the first event.
    pub fn new(writer: W, timescale: TimeScale) -> Self {
        Self {
            writer,
            timescale,
            scopes: Vec::new(),
            header_written: false,
        }
    }

    /// Consumes the writer and returns the underlying output.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn emit(&mut self, line: &TraceLine<'_>) -> Result<(), SimError> {
        if !self.header_written {
            self.header_written = true;
            let header = TraceLine::Header {
                version: env!("CARGO_PKG_VERSION"),
                timescale: self.timescale.to_string(),
            };
            serde_json::to_writer(&mut self.writer, &header)?;
            writeln!(self.writer)?;
        }
        serde_json::to_writer(&mut self.writer, line)?;
        writeln!(self.writer)?;
        Ok(())
    }
}

impl<W: Write> TraceSink for JsonTraceWriter<W> {
    fn begin_scope(&mut self, name: &str) -> Result<(), SimError> {
        self.emit(&TraceLine::Scope { name })?;
        self.scopes.push(name.to_string());
        Ok(())
    }

    fn register_signal(
        &mut self,
        index: u32,
        name: &str,
        width: u32,
        direction: Direction,
    ) -> Result<(), SimError> {
        let scope = self.scopes.join(".");
        self.emit(&TraceLine::Var {
            index,
            scope,
            name,
            width,
            direction,
        })
    }

    fn end_scope(&mut self) -> Result<(), SimError> {
        self.scopes.pop();
        self.emit(&TraceLine::Upscope)
    }

    fn record_tick(&mut self, time: SimTime, changes: &[(u32, Bits)]) -> Result<(), SimError> {
        self.emit(&TraceLine::Tick {
            time: time.steps(),
            changes: changes.iter().map(|&(i, v)| (i, v.to_u64())).collect(),
        })
    }

    fn finalize(&mut self) -> Result<(), SimError> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_buffer_tracks_scopes() {
        let buf = ChangeBuffer::new();
        let mut sink = buf.clone();
        sink.begin_scope("TOP").unwrap();
        sink.register_signal(0, "clk", 1, Direction::Input).unwrap();
        sink.begin_scope("valid_ready").unwrap();
        sink.register_signal(1, "valid_reg", 1, Direction::Internal)
            .unwrap();
        sink.end_scope().unwrap();
        sink.end_scope().unwrap();

        let signals = buf.signals();
        assert_eq!(signals.len(), 2);
        assert_eq!(signals[0].scope, "TOP");
        assert_eq!(signals[1].scope, "TOP.valid_ready");
        assert_eq!(signals[1].name, "valid_reg");
    }

    #[test]
    fn change_buffer_last_value() {
        let mut buf = ChangeBuffer::new();
        buf.record_tick(SimTime::ZERO, &[(0, Bits::from_bool(false)), (1, Bits::from_u64(3, 8))])
            .unwrap();
        buf.record_tick(SimTime::from_steps(5), &[(0, Bits::from_bool(true))])
            .unwrap();
        assert_eq!(buf.tick_count(), 2);
        assert_eq!(buf.last_value(0), Some(Bits::from_bool(true)));
        assert_eq!(buf.last_value(1), Some(Bits::from_u64(3, 8)));
        assert_eq!(buf.last_value(9), None);
        assert_eq!(buf.change_count(0), 2);
        assert!(!buf.is_finalized());
        buf.finalize().unwrap();
        assert!(buf.is_finalized());
    }

    #[test]
    fn json_writer_emits_lines() {
        let mut w = JsonTraceWriter::new(Vec::new(), TimeScale::default());
        w.begin_scope("TOP").unwrap();
        w.register_signal(0, "data_in", 8, Direction::Input).unwrap();
        w.end_scope().unwrap();
        w.record_tick(SimTime::from_steps(5000), &[(0, Bits::from_u64(0x5a, 8))])
            .unwrap();
        w.finalize().unwrap();

        let out = String::from_utf8(w.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0]["kind"], "header");
        assert_eq!(lines[0]["timescale"], "1ns/1ps");
        assert_eq!(lines[1]["kind"], "scope");
        assert_eq!(lines[2]["kind"], "var");
        assert_eq!(lines[2]["scope"], "TOP");
        assert_eq!(lines[2]["direction"], "input");
        assert_eq!(lines[3]["kind"], "upscope");
        assert_eq!(lines[4]["kind"], "tick");
        assert_eq!(lines[4]["time"], 5000);
        assert_eq!(lines[4]["changes"][0][1], 0x5a);
    }

    #[test]
    fn json_writer_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.jsonl");
        let file = std::fs::File::create(&path).unwrap();
        let mut w = JsonTraceWriter::new(std::io::BufWriter::new(file), TimeScale::default());
        w.record_tick(SimTime::ZERO, &[(0, Bits::from_bool(true))])
            .unwrap();
        w.finalize().unwrap();
        drop(w);
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
    }
}
