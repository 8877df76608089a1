//! The evaluation scheduler.
//!
//! [`Simulator`] owns one elaborated model and its signal bank and runs the
//! three scheduling regions on every call to [`eval`](Simulator::eval):
//!
//! 1. **ico**: settle combinational logic while the ico triggers fire (the
//!    first iteration always fires, later ones only if an input moved).
//! 2. **act**: detect watched edges and OR them into the pending nba set.
//! 3. **nba**: if anything is pending, run the clocked logic once, settle
//!    combinational logic on the new register values, and go back to act.
//!
//! Each loop is capped at `max_iterations`. Exceeding the cap is fatal and
//! poisons the simulator.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use strobe_common::{ArenaId, Bits};
use strobe_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink, Location};

use crate::error::{Region, SimError};
use crate::model::{InstanceBuilder, Model};
use crate::stage::{CombinationalStage, SequentialStage};
use crate::time::{SimTime, TimeScale};
use crate::trace::TraceSink;
use crate::trigger::{TriggerEvaluator, TriggerSet, ICO_TRIGGER_COUNT};
use crate::value::{Direction, SignalBank, SignalId, SignalState};
use crate::SimConfig;

/// Work done by one call to [`Simulator::eval`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EvalStats {
    /// Iterations of the ico loop, including the final quiet one.
    pub ico_iterations: u32,
    /// Iterations of the act loop summed over every nba iteration.
    pub act_iterations: u32,
    /// Iterations of the nba loop, including the final quiet one.
    pub nba_iterations: u32,
    /// Combinational passes across all settles.
    pub comb_passes: u32,
    /// Whether the clocked logic ran.
    pub sequential_fired: bool,
    /// Registers whose value changed.
    pub registers_changed: usize,
}

struct TraceState {
    sink: Box<dyn TraceSink>,
    /// Latest value seen by `dump`, per signal.
    seen: Vec<Option<u64>>,
    /// Value the sink last received, per signal.
    flushed: Vec<Option<u64>>,
    /// Changes at `pending_time`, held until time moves on.
    pending: BTreeMap<u32, Bits>,
    pending_time: Option<SimTime>,
}

impl TraceState {
    /// Sends the held tick to the sink, dropping signals that ended the
    /// tick at the value the sink already has.
    fn flush(&mut self) -> Result<bool, SimError> {
        let Some(time) = self.pending_time.take() else {
            return Ok(false);
        };
        let mut changes = Vec::with_capacity(self.pending.len());
        for (index, value) in std::mem::take(&mut self.pending) {
            let slot = &mut self.flushed[index as usize];
            if *slot != Some(value.to_u64()) {
                *slot = Some(value.to_u64());
                changes.push((index, value));
            }
        }
        if changes.is_empty() {
            return Ok(false);
        }
        self.sink.record_tick(time, &changes)?;
        Ok(true)
    }
}

/// A model instance plus the machinery that evaluates it.
pub struct Simulator<M: Model> {
    model: M,
    bank: SignalBank,
    triggers: TriggerEvaluator,
    ico_triggered: TriggerSet,
    act_triggered: TriggerSet,
    nba_triggered: TriggerSet,
    ico_seen: TriggerSet,
    act_seen: TriggerSet,
    comb: CombinationalStage,
    max_iterations: u32,
    time: SimTime,
    timescale: TimeScale,
    poisoned: bool,
    trace: Option<TraceState>,
    diagnostics: Arc<DiagnosticSink>,
    last_stats: EvalStats,
}

impl<M: Model> Simulator<M> {
    /// Elaborates `M` and prepares it for evaluation at time zero.
    pub fn new(config: &SimConfig) -> Result<Self, SimError> {
        let mut bank = SignalBank::new();
        bank.set_debug_checks(config.debug_checks);
        let mut triggers = TriggerEvaluator::new();
        let model = M::elaborate(&mut InstanceBuilder::new(&mut bank, &mut triggers))?;
        triggers.prime(&bank);
        let edges = triggers.edge_count();

        Ok(Self {
            model,
            bank,
            triggers,
            ico_triggered: TriggerSet::new(ICO_TRIGGER_COUNT),
            act_triggered: TriggerSet::new(edges),
            nba_triggered: TriggerSet::new(edges),
            ico_seen: TriggerSet::new(ICO_TRIGGER_COUNT),
            act_seen: TriggerSet::new(edges),
            comb: CombinationalStage::new(config.max_iterations),
            max_iterations: config.max_iterations,
            time: SimTime::ZERO,
            timescale: config.timescale,
            poisoned: false,
            trace: None,
            diagnostics: Arc::new(DiagnosticSink::new()),
            last_stats: EvalStats::default(),
        })
    }

    /// Routes width diagnostics into a shared sink.
    pub fn with_diagnostics(mut self, sink: Arc<DiagnosticSink>) -> Self {
        self.diagnostics = sink;
        self
    }

    /// Returns the diagnostic sink.
    pub fn diagnostics(&self) -> &Arc<DiagnosticSink> {
        &self.diagnostics
    }

    /// Returns the model and its signal handles.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Returns the signal bank.
    pub fn bank(&self) -> &SignalBank {
        &self.bank
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> SimTime {
        self.time
    }

    /// Returns the declared time scale.
    pub fn timescale(&self) -> TimeScale {
        self.timescale
    }

    /// Returns the per-region iteration cap.
    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Returns `true` after a convergence failure.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Returns the statistics of the last successful evaluation.
    pub fn last_stats(&self) -> EvalStats {
        self.last_stats
    }

    /// Describes the ico and act triggers that fired during the last evaluation.
    pub fn last_triggers(&self) -> Vec<String> {
        let mut lines = self
            .triggers
            .describe(Region::Ico, &self.ico_seen, &self.bank);
        lines.extend(
            self.triggers
                .describe(Region::Act, &self.act_seen, &self.bank),
        );
        lines
    }

    /// Looks up a signal by hierarchical path.
    pub fn find_signal(&self, path: &str) -> Option<SignalId> {
        self.bank.find(path)
    }

    /// Returns the hierarchical path of a signal.
    pub fn signal_path(&self, id: SignalId) -> &str {
        self.bank.path(id)
    }

    /// Returns the number of signals.
    pub fn signal_count(&self) -> usize {
        self.bank.len()
    }

    /// Iterates over all signals in declaration order.
    pub fn signals(&self) -> impl Iterator<Item = (SignalId, &SignalState)> {
        self.bank.iter()
    }

    /// Returns a signal's value as an integer.
    pub fn get(&self, signal: impl Into<SignalId>) -> u64 {
        self.bank.read(signal.into())
    }

    /// Returns a signal's value as a boolean.
    pub fn get_bool(&self, signal: impl Into<SignalId>) -> bool {
        self.bank.read_bool(signal.into())
    }

    /// Returns a signal's value with its width.
    pub fn value(&self, signal: impl Into<SignalId>) -> Bits {
        self.bank.value(signal.into())
    }

    /// Returns a signal's value by hierarchical path.
    pub fn get_by_name(&self, path: &str) -> Result<u64, SimError> {
        self.find_signal(path)
            .map(|id| self.bank.read(id))
            .ok_or_else(|| SimError::UnknownSignal(path.to_string()))
    }

    /// Drives an input. The new value takes effect at the next evaluation.
    pub fn set_input(&mut self, signal: impl Into<SignalId>, value: u64) -> Result<(), SimError> {
        let id = signal.into();
        if self.bank.signal(id).direction != Direction::Input {
            return Err(SimError::NotAnInput(self.bank.path(id).to_string()));
        }
        self.bank.write(id, value);
        Ok(())
    }

    /// Drives an input by hierarchical path.
    pub fn set_by_name(&mut self, path: &str, value: u64) -> Result<(), SimError> {
        let id = self
            .find_signal(path)
            .ok_or_else(|| SimError::UnknownSignal(path.to_string()))?;
        self.set_input(id, value)
    }

    /// Advances to `time` and evaluates.
    ///
    /// Moving time forward closes the trace tick held for the old time.
    pub fn eval_at(&mut self, time: SimTime) -> Result<EvalStats, SimError> {
        if time < self.time {
            return Err(SimError::TimeWentBackwards {
                now: self.time.steps(),
                requested: time.steps(),
            });
        }
        if time > self.time {
            if let Some(trace) = self.trace.as_mut() {
                trace.flush()?;
            }
        }
        self.time = time;
        self.eval()
    }

    /// Runs all regions to quiescence at the current time.
    pub fn eval(&mut self) -> Result<EvalStats, SimError> {
        if self.poisoned {
            return Err(SimError::Poisoned);
        }
        let result = self.eval_regions();
        self.report_overflows();
        match result {
            Ok(stats) => {
                self.last_stats = stats;
                Ok(stats)
            }
            Err(e) => {
                if matches!(e, SimError::NonConvergence { .. }) {
                    self.poisoned = true;
                }
                Err(e)
            }
        }
    }

    fn eval_regions(&mut self) -> Result<EvalStats, SimError> {
        let mut stats = EvalStats::default();
        let limit = self.max_iterations;
        self.ico_seen.clear();
        self.act_seen.clear();
        self.triggers.begin_eval();

        let mut ico_count = 0;
        loop {
            if ico_count > limit {
                return Err(SimError::NonConvergence {
                    region: Region::Ico,
                    limit,
                });
            }
            ico_count += 1;
            if !self.phase_ico(&mut stats)? {
                break;
            }
        }
        stats.ico_iterations = ico_count;

        let mut nba_count = 0;
        loop {
            if nba_count > limit {
                return Err(SimError::NonConvergence {
                    region: Region::Nba,
                    limit,
                });
            }
            nba_count += 1;

            let mut act_count = 0;
            loop {
                if act_count > limit {
                    return Err(SimError::NonConvergence {
                        region: Region::Act,
                        limit,
                    });
                }
                act_count += 1;
                if !self.phase_act() {
                    break;
                }
            }
            stats.act_iterations += act_count;

            if !self.phase_nba(&mut stats)? {
                break;
            }
        }
        stats.nba_iterations = nba_count;
        Ok(stats)
    }

    fn phase_ico(&mut self, stats: &mut EvalStats) -> Result<bool, SimError> {
        self.triggers
            .eval_ico(&self.bank, &mut self.ico_triggered);
        self.ico_seen.or_into(&self.ico_triggered);
        let execute = self.ico_triggered.any_set();
        if execute {
            stats.comb_passes += self.comb.settle(&self.model, &mut self.bank, Region::Ico)?;
        }
        Ok(execute)
    }

    fn phase_act(&mut self) -> bool {
        self.triggers
            .eval_act(&self.bank, &mut self.act_triggered);
        self.nba_triggered.or_into(&self.act_triggered);
        self.act_seen.or_into(&self.act_triggered);
        self.act_triggered.any_set()
    }

    fn phase_nba(&mut self, stats: &mut EvalStats) -> Result<bool, SimError> {
        let execute = self.nba_triggered.any_set();
        if execute {
            stats.sequential_fired = true;
            stats.registers_changed +=
                SequentialStage.run(&self.model, &mut self.bank, &self.nba_triggered);
            stats.comb_passes += self.comb.settle(&self.model, &mut self.bank, Region::Nba)?;
            self.nba_triggered.clear();
        }
        Ok(execute)
    }

    fn report_overflows(&mut self) {
        for overflow in self.bank.take_overflows() {
            let path = self.bank.path(overflow.signal);
            let stored = Bits::from_u64(overflow.attempted, overflow.width);
            self.diagnostics.emit(
                Diagnostic::warning(
                    DiagnosticCode::WIDTH_OVERFLOW,
                    format!(
                        "value {:#x} overflows the {}-bit width of '{path}'",
                        overflow.attempted, overflow.width
                    ),
                    Location::at(self.time.steps(), path),
                )
                .with_note(format!("stored as {stored}")),
            );
        }
    }

    /// Attaches a trace sink and publishes every signal to it, grouped by scope.
    pub fn attach_trace(&mut self, mut sink: Box<dyn TraceSink>) -> Result<(), SimError> {
        let mut open: Vec<&str> = Vec::new();
        for (id, state) in self.bank.iter() {
            let path = self.bank.path(id);
            let (scope, name) = path.rsplit_once('.').unwrap_or(("", path));
            let wanted: Vec<&str> = scope.split('.').filter(|s| !s.is_empty()).collect();
            let common = open
                .iter()
                .zip(&wanted)
                .take_while(|(a, b)| a == b)
                .count();
            while open.len() > common {
                open.pop();
                sink.end_scope()?;
            }
            for &part in &wanted[common..] {
                sink.begin_scope(part)?;
                open.push(part);
            }
            sink.register_signal(id.as_raw(), name, state.width(), state.direction)?;
        }
        for _ in open.drain(..) {
            sink.end_scope()?;
        }
        self.trace = Some(TraceState {
            sink,
            seen: vec![None; self.bank.len()],
            flushed: vec![None; self.bank.len()],
            pending: BTreeMap::new(),
            pending_time: None,
        });
        Ok(())
    }

    /// Collects every signal that changed since the previous dump into the
    /// tick for the current time.
    ///
    /// Repeated dumps at one time merge into a single tick, which reaches
    /// the sink once time advances or on [`finish`](Self::finish). Returns
    /// `false` if nothing changed or no sink is attached.
    pub fn dump(&mut self) -> Result<bool, SimError> {
        let Some(trace) = self.trace.as_mut() else {
            return Ok(false);
        };
        if trace.pending_time.is_some_and(|t| t != self.time) {
            trace.flush()?;
        }
        let mut changed = false;
        for (id, state) in self.bank.iter() {
            let slot = &mut trace.seen[id.index()];
            let value = state.value.to_u64();
            if *slot != Some(value) {
                *slot = Some(value);
                trace.pending.insert(id.as_raw(), state.value);
                changed = true;
            }
        }
        if changed {
            trace.pending_time = Some(self.time);
        }
        Ok(changed)
    }

    /// Sends the held tick, then finalizes and detaches the trace sink.
    pub fn finish(&mut self) -> Result<(), SimError> {
        if let Some(mut trace) = self.trace.take() {
            trace.flush()?;
            trace.sink.finalize()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CombContext, Reg, SeqContext, Wire};
    use crate::trace::ChangeBuffer;
    use crate::trigger::{Edge, TriggerId};
    use crate::valid_ready::ValidReadyStage;
    use strobe_diagnostics::Severity;

    /// A register that flips every time its own copy changes once started.
    struct Oscillator {
        q: Reg,
        w: Wire,
        start: TriggerId,
        feedback: TriggerId,
    }

    impl Model for Oscillator {
        fn elaborate(b: &mut InstanceBuilder<'_>) -> Result<Self, SimError> {
            let go = b.input("go", 1)?;
            let q = b.reg("q", 1)?;
            let w = b.wire("w", 1)?;
            Ok(Self {
                q,
                w,
                start: b.on_edge(go, Edge::Posedge),
                feedback: b.on_edge(w, Edge::AnyChange),
            })
        }

        fn eval_comb(&self, ctx: &mut CombContext<'_>) {
            let q = ctx.read(self.q);
            ctx.write(self.w, q);
        }

        fn eval_seq(&self, ctx: &mut SeqContext<'_>) {
            if ctx.fired(self.start) || ctx.fired(self.feedback) {
                let q = ctx.bit(self.q);
                ctx.schedule_bool(self.q, !q);
            }
        }
    }

    /// A combinational loop with no stable value.
    struct Ring {
        q: Wire,
    }

    impl Model for Ring {
        fn elaborate(b: &mut InstanceBuilder<'_>) -> Result<Self, SimError> {
            Ok(Self { q: b.wire("q", 1)? })
        }

        fn eval_comb(&self, ctx: &mut CombContext<'_>) {
            let q = ctx.bit(self.q);
            ctx.set(self.q, !q);
        }

        fn eval_seq(&self, _ctx: &mut SeqContext<'_>) {}
    }

    fn stage() -> Simulator<ValidReadyStage> {
        Simulator::new(&SimConfig::default()).unwrap()
    }

    #[test]
    fn first_eval_settles_once() {
        let mut sim = stage();
        let stats = sim.eval().unwrap();
        assert_eq!(stats.ico_iterations, 2);
        assert_eq!(stats.nba_iterations, 1);
        assert!(!stats.sequential_fired);
        assert!(sim.last_triggers()[0].contains("first iteration"));
    }

    #[test]
    fn clock_edge_fires_nba_once() {
        let mut sim = stage();
        let clk = sim.model().ports().clk;
        sim.eval().unwrap();
        sim.set_input(clk, 1).unwrap();
        let stats = sim.eval().unwrap();
        assert!(stats.sequential_fired);
        assert_eq!(stats.nba_iterations, 2);
        assert!(sim
            .last_triggers()
            .iter()
            .any(|l| l.ends_with("@(posedge TOP.valid_ready.clk)")));
    }

    #[test]
    fn oscillation_is_fatal_and_poisons() {
        let mut sim: Simulator<Oscillator> = Simulator::new(&SimConfig::default()).unwrap();
        sim.set_by_name("TOP.go", 1).unwrap();
        let err = sim.eval().unwrap_err();
        assert_eq!(err.to_string(), "NBA region did not converge after 100 tries");
        assert!(sim.is_poisoned());
        assert!(matches!(sim.eval(), Err(SimError::Poisoned)));
    }

    #[test]
    fn iteration_cap_is_configurable() {
        let config = SimConfig {
            max_iterations: 3,
            ..SimConfig::default()
        };
        let mut sim: Simulator<Oscillator> = Simulator::new(&config).unwrap();
        sim.set_by_name("TOP.go", 1).unwrap();
        let err = sim.eval().unwrap_err();
        assert!(matches!(
            err,
            SimError::NonConvergence {
                region: Region::Nba,
                limit: 3
            }
        ));
    }

    #[test]
    fn combinational_loop_fails_in_ico() {
        let mut sim: Simulator<Ring> = Simulator::new(&SimConfig::default()).unwrap();
        let err = sim.eval().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Input combinational region did not converge after 100 tries"
        );
        assert!(sim.is_poisoned());
    }

    #[test]
    fn only_inputs_are_drivable() {
        let mut sim = stage();
        let err = sim.set_by_name("TOP.ready_in", 1).unwrap_err();
        assert!(matches!(err, SimError::NotAnInput(ref p) if p == "TOP.ready_in"));
        let err = sim.set_by_name("TOP.bogus", 1).unwrap_err();
        assert!(matches!(err, SimError::UnknownSignal(_)));
        assert!(sim.get_by_name("TOP.bogus").is_err());
    }

    #[test]
    fn time_must_not_go_backwards() {
        let mut sim = stage();
        sim.eval_at(SimTime::from_steps(10)).unwrap();
        sim.eval_at(SimTime::from_steps(10)).unwrap();
        let err = sim.eval_at(SimTime::from_steps(5)).unwrap_err();
        assert!(matches!(
            err,
            SimError::TimeWentBackwards {
                now: 10,
                requested: 5
            }
        ));
    }

    #[test]
    fn width_overflow_reported_with_debug_checks() {
        let config = SimConfig {
            debug_checks: true,
            ..SimConfig::default()
        };
        let mut sim: Simulator<ValidReadyStage> = Simulator::new(&config).unwrap();
        let data_in = sim.model().ports().data_in;
        sim.set_input(data_in, 0x1a5).unwrap();
        sim.eval_at(SimTime::from_steps(3)).unwrap();
        assert_eq!(sim.get(data_in), 0xa5);

        let diags = sim.diagnostics().take_all();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Severity::Warning);
        assert_eq!(diags[0].code, DiagnosticCode::WIDTH_OVERFLOW);
        assert_eq!(diags[0].location, Location::at(3, "TOP.data_in"));
        assert_eq!(diags[0].notes, vec!["stored as 8'ha5"]);
    }

    #[test]
    fn width_overflow_silent_by_default() {
        let mut sim = stage();
        sim.set_by_name("TOP.clk", 2).unwrap();
        sim.eval().unwrap();
        assert_eq!(sim.diagnostics().warning_count(), 0);
        assert_eq!(sim.get_by_name("TOP.clk").unwrap(), 0);
    }

    #[test]
    fn attach_trace_groups_by_scope() {
        let mut sim = stage();
        let buf = ChangeBuffer::new();
        sim.attach_trace(Box::new(buf.clone())).unwrap();
        let signals = buf.signals();
        assert_eq!(signals.len(), sim.signal_count());
        assert_eq!(signals[0].scope, "TOP");
        assert_eq!(signals[0].name, "clk");
        let inner: Vec<_> = signals
            .iter()
            .filter(|s| s.scope == "TOP.valid_ready")
            .map(|s| s.name.as_str())
            .collect();
        assert!(inner.contains(&"valid_reg"));
        assert!(inner.contains(&"data_reg"));
    }

    #[test]
    fn dump_skips_quiet_ticks() {
        let mut sim = stage();
        let buf = ChangeBuffer::new();
        sim.attach_trace(Box::new(buf.clone())).unwrap();

        sim.eval().unwrap();
        assert!(sim.dump().unwrap());
        assert_eq!(buf.tick_count(), 0);

        sim.eval_at(SimTime::from_steps(5)).unwrap();
        assert_eq!(buf.tick_count(), 1);
        assert_eq!(buf.ticks()[0].changes.len(), sim.signal_count());
        assert!(!sim.dump().unwrap());

        let clk = sim.model().ports().clk;
        sim.set_input(clk, 1).unwrap();
        sim.eval_at(SimTime::from_steps(10)).unwrap();
        assert!(sim.dump().unwrap());

        sim.finish().unwrap();
        let ticks = buf.ticks();
        assert_eq!(ticks.len(), 2);
        assert_eq!(ticks[1].time, SimTime::from_steps(10));
        assert!(ticks[1].changes.iter().any(|&(i, v)| i == clk.id().as_raw() && v.is_true()));
        assert!(buf.is_finalized());
        assert!(!sim.dump().unwrap());
    }

    #[test]
    fn dumps_at_one_time_merge_into_one_tick() {
        let mut sim = stage();
        let buf = ChangeBuffer::new();
        sim.attach_trace(Box::new(buf.clone())).unwrap();
        let p = *sim.model().ports();

        sim.eval().unwrap();
        sim.dump().unwrap();
        sim.set_input(p.valid_in, 1).unwrap();
        sim.set_input(p.data_in, 0x3c).unwrap();
        sim.eval().unwrap();
        assert!(sim.dump().unwrap());

        sim.set_input(p.ready_out, 1).unwrap();
        sim.eval_at(SimTime::from_steps(10)).unwrap();
        sim.dump().unwrap();
        sim.set_input(p.ready_out, 0).unwrap();
        sim.eval().unwrap();
        assert!(sim.dump().unwrap());
        sim.finish().unwrap();

        // ready_out went up and back down at 10, so that time has no tick.
        let ticks = buf.ticks();
        assert_eq!(ticks.len(), 1);
        assert_eq!(ticks[0].time, SimTime::ZERO);
        let data_in = p.data_in.id().as_raw();
        let entry = ticks[0].changes.iter().find(|&&(i, _)| i == data_in).unwrap();
        assert_eq!(entry.1.to_u64(), 0x3c);
        assert_eq!(buf.change_count(data_in), 1);
    }
}
