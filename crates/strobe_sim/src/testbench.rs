//! Clocked testbench harness.
//!
//! [`Testbench`] drives one clock input of any model: each half period it
//! advances time, flips the clock, evaluates and dumps the trace.
//! [`ValidReadyBench`] adds the stimulus vocabulary of the valid/ready stage,
//! the directed scenarios, and a seeded random stream with a scoreboard.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::error::SimError;
use crate::model::Model;
use crate::scheduler::{EvalStats, Simulator};
use crate::valid_ready::{ValidReadyPorts, ValidReadyStage, DATA_WIDTH};
use crate::value::SignalId;
use crate::SimConfig;

/// Drives the clock of a simulator.
pub struct Testbench<M: Model> {
    sim: Simulator<M>,
    clk: SignalId,
    low_phase: u64,
    high_phase: u64,
    cycles: u64,
}

impl<M: Model> Testbench<M> {
    /// Wraps a simulator and settles it at its current time.
    ///
    /// `period` is the clock period in precision steps. An odd period gives
    /// the extra step to the high phase.
    pub fn new(sim: Simulator<M>, clk: impl Into<SignalId>, period: u64) -> Result<Self, SimError> {
        if period < 2 {
            return Err(SimError::InvalidClockPeriod(period));
        }
        let mut tb = Self {
            sim,
            clk: clk.into(),
            low_phase: period / 2,
            high_phase: period - period / 2,
            cycles: 0,
        };
        tb.settle()?;
        Ok(tb)
    }

    /// Returns the simulator.
    pub fn sim(&self) -> &Simulator<M> {
        &self.sim
    }

    /// Returns the simulator mutably, e.g. to drive inputs.
    pub fn sim_mut(&mut self) -> &mut Simulator<M> {
        &mut self.sim
    }

    /// Consumes the testbench and returns the simulator.
    pub fn into_simulator(self) -> Simulator<M> {
        self.sim
    }

    /// Number of rising edges driven so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Re-evaluates at the current time after a stimulus change.
    pub fn settle(&mut self) -> Result<EvalStats, SimError> {
        let stats = self.sim.eval()?;
        self.sim.dump()?;
        Ok(stats)
    }

    fn half_cycle(&mut self, level: u64, span: u64) -> Result<EvalStats, SimError> {
        let at = self.sim.time().advance(span);
        self.sim.set_input(self.clk, level)?;
        let stats = self.sim.eval_at(at)?;
        self.sim.dump()?;
        Ok(stats)
    }

    /// Advances the low phase and drives the clock low.
    pub fn drive_low(&mut self) -> Result<EvalStats, SimError> {
        self.half_cycle(0, self.low_phase)
    }

    /// Advances the high phase and drives the clock high.
    pub fn drive_high(&mut self) -> Result<EvalStats, SimError> {
        let stats = self.half_cycle(1, self.high_phase)?;
        self.cycles += 1;
        Ok(stats)
    }

    /// Drives one full clock cycle ending on a rising edge.
    pub fn rising_edge(&mut self) -> Result<EvalStats, SimError> {
        self.drive_low()?;
        self.drive_high()
    }
}

/// Handshakes observed on the settled state just before a rising edge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EdgeSample {
    /// Word taken from upstream (`valid_in && ready_in`).
    pub accepted: Option<u64>,
    /// Word handed downstream (`valid_out && ready_out`).
    pub delivered: Option<u64>,
}

/// Testbench for [`ValidReadyStage`].
pub struct ValidReadyBench {
    tb: Testbench<ValidReadyStage>,
    ports: ValidReadyPorts,
}

impl ValidReadyBench {
    /// Elaborates a fresh stage clocked at `config.clock_period`.
    pub fn new(config: &SimConfig) -> Result<Self, SimError> {
        Self::from_simulator(Simulator::new(config)?, config.clock_period)
    }

    /// Wraps an existing simulator, e.g. one with a trace attached.
    pub fn from_simulator(
        sim: Simulator<ValidReadyStage>,
        period: u64,
    ) -> Result<Self, SimError> {
        let ports = *sim.model().ports();
        Ok(Self {
            tb: Testbench::new(sim, ports.clk, period)?,
            ports,
        })
    }

    /// Returns the simulator.
    pub fn sim(&self) -> &Simulator<ValidReadyStage> {
        self.tb.sim()
    }

    /// Returns the simulator mutably.
    pub fn sim_mut(&mut self) -> &mut Simulator<ValidReadyStage> {
        self.tb.sim_mut()
    }

    /// Consumes the bench and returns the simulator.
    pub fn into_simulator(self) -> Simulator<ValidReadyStage> {
        self.tb.into_simulator()
    }

    /// Number of rising edges driven so far.
    pub fn cycles(&self) -> u64 {
        self.tb.cycles()
    }

    /// Holds reset for two rising edges, then releases it for two more.
    pub fn reset(&mut self) -> Result<(), SimError> {
        self.set(self.ports.rst, 1)?;
        self.clock()?;
        self.clock()?;
        self.set(self.ports.rst, 0)?;
        self.clock()?;
        self.clock()?;
        Ok(())
    }

    /// Drives the reset input without clocking.
    pub fn set_reset(&mut self, active: bool) -> Result<(), SimError> {
        self.set(self.ports.rst, active as u64)
    }

    /// Offers a word upstream.
    pub fn send(&mut self, data: u64) -> Result<(), SimError> {
        self.set(self.ports.valid_in, 1)?;
        self.set(self.ports.data_in, data)
    }

    /// Withdraws the upstream offer.
    pub fn idle(&mut self) -> Result<(), SimError> {
        self.set(self.ports.valid_in, 0)
    }

    /// Makes the downstream consumer not ready.
    pub fn stall(&mut self) -> Result<(), SimError> {
        self.set(self.ports.ready_out, 0)
    }

    /// Makes the downstream consumer ready.
    pub fn release(&mut self) -> Result<(), SimError> {
        self.set(self.ports.ready_out, 1)
    }

    fn set(&mut self, port: impl Into<SignalId>, value: u64) -> Result<(), SimError> {
        self.tb.sim_mut().set_input(port, value)
    }

    /// Re-evaluates at the current time after a stimulus change.
    pub fn settle(&mut self) -> Result<EvalStats, SimError> {
        self.tb.settle()
    }

    /// Drives one clock cycle and reports the handshakes taken on its rising edge.
    pub fn clock(&mut self) -> Result<EdgeSample, SimError> {
        self.tb.drive_low()?;
        let p = self.ports;
        let sim = self.tb.sim();
        let sample = EdgeSample {
            accepted: (sim.get_bool(p.valid_in) && sim.get_bool(p.ready_in))
                .then(|| sim.get(p.data_in)),
            delivered: (sim.get_bool(p.valid_out) && sim.get_bool(p.ready_out))
                .then(|| sim.get(p.data_out)),
        };
        self.tb.drive_high()?;
        Ok(sample)
    }

    /// Current `ready_in` output.
    pub fn ready_in(&self) -> bool {
        self.sim().get_bool(self.ports.ready_in)
    }

    /// Current `valid_out` output.
    pub fn valid_out(&self) -> bool {
        self.sim().get_bool(self.ports.valid_out)
    }

    /// Current `data_out` output.
    pub fn data_out(&self) -> u64 {
        self.sim().get(self.ports.data_out)
    }

    /// Current occupancy register.
    pub fn valid_reg(&self) -> bool {
        let reg = self.sim().model().valid_reg();
        self.sim().get_bool(reg)
    }

    /// Current data register.
    pub fn data_reg(&self) -> u64 {
        let reg = self.sim().model().data_reg();
        self.sim().get(reg)
    }

    /// Runs a seeded producer/consumer stream and scoreboards it.
    ///
    /// Each round the producer offers a random word with
    /// `send_probability`. If enough words are outstanding the consumer then
    /// takes an extra cycle, ready with `accept_probability`. Afterwards the
    /// stage is drained for `drain_cycles` cycles.
    pub fn stream_random(
        &mut self,
        config: &StreamConfig,
        seed: u64,
    ) -> Result<StreamReport, SimError> {
        let mut rng = StdRng::seed_from_u64(seed);
        let send_p = config.send_probability.clamp(0.0, 1.0);
        let accept_p = config.accept_probability.clamp(0.0, 1.0);
        let mut report = StreamReport {
            seed,
            ..StreamReport::default()
        };

        self.reset()?;
        self.stall()?;
        let start = self.cycles();

        for _ in 0..config.transactions {
            if rng.gen_bool(send_p) {
                let data = rng.gen_range(0..1u64 << DATA_WIDTH);
                self.send(data)?;
            } else {
                self.idle()?;
            }
            report.observe(self.clock()?);

            let slack = rng.gen_range(0..=3);
            if report.sent.len() > report.received.len() + slack {
                if rng.gen_bool(accept_p) {
                    self.release()?;
                } else {
                    self.stall()?;
                }
                report.observe(self.clock()?);
            }
        }

        self.idle()?;
        self.release()?;
        for _ in 0..config.drain_cycles {
            report.observe(self.clock()?);
        }
        report.cycles = self.cycles() - start;
        Ok(report)
    }
}

/// Parameters of a random stream run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StreamConfig {
    /// Producer/consumer rounds.
    pub transactions: u32,
    /// Chance the producer offers a word in a round.
    pub send_probability: f64,
    /// Chance the consumer is ready when it takes its turn.
    pub accept_probability: f64,
    /// Cycles spent draining after the last round.
    pub drain_cycles: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            transactions: 200,
            send_probability: 0.85,
            accept_probability: 0.65,
            drain_cycles: 20,
        }
    }
}

/// Scoreboard of a random stream run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StreamReport {
    /// Seed the run was driven with.
    pub seed: u64,
    /// Clock cycles after reset.
    pub cycles: u64,
    /// Words accepted from the producer, in order.
    pub sent: Vec<u64>,
    /// Words handed to the consumer, in order.
    pub received: Vec<u64>,
}

/// One position where the sent and received sequences disagree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    /// Position in the sequence.
    pub index: usize,
    /// Word sent at this position, if any.
    pub expected: Option<u64>,
    /// Word received at this position, if any.
    pub got: Option<u64>,
}

impl StreamReport {
    fn observe(&mut self, sample: EdgeSample) {
        self.sent.extend(sample.accepted);
        self.received.extend(sample.delivered);
    }

    /// Returns `true` if every sent word was received once, in order.
    pub fn passed(&self) -> bool {
        self.sent == self.received
    }

    /// Lists every position where the sequences differ.
    pub fn mismatches(&self) -> Vec<Mismatch> {
        let len = self.sent.len().max(self.received.len());
        (0..len)
            .filter_map(|index| {
                let expected = self.sent.get(index).copied();
                let got = self.received.get(index).copied();
                (expected != got).then_some(Mismatch {
                    index,
                    expected,
                    got,
                })
            })
            .collect()
    }
}

/// Result of one directed scenario.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScenarioOutcome {
    /// Scenario name.
    pub name: &'static str,
    /// Failed expectations, empty on success.
    pub failures: Vec<String>,
}

impl ScenarioOutcome {
    /// Returns `true` if every expectation held.
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Collects failed expectations with the time they were observed at.
#[derive(Debug, Default)]
pub(crate) struct Checks {
    failures: Vec<String>,
}

impl Checks {
    fn expect(&mut self, bench: &ValidReadyBench, what: &str, got: u64, want: u64) {
        if got != want {
            let sim = bench.sim();
            let at = sim.timescale().format(sim.time());
            self.failures
                .push(format!("at {at}: {what} = {got:#x}, expected {want:#x}"));
        }
    }

    fn expect_sample(&mut self, what: &str, got: Option<u64>, want: Option<u64>) {
        if got != want {
            self.failures
                .push(format!("{what}: got {got:x?}, expected {want:x?}"));
        }
    }
}

type ScenarioFn = fn(&mut ValidReadyBench, &mut Checks) -> Result<(), SimError>;

/// A named directed test of the valid/ready stage.
pub struct Scenario {
    /// Short name used on the command line.
    pub name: &'static str,
    /// One-line description.
    pub description: &'static str,
    body: ScenarioFn,
}

impl Scenario {
    /// Runs the scenario on a fresh stage.
    pub fn run(&self, config: &SimConfig) -> Result<ScenarioOutcome, SimError> {
        let mut bench = ValidReadyBench::new(config)?;
        let mut checks = Checks::default();
        (self.body)(&mut bench, &mut checks)?;
        Ok(ScenarioOutcome {
            name: self.name,
            failures: checks.failures,
        })
    }
}

/// Every directed scenario, in run order.
pub const SCENARIOS: &[Scenario] = &[
    Scenario {
        name: "reset",
        description: "reset empties the stage and raises ready_in",
        body: scenario_reset,
    },
    Scenario {
        name: "fill",
        description: "an empty stage accepts a word while downstream is stalled",
        body: scenario_fill,
    },
    Scenario {
        name: "drain",
        description: "a full stage empties when downstream takes its word",
        body: scenario_drain,
    },
    Scenario {
        name: "back_to_back",
        description: "one word per cycle when both sides are always ready",
        body: scenario_back_to_back,
    },
    Scenario {
        name: "basic_flow",
        description: "one word in, one word out",
        body: basic_flow,
    },
    Scenario {
        name: "backpressure",
        description: "a stalled stage ignores new data until downstream is ready",
        body: backpressure,
    },
    Scenario {
        name: "long_stall",
        description: "a word is held unchanged through a 50-cycle stall",
        body: long_stall,
    },
];

/// Runs every directed scenario.
pub fn run_scenarios(config: &SimConfig) -> Result<Vec<ScenarioOutcome>, SimError> {
    SCENARIOS.iter().map(|s| s.run(config)).collect()
}

fn check_state(b: &ValidReadyBench, c: &mut Checks, valid: bool, ready_in: bool) {
    c.expect(b, "valid_reg", b.valid_reg() as u64, valid as u64);
    c.expect(b, "valid_out", b.valid_out() as u64, valid as u64);
    c.expect(b, "ready_in", b.ready_in() as u64, ready_in as u64);
}

fn scenario_reset(b: &mut ValidReadyBench, c: &mut Checks) -> Result<(), SimError> {
    b.set_reset(true)?;
    b.send(0x33)?;
    b.release()?;
    b.clock()?;
    check_state(b, c, false, true);
    Ok(())
}

fn scenario_fill(b: &mut ValidReadyBench, c: &mut Checks) -> Result<(), SimError> {
    scenario_reset(b, c)?;
    b.set_reset(false)?;
    b.send(0x5a)?;
    b.stall()?;
    b.clock()?;
    check_state(b, c, true, false);
    c.expect(b, "data_reg", b.data_reg(), 0x5a);
    c.expect(b, "data_out", b.data_out(), 0x5a);
    Ok(())
}

fn scenario_drain(b: &mut ValidReadyBench, c: &mut Checks) -> Result<(), SimError> {
    scenario_fill(b, c)?;
    b.idle()?;
    b.release()?;
    let sample = b.clock()?;
    c.expect_sample("delivered", sample.delivered, Some(0x5a));
    check_state(b, c, false, true);
    Ok(())
}

fn scenario_back_to_back(b: &mut ValidReadyBench, c: &mut Checks) -> Result<(), SimError> {
    b.reset()?;
    b.release()?;
    let words = [0x01, 0x80, 0x5a, 0xa5, 0xff, 0x00, 0x3c, 0xc3];
    for (i, &word) in words.iter().enumerate() {
        b.send(word)?;
        let sample = b.clock()?;
        c.expect_sample("accepted", sample.accepted, Some(word));
        let previous = i.checked_sub(1).map(|p| words[p]);
        c.expect_sample("delivered", sample.delivered, previous);
        c.expect(b, "data_reg", b.data_reg(), word);
        check_state(b, c, true, true);
    }
    b.idle()?;
    let sample = b.clock()?;
    c.expect_sample("delivered", sample.delivered, words.last().copied());
    check_state(b, c, false, true);
    Ok(())
}

fn basic_flow(b: &mut ValidReadyBench, c: &mut Checks) -> Result<(), SimError> {
    b.reset()?;
    check_state(b, c, false, true);

    b.send(0xa5)?;
    b.clock()?;
    b.idle()?;
    b.settle()?;
    check_state(b, c, true, false);
    c.expect(b, "data_out", b.data_out(), 0xa5);

    b.release()?;
    b.settle()?;
    c.expect(b, "ready_in", b.ready_in() as u64, 1);
    b.clock()?;
    check_state(b, c, false, true);
    Ok(())
}

fn backpressure(b: &mut ValidReadyBench, c: &mut Checks) -> Result<(), SimError> {
    b.reset()?;
    b.send(0x77)?;
    b.clock()?;

    b.stall()?;
    b.settle()?;
    c.expect(b, "ready_in", b.ready_in() as u64, 0);

    b.send(0xff)?;
    let sample = b.clock()?;
    c.expect_sample("accepted", sample.accepted, None);
    c.expect(b, "data_out", b.data_out(), 0x77);

    // The held-off word enters in the same cycle the old one leaves.
    b.release()?;
    let sample = b.clock()?;
    c.expect_sample("delivered", sample.delivered, Some(0x77));
    c.expect_sample("accepted", sample.accepted, Some(0xff));
    c.expect(b, "data_out", b.data_out(), 0xff);

    b.idle()?;
    b.clock()?;
    check_state(b, c, false, true);
    Ok(())
}

fn long_stall(b: &mut ValidReadyBench, c: &mut Checks) -> Result<(), SimError> {
    b.reset()?;
    b.send(0xde)?;
    b.clock()?;
    b.stall()?;
    b.idle()?;

    for _ in 0..50 {
        b.clock()?;
        c.expect(b, "ready_in", b.ready_in() as u64, 0);
        c.expect(b, "data_out", b.data_out(), 0xde);
    }

    b.release()?;
    b.clock()?;
    check_state(b, c, false, true);
    Ok(())
}
