//! The interface between the engine and a hardware model.
//!
//! A [`Model`] declares its signals and watched edges once through an
//! [`InstanceBuilder`], then supplies two evaluation functions. Combinational
//! code gets a [`CombContext`] that can only write [`Wire`]s; clocked code
//! gets a [`SeqContext`] that can only *schedule* [`Reg`] writes, which the
//! engine applies together after the function returns. Input ports get an
//! [`Input`] handle, which neither context accepts as a write target.

use crate::error::SimError;
use crate::trigger::{Edge, TriggerEvaluator, TriggerId, TriggerSet};
use crate::value::{Direction, SignalBank, SignalId, SignalKind};
use strobe_common::ArenaId;

/// Scope name of the top-level instance.
pub const TOP_SCOPE: &str = "TOP";

/// Handle to an input port. Only the stimulus interface drives it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Input(SignalId);

impl Input {
    /// Returns the underlying signal ID.
    pub fn id(self) -> SignalId {
        self.0
    }
}

impl From<Input> for SignalId {
    fn from(i: Input) -> Self {
        i.0
    }
}

/// Handle to a combinational signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Wire(SignalId);

impl Wire {
    /// Returns the underlying signal ID.
    pub fn id(self) -> SignalId {
        self.0
    }
}

impl From<Wire> for SignalId {
    fn from(w: Wire) -> Self {
        w.0
    }
}

/// Handle to a state-holding signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Reg(SignalId);

impl Reg {
    /// Returns the underlying signal ID.
    pub fn id(self) -> SignalId {
        self.0
    }
}

impl From<Reg> for SignalId {
    fn from(r: Reg) -> Self {
        r.0
    }
}

/// A simulatable hardware model.
pub trait Model: Sized {
    /// Declares signals and triggers and returns the model holding their handles.
    fn elaborate(builder: &mut InstanceBuilder<'_>) -> Result<Self, SimError>;

    /// Recomputes combinational signals from inputs and registers.
    ///
    /// Called repeatedly until a pass changes nothing, so it must be a pure
    /// function of the values it reads.
    fn eval_comb(&self, ctx: &mut CombContext<'_>);

    /// Computes next-state values for the triggers that fired.
    fn eval_seq(&self, ctx: &mut SeqContext<'_>);
}

/// Declares signals in one scope of the instance tree.
pub struct InstanceBuilder<'a> {
    bank: &'a mut SignalBank,
    triggers: &'a mut TriggerEvaluator,
    scope: String,
}

impl<'a> InstanceBuilder<'a> {
    pub(crate) fn new(bank: &'a mut SignalBank, triggers: &'a mut TriggerEvaluator) -> Self {
        Self {
            bank,
            triggers,
            scope: TOP_SCOPE.to_string(),
        }
    }

    /// Returns the hierarchical path of this scope.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    fn declare(
        &mut self,
        name: &str,
        width: u32,
        direction: Direction,
        kind: SignalKind,
    ) -> Result<SignalId, SimError> {
        let path = format!("{}.{name}", self.scope);
        self.bank.declare(&path, width, direction, kind)
    }

    /// Declares an input port driven by the stimulus interface.
    pub fn input(&mut self, name: &str, width: u32) -> Result<Input, SimError> {
        let id = self.declare(name, width, Direction::Input, SignalKind::Wire)?;
        self.triggers.watch_input(id);
        Ok(Input(id))
    }

    /// Declares an output port.
    pub fn output(&mut self, name: &str, width: u32) -> Result<Wire, SimError> {
        self.declare(name, width, Direction::Output, SignalKind::Wire)
            .map(Wire)
    }

    /// Declares an internal combinational net.
    pub fn wire(&mut self, name: &str, width: u32) -> Result<Wire, SimError> {
        self.declare(name, width, Direction::Internal, SignalKind::Wire)
            .map(Wire)
    }

    /// Declares a register.
    pub fn reg(&mut self, name: &str, width: u32) -> Result<Reg, SimError> {
        self.declare(name, width, Direction::Internal, SignalKind::Register)
            .map(Reg)
    }

    /// Watches an edge of a signal; the returned ID tells `eval_seq` whether it fired.
    pub fn on_edge(&mut self, signal: impl Into<SignalId>, edge: Edge) -> TriggerId {
        self.triggers.watch_edge(signal.into(), edge)
    }

    /// Declares a child instance named `name` inside this scope.
    pub fn child<R>(
        &mut self,
        name: &str,
        build: impl FnOnce(&mut InstanceBuilder<'_>) -> Result<R, SimError>,
    ) -> Result<R, SimError> {
        let mut child = InstanceBuilder {
            bank: &mut *self.bank,
            triggers: &mut *self.triggers,
            scope: format!("{}.{name}", self.scope),
        };
        build(&mut child)
    }
}

/// View of the signal bank handed to combinational code.
///
/// Writes are visible to subsequent reads in the same pass.
pub struct CombContext<'a> {
    bank: &'a mut SignalBank,
}

impl<'a> CombContext<'a> {
    pub(crate) fn new(bank: &'a mut SignalBank) -> Self {
        Self { bank }
    }

    /// Reads any signal.
    pub fn read(&self, signal: impl Into<SignalId>) -> u64 {
        self.bank.read(signal.into())
    }

    /// Reads any signal as a boolean.
    pub fn bit(&self, signal: impl Into<SignalId>) -> bool {
        self.bank.read_bool(signal.into())
    }

    /// Writes a wire.
    ///
    /// Input ports cannot be written here:
    ///
    /// ```compile_fail
    /// use strobe_sim::{CombContext, Input};
    ///
    /// fn drive(ctx: &mut CombContext<'_>, clk: Input) {
    ///     ctx.write(clk, 1);
    /// }
    /// ```
    pub fn write(&mut self, wire: Wire, value: u64) {
        self.bank.write(wire.0, value);
    }

    /// Writes a wire from a boolean.
    pub fn set(&mut self, wire: Wire, value: bool) {
        self.bank.write(wire.0, value as u64);
    }
}

/// View of the signal bank handed to clocked code.
///
/// Reads always see the pre-edge state; scheduled writes land only after
/// `eval_seq` returns.
pub struct SeqContext<'a> {
    bank: &'a SignalBank,
    fired: &'a TriggerSet,
    pending: Vec<(Reg, u64)>,
}

impl<'a> SeqContext<'a> {
    pub(crate) fn new(bank: &'a SignalBank, fired: &'a TriggerSet) -> Self {
        Self {
            bank,
            fired,
            pending: Vec::new(),
        }
    }

    /// Reads any signal.
    pub fn read(&self, signal: impl Into<SignalId>) -> u64 {
        self.bank.read(signal.into())
    }

    /// Reads any signal as a boolean.
    pub fn bit(&self, signal: impl Into<SignalId>) -> bool {
        self.bank.read_bool(signal.into())
    }

    /// Returns `true` if the given trigger fired in this evaluation.
    pub fn fired(&self, trigger: TriggerId) -> bool {
        self.fired.get(trigger.index())
    }

    /// Schedules a register write. Later writes to the same register win.
    pub fn schedule(&mut self, reg: Reg, value: u64) {
        self.pending.push((reg, value));
    }

    /// Schedules a register write from a boolean.
    pub fn schedule_bool(&mut self, reg: Reg, value: bool) {
        self.schedule(reg, value as u64);
    }

    pub(crate) fn into_pending(self) -> Vec<(Reg, u64)> {
        self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_scopes_paths() {
        let mut bank = SignalBank::new();
        let mut triggers = TriggerEvaluator::new();
        let mut b = InstanceBuilder::new(&mut bank, &mut triggers);
        let clk: Input = b.input("clk", 1).unwrap();
        let (inner_clk, state) = b
            .child("stage", |c| {
                assert_eq!(c.scope(), "TOP.stage");
                Ok((c.wire("clk", 1)?, c.reg("state", 4)?))
            })
            .unwrap();
        let rise = b.on_edge(inner_clk, Edge::Posedge);
        assert_eq!(rise.index(), 0);

        assert_eq!(bank.path(clk.id()), "TOP.clk");
        assert_eq!(bank.path(inner_clk.id()), "TOP.stage.clk");
        assert_eq!(bank.signal(state.id()).kind, SignalKind::Register);
        assert_eq!(bank.signal(clk.id()).direction, Direction::Input);
        assert_eq!(triggers.edge_count(), 1);
    }

    #[test]
    fn seq_context_defers_writes() {
        let mut bank = SignalBank::new();
        let r = Reg(
            bank.declare("TOP.r", 8, Direction::Internal, SignalKind::Register)
                .unwrap(),
        );
        let fired = TriggerSet::new(1);
        let mut ctx = SeqContext::new(&bank, &fired);
        ctx.schedule(r, 7);
        assert_eq!(ctx.read(r), 0);
        ctx.schedule(r, 9);
        assert_eq!(ctx.into_pending(), vec![(r, 7), (r, 9)]);
    }

    #[test]
    fn inputs_are_read_only_to_comb_logic() {
        let mut bank = SignalBank::new();
        let mut triggers = TriggerEvaluator::new();
        let mut b = InstanceBuilder::new(&mut bank, &mut triggers);
        let a: Input = b.input("a", 4).unwrap();
        let y: Wire = b.wire("y", 4).unwrap();

        bank.write(a.id(), 9);
        let mut ctx = CombContext::new(&mut bank);
        let v = ctx.read(a);
        ctx.write(y, v + 1);
        assert_eq!(bank.read(a.id()), 9);
        assert_eq!(bank.read(y.id()), 10);
        assert_eq!(bank.signal(a.id()).direction, Direction::Input);
    }

    #[test]
    fn comb_context_writes_are_visible() {
        let mut bank = SignalBank::new();
        let a = Wire(
            bank.declare("TOP.a", 1, Direction::Internal, SignalKind::Wire)
                .unwrap(),
        );
        let mut ctx = CombContext::new(&mut bank);
        ctx.set(a, true);
        assert!(ctx.bit(a));
    }
}
