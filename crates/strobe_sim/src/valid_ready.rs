//! A single valid/ready pipeline register stage.
//!
//! The stage holds at most one word. It accepts a new word whenever it is
//! empty or its current word is being taken downstream in the same cycle
//! (`ready_in = !valid_reg | ready_out`). Reset is asynchronous and always
//! wins over a concurrent transfer.
//!
//! Signals follow the usual two-level layout: ports on `TOP`, and a child
//! `TOP.valid_ready` instance that mirrors every port and owns the registers.

use crate::error::SimError;
use crate::model::{CombContext, Input, InstanceBuilder, Model, Reg, SeqContext, Wire};
use crate::trigger::{Edge, TriggerId};

/// Width of the data path in bits.
pub const DATA_WIDTH: u32 = 8;

/// Name of the child instance.
pub const INSTANCE_NAME: &str = "valid_ready";

/// Port handles of one level of the hierarchy.
///
/// On `TOP` the five inputs are [`Input`] ports; the child instance mirrors
/// them as plain wires.
#[derive(Clone, Copy, Debug)]
pub struct ValidReadyPorts<I = Input> {
    /// Clock.
    pub clk: I,
    /// Active-high reset.
    pub rst: I,
    /// Upstream offers a word.
    pub valid_in: I,
    /// The offered word.
    pub data_in: I,
    /// Downstream can take a word.
    pub ready_out: I,
    /// The stage can take a word.
    pub ready_in: Wire,
    /// The stage holds a word.
    pub valid_out: Wire,
    /// The held word.
    pub data_out: Wire,
}

/// The valid/ready stage model.
#[derive(Clone, Debug)]
pub struct ValidReadyStage {
    top: ValidReadyPorts,
    inner: ValidReadyPorts<Wire>,
    valid_reg: Reg,
    data_reg: Reg,
    clk_rise: TriggerId,
    rst_rise: TriggerId,
}

impl ValidReadyStage {
    /// Top-level ports, as driven and observed by a testbench.
    pub fn ports(&self) -> &ValidReadyPorts {
        &self.top
    }

    /// Mirrored ports inside the child instance.
    pub fn inner_ports(&self) -> &ValidReadyPorts<Wire> {
        &self.inner
    }

    /// The occupancy register.
    pub fn valid_reg(&self) -> Reg {
        self.valid_reg
    }

    /// The data register.
    pub fn data_reg(&self) -> Reg {
        self.data_reg
    }
}

impl Model for ValidReadyStage {
    fn elaborate(b: &mut InstanceBuilder<'_>) -> Result<Self, SimError> {
        let top = ValidReadyPorts {
            clk: b.input("clk", 1)?,
            rst: b.input("rst", 1)?,
            valid_in: b.input("valid_in", 1)?,
            data_in: b.input("data_in", DATA_WIDTH)?,
            ready_out: b.input("ready_out", 1)?,
            ready_in: b.output("ready_in", 1)?,
            valid_out: b.output("valid_out", 1)?,
            data_out: b.output("data_out", DATA_WIDTH)?,
        };
        let (inner, valid_reg, data_reg) = b.child(INSTANCE_NAME, |c| {
            let inner = ValidReadyPorts {
                clk: c.wire("clk", 1)?,
                rst: c.wire("rst", 1)?,
                valid_in: c.wire("valid_in", 1)?,
                data_in: c.wire("data_in", DATA_WIDTH)?,
                ready_out: c.wire("ready_out", 1)?,
                ready_in: c.wire("ready_in", 1)?,
                valid_out: c.wire("valid_out", 1)?,
                data_out: c.wire("data_out", DATA_WIDTH)?,
            };
            Ok((inner, c.reg("valid_reg", 1)?, c.reg("data_reg", DATA_WIDTH)?))
        })?;
        let clk_rise = b.on_edge(inner.clk, Edge::Posedge);
        let rst_rise = b.on_edge(inner.rst, Edge::Posedge);
        Ok(Self {
            top,
            inner,
            valid_reg,
            data_reg,
            clk_rise,
            rst_rise,
        })
    }

    fn eval_comb(&self, ctx: &mut CombContext<'_>) {
        let (top, inner) = (&self.top, &self.inner);
        for (from, to) in [
            (top.clk, inner.clk),
            (top.rst, inner.rst),
            (top.valid_in, inner.valid_in),
            (top.data_in, inner.data_in),
            (top.ready_out, inner.ready_out),
        ] {
            let v = ctx.read(from);
            ctx.write(to, v);
        }

        let valid = ctx.bit(self.valid_reg);
        let data = ctx.read(self.data_reg);
        ctx.set(inner.valid_out, valid);
        ctx.write(inner.data_out, data);
        let ready_in = !valid || ctx.bit(inner.ready_out);
        ctx.set(inner.ready_in, ready_in);

        for (from, to) in [
            (inner.valid_out, top.valid_out),
            (inner.data_out, top.data_out),
            (inner.ready_in, top.ready_in),
        ] {
            let v = ctx.read(from);
            ctx.write(to, v);
        }
    }

    fn eval_seq(&self, ctx: &mut SeqContext<'_>) {
        if !(ctx.fired(self.clk_rise) || ctx.fired(self.rst_rise)) {
            return;
        }
        let inner = &self.inner;
        let rst = ctx.bit(inner.rst);
        let transfer_in = ctx.bit(inner.valid_in) && ctx.bit(inner.ready_in);
        let valid = ctx.bit(self.valid_reg);
        let transfer_out = valid && ctx.bit(inner.ready_out);

        let next_valid = if rst {
            false
        } else if transfer_in {
            true
        } else if transfer_out {
            false
        } else {
            valid
        };
        ctx.schedule_bool(self.valid_reg, next_valid);

        if !rst && transfer_in {
            let data = ctx.read(inner.data_in);
            ctx.schedule(self.data_reg, data);
        }
    }
}
