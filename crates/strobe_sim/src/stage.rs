//! The combinational and sequential evaluation stages.

use crate::error::{Region, SimError};
use crate::model::{CombContext, Model, SeqContext};
use crate::trigger::TriggerSet;
use crate::value::SignalBank;

/// Runs a model's combinational function to a fixed point.
#[derive(Clone, Copy, Debug)]
pub struct CombinationalStage {
    limit: u32,
}

impl CombinationalStage {
    /// Creates a stage that gives up after `limit` non-settling passes.
    pub fn new(limit: u32) -> Self {
        Self { limit }
    }

    /// Re-runs `eval_comb` until a pass changes nothing.
    ///
    /// Returns the number of passes, including the final quiet one.
    /// `region` names the caller in the non-convergence error.
    pub fn settle<M: Model>(
        &self,
        model: &M,
        bank: &mut SignalBank,
        region: Region,
    ) -> Result<u32, SimError> {
        bank.take_changed();
        let mut passes = 0u32;
        loop {
            if passes > self.limit {
                return Err(SimError::NonConvergence {
                    region,
                    limit: self.limit,
                });
            }
            passes += 1;
            model.eval_comb(&mut CombContext::new(bank));
            if bank.take_changed() == 0 {
                return Ok(passes);
            }
        }
    }
}

/// Runs a model's clocked function with deferred register writes.
#[derive(Clone, Copy, Debug, Default)]
pub struct SequentialStage;

impl SequentialStage {
    /// Computes next state from the pre-edge bank, then applies it.
    ///
    /// Returns the number of registers whose value changed.
    pub fn run<M: Model>(&self, model: &M, bank: &mut SignalBank, fired: &TriggerSet) -> usize {
        let pending = {
            let mut ctx = SeqContext::new(bank, fired);
            model.eval_seq(&mut ctx);
            ctx.into_pending()
        };
        pending
            .into_iter()
            .filter(|&(reg, value)| bank.write(reg.id(), value))
            .count()
    }
}
