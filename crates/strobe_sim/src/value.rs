//! Signal storage for an elaborated model.
//!
//! Every signal gets a flat [`SignalId`] and a hierarchical path such as
//! `TOP.valid_ready.valid_reg`. Values are 2-state and masked to the declared
//! width on every write. The bank counts value-changing writes so the
//! combinational settle loop can tell when it has reached a fixed point.

use crate::error::SimError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strobe_common::{Arena, ArenaId, Bits, Ident, Interner, MAX_WIDTH};

/// Opaque ID for a signal in a [`SignalBank`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct SignalId(u32);

impl ArenaId for SignalId {
    fn from_raw(index: u32) -> Self {
        Self(index)
    }

    fn as_raw(self) -> u32 {
        self.0
    }
}

/// Port direction of a signal as seen from the stimulus interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Driven by the stimulus interface.
    Input,
    /// Observable output of the top level.
    Output,
    /// Internal net or state.
    Internal,
}

/// Whether a signal is recomputed combinationally or holds state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    /// Combinational net, recomputed from other signals.
    Wire,
    /// State element, updated only by clocked logic.
    Register,
}

/// A declared signal and its current value.
#[derive(Clone, Debug)]
pub struct SignalState {
    /// Interned hierarchical path.
    pub path: Ident,
    /// Port direction.
    pub direction: Direction,
    /// Wire or register.
    pub kind: SignalKind,
    /// Current value, always masked to the declared width.
    pub value: Bits,
}

impl SignalState {
    /// Returns the declared width in bits.
    pub fn width(&self) -> u32 {
        self.value.width()
    }
}

/// An assignment whose value did not fit the target signal's width.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WidthOverflow {
    /// The signal that was written.
    pub signal: SignalId,
    /// The value the writer tried to store.
    pub attempted: u64,
    /// The signal's declared width.
    pub width: u32,
}

/// All signals of one elaborated model.
pub struct SignalBank {
    signals: Arena<SignalId, SignalState>,
    interner: Interner,
    by_path: HashMap<Ident, SignalId>,
    debug_checks: bool,
    changes: usize,
    overflows: Vec<WidthOverflow>,
}

impl SignalBank {
    /// Creates an empty bank.
    pub fn new() -> Self {
        Self {
            signals: Arena::new(),
            interner: Interner::new(),
            by_path: HashMap::new(),
            debug_checks: false,
            changes: 0,
            overflows: Vec::new(),
        }
    }

    /// Enables or disables recording of width overflows.
    pub fn set_debug_checks(&mut self, enabled: bool) {
        self.debug_checks = enabled;
    }

    /// Declares a new zero-initialized signal.
    pub fn declare(
        &mut self,
        path: &str,
        width: u32,
        direction: Direction,
        kind: SignalKind,
    ) -> Result<SignalId, SimError> {
        if !(1..=MAX_WIDTH).contains(&width) {
            return Err(SimError::InvalidWidth {
                name: path.to_string(),
                width,
            });
        }
        let ident = self.interner.get_or_intern(path);
        if self.by_path.contains_key(&ident) {
            return Err(SimError::DuplicateSignal(path.to_string()));
        }
        let id = self.signals.alloc(SignalState {
            path: ident,
            direction,
            kind,
            value: Bits::zero(width),
        });
        self.by_path.insert(ident, id);
        Ok(id)
    }

    /// Returns the current value of a signal as an integer.
    pub fn read(&self, id: SignalId) -> u64 {
        self.signals[id].value.to_u64()
    }

    /// Returns `true` if any bit of the signal is set.
    pub fn read_bool(&self, id: SignalId) -> bool {
        self.signals[id].value.is_true()
    }

    /// Returns the current value with its width.
    pub fn value(&self, id: SignalId) -> Bits {
        self.signals[id].value
    }

    /// Stores a value, truncating it to the signal's width.
    ///
    /// Returns `true` if the stored value changed. With debug checks enabled,
    /// values that do not fit are recorded for [`take_overflows`](Self::take_overflows).
    pub fn write(&mut self, id: SignalId, value: u64) -> bool {
        let state = &mut self.signals[id];
        let width = state.value.width();
        if self.debug_checks && !Bits::fits(value, width) {
            self.overflows.push(WidthOverflow {
                signal: id,
                attempted: value,
                width,
            });
        }
        let next = state.value.with_value(value);
        if next == state.value {
            return false;
        }
        state.value = next;
        self.changes += 1;
        true
    }

    /// Looks up a signal by hierarchical path.
    pub fn find(&self, path: &str) -> Option<SignalId> {
        let ident = self.interner.get(path)?;
        self.by_path.get(&ident).copied()
    }

    /// Returns the hierarchical path of a signal.
    pub fn path(&self, id: SignalId) -> &str {
        self.interner.resolve(self.signals[id].path)
    }

    /// Returns the full state of a signal.
    pub fn signal(&self, id: SignalId) -> &SignalState {
        &self.signals[id]
    }

    /// Captures the current values of the given signals.
    pub fn snapshot(&self, ids: &[SignalId]) -> HashMap<SignalId, u64> {
        ids.iter().map(|&id| (id, self.read(id))).collect()
    }

    /// Returns the number of value-changing writes since the last call.
    pub fn take_changed(&mut self) -> usize {
        std::mem::take(&mut self.changes)
    }

    /// Drains the recorded width overflows.
    pub fn take_overflows(&mut self) -> Vec<WidthOverflow> {
        std::mem::take(&mut self.overflows)
    }

    /// Returns the number of declared signals.
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    /// Returns `true` if no signals have been declared.
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Iterates over signals in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (SignalId, &SignalState)> {
        self.signals.iter()
    }
}

impl Default for SignalBank {
    fn default() -> Self {
        Self::new()
    }
}
