//! Trigger bit-vectors and edge detection.
//!
//! Each scheduling region works off a [`TriggerSet`]. The ico set has two
//! fixed bits: one that fires on the first iteration of every evaluation and
//! one that fires when any input moved since the last look. The act set has
//! one bit per watched edge, computed by comparing each watched signal with
//! the value it had at the previous act evaluation.

use crate::error::Region;
use crate::value::{SignalBank, SignalId};
use serde::{Deserialize, Serialize};
use std::fmt;
use strobe_common::{Arena, ArenaId};

/// Ico bit that fires once at the start of every evaluation.
pub const ICO_FIRST_ITERATION: usize = 0;
/// Ico bit that fires when any watched input changed.
pub const ICO_INPUT_CHANGED: usize = 1;
/// Number of ico trigger bits.
pub const ICO_TRIGGER_COUNT: usize = 2;

/// Opaque ID for a watched edge; its index is the act trigger bit.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct TriggerId(u32);

impl ArenaId for TriggerId {
    fn from_raw(index: u32) -> Self {
        Self(index)
    }

    fn as_raw(self) -> u32 {
        self.0
    }
}

/// Edge polarity a trigger reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Edge {
    /// Bit 0 went from 0 to 1.
    Posedge,
    /// Bit 0 went from 1 to 0.
    Negedge,
    /// Any change of value.
    AnyChange,
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edge::Posedge => write!(f, "posedge"),
            Edge::Negedge => write!(f, "negedge"),
            Edge::AnyChange => write!(f, "anychange"),
        }
    }
}

/// Returns `true` if the transition `prev -> curr` matches `edge`.
pub fn detect_edge(prev: u64, curr: u64, edge: Edge) -> bool {
    let (was, now) = (prev & 1 == 1, curr & 1 == 1);
    match edge {
        Edge::Posedge => !was && now,
        Edge::Negedge => was && !now,
        Edge::AnyChange => prev != curr,
    }
}

/// A fixed-size bit-vector of trigger flags.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TriggerSet {
    words: Vec<u64>,
    len: usize,
}

impl TriggerSet {
    /// Creates a cleared set of `len` bits.
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(64).max(1)],
            len,
        }
    }

    /// Returns the number of bits.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the set has no bits at all.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Sets bit `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn set(&mut self, index: usize) {
        assert!(index < self.len, "trigger {index} out of range {}", self.len);
        self.words[index / 64] |= 1u64 << (index % 64);
    }

    /// Returns `true` if bit `index` is set. Out-of-range bits read as clear.
    pub fn get(&self, index: usize) -> bool {
        index < self.len && self.words[index / 64] & (1u64 << (index % 64)) != 0
    }

    /// Returns `true` if any bit is set.
    pub fn any_set(&self) -> bool {
        self.words.iter().any(|&w| w != 0)
    }

    /// ORs every bit of `other` into this set.
    pub fn or_into(&mut self, other: &TriggerSet) {
        for (dst, src) in self.words.iter_mut().zip(&other.words) {
            *dst |= src;
        }
    }

    /// Clears every bit.
    pub fn clear(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
    }

    /// Iterates over the indices of set bits in ascending order.
    pub fn iter_set(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(|&i| self.get(i))
    }
}

impl fmt::Display for TriggerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0b")?;
        if self.len == 0 {
            return write!(f, "0");
        }
        for i in (0..self.len).rev() {
            write!(f, "{}", self.get(i) as u8)?;
        }
        Ok(())
    }
}

/// A watched edge on one signal.
#[derive(Clone, Debug)]
pub struct EdgeTrigger {
    /// The watched signal.
    pub signal: SignalId,
    /// The polarity that fires the trigger.
    pub edge: Edge,
}

/// Computes ico and act trigger sets from the signal bank.
pub struct TriggerEvaluator {
    edges: Arena<TriggerId, EdgeTrigger>,
    previous: Vec<u64>,
    inputs: Vec<SignalId>,
    input_previous: Vec<u64>,
    first_iteration: bool,
}

impl TriggerEvaluator {
    /// Creates an evaluator with nothing watched.
    pub fn new() -> Self {
        Self {
            edges: Arena::new(),
            previous: Vec::new(),
            inputs: Vec::new(),
            input_previous: Vec::new(),
            first_iteration: true,
        }
    }

    /// Watches `signal` for `edge` and returns the act bit it will set.
    pub fn watch_edge(&mut self, signal: SignalId, edge: Edge) -> TriggerId {
        self.previous.push(0);
        self.edges.alloc(EdgeTrigger { signal, edge })
    }

    /// Watches an input for changes between evaluations.
    pub fn watch_input(&mut self, signal: SignalId) {
        self.inputs.push(signal);
        self.input_previous.push(0);
    }

    /// Records the current value of every watched signal as the baseline.
    pub fn prime(&mut self, bank: &SignalBank) {
        for (id, trigger) in self.edges.iter() {
            self.previous[id.index()] = bank.read(trigger.signal);
        }
        for (prev, &signal) in self.input_previous.iter_mut().zip(&self.inputs) {
            *prev = bank.read(signal);
        }
    }

    /// Returns the number of act trigger bits.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns the watched edge behind an act bit.
    pub fn edge(&self, id: TriggerId) -> &EdgeTrigger {
        &self.edges[id]
    }

    /// Re-arms the first-iteration trigger. Called once per evaluation.
    pub fn begin_eval(&mut self) {
        self.first_iteration = true;
    }

    /// Recomputes the ico set.
    pub fn eval_ico(&mut self, bank: &SignalBank, out: &mut TriggerSet) {
        out.clear();
        if std::mem::replace(&mut self.first_iteration, false) {
            out.set(ICO_FIRST_ITERATION);
        }
        let mut changed = false;
        for (prev, &signal) in self.input_previous.iter_mut().zip(&self.inputs) {
            let curr = bank.read(signal);
            if curr != *prev {
                changed = true;
                *prev = curr;
            }
        }
        if changed {
            out.set(ICO_INPUT_CHANGED);
        }
    }

    /// Recomputes the act set and stores current values as the new baseline.
    pub fn eval_act(&mut self, bank: &SignalBank, out: &mut TriggerSet) {
        out.clear();
        for (id, trigger) in self.edges.iter() {
            let curr = bank.read(trigger.signal);
            let prev = std::mem::replace(&mut self.previous[id.index()], curr);
            if detect_edge(prev, curr, trigger.edge) {
                out.set(id.index());
            }
        }
    }

    /// Describes the active bits of a set, one line per bit.
    pub fn describe(&self, region: Region, set: &TriggerSet, bank: &SignalBank) -> Vec<String> {
        let tag = region.tag();
        if !set.any_set() {
            return vec![format!("'{tag}' region trigger set: none active")];
        }
        set.iter_set()
            .map(|bit| {
                let what = match region {
                    Region::Ico => match bit {
                        ICO_FIRST_ITERATION => "Internal 'ico' trigger - first iteration".to_string(),
                        _ => "Internal 'ico' trigger - input changed".to_string(),
                    },
                    Region::Act | Region::Nba => {
                        let trigger = &self.edges[TriggerId::from_raw(bit as u32)];
                        format!("@({} {})", trigger.edge, bank.path(trigger.signal))
                    }
                };
                format!("'{tag}' region trigger index {bit} is active: {what}")
            })
            .collect()
    }
}

impl Default for TriggerEvaluator {
    fn default() -> Self {
        Self::new()
    }
}
