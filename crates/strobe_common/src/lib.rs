//! Shared foundational types for the strobe simulator.
//!
//! This crate provides fixed-width 2-state signal values, interned hierarchical
//! names, a dense ID-indexed arena, clock frequency parsing, and decimal
//! time units.

#![warn(missing_docs)]

pub mod arena;
pub mod bits;
pub mod frequency;
pub mod ident;
pub mod time_unit;

pub use arena::{Arena, ArenaId};
pub use bits::{Bits, MAX_WIDTH};
pub use frequency::{Frequency, ParseFrequencyError};
pub use ident::{Ident, Interner};
pub use time_unit::TimeUnit;
