//! Decimal time units for declaring a simulation time scale.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A power-of-ten time unit, from seconds down to femtoseconds.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    /// 1e0 s.
    S,
    /// 1e-3 s.
    Ms,
    /// 1e-6 s.
    Us,
    /// 1e-9 s.
    Ns,
    /// 1e-12 s.
    Ps,
    /// 1e-15 s.
    Fs,
}

impl TimeUnit {
    /// Returns the base-10 exponent of this unit in seconds (e.g. `-9` for ns).
    pub fn exponent(self) -> i32 {
        match self {
            TimeUnit::S => 0,
            TimeUnit::Ms => -3,
            TimeUnit::Us => -6,
            TimeUnit::Ns => -9,
            TimeUnit::Ps => -12,
            TimeUnit::Fs => -15,
        }
    }

    /// Returns how many femtoseconds one of this unit spans.
    pub fn femtoseconds(self) -> u64 {
        10u64.pow((self.exponent() + 15) as u32)
    }

    /// Returns the unit suffix used in displays.
    pub fn suffix(self) -> &'static str {
        match self {
            TimeUnit::S => "s",
            TimeUnit::Ms => "ms",
            TimeUnit::Us => "us",
            TimeUnit::Ns => "ns",
            TimeUnit::Ps => "ps",
            TimeUnit::Fs => "fs",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponents() {
        assert_eq!(TimeUnit::Ns.exponent(), -9);
        assert_eq!(TimeUnit::Ps.exponent(), -12);
    }

    #[test]
    fn femtoseconds_per_unit() {
        assert_eq!(TimeUnit::Fs.femtoseconds(), 1);
        assert_eq!(TimeUnit::Ps.femtoseconds(), 1_000);
        assert_eq!(TimeUnit::Ns.femtoseconds(), 1_000_000);
        assert_eq!(TimeUnit::S.femtoseconds(), 1_000_000_000_000_000);
    }

    #[test]
    fn coarser_units_order_first() {
        assert!(TimeUnit::Ns < TimeUnit::Ps);
    }

    #[test]
    fn deserializes_lowercase() {
        let u: TimeUnit = serde_json::from_str("\"us\"").unwrap();
        assert_eq!(u, TimeUnit::Us);
    }
}
