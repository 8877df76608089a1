//! Clock frequencies with unit parsing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Femtoseconds in one second.
const FS_PER_SECOND: f64 = 1e15;

/// A clock frequency in Hertz.
///
/// Parses strings like "100MHz", "50khz", "1GHz" or a bare number of Hz.
#[derive(Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frequency(f64);

impl Frequency {
    /// Creates a frequency from a value in Hertz.
    pub fn new(hz: f64) -> Self {
        Self(hz)
    }

    /// Returns the frequency in Hertz.
    pub fn hz(&self) -> f64 {
        self.0
    }

    /// Returns the frequency in megahertz.
    pub fn mhz(&self) -> f64 {
        self.0 / 1_000_000.0
    }

    /// Returns the clock period in femtoseconds, rounded to the nearest fs.
    ///
    /// Returns `None` for non-positive or non-finite frequencies.
    pub fn period_fs(&self) -> Option<u64> {
        if !self.0.is_finite() || self.0 <= 0.0 {
            return None;
        }
        let fs = (FS_PER_SECOND / self.0).round();
        if fs < 1.0 {
            None
        } else {
            Some(fs as u64)
        }
    }
}

impl fmt::Debug for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frequency({self})")
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hz = self.0;
        if hz >= 1e9 {
            write!(f, "{}GHz", hz / 1e9)
        } else if hz >= 1e6 {
            write!(f, "{}MHz", hz / 1e6)
        } else if hz >= 1e3 {
            write!(f, "{}KHz", hz / 1e3)
        } else {
            write!(f, "{hz}Hz")
        }
    }
}

/// Error returned when a frequency string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid frequency: '{input}'")]
pub struct ParseFrequencyError {
    /// The rejected input.
    pub input: String,
}

impl FromStr for Frequency {
    type Err = ParseFrequencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let err = || ParseFrequencyError {
            input: s.to_string(),
        };

        let lower = s.to_ascii_lowercase();
        let (num, scale) = if let Some(num) = lower.strip_suffix("ghz") {
            (num, 1e9)
        } else if let Some(num) = lower.strip_suffix("mhz") {
            (num, 1e6)
        } else if let Some(num) = lower.strip_suffix("khz") {
            (num, 1e3)
        } else if let Some(num) = lower.strip_suffix("hz") {
            (num, 1.0)
        } else {
            (lower.as_str(), 1.0)
        };

        let val: f64 = num.trim().parse().map_err(|_| err())?;
        Ok(Frequency(val * scale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_mhz() {
        let f: Frequency = "100MHz".parse().unwrap();
        assert_eq!(f.hz(), 100_000_000.0);
        assert_eq!(f.mhz(), 100.0);
    }

    #[test]
    fn parse_case_insensitive_with_space() {
        let f: Frequency = " 50 khz ".parse().unwrap();
        assert_eq!(f.hz(), 50_000.0);
    }

    #[test]
    fn parse_bare_number() {
        let f: Frequency = "25000000".parse().unwrap();
        assert_eq!(f.hz(), 25_000_000.0);
    }

    #[test]
    fn parse_invalid() {
        let e = "fast".parse::<Frequency>().unwrap_err();
        assert_eq!(e.to_string(), "invalid frequency: 'fast'");
    }

    #[test]
    fn period_of_100mhz_is_10ns() {
        let f = Frequency::new(100e6);
        assert_eq!(f.period_fs(), Some(10_000_000));
    }

    #[test]
    fn period_rejects_zero() {
        assert_eq!(Frequency::new(0.0).period_fs(), None);
        assert_eq!(Frequency::new(-5.0).period_fs(), None);
    }

    #[test]
    fn display_selects_unit() {
        assert_eq!(Frequency::new(100e6).to_string(), "100MHz");
        assert_eq!(Frequency::new(2.5e9).to_string(), "2.5GHz");
        assert_eq!(Frequency::new(500.0).to_string(), "500Hz");
    }
}
