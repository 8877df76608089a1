//! Simulation time and the declared time scale.
//!
//! [`SimTime`] is a plain count of precision steps. The [`TimeScale`] gives
//! those steps meaning: a `1ns/1ps` scale makes one step a picosecond and
//! prints times in nanoseconds.

use serde::{Deserialize, Serialize};
use std::fmt;
use strobe_common::TimeUnit;

/// A point in simulation time, counted in precision steps.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SimTime(u64);

impl SimTime {
    /// Time zero.
    pub const ZERO: SimTime = SimTime(0);

    /// Creates a time from a raw step count.
    pub fn from_steps(steps: u64) -> Self {
        Self(steps)
    }

    /// Returns the raw step count.
    pub fn steps(self) -> u64 {
        self.0
    }

    /// Returns this time advanced by `steps`, saturating at `u64::MAX`.
    pub fn advance(self, steps: u64) -> Self {
        Self(self.0.saturating_add(steps))
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A declared time unit and precision, e.g. `1ns/1ps`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeScale {
    /// Unit used when printing times.
    pub unit: TimeUnit,
    /// Size of one simulation step.
    pub precision: TimeUnit,
}

impl Default for TimeScale {
    fn default() -> Self {
        Self {
            unit: TimeUnit::Ns,
            precision: TimeUnit::Ps,
        }
    }
}

impl TimeScale {
    /// Creates a time scale. `precision` must not be coarser than `unit`.
    pub fn new(unit: TimeUnit, precision: TimeUnit) -> Option<Self> {
        if precision < unit {
            None
        } else {
            Some(Self { unit, precision })
        }
    }

    /// Number of precision steps in one time unit.
    pub fn steps_per_unit(&self) -> u64 {
        self.unit.femtoseconds() / self.precision.femtoseconds()
    }

    /// Converts a duration in femtoseconds to steps, rounding to the nearest step.
    ///
    /// Returns `None` if the duration rounds to zero steps.
    pub fn steps_from_fs(&self, fs: u64) -> Option<u64> {
        let step = self.precision.femtoseconds();
        let steps = fs.saturating_add(step / 2) / step;
        (steps > 0).then_some(steps)
    }

    /// Converts a number of whole time units to a time point.
    pub fn from_units(&self, units: u64) -> SimTime {
        SimTime(units.saturating_mul(self.steps_per_unit()))
    }

    /// Formats a time in this scale's unit, e.g. `"15 ns"` or `"12.5 ns"`.
    pub fn format(&self, time: SimTime) -> String {
        let per_unit = self.steps_per_unit();
        let whole = time.0 / per_unit;
        let frac = time.0 % per_unit;
        if frac == 0 {
            return format!("{whole} {}", self.unit);
        }
        let digits = (per_unit.ilog10()) as usize;
        let frac = format!("{frac:0digits$}");
        format!("{whole}.{} {}", frac.trim_end_matches('0'), self.unit)
    }
}

impl fmt::Display for TimeScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "1{}/1{}", self.unit, self.precision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_ordering() {
        assert!(SimTime::from_steps(1) > SimTime::ZERO);
        assert_eq!(SimTime::from_steps(5).advance(5).steps(), 10);
        assert_eq!(SimTime::from_steps(u64::MAX).advance(1).steps(), u64::MAX);
    }

    #[test]
    fn default_scale_is_ns_over_ps() {
        let ts = TimeScale::default();
        assert_eq!(ts.steps_per_unit(), 1_000);
        assert_eq!(ts.to_string(), "1ns/1ps");
    }

    #[test]
    fn coarse_precision_rejected() {
        assert!(TimeScale::new(TimeUnit::Ps, TimeUnit::Ns).is_none());
        assert!(TimeScale::new(TimeUnit::Ns, TimeUnit::Ns).is_some());
    }

    #[test]
    fn clock_period_in_steps() {
        let ts = TimeScale::default();
        // 100 MHz
        assert_eq!(ts.steps_from_fs(10_000_000), Some(10_000));
        assert_eq!(ts.steps_from_fs(400), None);
        assert_eq!(ts.steps_from_fs(600), Some(1));
    }

    #[test]
    fn format_whole_and_fractional() {
        let ts = TimeScale::default();
        assert_eq!(ts.format(ts.from_units(15)), "15 ns");
        assert_eq!(ts.format(SimTime::from_steps(12_500)), "12.5 ns");
        assert_eq!(ts.format(SimTime::from_steps(7)), "0.007 ns");
    }

    #[test]
    fn format_same_unit_and_precision() {
        let ts = TimeScale::new(TimeUnit::Ns, TimeUnit::Ns).unwrap();
        assert_eq!(ts.format(SimTime::from_steps(42)), "42 ns");
    }
}
