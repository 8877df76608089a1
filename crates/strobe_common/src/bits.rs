//! Fixed-width 2-state signal values.
//!
//! The simulator models every signal as an unsigned integer of a declared
//! width between 1 and [`MAX_WIDTH`] bits. [`Bits`] keeps the value masked to
//! that width; callers that need to detect an out-of-range assignment use
//! [`Bits::fits`] before truncating.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Widest signal the value model supports.
pub const MAX_WIDTH: u32 = 64;

/// An unsigned value of a fixed bit width.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bits {
    value: u64,
    width: u32,
}

impl Bits {
    /// Creates an all-zero value of the given width.
    ///
    /// # Panics
    ///
    /// Panics if `width` is zero or greater than [`MAX_WIDTH`].
    pub fn zero(width: u32) -> Self {
        assert!(
            (1..=MAX_WIDTH).contains(&width),
            "signal width {width} out of range 1..={MAX_WIDTH}"
        );
        Self { value: 0, width }
    }

    /// Creates a value, truncating `value` to `width` bits.
    pub fn from_u64(value: u64, width: u32) -> Self {
        let mut bits = Self::zero(width);
        bits.value = value & Self::mask(width);
        bits
    }

    /// Creates a 1-bit value from a boolean.
    pub fn from_bool(b: bool) -> Self {
        Self {
            value: b as u64,
            width: 1,
        }
    }

    /// Returns the all-ones mask for a width.
    pub fn mask(width: u32) -> u64 {
        if width >= MAX_WIDTH {
            u64::MAX
        } else {
            (1u64 << width) - 1
        }
    }

    /// Returns `true` if `value` is representable in `width` bits.
    pub fn fits(value: u64, width: u32) -> bool {
        value & !Self::mask(width) == 0
    }

    /// Returns the declared width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the value as an integer.
    pub fn to_u64(&self) -> u64 {
        self.value
    }

    /// Returns `true` if any bit is set.
    pub fn is_true(&self) -> bool {
        self.value != 0
    }

    /// Returns a copy holding `value`, truncated to this width.
    pub fn with_value(&self, value: u64) -> Self {
        Self::from_u64(value, self.width)
    }
}

impl fmt::Debug for Bits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bits({self})")
    }
}

impl fmt::Display for Bits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.width == 1 {
            write!(f, "{}", self.value)
        } else {
            let digits = self.width.div_ceil(4) as usize;
            write!(f, "{}'h{:0digits$x}", self.width, self.value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_has_width() {
        let b = Bits::zero(8);
        assert_eq!(b.width(), 8);
        assert_eq!(b.to_u64(), 0);
        assert!(!b.is_true());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn zero_width_rejected() {
        Bits::zero(0);
    }

    #[test]
    fn from_u64_truncates() {
        let b = Bits::from_u64(0x15a, 8);
        assert_eq!(b.to_u64(), 0x5a);
    }

    #[test]
    fn fits_checks_high_bits() {
        assert!(Bits::fits(1, 1));
        assert!(!Bits::fits(2, 1));
        assert!(Bits::fits(0xff, 8));
        assert!(!Bits::fits(0x100, 8));
        assert!(Bits::fits(u64::MAX, 64));
    }

    #[test]
    fn mask_full_width() {
        assert_eq!(Bits::mask(64), u64::MAX);
        assert_eq!(Bits::mask(1), 1);
    }

    #[test]
    fn from_bool() {
        assert!(Bits::from_bool(true).is_true());
        assert_eq!(Bits::from_bool(false).width(), 1);
    }

    #[test]
    fn display_formats() {
        assert_eq!(Bits::from_bool(true).to_string(), "1");
        assert_eq!(Bits::from_u64(0x5a, 8).to_string(), "8'h5a");
        assert_eq!(Bits::from_u64(0x3, 12).to_string(), "12'h003");
    }

    #[test]
    fn serde_roundtrip() {
        let b = Bits::from_u64(0xa5, 8);
        let json = serde_json::to_string(&b).unwrap();
        let back: Bits = serde_json::from_str(&json).unwrap();
        assert_eq!(b, back);
    }
}
