//! Percentage value object (0-100 scale).

use serde::{Deserialize, Serialize};
use std::fmt;

/// A value between 0 and 100 inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Percentage(u8);

impl Percentage {
    /// Zero percent.
    pub const ZERO: Self = Self(0);

    /// One hundred percent.
    pub const HUNDRED: Self = Self(100);

    /// Creates a new Percentage, clamping to valid range.
    pub fn new(value: u8) -> Self {
        Self(value.min(100))
    }

    /// Computes `part / whole` rounded down.
    ///
    /// Rounding down means 100 is only reached when `part == whole`.
    /// A zero `whole` counts as fully complete.
    pub fn from_ratio(part: usize, whole: usize) -> Self {
        if whole == 0 {
            return Self::HUNDRED;
        }
        let part = part.min(whole);
        Self(((part * 100) / whole) as u8)
    }

    /// Returns the value as u8.
    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn is_complete(&self) -> bool {
        self.0 == 100
    }
}

impl Default for Percentage {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn percentage_new_clamps_to_100() {
        assert_eq!(Percentage::new(101).value(), 100);
        assert_eq!(Percentage::new(255).value(), 100);
    }

    #[test]
    fn from_ratio_rounds_down() {
        assert_eq!(Percentage::from_ratio(2, 3).value(), 66);
        assert_eq!(Percentage::from_ratio(8, 9).value(), 88);
    }

    #[test]
    fn from_ratio_with_zero_whole_is_complete() {
        assert!(Percentage::from_ratio(0, 0).is_complete());
    }

    #[test]
    fn percentage_displays_with_percent_sign() {
        assert_eq!(format!("{}", Percentage::new(75)), "75%");
    }

    proptest! {
        #[test]
        fn from_ratio_is_complete_only_when_all_parts_present(whole in 1usize..500, part in 0usize..500) {
            let pct = Percentage::from_ratio(part, whole);
            prop_assert!(pct.value() <= 100);
            prop_assert_eq!(pct.is_complete(), part >= whole);
        }
    }
}
