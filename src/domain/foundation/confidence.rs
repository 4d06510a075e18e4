//! Confidence score attached to every candidate field value.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A score in `[0, 1]`. Construction clamps; NaN becomes zero.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Confidence(f32);

impl Confidence {
    pub const ZERO: Self = Self(0.0);
    pub const CERTAIN: Self = Self(1.0);

    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            return Self::ZERO;
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(&self) -> f32 {
        self.0
    }

    /// Strict comparison used by the merge policy.
    pub fn exceeds(&self, other: &Confidence) -> bool {
        self.0 > other.0
    }
}

impl Default for Confidence {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_out_of_range_values() {
        assert_eq!(Confidence::new(1.7).value(), 1.0);
        assert_eq!(Confidence::new(-0.2).value(), 0.0);
    }

    #[test]
    fn nan_collapses_to_zero() {
        assert_eq!(Confidence::new(f32::NAN), Confidence::ZERO);
    }

    #[test]
    fn exceeds_is_strict() {
        let a = Confidence::new(0.5);
        assert!(!a.exceeds(&Confidence::new(0.5)));
        assert!(Confidence::new(0.51).exceeds(&a));
    }
}
