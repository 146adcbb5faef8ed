//! Checked numeric conversions for BPM and bin arithmetic

use crate::{Error, Result};

/// Safely convert f64 to i32 with bounds checking, truncating toward zero
///
/// # Errors
///
/// Returns an error if the value is not finite or outside i32 range
#[allow(clippy::cast_possible_truncation)] // Truncation after bounds check is safe
pub fn f64_to_i32(value: f64) -> Result<i32> {
    if value.is_finite() && value >= f64::from(i32::MIN) && value <= f64::from(i32::MAX) {
        Ok(value as i32)
    } else {
        Err(Error::InvalidInput(format!(
            "Value {value} cannot be safely converted to i32"
        )))
    }
}

/// Round to the nearest integer (halves away from zero) and convert to i32
///
/// # Errors
///
/// Returns an error if the rounded value is not finite or outside i32 range
pub fn round_to_i32(value: f64) -> Result<i32> {
    f64_to_i32(value.round())
}

/// Round a non-negative value to the nearest index
///
/// # Errors
///
/// Returns an error if the value is negative, not finite, or too large
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // Checked before the cast
pub fn round_to_index(value: f64) -> Result<usize> {
    let rounded = value.round();
    if rounded.is_finite() && rounded >= 0.0 && rounded <= u32::MAX as f64 {
        Ok(rounded as usize)
    } else {
        Err(Error::InvalidInput(format!(
            "Value {value} cannot be used as an index"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_f64_to_i32() {
        assert_eq!(f64_to_i32(42.9).unwrap(), 42);
        assert_eq!(f64_to_i32(-42.9).unwrap(), -42);
        assert!(f64_to_i32(f64::NAN).is_err());
        assert!(f64_to_i32(f64::INFINITY).is_err());
        assert!(f64_to_i32(2147483648.0).is_err());
    }

    #[test]
    fn test_round_to_i32() {
        assert_eq!(round_to_i32(75.49).unwrap(), 75);
        assert_eq!(round_to_i32(75.5).unwrap(), 76);
        assert_eq!(round_to_i32(59.6).unwrap(), 60);
        assert!(round_to_i32(f64::NEG_INFINITY).is_err());
    }

    #[test]
    fn test_round_to_index() {
        assert_eq!(round_to_index(2.646).unwrap(), 3);
        assert_eq!(round_to_index(8.467).unwrap(), 8);
        assert_eq!(round_to_index(0.4).unwrap(), 0);
        assert!(round_to_index(-1.0).is_err());
        assert!(round_to_index(f64::NAN).is_err());
    }

    proptest! {
        #[test]
        fn prop_round_to_i32_within_half(value in -1.0e6f64..1.0e6) {
            let rounded = round_to_i32(value).unwrap();
            prop_assert!((f64::from(rounded) - value).abs() <= 0.5);
        }

        #[test]
        fn prop_round_to_index_matches_round(value in 0.0f64..1.0e6) {
            let index = round_to_index(value).unwrap();
            prop_assert_eq!(index as f64, value.round());
        }
    }
}
