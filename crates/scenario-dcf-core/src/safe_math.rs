//! Guarded arithmetic shared by every component.
//!
//! Financial inputs routinely contain zeros standing in for "unavailable".
//! Every division in the engine goes through [`safe_divide`] so the value
//! substituted for a zero denominator is named at the call site.
//!
//! Decimal arithmetic panics on overflow. Ratios saturate instead; the
//! projection and discounting paths use [`checked`] and fail with
//! [`DcfError::ArithmeticOverflow`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::DcfError;
use crate::DcfResult;

/// What to do when a denominator is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DivisionFallback {
    /// Return this value instead of dividing.
    Value(Decimal),
    /// Divide by this value instead of the zero denominator.
    Denominator(Decimal),
}

/// Divide `numerator` by `denominator`, applying `fallback` when the
/// denominator is zero.
///
/// A `Denominator(0)` fallback degrades to returning zero. Quotients too
/// large for a `Decimal` saturate at `Decimal::MAX` / `Decimal::MIN`.
pub fn safe_divide(numerator: Decimal, denominator: Decimal, fallback: DivisionFallback) -> Decimal {
    if !denominator.is_zero() {
        return saturating_divide(numerator, denominator);
    }
    match fallback {
        DivisionFallback::Value(v) => v,
        DivisionFallback::Denominator(d) if d.is_zero() => Decimal::ZERO,
        DivisionFallback::Denominator(d) => saturating_divide(numerator, d),
    }
}

fn saturating_divide(numerator: Decimal, denominator: Decimal) -> Decimal {
    numerator.checked_div(denominator).unwrap_or_else(|| {
        if numerator.is_sign_negative() == denominator.is_sign_negative() {
            Decimal::MAX
        } else {
            Decimal::MIN
        }
    })
}

/// Turn the result of a `checked_*` operation into a [`DcfResult`], naming
/// the quantity that overflowed.
pub fn checked(value: Option<Decimal>, context: &str) -> DcfResult<Decimal> {
    value.ok_or_else(|| DcfError::ArithmeticOverflow {
        context: context.to_string(),
    })
}

/// `value` if strictly positive, otherwise zero.
///
/// Used to route non-positive denominators (negative share counts, a
/// negative capital base) into the same zero-denominator fallback.
pub fn positive_or_zero(value: Decimal) -> Decimal {
    if value > Decimal::ZERO {
        value
    } else {
        Decimal::ZERO
    }
}

/// Arithmetic mean, or `default` for an empty slice.
pub fn mean_or(values: &[Decimal], default: Decimal) -> Decimal {
    if values.is_empty() {
        return default;
    }
    let count = Decimal::from(values.len());
    match values.iter().try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v)) {
        Some(sum) => sum / count,
        None => values
            .iter()
            .fold(Decimal::ZERO, |acc, v| acc.saturating_add(*v / count)),
    }
}

/// Clamp `value` to `[lower, upper]`, applying the upper bound first.
///
/// When the bounds cross, the lower bound wins.
pub fn clamp_upper_first(value: Decimal, lower: Decimal, upper: Decimal) -> Decimal {
    value.min(upper).max(lower)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_safe_divide_nonzero() {
        let r = safe_divide(dec!(10), dec!(4), DivisionFallback::Value(dec!(99)));
        assert_eq!(r, dec!(2.5));
    }

    #[test]
    fn test_safe_divide_value_fallback() {
        let r = safe_divide(dec!(10), Decimal::ZERO, DivisionFallback::Value(dec!(0.21)));
        assert_eq!(r, dec!(0.21));
    }

    #[test]
    fn test_safe_divide_denominator_fallback() {
        let r = safe_divide(dec!(7), Decimal::ZERO, DivisionFallback::Denominator(Decimal::ONE));
        assert_eq!(r, dec!(7));
        let r = safe_divide(Decimal::ZERO, Decimal::ZERO, DivisionFallback::Denominator(Decimal::ONE));
        assert_eq!(r, Decimal::ZERO);
    }

    #[test]
    fn test_safe_divide_zero_substitute() {
        let r = safe_divide(dec!(7), Decimal::ZERO, DivisionFallback::Denominator(Decimal::ZERO));
        assert_eq!(r, Decimal::ZERO);
    }

    #[test]
    fn test_safe_divide_saturates_on_overflow() {
        let tiny = dec!(0.0000000001);
        assert_eq!(
            safe_divide(Decimal::MAX, tiny, DivisionFallback::Value(Decimal::ZERO)),
            Decimal::MAX
        );
        assert_eq!(
            safe_divide(Decimal::MAX, -tiny, DivisionFallback::Value(Decimal::ZERO)),
            Decimal::MIN
        );
    }

    #[test]
    fn test_checked_names_the_overflow() {
        assert_eq!(checked(dec!(2).checked_mul(dec!(3)), "x").unwrap(), dec!(6));
        let err = checked(Decimal::MAX.checked_mul(dec!(2)), "revenue").unwrap_err();
        match err {
            DcfError::ArithmeticOverflow { context } => assert_eq!(context, "revenue"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_positive_or_zero() {
        assert_eq!(positive_or_zero(dec!(3)), dec!(3));
        assert_eq!(positive_or_zero(dec!(-3)), Decimal::ZERO);
    }

    #[test]
    fn test_mean_or() {
        assert_eq!(mean_or(&[], dec!(0.05)), dec!(0.05));
        assert_eq!(mean_or(&[dec!(0.1), dec!(0.2), dec!(0.3)], dec!(0.05)), dec!(0.2));
    }

    #[test]
    fn test_mean_or_does_not_overflow() {
        let m = mean_or(&[Decimal::MAX, Decimal::MAX], Decimal::ZERO);
        assert!(m > Decimal::MAX / dec!(2));
    }

    #[test]
    fn test_clamp_upper_first() {
        assert_eq!(clamp_upper_first(dec!(0.06), dec!(0.005), dec!(0.03)), dec!(0.03));
        assert_eq!(clamp_upper_first(dec!(0.001), dec!(0.005), dec!(0.03)), dec!(0.005));
        assert_eq!(clamp_upper_first(dec!(0.02), dec!(0.005), dec!(0.03)), dec!(0.02));
        // crossed bounds: floor wins
        assert_eq!(clamp_upper_first(dec!(0.02), dec!(0.005), dec!(0.001)), dec!(0.005));
    }
}
