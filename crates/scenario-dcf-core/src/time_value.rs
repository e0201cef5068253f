use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;

use crate::error::DcfError;
use crate::safe_math::checked;
use crate::types::{Money, Rate};
use crate::DcfResult;

/// Compound growth factor (1 + rate)^periods
pub fn compound_factor(rate: Rate, periods: u32) -> DcfResult<Decimal> {
    let base = checked(Decimal::ONE.checked_add(rate), "compound factor")?;
    checked(base.checked_powi(i64::from(periods)), "compound factor")
}

/// Present value of a single amount received `periods` years from now,
/// computed as `amount / (1 + rate)^periods`.
pub fn present_value(amount: Money, rate: Rate, periods: u32) -> DcfResult<Money> {
    if rate <= Decimal::NEGATIVE_ONE {
        return Err(DcfError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }
    let factor = compound_factor(rate, periods)?;
    // a factor that underflows to zero is as unrepresentable as one that overflows
    checked(amount.checked_div(factor), "present value")
}

/// Gordon growth terminal value: `next_cash_flow / (rate - growth)`.
///
/// `next_cash_flow` is the first post-horizon cash flow, i.e. the final
/// projected flow already grown by one year.
pub fn gordon_terminal_value(next_cash_flow: Money, rate: Rate, growth: Rate) -> DcfResult<Money> {
    let spread = rate - growth;
    if spread <= Decimal::ZERO {
        return Err(DcfError::InvalidInput {
            field: "terminal_growth".into(),
            reason: format!(
                "Terminal growth ({growth}) must be below the discount rate ({rate})"
            ),
        });
    }
    checked(next_cash_flow.checked_div(spread), "terminal value")
}
