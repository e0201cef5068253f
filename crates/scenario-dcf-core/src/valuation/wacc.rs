use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::inputs::{FinancialStatementSeries, MarketSnapshot, RateEnvironment};
use crate::safe_math::{checked, positive_or_zero, safe_divide, DivisionFallback};
use crate::types::{Money, Rate};
use crate::DcfResult;

/// Tax rate assumed when the latest period reports neither income nor tax.
pub const DEFAULT_TAX_RATE: Rate = dec!(0.21);
/// Capital weights assumed when the capital base is zero or negative.
pub const DEFAULT_EQUITY_WEIGHT: Rate = dec!(0.7);
pub const DEFAULT_DEBT_WEIGHT: Rate = dec!(0.3);

/// How the implied cost of debt is derived when the company reports no debt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostOfDebtPolicy {
    /// Divide interest expense by 1 instead of a zero debt balance. With the
    /// interest expense of a debt-free company this yields a cost of debt
    /// close to zero.
    #[default]
    UnitDenominator,
    /// Use the risk-free rate as the cost of debt whenever the debt balance
    /// is zero or negative.
    RiskFreeFallback,
}

/// Discount-rate build-up for a single run. Scenario adjustments are applied
/// later by the valuator, never here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaccBreakdown {
    pub wacc: Rate,
    /// CAPM: Rf + beta * ERP
    pub cost_of_equity: Rate,
    /// Pre-tax implied cost of debt
    pub cost_of_debt: Rate,
    pub after_tax_cost_of_debt: Rate,
    pub tax_rate: Rate,
    pub weight_equity: Rate,
    pub weight_debt: Rate,
    pub risk_free_rate: Rate,
    /// Beta actually used (1.0 when the snapshot reported none)
    pub beta: Decimal,
    pub equity_risk_premium: Rate,
    pub equity_value: Money,
    pub debt_value: Money,
    pub cost_of_debt_policy: CostOfDebtPolicy,
}

/// Effective tax rate of the latest period: |tax| / (|net income| + |tax|).
///
/// The pretax denominator is floored at 1; a period with neither income nor
/// tax falls back to [`DEFAULT_TAX_RATE`].
pub fn effective_tax_rate(statements: &FinancialStatementSeries) -> Rate {
    let tax = FinancialStatementSeries::latest(&statements.tax_provision).abs();
    let net_income = FinancialStatementSeries::latest(&statements.net_income).abs();
    let pretax_income = net_income.saturating_add(tax);
    if pretax_income <= Decimal::ZERO {
        return DEFAULT_TAX_RATE;
    }
    safe_divide(
        tax,
        pretax_income.max(Decimal::ONE),
        DivisionFallback::Value(DEFAULT_TAX_RATE),
    )
}

/// Implied pre-tax cost of debt: |interest expense| / total debt.
pub fn implied_cost_of_debt(
    statements: &FinancialStatementSeries,
    risk_free_rate: Rate,
    policy: CostOfDebtPolicy,
) -> Rate {
    let interest = FinancialStatementSeries::latest(&statements.interest_expense).abs();
    let debt = FinancialStatementSeries::latest(&statements.total_debt);
    match policy {
        CostOfDebtPolicy::UnitDenominator => {
            safe_divide(interest, debt, DivisionFallback::Denominator(Decimal::ONE))
        }
        CostOfDebtPolicy::RiskFreeFallback => {
            safe_divide(
                interest,
                positive_or_zero(debt),
                DivisionFallback::Value(risk_free_rate),
            )
        }
    }
}

/// Compute the weighted average cost of capital from market data, the latest
/// statement period and the rate environment.
///
/// WACC = We * Ke + Wd * Kd * (1 - t), with Ke from CAPM and Kd implied from
/// interest expense over total debt.
pub fn compute_wacc(
    market: &MarketSnapshot,
    statements: &FinancialStatementSeries,
    rates: &RateEnvironment,
    equity_risk_premium: Rate,
    policy: CostOfDebtPolicy,
) -> DcfResult<WaccBreakdown> {
    statements.validate()?;

    let risk_free_rate = rates.risk_free_rate;
    let beta = market.effective_beta();
    let cost_of_equity = checked(
        beta.checked_mul(equity_risk_premium)
            .and_then(|premium| risk_free_rate.checked_add(premium)),
        "cost of equity",
    )?;

    let cost_of_debt = implied_cost_of_debt(statements, risk_free_rate, policy);
    let tax_rate = effective_tax_rate(statements);
    let after_tax_cost_of_debt = cost_of_debt * (Decimal::ONE - tax_rate);

    let equity_value = market.equity_market_value();
    let debt_value = FinancialStatementSeries::latest(&statements.total_debt);
    let total_capital = equity_value.saturating_add(debt_value);
    // A non-positive capital base is treated like a missing one.
    let capital_base = positive_or_zero(total_capital);
    let weight_equity = safe_divide(
        equity_value,
        capital_base,
        DivisionFallback::Value(DEFAULT_EQUITY_WEIGHT),
    );
    let weight_debt = safe_divide(
        debt_value,
        capital_base,
        DivisionFallback::Value(DEFAULT_DEBT_WEIGHT),
    );

    let wacc = checked(
        weight_equity
            .checked_mul(cost_of_equity)
            .zip(weight_debt.checked_mul(after_tax_cost_of_debt))
            .and_then(|(equity_part, debt_part)| equity_part.checked_add(debt_part)),
        "WACC",
    )?;

    debug!(
        %wacc,
        %cost_of_equity,
        %cost_of_debt,
        %tax_rate,
        "WACC computed"
    );

    Ok(WaccBreakdown {
        wacc,
        cost_of_equity,
        cost_of_debt,
        after_tax_cost_of_debt,
        tax_rate,
        weight_equity,
        weight_debt,
        risk_free_rate,
        beta,
        equity_risk_premium,
        equity_value,
        debt_value,
        cost_of_debt_policy: policy,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
