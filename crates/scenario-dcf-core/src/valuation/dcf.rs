use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::DcfError;
use crate::inputs::{FinancialStatementSeries, MarketSnapshot};
use crate::safe_math::{
    checked, clamp_upper_first, positive_or_zero, safe_divide, DivisionFallback,
};
use crate::scenarios::registry::ScenarioDefinition;
use crate::time_value::{gordon_terminal_value, present_value};
use crate::types::{Money, Rate};
use crate::DcfResult;

use super::projection::Projection;
use super::wacc::WaccBreakdown;

// ---------------------------------------------------------------------------
// Bounds
// ---------------------------------------------------------------------------

/// Scenario discount rates never fall below 4%.
pub const WACC_FLOOR: Rate = dec!(0.04);
/// Terminal growth never falls below 0.5%.
pub const TERMINAL_GROWTH_FLOOR: Rate = dec!(0.005);
/// Terminal growth stays at least this far below the discount rate.
pub const TERMINAL_GROWTH_SPREAD: Rate = dec!(0.01);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Discounting and enterprise-to-equity bridge for one FCF path at one
/// (discount rate, terminal growth) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityBridge {
    pub pv_fcfs: Vec<Money>,
    pub pv_fcf_total: Money,
    /// Final-year FCF grown one year at the terminal rate
    pub terminal_fcf: Money,
    pub terminal_value: Money,
    pub pv_terminal_value: Money,
    pub enterprise_value: Money,
    pub net_debt: Money,
    pub equity_value: Money,
    pub shares_outstanding: Decimal,
    pub implied_share_price: Money,
}

/// Full valuation of one scenario, keeping every intermediate step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    pub scenario_key: String,
    pub scenario_name: String,
    pub scenario_description: String,
    /// Base WACC plus the scenario adjustment, before the floor
    pub wacc_before_floor: Rate,
    /// Discount rate used
    pub wacc: Rate,
    /// Configured terminal growth plus the scenario adjustment, before clamping
    pub terminal_growth_before_clamp: Rate,
    /// Terminal growth used
    pub terminal_growth: Rate,
    pub pv_fcfs: Vec<Money>,
    pub pv_fcf_total: Money,
    pub terminal_fcf: Money,
    pub terminal_value: Money,
    pub pv_terminal_value: Money,
    pub enterprise_value: Money,
    pub net_debt: Money,
    pub equity_value: Money,
    pub shares_outstanding: Decimal,
    pub implied_share_price: Money,
    pub current_price: Money,
    /// (implied - current) / current
    pub upside_downside: Rate,
    /// PV of terminal value as a fraction of enterprise value
    pub terminal_value_share: Rate,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Scenario discount rate: base WACC plus the scenario delta, floored at 4%.
pub fn scenario_discount_rate(base_wacc: Rate, scenario: &ScenarioDefinition) -> Rate {
    base_wacc.saturating_add(scenario.wacc_adj).max(WACC_FLOOR)
}

/// Scenario terminal growth: configured growth plus the scenario delta,
/// capped 100bp below `discount_rate` and floored at 0.5%.
pub fn scenario_terminal_growth(
    terminal_growth: Rate,
    scenario: &ScenarioDefinition,
    discount_rate: Rate,
) -> Rate {
    clamp_upper_first(
        terminal_growth.saturating_add(scenario.terminal_growth_adj),
        TERMINAL_GROWTH_FLOOR,
        discount_rate.saturating_sub(TERMINAL_GROWTH_SPREAD),
    )
}

/// Discount an FCF path and bridge enterprise value to a per-share price.
///
/// PV_t = FCF_t / (1 + r)^t
/// TV   = FCF_N * (1 + g) / (r - g)
/// EV   = sum(PV_t) + TV / (1 + r)^N
/// Equity = EV - net debt; price = equity / shares (0 without shares)
pub fn discount_and_bridge(
    fcfs: &[Money],
    discount_rate: Rate,
    terminal_growth: Rate,
    net_debt: Money,
    shares_outstanding: Decimal,
) -> DcfResult<EquityBridge> {
    let last_fcf = *fcfs.last().ok_or_else(|| {
        DcfError::InsufficientData("No projected cash flows to discount".into())
    })?;
    let horizon = fcfs.len() as u32;

    let pv_fcfs = fcfs
        .iter()
        .zip(1u32..)
        .map(|(fcf, year)| present_value(*fcf, discount_rate, year))
        .collect::<DcfResult<Vec<Money>>>()?;
    let pv_fcf_total = checked(
        pv_fcfs
            .iter()
            .try_fold(Decimal::ZERO, |acc, pv| acc.checked_add(*pv)),
        "sum of discounted cash flows",
    )?;

    let terminal_fcf = checked(
        Decimal::ONE
            .checked_add(terminal_growth)
            .and_then(|factor| last_fcf.checked_mul(factor)),
        "terminal cash flow",
    )?;
    let terminal_value = gordon_terminal_value(terminal_fcf, discount_rate, terminal_growth)?;
    let pv_terminal_value = present_value(terminal_value, discount_rate, horizon)?;

    let enterprise_value = checked(
        pv_fcf_total.checked_add(pv_terminal_value),
        "enterprise value",
    )?;
    let equity_value = checked(enterprise_value.checked_sub(net_debt), "equity value")?;
    let implied_share_price = safe_divide(
        equity_value,
        positive_or_zero(shares_outstanding),
        DivisionFallback::Value(Decimal::ZERO),
    );

    Ok(EquityBridge {
        pv_fcfs,
        pv_fcf_total,
        terminal_fcf,
        terminal_value,
        pv_terminal_value,
        enterprise_value,
        net_debt,
        equity_value,
        shares_outstanding,
        implied_share_price,
    })
}

/// Value a scenario's projection.
///
/// Applies the scenario's discount-rate and terminal-growth adjustments to
/// the run-level WACC and terminal growth, discounts the projected FCFs and
/// compares the implied price with the market price.
pub fn value_projection(
    projection: &Projection,
    wacc: &WaccBreakdown,
    scenario: &ScenarioDefinition,
    market: &MarketSnapshot,
    statements: &FinancialStatementSeries,
    terminal_growth: Rate,
) -> DcfResult<Valuation> {
    let wacc_before_floor = wacc.wacc.saturating_add(scenario.wacc_adj);
    let discount_rate = scenario_discount_rate(wacc.wacc, scenario);
    let terminal_growth_before_clamp = terminal_growth.saturating_add(scenario.terminal_growth_adj);
    let growth = scenario_terminal_growth(terminal_growth, scenario, discount_rate);

    let bridge = discount_and_bridge(
        &projection.fcf,
        discount_rate,
        growth,
        statements.net_debt(),
        market.shares_outstanding,
    )?;

    let current_price = market.current_price;
    let upside_downside = safe_divide(
        bridge.implied_share_price.saturating_sub(current_price),
        positive_or_zero(current_price),
        DivisionFallback::Value(Decimal::ZERO),
    );
    let terminal_value_share = safe_divide(
        bridge.pv_terminal_value,
        bridge.enterprise_value,
        DivisionFallback::Value(Decimal::ZERO),
    );

    debug!(
        scenario = %scenario.key,
        %discount_rate,
        terminal_growth = %growth,
        implied_share_price = %bridge.implied_share_price,
        "scenario valued"
    );

    Ok(Valuation {
        scenario_key: scenario.key.clone(),
        scenario_name: scenario.name.clone(),
        scenario_description: scenario.description.clone(),
        wacc_before_floor,
        wacc: discount_rate,
        terminal_growth_before_clamp,
        terminal_growth: growth,
        pv_fcfs: bridge.pv_fcfs,
        pv_fcf_total: bridge.pv_fcf_total,
        terminal_fcf: bridge.terminal_fcf,
        terminal_value: bridge.terminal_value,
        pv_terminal_value: bridge.pv_terminal_value,
        enterprise_value: bridge.enterprise_value,
        net_debt: bridge.net_debt,
        equity_value: bridge.equity_value,
        shares_outstanding: bridge.shares_outstanding,
        implied_share_price: bridge.implied_share_price,
        current_price,
        upside_downside,
        terminal_value_share,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
