use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::inputs::FinancialStatementSeries;
use crate::safe_math::{mean_or, safe_divide, DivisionFallback};
use crate::types::{Money, Rate};
use crate::DcfResult;

// Baselines used when a series has no samples (a single reporting period
// yields no year-over-year growth observation).
pub const DEFAULT_REVENUE_GROWTH: Rate = dec!(0.05);
pub const DEFAULT_OPERATING_MARGIN: Rate = dec!(0.15);
pub const DEFAULT_NET_MARGIN: Rate = dec!(0.0);
pub const DEFAULT_FCF_MARGIN: Rate = dec!(0.10);
pub const DEFAULT_CAPEX_PCT: Rate = dec!(0.03);
pub const DEFAULT_DA_PCT: Rate = dec!(0.03);

/// Growth, margin and reinvestment ratios derived from trailing statements.
///
/// Per-period vectors follow the statements' most-recent-first ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalMetrics {
    /// Year-over-year revenue growth (K−1 values)
    pub revenue_growths: Vec<Rate>,
    pub operating_margins: Vec<Rate>,
    pub net_margins: Vec<Rate>,
    pub fcf_margins: Vec<Rate>,
    /// |capex| / revenue
    pub capex_pcts: Vec<Rate>,
    /// |depreciation| / revenue
    pub da_pcts: Vec<Rate>,
    pub avg_revenue_growth: Rate,
    pub avg_operating_margin: Rate,
    pub avg_net_margin: Rate,
    pub avg_fcf_margin: Rate,
    pub avg_capex_pct: Rate,
    pub avg_da_pct: Rate,
}

impl HistoricalMetrics {
    /// True when the growth average is the documented default rather than
    /// an observed mean.
    pub fn growth_is_default(&self) -> bool {
        self.revenue_growths.is_empty()
    }
}

/// Derive historical growth and margin series and their averages.
///
/// Zero revenue in a period yields zero ratios for that period. The only
/// failure is a structural one: statement series of unequal length.
pub fn compute_historical_metrics(
    statements: &FinancialStatementSeries,
) -> DcfResult<HistoricalMetrics> {
    let periods = statements.validate()?;
    let revenue = &statements.revenue;

    let revenue_growths: Vec<Rate> = revenue
        .windows(2)
        .map(|pair| {
            safe_divide(
                pair[0].saturating_sub(pair[1]),
                pair[1].abs(),
                DivisionFallback::Value(Decimal::ZERO),
            )
        })
        .collect();

    let operating_margins = ratio_to_revenue(&statements.operating_income, revenue, false);
    let net_margins = ratio_to_revenue(&statements.net_income, revenue, false);
    let fcf_margins = ratio_to_revenue(&statements.free_cash_flow, revenue, false);
    let capex_pcts = ratio_to_revenue(&statements.capex, revenue, true);
    let da_pcts = ratio_to_revenue(&statements.depreciation, revenue, true);

    let metrics = HistoricalMetrics {
        avg_revenue_growth: mean_or(&revenue_growths, DEFAULT_REVENUE_GROWTH),
        avg_operating_margin: mean_or(&operating_margins, DEFAULT_OPERATING_MARGIN),
        avg_net_margin: mean_or(&net_margins, DEFAULT_NET_MARGIN),
        avg_fcf_margin: mean_or(&fcf_margins, DEFAULT_FCF_MARGIN),
        avg_capex_pct: mean_or(&capex_pcts, DEFAULT_CAPEX_PCT),
        avg_da_pct: mean_or(&da_pcts, DEFAULT_DA_PCT),
        revenue_growths,
        operating_margins,
        net_margins,
        fcf_margins,
        capex_pcts,
        da_pcts,
    };

    debug!(
        periods,
        avg_revenue_growth = %metrics.avg_revenue_growth,
        avg_operating_margin = %metrics.avg_operating_margin,
        "historical metrics computed"
    );

    Ok(metrics)
}

fn ratio_to_revenue(series: &[Money], revenue: &[Money], absolute: bool) -> Vec<Rate> {
    series
        .iter()
        .zip(revenue)
        .map(|(value, rev)| {
            let numerator = if absolute { value.abs() } else { *value };
            safe_divide(numerator, *rev, DivisionFallback::Value(Decimal::ZERO))
        })
        .collect()
}
