use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::DcfError;
use crate::inputs::FinancialStatementSeries;
use crate::scenarios::registry::ScenarioDefinition;
use crate::safe_math::checked;
use crate::time_value::compound_factor;
use crate::types::{Money, Rate};
use crate::DcfResult;

use super::metrics::HistoricalMetrics;
use super::wacc::effective_tax_rate;

/// Lowest adjusted revenue growth a scenario can start from.
pub const GROWTH_FLOOR: Rate = dec!(-0.15);
/// Lowest adjusted operating margin a scenario can use.
pub const MARGIN_FLOOR: Rate = dec!(0.01);
/// Faded growth never drops below this while the starting rate is positive.
pub const POSITIVE_GROWTH_FLOOR: Rate = dec!(0.005);

/// Everything needed to turn a starting growth/margin into a cash flow path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionBaseline {
    /// Latest reported revenue; every projected year is anchored on it
    pub base_revenue: Money,
    /// Starting growth rate, before fading
    pub growth: Rate,
    /// Operating margin, held flat over the horizon
    pub margin: Rate,
    pub tax_rate: Rate,
    pub da_pct: Rate,
    pub capex_pct: Rate,
    pub horizon: u32,
}

impl ProjectionBaseline {
    /// Baseline for a historical average growth and margin, with floors
    /// applied to the adjusted values.
    pub fn from_rates(
        statements: &FinancialStatementSeries,
        metrics: &HistoricalMetrics,
        growth: Rate,
        margin: Rate,
        horizon: u32,
    ) -> Self {
        ProjectionBaseline {
            base_revenue: FinancialStatementSeries::latest(&statements.revenue),
            growth,
            margin,
            tax_rate: effective_tax_rate(statements),
            da_pct: metrics.avg_da_pct,
            capex_pct: metrics.avg_capex_pct,
            horizon,
        }
        .with_rates(growth, margin)
    }

    /// Same baseline with a different starting growth and margin, floors
    /// applied.
    pub fn with_rates(&self, growth: Rate, margin: Rate) -> Self {
        ProjectionBaseline {
            growth: growth.max(GROWTH_FLOOR),
            margin: margin.max(MARGIN_FLOOR),
            ..self.clone()
        }
    }
}

/// Projected operating path for one scenario. Every vector has one entry
/// per projection year, year 1 first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub horizon: u32,
    pub base_revenue: Money,
    /// Scenario-adjusted starting growth (after the floor)
    pub adjusted_growth: Rate,
    /// Scenario-adjusted operating margin (after the floor)
    pub adjusted_margin: Rate,
    /// Faded growth applied in each year
    pub growth_rates: Vec<Rate>,
    pub margins: Vec<Rate>,
    pub tax_rate: Rate,
    pub da_pct: Rate,
    pub capex_pct: Rate,
    pub revenue: Vec<Money>,
    pub ebit: Vec<Money>,
    pub nopat: Vec<Money>,
    pub da: Vec<Money>,
    pub capex: Vec<Money>,
    pub fcf: Vec<Money>,
}

/// One row of a projection, for presentation layers that work year by year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedYear {
    pub year: u32,
    pub growth: Rate,
    pub margin: Rate,
    pub revenue: Money,
    pub ebit: Money,
    pub nopat: Money,
    pub da: Money,
    pub capex: Money,
    pub fcf: Money,
}

impl Projection {
    /// The baseline this projection was produced from.
    pub fn baseline(&self) -> ProjectionBaseline {
        ProjectionBaseline {
            base_revenue: self.base_revenue,
            growth: self.adjusted_growth,
            margin: self.adjusted_margin,
            tax_rate: self.tax_rate,
            da_pct: self.da_pct,
            capex_pct: self.capex_pct,
            horizon: self.horizon,
        }
    }

    pub fn years(&self) -> impl Iterator<Item = ProjectedYear> + '_ {
        (0..self.fcf.len()).map(move |i| ProjectedYear {
            year: i as u32 + 1,
            growth: self.growth_rates[i],
            margin: self.margins[i],
            revenue: self.revenue[i],
            ebit: self.ebit[i],
            nopat: self.nopat[i],
            da: self.da[i],
            capex: self.capex[i],
            fcf: self.fcf[i],
        })
    }

    /// Free cash flow of the final projected year.
    pub fn final_fcf(&self) -> Money {
        self.fcf.last().copied().unwrap_or(Decimal::ZERO)
    }
}

/// Project free cash flows for one scenario.
///
/// The scenario's deltas shift the historical average growth and margin;
/// the resulting path is produced by [`project_from_baseline`].
pub fn project_free_cash_flows(
    statements: &FinancialStatementSeries,
    metrics: &HistoricalMetrics,
    scenario: &ScenarioDefinition,
    horizon: u32,
) -> DcfResult<Projection> {
    statements.validate()?;
    let baseline = ProjectionBaseline::from_rates(
        statements,
        metrics,
        metrics
            .avg_revenue_growth
            .saturating_add(scenario.revenue_growth_adj),
        metrics.avg_operating_margin.saturating_add(scenario.margin_adj),
        horizon,
    );
    project_from_baseline(&baseline)
}

/// Turn a baseline into a year-by-year cash flow path.
///
/// Growth fades linearly: in year t of N the starting rate is scaled by
/// `1 - (t-1)/(2N)`, and a positive starting rate never fades below 0.5%.
/// Each year's revenue is `base * (1 + g_t)^t`, anchored on the base year
/// rather than compounded from the previous year.
///
/// FCF = EBIT * (1 - t) + D&A - CapEx
pub fn project_from_baseline(baseline: &ProjectionBaseline) -> DcfResult<Projection> {
    let n = baseline.horizon;
    if n == 0 {
        return Err(DcfError::InvalidInput {
            field: "projection_horizon".into(),
            reason: "Projection horizon must be at least one year".into(),
        });
    }

    let capacity = n as usize;
    let mut growth_rates = Vec::with_capacity(capacity);
    let mut margins = Vec::with_capacity(capacity);
    let mut revenue = Vec::with_capacity(capacity);
    let mut ebit = Vec::with_capacity(capacity);
    let mut nopat = Vec::with_capacity(capacity);
    let mut da = Vec::with_capacity(capacity);
    let mut capex = Vec::with_capacity(capacity);
    let mut fcf = Vec::with_capacity(capacity);

    let fade_span = Decimal::from(2 * n);
    for year in 1..=n {
        let fade = Decimal::ONE - Decimal::from(year - 1) / fade_span;
        let mut growth = baseline.growth * fade;
        if baseline.growth > Decimal::ZERO {
            growth = growth.max(POSITIVE_GROWTH_FLOOR);
        }

        let year_revenue = checked(
            baseline
                .base_revenue
                .checked_mul(compound_factor(growth, year)?),
            "projected revenue",
        )?;
        let year_ebit = checked(year_revenue.checked_mul(baseline.margin), "projected EBIT")?;
        let year_nopat = checked(
            Decimal::ONE
                .checked_sub(baseline.tax_rate)
                .and_then(|keep| year_ebit.checked_mul(keep)),
            "projected NOPAT",
        )?;
        let year_da = checked(year_revenue.checked_mul(baseline.da_pct), "projected D&A")?;
        let year_capex = checked(year_revenue.checked_mul(baseline.capex_pct), "projected CapEx")?;
        let year_fcf = checked(
            year_nopat
                .checked_add(year_da)
                .and_then(|v| v.checked_sub(year_capex)),
            "projected free cash flow",
        )?;

        growth_rates.push(growth);
        margins.push(baseline.margin);
        revenue.push(year_revenue);
        ebit.push(year_ebit);
        nopat.push(year_nopat);
        da.push(year_da);
        capex.push(year_capex);
        fcf.push(year_fcf);
    }

    Ok(Projection {
        horizon: n,
        base_revenue: baseline.base_revenue,
        adjusted_growth: baseline.growth,
        adjusted_margin: baseline.margin,
        growth_rates,
        margins,
        tax_rate: baseline.tax_rate,
        da_pct: baseline.da_pct,
        capex_pct: baseline.capex_pct,
        revenue,
        ebit,
        nopat,
        da,
        capex,
        fcf,
    })
}
