use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;
use std::time::Instant;
use tracing::{debug, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::engine::{ModelRun, ScenarioOutcome};
use crate::error::DcfError;
use crate::types::*;
use crate::valuation::dcf::{TERMINAL_GROWTH_FLOOR, WACC_FLOOR};
use crate::valuation::{discount_and_bridge, project_from_baseline};
use crate::DcfResult;

/// Discount-rate offsets for the rows of the discount-rate grid.
pub const DISCOUNT_RATE_STEPS: [Rate; 7] = [
    dec!(-0.03),
    dec!(-0.02),
    dec!(-0.01),
    dec!(0),
    dec!(0.01),
    dec!(0.02),
    dec!(0.03),
];
/// Terminal-growth offsets for the columns of the discount-rate grid.
pub const TERMINAL_GROWTH_STEPS: [Rate; 7] = [
    dec!(-0.015),
    dec!(-0.01),
    dec!(-0.005),
    dec!(0),
    dec!(0.005),
    dec!(0.01),
    dec!(0.015),
];
/// Revenue-growth offsets for the rows of the operating grid.
pub const GROWTH_STEPS: [Rate; 6] = [
    dec!(-0.04),
    dec!(-0.02),
    dec!(0),
    dec!(0.02),
    dec!(0.04),
    dec!(0.06),
];
/// Operating-margin offsets for the columns of the operating grid.
pub const MARGIN_STEPS: [Rate; 5] = [
    dec!(-0.04),
    dec!(-0.02),
    dec!(0),
    dec!(0.02),
    dec!(0.04),
];

const NOT_APPLICABLE: &str = "N/A";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One grid entry: an implied share price, or a marker for a combination
/// where the Gordon growth model is undefined (discount rate not above
/// terminal growth).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GridCell {
    Price(Money),
    NotApplicable,
}

impl GridCell {
    pub fn price(&self) -> Option<Money> {
        match self {
            GridCell::Price(p) => Some(*p),
            GridCell::NotApplicable => None,
        }
    }

    pub fn is_applicable(&self) -> bool {
        matches!(self, GridCell::Price(_))
    }
}

impl std::fmt::Display for GridCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GridCell::Price(p) => write!(f, "{:.2}", p.round_dp(2)),
            GridCell::NotApplicable => f.write_str(NOT_APPLICABLE),
        }
    }
}

impl Serialize for GridCell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            GridCell::Price(p) => Serialize::serialize(p, serializer),
            GridCell::NotApplicable => serializer.serialize_str(NOT_APPLICABLE),
        }
    }
}

impl<'de> Deserialize<'de> for GridCell {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawCell {
            Text(String),
            Number(Decimal),
        }

        match RawCell::deserialize(deserializer)? {
            RawCell::Text(s) if s == NOT_APPLICABLE => Ok(GridCell::NotApplicable),
            RawCell::Text(s) => Decimal::from_str(&s)
                .map(GridCell::Price)
                .map_err(serde::de::Error::custom),
            RawCell::Number(p) => Ok(GridCell::Price(p)),
        }
    }
}

/// A two-way table of implied share prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityGrid {
    pub row_variable: String,
    pub column_variable: String,
    pub row_values: Vec<Rate>,
    pub column_values: Vec<Rate>,
    /// cells[i][j] = price at (row_values[i], column_values[j])
    pub cells: Vec<Vec<GridCell>>,
    /// Base case price, read from the grid itself
    pub base_case_value: GridCell,
    /// Position of the base case in the grid (row, col)
    pub base_case_position: (usize, usize),
}

impl SensitivityGrid {
    pub fn cell(&self, row: usize, col: usize) -> Option<GridCell> {
        self.cells.get(row).and_then(|r| r.get(col)).copied()
    }

    pub fn not_applicable_count(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|c| !c.is_applicable())
            .count()
    }
}

/// Both sensitivity grids for a run's base case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityTables {
    pub ticker: String,
    /// Effective discount rate of the base case
    pub base_wacc: Rate,
    /// Effective terminal growth of the base case
    pub base_terminal_growth: Rate,
    pub base_implied_share_price: Money,
    pub current_price: Money,
    /// Rows: discount rate, columns: terminal growth
    pub discount_rate_vs_terminal_growth: SensitivityGrid,
    /// Rows: starting revenue growth, columns: operating margin
    pub growth_vs_margin: SensitivityGrid,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Build both sensitivity grids from the base scenario of a run.
///
/// Every cell goes through the same projection and discounting code as the
/// scenarios themselves, with net debt and share count held at the base
/// case values.
#[instrument(skip_all, fields(ticker = %run.ticker, horizon = run.horizon))]
pub fn build_sensitivity_tables(run: &ModelRun) -> DcfResult<ComputationOutput<SensitivityTables>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let base = run.base().ok_or_else(|| {
        DcfError::InsufficientData("Sensitivity grids require a 'base' scenario".into())
    })?;

    let discount_rate_vs_terminal_growth = discount_rate_grid(base)?;
    let growth_vs_margin = operating_grid(base, run)?;

    let skipped = discount_rate_vs_terminal_growth.not_applicable_count();
    if skipped > 0 {
        warnings.push(format!(
            "{skipped} discount rate / terminal growth combinations have no valid terminal value and are marked N/A"
        ));
    }

    debug!(
        skipped,
        base_wacc = %base.valuation.wacc,
        base_terminal_growth = %base.valuation.terminal_growth,
        "sensitivity grids built"
    );

    let output = SensitivityTables {
        ticker: run.ticker.clone(),
        base_wacc: base.valuation.wacc,
        base_terminal_growth: base.valuation.terminal_growth,
        base_implied_share_price: base.valuation.implied_share_price,
        current_price: base.valuation.current_price,
        discount_rate_vs_terminal_growth,
        growth_vs_margin,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "2-Way Sensitivity of Implied Share Price (base scenario)",
        &serde_json::json!({
            "discount_rate_steps": DISCOUNT_RATE_STEPS,
            "terminal_growth_steps": TERMINAL_GROWTH_STEPS,
            "growth_steps": GROWTH_STEPS,
            "margin_steps": MARGIN_STEPS,
            "wacc_floor": WACC_FLOOR,
            "terminal_growth_floor": TERMINAL_GROWTH_FLOOR,
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Re-discount the base FCF path over a discount rate × terminal growth
/// grid. Combinations with `wacc <= g` are marked N/A without dividing.
///
/// The axes are centred on the base case's effective discount rate and
/// terminal growth, after the 4% WACC floor and the terminal growth clamp.
/// Centring on the raw WACC and the configured terminal growth instead gives
/// different axes whenever the raw WACC is below 4% or the configured growth
/// exceeds WACC - 1%; otherwise the two coincide.
pub fn discount_rate_grid(base: &ScenarioOutcome) -> DcfResult<SensitivityGrid> {
    let v = &base.valuation;
    let fcfs = &base.projection.fcf;

    let row_values: Vec<Rate> = DISCOUNT_RATE_STEPS
        .iter()
        .map(|step| v.wacc.saturating_add(*step).max(WACC_FLOOR))
        .collect();
    let column_values: Vec<Rate> = TERMINAL_GROWTH_STEPS
        .iter()
        .map(|step| v.terminal_growth.saturating_add(*step).max(TERMINAL_GROWTH_FLOOR))
        .collect();

    evaluate_grid(
        "discount_rate",
        "terminal_growth",
        row_values,
        column_values,
        (3, 3),
        |wacc, growth| {
            if wacc <= growth {
                return Ok(GridCell::NotApplicable);
            }
            let bridge = discount_and_bridge(fcfs, wacc, growth, v.net_debt, v.shares_outstanding)?;
            Ok(GridCell::Price(bridge.implied_share_price))
        },
    )
}

/// Re-project the base case over a starting growth × operating margin grid
/// and value each path at the base case discount rate and terminal growth.
pub fn operating_grid(base: &ScenarioOutcome, run: &ModelRun) -> DcfResult<SensitivityGrid> {
    let v = &base.valuation;
    let template = base.projection.baseline();

    let row_values: Vec<Rate> = GROWTH_STEPS
        .iter()
        .map(|step| run.metrics.avg_revenue_growth.saturating_add(*step))
        .collect();
    let column_values: Vec<Rate> = MARGIN_STEPS
        .iter()
        .map(|step| run.metrics.avg_operating_margin.saturating_add(*step))
        .collect();

    evaluate_grid(
        "revenue_growth",
        "operating_margin",
        row_values,
        column_values,
        (2, 2),
        |growth, margin| {
            let projection = project_from_baseline(&template.with_rates(growth, margin))?;
            let bridge = discount_and_bridge(
                &projection.fcf,
                v.wacc,
                v.terminal_growth,
                v.net_debt,
                v.shares_outstanding,
            )?;
            Ok(GridCell::Price(bridge.implied_share_price))
        },
    )
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn evaluate_grid<F>(
    row_variable: &str,
    column_variable: &str,
    row_values: Vec<Rate>,
    column_values: Vec<Rate>,
    base_case_position: (usize, usize),
    eval_fn: F,
) -> DcfResult<SensitivityGrid>
where
    F: Fn(Rate, Rate) -> DcfResult<GridCell> + Sync,
{
    let cells = evaluate_rows(&row_values, &column_values, &eval_fn)?;
    let (base_row, base_col) = base_case_position;
    let base_case_value = cells
        .get(base_row)
        .and_then(|r| r.get(base_col))
        .copied()
        .unwrap_or(GridCell::NotApplicable);

    Ok(SensitivityGrid {
        row_variable: row_variable.to_string(),
        column_variable: column_variable.to_string(),
        row_values,
        column_values,
        cells,
        base_case_value,
        base_case_position,
    })
}

fn evaluate_row<F>(row: Rate, column_values: &[Rate], eval_fn: &F) -> DcfResult<Vec<GridCell>>
where
    F: Fn(Rate, Rate) -> DcfResult<GridCell>,
{
    column_values.iter().map(|col| eval_fn(row, *col)).collect()
}

#[cfg(feature = "parallel")]
fn evaluate_rows<F>(
    row_values: &[Rate],
    column_values: &[Rate],
    eval_fn: &F,
) -> DcfResult<Vec<Vec<GridCell>>>
where
    F: Fn(Rate, Rate) -> DcfResult<GridCell> + Sync,
{
    row_values
        .par_iter()
        .map(|row| evaluate_row(*row, column_values, eval_fn))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn evaluate_rows<F>(
    row_values: &[Rate],
    column_values: &[Rate],
    eval_fn: &F,
) -> DcfResult<Vec<Vec<GridCell>>>
where
    F: Fn(Rate, Rate) -> DcfResult<GridCell> + Sync,
{
    row_values
        .iter()
        .map(|row| evaluate_row(*row, column_values, eval_fn))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
