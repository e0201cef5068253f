use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::DcfError;
use crate::inputs::{FinancialStatementSeries, ValuationInputs};
use crate::safe_math::{safe_divide, DivisionFallback};
use crate::scenarios::registry::{ScenarioDefinition, ScenarioRegistry, BASE_SCENARIO_KEY};
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::valuation::dcf::WACC_FLOOR;
use crate::valuation::wacc::CostOfDebtPolicy;
use crate::valuation::{
    compute_historical_metrics, compute_wacc, project_free_cash_flows, value_projection,
    HistoricalMetrics, Projection, Valuation, WaccBreakdown,
};
use crate::DcfResult;

/// Terminal value share of EV above which a run is flagged.
const TERMINAL_VALUE_WARNING_SHARE: Rate = dec!(0.75);

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Run-level assumptions shared by every scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Number of explicitly projected years
    pub projection_horizon: u32,
    /// Long-run growth before scenario adjustments
    pub terminal_growth: Rate,
    pub equity_risk_premium: Rate,
    pub cost_of_debt_policy: CostOfDebtPolicy,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            projection_horizon: 5,
            terminal_growth: dec!(0.025),
            equity_risk_premium: dec!(0.055),
            cost_of_debt_policy: CostOfDebtPolicy::default(),
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> DcfResult<()> {
        if self.projection_horizon == 0 {
            return Err(DcfError::InvalidInput {
                field: "projection_horizon".into(),
                reason: "Projection horizon must be at least one year".into(),
            });
        }
        if self.equity_risk_premium < Decimal::ZERO {
            return Err(DcfError::InvalidInput {
                field: "equity_risk_premium".into(),
                reason: "Equity risk premium cannot be negative".into(),
            });
        }
        if self.terminal_growth <= -Decimal::ONE {
            return Err(DcfError::InvalidInput {
                field: "terminal_growth".into(),
                reason: "Terminal growth must be greater than -100%".into(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Projection and valuation of one registered scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    pub scenario: ScenarioDefinition,
    pub projection: Projection,
    pub valuation: Valuation,
}

/// Result tree of a full run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRun {
    pub ticker: String,
    pub wacc: WaccBreakdown,
    pub metrics: HistoricalMetrics,
    /// Outcomes keyed by scenario key
    pub scenarios: BTreeMap<String, ScenarioOutcome>,
    /// Scenario keys in registration order
    pub scenario_order: Vec<String>,
    pub horizon: u32,
    pub terminal_growth: Rate,
}

/// One line of the per-scenario comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSummaryRow {
    pub key: String,
    pub name: String,
    pub implied_share_price: Money,
    pub current_price: Money,
    pub upside_downside: Rate,
    pub discount_rate: Rate,
    pub terminal_growth: Rate,
    pub enterprise_value: Money,
    /// Implied price minus the base scenario's, when a base scenario exists
    pub deviation_from_base: Option<Money>,
    pub deviation_pct: Option<Rate>,
}

impl ModelRun {
    /// The outcome of the `base` scenario, if one was registered.
    pub fn base(&self) -> Option<&ScenarioOutcome> {
        self.scenarios.get(BASE_SCENARIO_KEY)
    }

    pub fn outcome(&self, key: &str) -> Option<&ScenarioOutcome> {
        self.scenarios.get(key)
    }

    /// Outcomes in registration order.
    pub fn ordered(&self) -> impl Iterator<Item = &ScenarioOutcome> + '_ {
        self.scenario_order
            .iter()
            .filter_map(move |key| self.scenarios.get(key))
    }

    /// Per-scenario comparison rows, in registration order.
    pub fn summary(&self) -> Vec<ScenarioSummaryRow> {
        let base_price = self.base().map(|b| b.valuation.implied_share_price);
        self.ordered()
            .map(|outcome| {
                let v = &outcome.valuation;
                let deviation_from_base = base_price.map(|bp| v.implied_share_price.saturating_sub(bp));
                let deviation_pct = base_price.zip(deviation_from_base).map(|(bp, dev)| {
                    safe_divide(dev, bp, DivisionFallback::Value(Decimal::ZERO))
                });
                ScenarioSummaryRow {
                    key: outcome.scenario.key.clone(),
                    name: outcome.scenario.name.clone(),
                    implied_share_price: v.implied_share_price,
                    current_price: v.current_price,
                    upside_downside: v.upside_downside,
                    discount_rate: v.wacc,
                    terminal_growth: v.terminal_growth,
                    enterprise_value: v.enterprise_value,
                    deviation_from_base,
                    deviation_pct,
                }
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Value a company under every scenario in `registry`.
///
/// The WACC build-up and historical metrics are computed once and shared;
/// each scenario is then projected and valued independently.
#[instrument(
    skip_all,
    fields(ticker = %inputs.market.ticker, horizon = config.projection_horizon)
)]
pub fn run_valuation(
    inputs: &ValuationInputs,
    registry: &ScenarioRegistry,
    config: &RunConfig,
) -> DcfResult<ComputationOutput<ModelRun>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    // --- Validate ---
    let periods = inputs.statements.validate()?;
    config.validate()?;
    if registry.is_empty() {
        return Err(DcfError::InsufficientData(
            "At least one scenario must be registered".into(),
        ));
    }

    info!(periods, scenarios = registry.len(), "starting valuation run");

    // --- Shared components ---
    let wacc = compute_wacc(
        &inputs.market,
        &inputs.statements,
        &inputs.rates,
        config.equity_risk_premium,
        config.cost_of_debt_policy,
    )?;
    let metrics = compute_historical_metrics(&inputs.statements)?;
    collect_input_warnings(inputs, &wacc, &metrics, &mut warnings);

    // --- Scenarios ---
    let outcomes = evaluate_scenarios(inputs, registry, &wacc, &metrics, config)?;

    let scenario_order: Vec<String> = registry.keys().map(str::to_string).collect();
    let mut scenarios = BTreeMap::new();
    for outcome in outcomes {
        collect_scenario_warnings(&outcome.valuation, &mut warnings);
        scenarios.insert(outcome.scenario.key.clone(), outcome);
    }

    for w in &warnings {
        warn!("{w}");
    }

    let run = ModelRun {
        ticker: inputs.market.ticker.clone(),
        wacc,
        metrics,
        scenarios,
        scenario_order,
        horizon: config.projection_horizon,
        terminal_growth: config.terminal_growth,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    info!(
        scenarios = run.scenarios.len(),
        elapsed_us = elapsed,
        "valuation run finished"
    );

    Ok(with_metadata(
        "Multi-scenario FCFF DCF (CAPM WACC, faded growth, Gordon growth terminal value)",
        &serde_json::json!({
            "ticker": inputs.market.ticker,
            "config": config,
            "scenarios": run.scenario_order,
            "reporting_periods": periods,
        }),
        warnings,
        elapsed,
        run,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn evaluate_scenario(
    inputs: &ValuationInputs,
    scenario: &ScenarioDefinition,
    wacc: &WaccBreakdown,
    metrics: &HistoricalMetrics,
    config: &RunConfig,
) -> DcfResult<ScenarioOutcome> {
    let projection = project_free_cash_flows(
        &inputs.statements,
        metrics,
        scenario,
        config.projection_horizon,
    )?;
    let valuation = value_projection(
        &projection,
        wacc,
        scenario,
        &inputs.market,
        &inputs.statements,
        config.terminal_growth,
    )?;
    Ok(ScenarioOutcome {
        scenario: scenario.clone(),
        projection,
        valuation,
    })
}

#[cfg(feature = "parallel")]
fn evaluate_scenarios(
    inputs: &ValuationInputs,
    registry: &ScenarioRegistry,
    wacc: &WaccBreakdown,
    metrics: &HistoricalMetrics,
    config: &RunConfig,
) -> DcfResult<Vec<ScenarioOutcome>> {
    let definitions: Vec<&ScenarioDefinition> = registry.iter().collect();
    definitions
        .par_iter()
        .map(|scenario| evaluate_scenario(inputs, scenario, wacc, metrics, config))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn evaluate_scenarios(
    inputs: &ValuationInputs,
    registry: &ScenarioRegistry,
    wacc: &WaccBreakdown,
    metrics: &HistoricalMetrics,
    config: &RunConfig,
) -> DcfResult<Vec<ScenarioOutcome>> {
    registry
        .iter()
        .map(|scenario| evaluate_scenario(inputs, scenario, wacc, metrics, config))
        .collect()
}

fn collect_input_warnings(
    inputs: &ValuationInputs,
    wacc: &WaccBreakdown,
    metrics: &HistoricalMetrics,
    warnings: &mut Vec<String>,
) {
    let market = &inputs.market;
    let statements = &inputs.statements;

    if market.beta.is_zero() {
        warnings.push("Beta unavailable; cost of equity uses a market beta of 1.0".into());
    }
    if FinancialStatementSeries::latest(&statements.total_debt) <= Decimal::ZERO {
        warnings.push(format!(
            "No reported debt; cost of debt {:.4} derived under the {:?} policy",
            wacc.cost_of_debt, wacc.cost_of_debt_policy
        ));
    }
    if wacc.equity_value.saturating_add(wacc.debt_value) <= Decimal::ZERO {
        warnings.push(format!(
            "Capital base is zero; using default weights {:.0}% equity / {:.0}% debt",
            wacc.weight_equity * dec!(100),
            wacc.weight_debt * dec!(100)
        ));
    }
    let tax = FinancialStatementSeries::latest(&statements.tax_provision);
    let net_income = FinancialStatementSeries::latest(&statements.net_income);
    if tax.is_zero() && net_income.is_zero() {
        warnings.push(format!(
            "No income or tax reported; tax rate defaults to {:.0}%",
            wacc.tax_rate * dec!(100)
        ));
    }
    if metrics.growth_is_default() {
        warnings.push(format!(
            "Single reporting period; revenue growth baseline defaults to {:.2}%",
            metrics.avg_revenue_growth * dec!(100)
        ));
    }
    if market.shares_outstanding <= Decimal::ZERO {
        warnings.push("Shares outstanding unavailable; implied share prices are reported as 0".into());
    }
    if market.current_price <= Decimal::ZERO {
        warnings.push("Current price unavailable; upside/downside is reported as 0".into());
    }
}

fn collect_scenario_warnings(valuation: &Valuation, warnings: &mut Vec<String>) {
    let key = &valuation.scenario_key;
    if valuation.wacc_before_floor < WACC_FLOOR {
        warnings.push(format!(
            "[{key}] Discount rate {:.2}% floored at {:.2}%",
            valuation.wacc_before_floor.saturating_mul(dec!(100)),
            valuation.wacc.saturating_mul(dec!(100))
        ));
    }
    if valuation.terminal_growth != valuation.terminal_growth_before_clamp {
        warnings.push(format!(
            "[{key}] Terminal growth {:.2}% clamped to {:.2}%",
            valuation.terminal_growth_before_clamp.saturating_mul(dec!(100)),
            valuation.terminal_growth.saturating_mul(dec!(100))
        ));
    }
    if valuation.terminal_value_share > TERMINAL_VALUE_WARNING_SHARE {
        warnings.push(format!(
            "[{key}] Terminal value represents {:.1}% of enterprise value",
            valuation.terminal_value_share.saturating_mul(dec!(100))
        ));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::fixtures::sample_inputs;
    use rust_decimal_macros::dec;

    fn canonical_run() -> ComputationOutput<ModelRun> {
        run_valuation(
            &sample_inputs(),
            &ScenarioRegistry::canonical(),
            &RunConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_default_config() {
        let c = RunConfig::default();
        assert_eq!(c.projection_horizon, 5);
        assert_eq!(c.terminal_growth, dec!(0.025));
        assert_eq!(c.equity_risk_premium, dec!(0.055));
        assert_eq!(c.cost_of_debt_policy, CostOfDebtPolicy::UnitDenominator);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let c: RunConfig = serde_json::from_str(r#"{"projection_horizon": 7}"#).unwrap();
        assert_eq!(c.projection_horizon, 7);
        assert_eq!(c.terminal_growth, dec!(0.025));
    }

    #[test]
    fn test_zero_horizon_rejected() {
        let config = RunConfig {
            projection_horizon: 0,
            ..RunConfig::default()
        };
        let err = run_valuation(&sample_inputs(), &ScenarioRegistry::canonical(), &config);
        assert!(matches!(err, Err(DcfError::InvalidInput { .. })));
    }

    #[test]
    fn test_runs_every_registered_scenario() {
        let out = canonical_run();
        let run = &out.result;
        assert_eq!(run.scenarios.len(), 5);
        assert_eq!(
            run.scenario_order,
            vec!["base", "bull", "bear", "rate_hike", "rate_cut"]
        );
        assert_eq!(run.horizon, 5);
        assert_eq!(run.terminal_growth, dec!(0.025));
        for outcome in run.scenarios.values() {
            assert_eq!(outcome.projection.fcf.len(), 5);
            assert_eq!(outcome.scenario.key, outcome.valuation.scenario_key);
        }
    }

    #[test]
    fn test_base_price_reference() {
        let out = canonical_run();
        let price = out.result.base().unwrap().valuation.implied_share_price;
        let err = ((price - dec!(56.70856925339431)) / dec!(56.70856925339431)).abs();
        assert!(err < dec!(0.000001), "base price = {price}");
    }

    #[test]
    fn test_summary_rows_in_registration_order() {
        let out = canonical_run();
        let rows = out.result.summary();
        let keys: Vec<&str> = rows.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["base", "bull", "bear", "rate_hike", "rate_cut"]);
        assert_eq!(rows[0].deviation_from_base, Some(Decimal::ZERO));
        assert!(rows[1].deviation_from_base.unwrap() > Decimal::ZERO);
        assert!(rows[2].deviation_pct.unwrap() < Decimal::ZERO);
    }

    #[test]
    fn test_summary_without_base_has_no_deviation() {
        let registry = ScenarioRegistry::empty()
            .with_scenario(ScenarioDefinition::new("solo", "Solo", ""))
            .unwrap();
        let out = run_valuation(&sample_inputs(), &registry, &RunConfig::default()).unwrap();
        assert!(out.result.base().is_none());
        let rows = out.result.summary();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].deviation_from_base, None);
    }

    #[test]
    fn test_empty_registry_rejected() {
        let err = run_valuation(
            &sample_inputs(),
            &ScenarioRegistry::empty(),
            &RunConfig::default(),
        );
        assert!(matches!(err, Err(DcfError::InsufficientData(_))));
    }

    #[test]
    fn test_mismatched_series_fail_before_computing() {
        let mut inputs = sample_inputs();
        inputs.statements.capex.pop();
        let err = run_valuation(&inputs, &ScenarioRegistry::canonical(), &RunConfig::default());
        assert!(matches!(err, Err(DcfError::SeriesLengthMismatch { .. })));
    }

    #[test]
    fn test_warnings_for_degraded_inputs() {
        let mut inputs = sample_inputs();
        inputs.market.beta = Decimal::ZERO;
        inputs.market.current_price = Decimal::ZERO;
        inputs.statements.total_debt[0] = Decimal::ZERO;
        inputs.statements.interest_expense[0] = Decimal::ZERO;
        let out = run_valuation(&inputs, &ScenarioRegistry::canonical(), &RunConfig::default())
            .unwrap();
        assert!(out.warnings.iter().any(|w| w.starts_with("Beta unavailable")));
        assert!(out.warnings.iter().any(|w| w.starts_with("No reported debt")));
        assert!(out.warnings.iter().any(|w| w.starts_with("Current price unavailable")));
        assert_eq!(out.result.wacc.cost_of_debt, Decimal::ZERO);
    }

    #[test]
    fn test_floor_warning_names_scenario() {
        let registry = ScenarioRegistry::canonical()
            .with_scenario(
                ScenarioDefinition::new("collapse", "Rate Collapse", "").with_adjustments(
                    Decimal::ZERO,
                    Decimal::ZERO,
                    dec!(-0.5),
                    Decimal::ZERO,
                ),
            )
            .unwrap();
        let out = run_valuation(&sample_inputs(), &registry, &RunConfig::default()).unwrap();
        let collapse = &out.result.outcome("collapse").unwrap().valuation;
        assert_eq!(collapse.wacc, dec!(0.04));
        assert_eq!(collapse.terminal_growth, dec!(0.025));
        assert!(out.warnings.iter().any(|w| w.starts_with("[collapse] Discount rate")));
        assert!(!out.warnings.iter().any(|w| w.starts_with("[base] Discount rate")));
    }

    #[test]
    fn test_envelope_assumptions() {
        let out = canonical_run();
        assert_eq!(out.assumptions["ticker"], "SAMPLE");
        assert_eq!(out.assumptions["config"]["projection_horizon"], 5);
        assert_eq!(out.assumptions["reporting_periods"], 4);
        assert!(out.methodology.contains("DCF"));
    }
}
