use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use scenario_dcf_core::valuation::wacc::CostOfDebtPolicy;
use scenario_dcf_core::{
    run_valuation, DcfError, FinancialStatementSeries, MarketSnapshot, RateEnvironment, RunConfig,
    ScenarioDefinition, ScenarioRegistry, ValuationInputs,
};

// ===========================================================================
// Fixtures
// ===========================================================================

fn billions(values: &[Decimal]) -> Vec<Decimal> {
    values.iter().map(|v| v * dec!(1_000_000_000)).collect()
}

/// The four-period sample company, most recent year first.
fn sample_statements() -> FinancialStatementSeries {
    let mut s = FinancialStatementSeries::zeroed(vec![
        "2024".into(),
        "2023".into(),
        "2022".into(),
        "2021".into(),
    ]);
    s.revenue = billions(&[dec!(10), dec!(9.2), dec!(8.5), dec!(7.8)]);
    s.operating_income = billions(&[dec!(2.5), dec!(2.2), dec!(2.0), dec!(1.8)]);
    s.net_income = billions(&[dec!(2), dec!(1.8), dec!(1.6), dec!(1.4)]);
    s.tax_provision = billions(&[dec!(0.5), dec!(0.45), dec!(0.4), dec!(0.35)]);
    s.interest_expense = billions(&[dec!(0.2), dec!(0.22), dec!(0.25), dec!(0.28)]);
    s.total_debt = billions(&[dec!(5), dec!(5.5), dec!(6), dec!(6.2)]);
    s.cash = billions(&[dec!(2), dec!(1.8), dec!(1.5), dec!(1.2)]);
    s.capex = billions(&[dec!(-0.5), dec!(-0.45), dec!(-0.4), dec!(-0.38)]);
    s.depreciation = billions(&[dec!(0.5), dec!(0.5), dec!(0.5), dec!(0.4)]);
    s.depreciation_amortization = s.depreciation.clone();
    s.free_cash_flow = billions(&[dec!(2.3), dec!(2.05), dec!(1.8), dec!(1.62)]);
    s
}

fn sample_market() -> MarketSnapshot {
    MarketSnapshot {
        ticker: "SAMPLE".into(),
        company_name: "Sample Corp".into(),
        current_price: dec!(100),
        market_cap: dec!(50_000_000_000),
        shares_outstanding: dec!(500_000_000),
        beta: dec!(1.1),
        ..MarketSnapshot::default()
    }
}

fn sample_rates() -> RateEnvironment {
    RateEnvironment {
        risk_free_rate: dec!(0.0435),
        treasury_10y: Some(dec!(0.0435)),
        treasury_2y: None,
        fed_funds_rate: None,
        as_of: NaiveDate::from_ymd_opt(2025, 1, 15)
            .and_then(|d| d.and_hms_opt(10, 0, 0))
            .unwrap(),
    }
}

fn sample_inputs() -> ValuationInputs {
    ValuationInputs {
        statements: sample_statements(),
        market: sample_market(),
        rates: sample_rates(),
    }
}

fn assert_close(actual: Decimal, expected: Decimal, what: &str) {
    let err = ((actual - expected) / expected).abs();
    assert!(
        err < dec!(0.000001),
        "{what}: expected ~{expected}, got {actual}"
    );
}

// ===========================================================================
// End-to-end
// ===========================================================================

#[test]
fn test_end_to_end_reference_prices() {
    let out = run_valuation(
        &sample_inputs(),
        &ScenarioRegistry::canonical(),
        &RunConfig::default(),
    )
    .unwrap();
    let run = &out.result;

    assert_close(run.metrics.avg_revenue_growth, dec!(0.08635101755306358), "avg growth");
    assert_close(run.wacc.wacc, dec!(0.0974545454545), "base WACC");
    assert_eq!(run.wacc.tax_rate, dec!(0.2));
    assert_eq!(run.wacc.cost_of_debt, dec!(0.04));

    let base = run.base().unwrap();
    assert_close(base.projection.revenue[0], dec!(10863510175.53), "revenue_1");

    let expected = [
        ("base", dec!(56.70856925339431)),
        ("bull", dec!(85.12167215493591)),
        ("bear", dec!(36.37658997055566)),
        ("rate_hike", dec!(42.06698109635484)),
        ("rate_cut", dec!(74.78994802979643)),
    ];
    for (key, price) in expected {
        let v = &run.outcome(key).unwrap().valuation;
        assert_close(v.implied_share_price, price, key);
    }
}

#[test]
fn test_bridge_identity_every_scenario() {
    let out = run_valuation(
        &sample_inputs(),
        &ScenarioRegistry::canonical(),
        &RunConfig::default(),
    )
    .unwrap();
    for outcome in out.result.scenarios.values() {
        let v = &outcome.valuation;
        assert_eq!(v.enterprise_value, v.pv_fcf_total + v.pv_terminal_value);
        assert_eq!(v.equity_value, v.enterprise_value - v.net_debt);
        assert!(v.wacc > v.terminal_growth);
    }
}

#[test]
fn test_scenario_ordering_of_prices() {
    let out = run_valuation(
        &sample_inputs(),
        &ScenarioRegistry::canonical(),
        &RunConfig::default(),
    )
    .unwrap();
    let price = |key: &str| out.result.outcome(key).unwrap().valuation.implied_share_price;
    assert!(price("bull") > price("base"));
    assert!(price("base") > price("bear"));
    assert!(price("rate_cut") > price("base"));
    assert!(price("rate_hike") < price("base"));
}

#[test]
fn test_identical_inputs_identical_results() {
    let inputs = sample_inputs();
    let registry = ScenarioRegistry::canonical();
    let config = RunConfig::default();
    let first = run_valuation(&inputs, &registry, &config).unwrap();
    let second = run_valuation(&inputs, &registry, &config).unwrap();
    assert_eq!(first.result, second.result);
    assert_eq!(first.warnings, second.warnings);
}

// ===========================================================================
// Degraded inputs
// ===========================================================================

#[test]
fn test_single_period_uses_defaults() {
    let mut s = FinancialStatementSeries::zeroed(vec!["2024".into()]);
    s.revenue = vec![dec!(1000)];
    s.operating_income = vec![dec!(180)];
    s.net_income = vec![dec!(120)];
    s.tax_provision = vec![dec!(30)];
    s.free_cash_flow = vec![dec!(90)];
    s.capex = vec![dec!(-40)];
    s.depreciation = vec![dec!(35)];
    let inputs = ValuationInputs {
        statements: s,
        ..sample_inputs()
    };

    let out = run_valuation(&inputs, &ScenarioRegistry::canonical(), &RunConfig::default())
        .unwrap();
    let m = &out.result.metrics;
    assert!(m.revenue_growths.is_empty());
    assert_eq!(m.avg_revenue_growth, dec!(0.05));
    assert_eq!(m.avg_operating_margin, dec!(0.18));
    assert_eq!(m.avg_net_margin, dec!(0.12));
    assert_eq!(m.avg_fcf_margin, dec!(0.09));
    assert_eq!(m.avg_capex_pct, dec!(0.04));
    assert_eq!(m.avg_da_pct, dec!(0.035));
    assert!(out.warnings.iter().any(|w| w.starts_with("Single reporting period")));
}

#[test]
fn test_zero_debt_is_finite() {
    let mut inputs = sample_inputs();
    inputs.statements.total_debt[0] = Decimal::ZERO;
    inputs.statements.interest_expense[0] = Decimal::ZERO;

    let out = run_valuation(&inputs, &ScenarioRegistry::canonical(), &RunConfig::default())
        .unwrap();
    let w = &out.result.wacc;
    assert_eq!(w.cost_of_debt, Decimal::ZERO);
    assert_eq!(w.weight_debt, Decimal::ZERO);
    assert_eq!(w.weight_equity, Decimal::ONE);
    assert_eq!(w.wacc, w.cost_of_equity);
}

#[test]
fn test_risk_free_fallback_policy() {
    let mut inputs = sample_inputs();
    inputs.statements.total_debt[0] = Decimal::ZERO;
    let config = RunConfig {
        cost_of_debt_policy: CostOfDebtPolicy::RiskFreeFallback,
        ..RunConfig::default()
    };
    let out = run_valuation(&inputs, &ScenarioRegistry::canonical(), &config).unwrap();
    assert_eq!(out.result.wacc.cost_of_debt, dec!(0.0435));
}

#[test]
fn test_missing_shares_and_price_degrade_to_zero() {
    let mut inputs = sample_inputs();
    inputs.market.shares_outstanding = Decimal::ZERO;
    inputs.market.current_price = Decimal::ZERO;
    let out = run_valuation(&inputs, &ScenarioRegistry::canonical(), &RunConfig::default())
        .unwrap();
    for outcome in out.result.scenarios.values() {
        assert_eq!(outcome.valuation.implied_share_price, Decimal::ZERO);
        assert_eq!(outcome.valuation.upside_downside, Decimal::ZERO);
        assert!(outcome.valuation.equity_value > Decimal::ZERO);
    }
}

#[test]
fn test_mismatched_lengths_fail_fast() {
    let mut inputs = sample_inputs();
    inputs.statements.free_cash_flow.push(Decimal::ZERO);
    let err = run_valuation(&inputs, &ScenarioRegistry::canonical(), &RunConfig::default())
        .unwrap_err();
    match err {
        DcfError::SeriesLengthMismatch {
            series,
            expected,
            actual,
        } => {
            assert_eq!(series, "free_cash_flow");
            assert_eq!(expected, 4);
            assert_eq!(actual, 5);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_empty_statements_rejected() {
    let inputs = ValuationInputs {
        statements: FinancialStatementSeries::zeroed(vec![]),
        ..sample_inputs()
    };
    let err = run_valuation(&inputs, &ScenarioRegistry::canonical(), &RunConfig::default());
    assert!(matches!(err, Err(DcfError::InsufficientData(_))));
}

// ===========================================================================
// Scenario floors and registry extension
// ===========================================================================

#[test]
fn test_extreme_scenario_is_floored_and_capped() {
    let registry = ScenarioRegistry::canonical()
        .with_scenario(
            ScenarioDefinition::new("melt_up", "Melt Up", "Rates collapse, growth soars")
                .with_adjustments(dec!(0.02), dec!(0.01), dec!(-0.5), dec!(0.035)),
        )
        .unwrap();
    let out = run_valuation(&sample_inputs(), &registry, &RunConfig::default()).unwrap();
    let v = &out.result.outcome("melt_up").unwrap().valuation;
    assert_eq!(v.wacc, dec!(0.04));
    assert_eq!(v.terminal_growth_before_clamp, dec!(0.06));
    assert_eq!(v.terminal_growth, dec!(0.03));
    assert!(out
        .warnings
        .iter()
        .any(|w| w.starts_with("[melt_up] Terminal growth")));
}

#[test]
fn test_sixth_scenario_leaves_the_others_unchanged() {
    let inputs = sample_inputs();
    let config = RunConfig::default();
    let canonical = run_valuation(&inputs, &ScenarioRegistry::canonical(), &config).unwrap();

    let stagflation = ScenarioDefinition::new(
        "stagflation",
        "Stagflation",
        "Slow growth with elevated rates",
    )
    .with_adjustments(dec!(-0.03), dec!(-0.02), dec!(0.015), dec!(-0.005));
    let extended_registry = ScenarioRegistry::canonical()
        .with_scenario(stagflation)
        .unwrap();
    let extended = run_valuation(&inputs, &extended_registry, &config).unwrap();

    assert_eq!(extended.result.scenarios.len(), 6);
    for (key, outcome) in &canonical.result.scenarios {
        assert_eq!(&extended.result.scenarios[key], outcome);
    }
    assert_eq!(extended.result.scenario_order.last().unwrap(), "stagflation");
}

#[test]
fn test_duplicate_scenario_key_rejected() {
    let err = ScenarioRegistry::canonical()
        .with_scenario(ScenarioDefinition::new("bull", "Another Bull", ""));
    assert!(matches!(err, Err(DcfError::InvalidInput { .. })));
}

#[test]
fn test_longer_horizon() {
    let config = RunConfig {
        projection_horizon: 10,
        ..RunConfig::default()
    };
    let out = run_valuation(&sample_inputs(), &ScenarioRegistry::canonical(), &config).unwrap();
    let base = out.result.base().unwrap();
    assert_eq!(out.result.horizon, 10);
    assert_eq!(base.projection.fcf.len(), 10);
    assert_eq!(base.valuation.pv_fcfs.len(), 10);
}

#[test]
fn test_result_tree_serializes() {
    let out = run_valuation(
        &sample_inputs(),
        &ScenarioRegistry::canonical(),
        &RunConfig::default(),
    )
    .unwrap();
    let json = serde_json::to_value(&out).unwrap();
    assert!(json["result"]["scenarios"]["base"]["valuation"]["implied_share_price"].is_string());
    assert_eq!(json["result"]["horizon"], 5);
    assert_eq!(json["metadata"]["precision"], "rust_decimal_128bit");
}

// ===========================================================================
// Unrepresentable magnitudes
// ===========================================================================

#[test]
fn test_hyper_growth_history_is_an_error_not_a_panic() {
    let mut s = FinancialStatementSeries::zeroed(vec!["2024".into(), "2023".into()]);
    s.revenue = vec![dec!(10_000_000_000), dec!(100_000)];
    s.operating_income = vec![dec!(2_000_000_000), dec!(20_000)];
    s.net_income = vec![dec!(1_500_000_000), dec!(15_000)];
    s.tax_provision = vec![dec!(400_000_000), dec!(4_000)];
    let inputs = ValuationInputs {
        statements: s,
        ..sample_inputs()
    };

    let err = run_valuation(&inputs, &ScenarioRegistry::canonical(), &RunConfig::default())
        .unwrap_err();
    assert!(
        matches!(err, DcfError::ArithmeticOverflow { .. }),
        "unexpected error: {err}"
    );
}

#[test]
fn test_very_long_horizon_is_an_error_not_a_panic() {
    let config = RunConfig {
        projection_horizon: 1000,
        ..RunConfig::default()
    };
    let err = run_valuation(&sample_inputs(), &ScenarioRegistry::canonical(), &config)
        .unwrap_err();
    assert!(
        matches!(err, DcfError::ArithmeticOverflow { .. }),
        "unexpected error: {err}"
    );
}

// ===========================================================================
// Parallel evaluation
// ===========================================================================

#[cfg(feature = "parallel")]
#[test]
fn test_parallel_run_matches_serial_reference() {
    let inputs = sample_inputs();
    let registry = ScenarioRegistry::canonical();
    let config = RunConfig::default();
    let out = run_valuation(&inputs, &registry, &config).unwrap();

    assert_eq!(
        out.result.scenarios.keys().collect::<Vec<_>>(),
        vec!["base", "bear", "bull", "rate_cut", "rate_hike"]
    );
    assert_eq!(
        out.result.scenario_order,
        vec!["base", "bull", "bear", "rate_hike", "rate_cut"]
    );
    let expected = [
        ("base", dec!(56.70856925339431)),
        ("bull", dec!(85.12167215493591)),
        ("bear", dec!(36.37658997055566)),
        ("rate_hike", dec!(42.06698109635484)),
        ("rate_cut", dec!(74.78994802979643)),
    ];
    for (key, price) in expected {
        let v = &out.result.outcome(key).unwrap().valuation;
        assert_close(v.implied_share_price, price, key);
    }

    let again = run_valuation(&inputs, &registry, &config).unwrap();
    assert_eq!(out.result, again.result);
    assert_eq!(out.warnings, again.warnings);
}
