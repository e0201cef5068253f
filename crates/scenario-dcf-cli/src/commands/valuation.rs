use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::debug;

use scenario_dcf_core::valuation::CostOfDebtPolicy;
use scenario_dcf_core::{
    run_valuation, with_metadata, RunConfig, ScenarioRegistry, ValuationInputs,
};

use crate::input;

/// Zero-debt cost of debt policy, as accepted on the command line
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PolicyArg {
    /// Interest expense divided by 1 when no debt is reported
    UnitDenominator,
    /// Risk-free rate as cost of debt when no debt is reported
    RiskFreeFallback,
}

impl From<PolicyArg> for CostOfDebtPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::UnitDenominator => CostOfDebtPolicy::UnitDenominator,
            PolicyArg::RiskFreeFallback => CostOfDebtPolicy::RiskFreeFallback,
        }
    }
}

/// Inputs and assumptions shared by every valuation command
#[derive(Args)]
pub struct ModelArgs {
    /// Path to JSON input file with statements, market snapshot and rates
    #[arg(long)]
    pub input: Option<String>,

    /// Use bundled offline data (AAPL, or the generic company for any other ticker)
    #[arg(
        long,
        value_name = "TICKER",
        num_args = 0..=1,
        default_missing_value = input::sample::GENERIC_TICKER
    )]
    pub sample: Option<String>,

    /// Run configuration file (YAML or JSON)
    #[arg(long)]
    pub config: Option<String>,

    /// Extra scenarios (YAML or JSON list) registered after the default five
    #[arg(long)]
    pub scenarios: Option<String>,

    /// Number of explicitly projected years
    #[arg(long)]
    pub projection_years: Option<u32>,

    /// Terminal growth rate before scenario adjustments (e.g. 0.025)
    #[arg(long, allow_negative_numbers = true)]
    pub terminal_growth: Option<Decimal>,

    /// Equity risk premium (e.g. 0.055 for 5.5%)
    #[arg(long, alias = "equity-risk-premium")]
    pub erp: Option<Decimal>,

    /// How cost of debt is derived when no debt is reported
    #[arg(long, value_enum)]
    pub cost_of_debt_policy: Option<PolicyArg>,
}

/// Everything a valuation command needs, resolved from files and flags.
pub struct LoadedModel {
    pub inputs: ValuationInputs,
    pub registry: ScenarioRegistry,
    pub config: RunConfig,
}

pub fn load_model(args: &ModelArgs) -> Result<LoadedModel, Box<dyn std::error::Error>> {
    let inputs: ValuationInputs = if let Some(ref ticker) = args.sample {
        input::sample::sample_inputs(ticker)?
    } else if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(piped) = input::stdin::read_stdin()? {
        piped
    } else {
        return Err("No input data: provide --input, pipe JSON on stdin, or use --sample".into());
    };

    let mut config: RunConfig = match args.config {
        Some(ref path) => input::file::read_yaml(path)?,
        None => RunConfig::default(),
    };
    if let Some(years) = args.projection_years {
        config.projection_horizon = years;
    }
    if let Some(g) = args.terminal_growth {
        config.terminal_growth = g;
    }
    if let Some(erp) = args.erp {
        config.equity_risk_premium = erp;
    }
    if let Some(policy) = args.cost_of_debt_policy {
        config.cost_of_debt_policy = policy.into();
    }
    config.validate()?;

    let registry = match args.scenarios {
        Some(ref path) => {
            let extra: ScenarioRegistry = input::file::read_yaml(path)?;
            ScenarioRegistry::canonical().extended_with(&extra)?
        }
        None => ScenarioRegistry::canonical(),
    };

    debug!(
        ticker = %inputs.market.ticker,
        scenarios = registry.len(),
        horizon = config.projection_horizon,
        "model inputs loaded"
    );

    Ok(LoadedModel {
        inputs,
        registry,
        config,
    })
}

pub fn run_value(args: ModelArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let model = load_model(&args)?;
    let result = run_valuation(&model.inputs, &model.registry, &model.config)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_summary(args: ModelArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let model = load_model(&args)?;
    let run = run_valuation(&model.inputs, &model.registry, &model.config)?;
    let summary = with_metadata(
        "Scenario comparison of implied share prices",
        &run.assumptions,
        run.warnings,
        run.metadata.computation_time_us,
        run.result.summary(),
    );
    Ok(serde_json::to_value(summary)?)
}
