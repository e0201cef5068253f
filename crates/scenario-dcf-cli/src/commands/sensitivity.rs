use serde_json::Value;

use scenario_dcf_core::{build_sensitivity_tables, run_valuation};

use super::valuation::{load_model, ModelArgs};

pub fn run_sensitivity(args: ModelArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let model = load_model(&args)?;
    let run = run_valuation(&model.inputs, &model.registry, &model.config)?;
    let mut tables = build_sensitivity_tables(&run.result)?;
    // surface run-level diagnostics alongside the grid ones
    let mut warnings = run.warnings;
    warnings.append(&mut tables.warnings);
    tables.warnings = warnings;
    Ok(serde_json::to_value(tables)?)
}
