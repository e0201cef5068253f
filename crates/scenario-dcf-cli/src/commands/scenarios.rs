use clap::Args;
use serde_json::Value;

use scenario_dcf_core::ScenarioRegistry;

use crate::input;

/// Arguments for listing scenarios
#[derive(Args)]
pub struct ScenariosArgs {
    /// Extra scenarios (YAML or JSON list) to list after the default five
    #[arg(long)]
    pub scenarios: Option<String>,
}

pub fn run_scenarios(args: ScenariosArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let registry = match args.scenarios {
        Some(ref path) => {
            let extra: ScenarioRegistry = input::file::read_yaml(path)?;
            ScenarioRegistry::canonical().extended_with(&extra)?
        }
        None => ScenarioRegistry::canonical(),
    };
    Ok(serde_json::to_value(registry)?)
}
