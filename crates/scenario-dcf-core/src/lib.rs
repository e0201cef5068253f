pub mod engine;
pub mod error;
pub mod inputs;
pub mod safe_math;
pub mod scenarios;
pub mod time_value;
pub mod types;
pub mod valuation;

pub use engine::{run_valuation, ModelRun, RunConfig, ScenarioOutcome, ScenarioSummaryRow};
pub use error::DcfError;
pub use inputs::{FinancialStatementSeries, MarketSnapshot, RateEnvironment, ValuationInputs};
pub use scenarios::registry::{ScenarioDefinition, ScenarioRegistry};
pub use types::*;

#[cfg(feature = "sensitivity")]
pub use scenarios::sensitivity::{build_sensitivity_tables, GridCell, SensitivityTables};

/// Standard result type for all valuation operations
pub type DcfResult<T> = Result<T, DcfError>;
