pub mod dcf;
pub mod metrics;
pub mod projection;
pub mod wacc;

pub use dcf::{discount_and_bridge, value_projection, EquityBridge, Valuation};
pub use metrics::{compute_historical_metrics, HistoricalMetrics};
pub use projection::{
    project_free_cash_flows, project_from_baseline, ProjectedYear, Projection, ProjectionBaseline,
};
pub use wacc::{compute_wacc, CostOfDebtPolicy, WaccBreakdown};
