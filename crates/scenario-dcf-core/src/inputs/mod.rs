pub mod market;
pub mod rates;
pub mod statements;

pub use market::MarketSnapshot;
pub use rates::RateEnvironment;
pub use statements::FinancialStatementSeries;

use serde::{Deserialize, Serialize};

/// Everything the engine consumes about one company, already normalised by
/// whatever provider fetched it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationInputs {
    #[serde(alias = "financials")]
    pub statements: FinancialStatementSeries,
    #[serde(alias = "stock")]
    pub market: MarketSnapshot,
    pub rates: RateEnvironment,
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_field_aliases() {
        let json = serde_json::json!({
            "stock": { "ticker": "X", "current_price": 10 },
            "financials": serde_json::to_value(fixtures::sample_statements()).unwrap(),
            "rates": { "risk_free_rate": 0.04, "date_fetched": "2025-01-15 10:00" }
        });
        let inputs: ValuationInputs = serde_json::from_value(json).unwrap();
        assert_eq!(inputs.market.ticker, "X");
        assert_eq!(inputs.statements.validate().unwrap(), 4);
    }
}
