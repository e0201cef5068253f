use scenario_dcf_core::ValuationInputs;

const AAPL: &str = include_str!("../../samples/aapl.json");
const GENERIC: &str = include_str!("../../samples/generic.json");

/// Ticker of the generic sample company.
pub const GENERIC_TICKER: &str = "SAMPLE";

/// Bundled offline data for `ticker`.
///
/// Tickers without their own dataset get the generic company relabelled
/// with the requested ticker.
pub fn sample_inputs(ticker: &str) -> Result<ValuationInputs, Box<dyn std::error::Error>> {
    let ticker = ticker.trim().to_uppercase();
    if ticker == "AAPL" {
        return Ok(serde_json::from_str(AAPL)?);
    }

    let mut inputs: ValuationInputs = serde_json::from_str(GENERIC)?;
    if !ticker.is_empty() && ticker != GENERIC_TICKER {
        inputs.market.company_name = format!("{ticker} (Sample)");
        inputs.market.ticker = ticker;
    }
    Ok(inputs)
}
