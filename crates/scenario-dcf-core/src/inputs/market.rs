use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Currency, Money, Rate};

/// Point-in-time market data for the company being valued.
///
/// Numeric fields that a provider could not supply are zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketSnapshot {
    pub ticker: String,
    pub company_name: String,
    pub sector: String,
    pub industry: String,
    pub country: String,
    pub currency: Currency,
    pub current_price: Money,
    pub market_cap: Money,
    pub shares_outstanding: Decimal,
    /// Levered equity beta; zero means unknown
    pub beta: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trailing_pe: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forward_pe: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dividend_yield: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fifty_two_week_high: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fifty_two_week_low: Option<Money>,
}

impl MarketSnapshot {
    /// Market value of equity: reported market cap, or price × shares when
    /// the market cap is unavailable.
    pub fn equity_market_value(&self) -> Money {
        if self.market_cap.is_zero() {
            self.current_price.saturating_mul(self.shares_outstanding)
        } else {
            self.market_cap
        }
    }

    /// Beta with the unknown (zero) case replaced by a market beta of 1.0.
    pub fn effective_beta(&self) -> Decimal {
        if self.beta.is_zero() {
            Decimal::ONE
        } else {
            self.beta
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_equity_value_prefers_market_cap() {
        let m = MarketSnapshot {
            current_price: dec!(100),
            shares_outstanding: dec!(10),
            market_cap: dec!(1200),
            ..Default::default()
        };
        assert_eq!(m.equity_market_value(), dec!(1200));
    }

    #[test]
    fn test_equity_value_falls_back_to_price_times_shares() {
        let m = MarketSnapshot {
            current_price: dec!(100),
            shares_outstanding: dec!(10),
            ..Default::default()
        };
        assert_eq!(m.equity_market_value(), dec!(1000));
    }

    #[test]
    fn test_unknown_beta_defaults_to_one() {
        let m = MarketSnapshot::default();
        assert_eq!(m.effective_beta(), Decimal::ONE);
        let m = MarketSnapshot {
            beta: dec!(1.24),
            ..Default::default()
        };
        assert_eq!(m.effective_beta(), dec!(1.24));
    }

    #[test]
    fn test_partial_json_coalesces_to_zero() {
        let m: MarketSnapshot =
            serde_json::from_str(r#"{"ticker": "SAMPLE", "current_price": 100}"#).unwrap();
        assert_eq!(m.ticker, "SAMPLE");
        assert_eq!(m.current_price, dec!(100));
        assert!(m.market_cap.is_zero());
        assert_eq!(m.currency, Currency::USD);
    }
}
