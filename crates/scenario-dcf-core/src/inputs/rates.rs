use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::types::Rate;

/// Interest-rate backdrop for a valuation run. All yields are decimal
/// fractions (0.043 = 4.3%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateEnvironment {
    /// Risk-free rate used in CAPM (normally the 10-year treasury yield)
    pub risk_free_rate: Rate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub treasury_10y: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub treasury_2y: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fed_funds_rate: Option<Rate>,
    /// When the rates were observed
    #[serde(alias = "date_fetched", with = "as_of_format")]
    pub as_of: NaiveDateTime,
}

impl RateEnvironment {
    /// 10-year minus 2-year spread, when both yields are known.
    pub fn term_spread(&self) -> Option<Rate> {
        match (self.treasury_10y, self.treasury_2y) {
            (Some(long), Some(short)) => Some(long - short),
            _ => None,
        }
    }
}

/// Accepts `YYYY-MM-DD HH:MM`, `YYYY-MM-DD HH:MM:SS` and ISO-8601
/// `YYYY-MM-DDTHH:MM:SS`; always writes `YYYY-MM-DD HH:MM:SS`.
mod as_of_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const WRITE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
    const READ_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"];

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(WRITE_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        READ_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(&raw, fmt).ok())
            .ok_or_else(|| serde::de::Error::custom(format!("unrecognised timestamp '{raw}'")))
    }
}
