use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::DcfError;
use crate::types::Money;
use crate::DcfResult;

/// Trailing financial statements, one entry per fiscal period.
///
/// Every series is ordered most-recent-first (index 0 is the latest period)
/// and all series share the same length. A zero entry means the value was
/// unavailable; there is no separate "missing" marker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialStatementSeries {
    /// Period labels, e.g. fiscal years
    pub years: Vec<String>,
    // --- Income statement ---
    pub revenue: Vec<Money>,
    pub cost_of_revenue: Vec<Money>,
    pub gross_profit: Vec<Money>,
    pub operating_income: Vec<Money>,
    pub ebitda: Vec<Money>,
    pub net_income: Vec<Money>,
    pub tax_provision: Vec<Money>,
    pub interest_expense: Vec<Money>,
    pub depreciation: Vec<Money>,
    // --- Balance sheet ---
    pub total_assets: Vec<Money>,
    pub total_liabilities: Vec<Money>,
    pub total_equity: Vec<Money>,
    pub total_debt: Vec<Money>,
    pub cash: Vec<Money>,
    pub current_assets: Vec<Money>,
    pub current_liabilities: Vec<Money>,
    // --- Cash flow statement ---
    pub operating_cash_flow: Vec<Money>,
    /// Capital expenditure; providers usually report it as a negative outflow
    pub capex: Vec<Money>,
    pub depreciation_amortization: Vec<Money>,
    pub change_in_working_capital: Vec<Money>,
    pub free_cash_flow: Vec<Money>,
}

impl FinancialStatementSeries {
    /// Statements with every series zero-filled to the length of `years`.
    pub fn zeroed(years: Vec<String>) -> Self {
        let zeros = vec![Decimal::ZERO; years.len()];
        FinancialStatementSeries {
            years,
            revenue: zeros.clone(),
            cost_of_revenue: zeros.clone(),
            gross_profit: zeros.clone(),
            operating_income: zeros.clone(),
            ebitda: zeros.clone(),
            net_income: zeros.clone(),
            tax_provision: zeros.clone(),
            interest_expense: zeros.clone(),
            depreciation: zeros.clone(),
            total_assets: zeros.clone(),
            total_liabilities: zeros.clone(),
            total_equity: zeros.clone(),
            total_debt: zeros.clone(),
            cash: zeros.clone(),
            current_assets: zeros.clone(),
            current_liabilities: zeros.clone(),
            operating_cash_flow: zeros.clone(),
            capex: zeros.clone(),
            depreciation_amortization: zeros.clone(),
            change_in_working_capital: zeros.clone(),
            free_cash_flow: zeros,
        }
    }

    fn numeric_series(&self) -> [(&'static str, &[Money]); 21] {
        [
            ("revenue", &self.revenue),
            ("cost_of_revenue", &self.cost_of_revenue),
            ("gross_profit", &self.gross_profit),
            ("operating_income", &self.operating_income),
            ("ebitda", &self.ebitda),
            ("net_income", &self.net_income),
            ("tax_provision", &self.tax_provision),
            ("interest_expense", &self.interest_expense),
            ("depreciation", &self.depreciation),
            ("total_assets", &self.total_assets),
            ("total_liabilities", &self.total_liabilities),
            ("total_equity", &self.total_equity),
            ("total_debt", &self.total_debt),
            ("cash", &self.cash),
            ("current_assets", &self.current_assets),
            ("current_liabilities", &self.current_liabilities),
            ("operating_cash_flow", &self.operating_cash_flow),
            ("capex", &self.capex),
            ("depreciation_amortization", &self.depreciation_amortization),
            ("change_in_working_capital", &self.change_in_working_capital),
            ("free_cash_flow", &self.free_cash_flow),
        ]
    }

    /// Check that every series has the same non-zero length and return it.
    ///
    /// Per-index alignment across series is what every downstream formula
    /// relies on, so a mismatch is rejected before any computation starts.
    pub fn validate(&self) -> DcfResult<usize> {
        let expected = self.revenue.len();
        if expected == 0 {
            return Err(DcfError::InsufficientData(
                "At least one reporting period is required".into(),
            ));
        }
        if self.years.len() != expected {
            return Err(DcfError::SeriesLengthMismatch {
                series: "years".into(),
                expected,
                actual: self.years.len(),
            });
        }
        for (name, series) in self.numeric_series() {
            if series.len() != expected {
                return Err(DcfError::SeriesLengthMismatch {
                    series: name.into(),
                    expected,
                    actual: series.len(),
                });
            }
        }
        Ok(expected)
    }

    /// Number of reporting periods (K).
    pub fn periods(&self) -> usize {
        self.revenue.len()
    }

    /// Latest-period value of a series, zero if the series is empty.
    pub fn latest(series: &[Money]) -> Money {
        series.first().copied().unwrap_or(Decimal::ZERO)
    }

    /// Latest period's total debt minus cash. Negative means net cash.
    pub fn net_debt(&self) -> Money {
        Self::latest(&self.total_debt).saturating_sub(Self::latest(&self.cash))
    }
}
