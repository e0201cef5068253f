pub mod scenarios;
pub mod sensitivity;
pub mod valuation;
