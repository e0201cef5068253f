use thiserror::Error;

#[derive(Debug, Error)]
pub enum DcfError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Series length mismatch: '{series}' has {actual} periods, expected {expected}")]
    SeriesLengthMismatch {
        series: String,
        expected: usize,
        actual: usize,
    },

    #[error("Arithmetic overflow: {context}")]
    ArithmeticOverflow { context: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for DcfError {
    fn from(e: serde_json::Error) -> Self {
        DcfError::SerializationError(e.to_string())
    }
}
