use thiserror::Error;

#[derive(Debug, Error)]
pub enum RentRiskError {
    #[error("Invalid property financials: {field}: {reason}")]
    InvalidPropertyFinancials { field: String, reason: String },

    #[error("Invalid loan terms: {field}: {reason}")]
    InvalidLoanTerms { field: String, reason: String },

    #[error("Invalid simulation config: {field}: {reason}")]
    InvalidSimulationConfig { field: String, reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for RentRiskError {
    fn from(e: serde_json::Error) -> Self {
        RentRiskError::SerializationError(e.to_string())
    }
}
