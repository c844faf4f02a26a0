pub mod amortization;
pub mod error;
pub mod types;

#[cfg(feature = "metrics")]
pub mod metrics;

#[cfg(feature = "projection")]
pub mod projection;

#[cfg(feature = "monte_carlo")]
pub mod monte_carlo;

pub use error::RentRiskError;
pub use types::*;

/// Standard result type for all rentrisk operations
pub type RentRiskResult<T> = Result<T, RentRiskError>;
