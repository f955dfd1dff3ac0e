// riskwatch-core/src/error.rs

use crate::domain::error::DomainError;
use crate::infrastructure::error::InfrastructureError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RiskwatchError {
    // --- DOMAIN (policy, lifecycle, data gaps) ---
    #[error(transparent)]
    Domain(#[from] DomainError),

    // --- INFRASTRUCTURE (store, IO, config parsing) ---
    #[error(transparent)]
    Infrastructure(#[from] InfrastructureError),

    #[error("Internal Error: {0}")]
    InternalError(String),
}

impl RiskwatchError {
    /// Worth retrying: the store may answer on a later attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RiskwatchError::Infrastructure(InfrastructureError::StoreUnavailable(_))
        )
    }
}

impl From<std::io::Error> for RiskwatchError {
    fn from(err: std::io::Error) -> Self {
        RiskwatchError::Infrastructure(InfrastructureError::Io(err))
    }
}

impl From<duckdb::Error> for RiskwatchError {
    fn from(err: duckdb::Error) -> Self {
        RiskwatchError::Infrastructure(InfrastructureError::from(err))
    }
}
