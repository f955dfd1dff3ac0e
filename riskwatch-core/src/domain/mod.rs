// riskwatch-core/src/domain/mod.rs

pub mod alert;
pub mod error;
pub mod facts;
pub mod monitoring;
pub mod prediction;
pub mod project;

// Re-exports pratiques
pub use error::DomainError;
