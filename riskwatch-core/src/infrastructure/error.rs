// riskwatch-core/src/infrastructure/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DatabaseError {
    #[error("DuckDB Engine Error: {0}")]
    #[diagnostic(
        code(riskwatch::infra::database::duckdb),
        help("An error occurred inside the SQL engine.")
    )]
    DuckDB(#[from] duckdb::Error),
}

#[derive(Error, Debug, Diagnostic)]
pub enum InfrastructureError {
    // --- DATABASE (Abstracted) ---
    #[error(transparent)]
    #[diagnostic(transparent)]
    Database(#[from] DatabaseError),

    #[error("Store unavailable: {0}")]
    #[diagnostic(
        code(riskwatch::infra::store_unavailable),
        help("The store is locked or unreachable; the operation is retried with backoff.")
    )]
    StoreUnavailable(String),

    // --- FILESYSTEM (IO) ---
    #[error("File System Error: {0}")]
    #[diagnostic(
        code(riskwatch::infra::io),
        help("Check file permissions or path validity.")
    )]
    Io(#[from] std::io::Error),

    // --- CONFIG / YAML ---
    #[error("YAML Parsing Error: {0}")]
    #[diagnostic(
        code(riskwatch::infra::yaml),
        help("Check your YAML syntax (indentation, types).")
    )]
    YamlError(#[from] serde_yaml::Error),

    #[error("JSON Error: {0}")]
    #[diagnostic(code(riskwatch::infra::json))]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration Error: {0}")]
    ConfigError(String),

    #[error("Invalid configuration: {0}")]
    #[diagnostic(
        code(riskwatch::infra::validation),
        help("Fix the reported fields in riskwatch.yaml or config/metrics.yml.")
    )]
    Validation(#[from] validator::ValidationErrors),

    #[error("Project configuration not found at '{0}'")]
    #[diagnostic(code(riskwatch::infra::config_missing))]
    ConfigNotFound(String),
}

/// Lock contention, write-write conflicts and I/O failures are worth retrying.
fn is_transient_message(msg: &str) -> bool {
    let lower = msg.to_lowercase();
    lower.contains("could not set lock")
        || lower.contains("database is locked")
        || lower.contains("conflict on tuple")
        || lower.contains("write-write conflict")
        || lower.contains("io error")
}

impl From<duckdb::Error> for InfrastructureError {
    fn from(err: duckdb::Error) -> Self {
        if is_transient_message(&err.to_string()) {
            InfrastructureError::StoreUnavailable(err.to_string())
        } else {
            InfrastructureError::Database(DatabaseError::DuckDB(err))
        }
    }
}
