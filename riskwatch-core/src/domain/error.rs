// riskwatch-core/src/domain/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DomainError {
    #[error("Configuration Error: {0}")]
    #[diagnostic(
        code(riskwatch::domain::configuration),
        help("Check the 'prediction' and 'monitoring' sections of riskwatch.yaml.")
    )]
    Configuration(String),

    #[error(
        "Insufficient history for '{series}': {available} preceding buckets, window needs {required}"
    )]
    #[diagnostic(
        code(riskwatch::domain::data_gap),
        help("Z-scores stay null until enough buckets accumulate; widen 'lookback_buckets' or wait.")
    )]
    DataGap {
        series: String,
        available: usize,
        required: usize,
    },

    #[error("Alert #{0} not found")]
    #[diagnostic(code(riskwatch::domain::alert_not_found))]
    AlertNotFound(i64),

    #[error("Invalid alert transition: {from} -> {to}")]
    #[diagnostic(
        code(riskwatch::domain::transition),
        help("Closed alerts are terminal; a recurrence opens a new alert.")
    )]
    InvalidTransition { from: String, to: String },

    #[error("Invalid level '{0}'")]
    #[diagnostic(
        code(riskwatch::domain::level),
        help("Use 'global', 'queue:<name>', 'tag:<name>' or 'customer:<id>'.")
    )]
    InvalidLevel(String),

    #[error("Metric '{0}' is not configured")]
    #[diagnostic(code(riskwatch::domain::unknown_metric))]
    UnknownMetric(String),
}
