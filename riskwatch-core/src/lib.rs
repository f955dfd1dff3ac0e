// riskwatch-core/src/lib.rs

#![allow(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::perf)]

// --- HEXAGONAL MODULES ---

// 1. Ports: storage contracts (facts, alerts, predictions).
pub mod ports;

// 2. Domain: series, rolling statistics, anomaly rules, alert lifecycle, prediction policy.
// Depends on nothing else in the crate.
pub mod domain;

// 3. Infrastructure: DuckDB store, config files, retry, filesystem.
pub mod infrastructure;

// 4. Application: monitoring run, alert materialization, prediction recording.
pub mod application;

pub mod error;

pub use error::RiskwatchError;
