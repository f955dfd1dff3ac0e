// src/domain/project/configuration.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::monitoring::config::MonitoringConfig;
use crate::domain::prediction::PredictionConfig;

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct ProjectConfig {
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,

    /// DuckDB file, relative to the project directory (or `:memory:`).
    #[serde(default = "default_database")]
    pub database: String,

    #[serde(rename = "config-paths", default = "default_config_paths")]
    pub config_paths: Vec<String>,

    #[serde(rename = "target-path", default = "default_target_path")]
    pub target_path: String,

    #[validate(nested)]
    #[serde(default)]
    pub monitoring: MonitoringConfig,

    #[validate(nested)]
    #[serde(default)]
    pub prediction: PredictionConfig,
}

fn default_version() -> String {
    "0.1.0".to_string()
}
fn default_database() -> String {
    "riskwatch.duckdb".to_string()
}
fn default_config_paths() -> Vec<String> {
    vec!["config".to_string()]
}
fn default_target_path() -> String {
    "target".to_string()
}
