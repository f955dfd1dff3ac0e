// riskwatch-core/src/infrastructure/config/project.rs

use serde::{Deserialize, de::DeserializeOwned};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};
use validator::Validate;

use crate::domain::monitoring::MetricDefinition;
use crate::domain::project::configuration::ProjectConfig;
use crate::infrastructure::error::InfrastructureError;

const CANDIDATES: [&str; 2] = ["riskwatch.yaml", "riskwatch_project.yaml"];

/// Loads, layers and validates the project configuration found in `project_dir`.
///
/// Order: project file, then `<config-path>/metrics.yml`, then `RISKWATCH_*` variables.
#[instrument(skip(project_dir))]
pub fn load_project_config(project_dir: &Path) -> Result<ProjectConfig, InfrastructureError> {
    load_with_env(project_dir, |key| std::env::var(key).ok())
}

fn load_with_env<E>(project_dir: &Path, env: E) -> Result<ProjectConfig, InfrastructureError>
where
    E: Fn(&str) -> Option<String>,
{
    let config_path = find_main_config(project_dir)?;
    info!(path = ?config_path, "Loading project configuration");

    let mut config: ProjectConfig = load_fragment(&config_path)?;

    if let Some(config_folder) = config.config_paths.first() {
        let config_dir = project_dir.join(config_folder);
        if config_dir.exists() {
            load_satellite_configs(&mut config, &config_dir)?;
        }
    }

    apply_env_overrides(&mut config, env)?;

    config.validate()?;
    Ok(config)
}

fn find_main_config(root: &Path) -> Result<PathBuf, InfrastructureError> {
    CANDIDATES
        .iter()
        .map(|filename| root.join(filename))
        .find(|p| p.exists())
        .ok_or_else(|| {
            InfrastructureError::ConfigNotFound(format!(
                "{} (checked {:?})",
                root.display(),
                CANDIDATES
            ))
        })
}

fn load_fragment<T: DeserializeOwned>(path: &Path) -> Result<T, InfrastructureError> {
    let content = fs::read_to_string(path)?;
    serde_yaml::from_str(&content).map_err(|e| {
        InfrastructureError::ConfigError(format!("{}: {}", path.display(), e))
    })
}

fn load_satellite_configs(
    config: &mut ProjectConfig,
    config_dir: &Path,
) -> Result<(), InfrastructureError> {
    let metrics_path = config_dir.join("metrics.yml");
    if metrics_path.exists() {
        #[derive(Deserialize)]
        struct MetricsWrapper {
            metrics: Vec<MetricDefinition>,
        }

        let wrapper: MetricsWrapper = load_fragment(&metrics_path)?;
        info!(count = wrapper.metrics.len(), "Metric catalogue loaded");
        config.monitoring.metrics = wrapper.metrics;
    }
    Ok(())
}

fn apply_env_overrides<E>(config: &mut ProjectConfig, env: E) -> Result<(), InfrastructureError>
where
    E: Fn(&str) -> Option<String>,
{
    if let Some(val) = env("RISKWATCH_DATABASE") {
        info!(old = ?config.database, new = ?val, "Overriding database via ENV");
        config.database = val;
    }
    if let Some(val) = env("RISKWATCH_TARGET_PATH") {
        info!(old = ?config.target_path, new = ?val, "Overriding target path via ENV");
        config.target_path = val;
    }
    if let Some(val) = env("RISKWATCH_POLICY") {
        let policy = val.parse().map_err(InfrastructureError::ConfigError)?;
        info!(old = ?config.prediction.policy, new = ?policy, "Overriding prediction policy via ENV");
        config.prediction.policy = policy;
    }
    Ok(())
}
