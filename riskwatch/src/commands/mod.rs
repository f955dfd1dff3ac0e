// riskwatch/src/commands/mod.rs

pub mod alerts;
pub mod import;
pub mod init;
pub mod predict;
pub mod run;
pub mod series;

use anyhow::Context;
use std::path::Path;

use riskwatch_core::infrastructure::adapters::DuckDBStore;
use riskwatch_core::infrastructure::config::{ProjectConfig, load_project_config};

/// Loads the project configuration with a readable error context.
pub fn load_config(project_dir: &Path) -> anyhow::Result<ProjectConfig> {
    load_project_config(project_dir).with_context(|| {
        format!(
            "Failed to load project configuration from {:?}",
            project_dir
        )
    })
}

/// Opens the project's DuckDB file (relative paths resolve against the project directory).
pub fn open_store(project_dir: &Path, config: &ProjectConfig) -> anyhow::Result<DuckDBStore> {
    let db_path = if config.database == ":memory:" || Path::new(&config.database).is_absolute() {
        config.database.clone()
    } else {
        project_dir.join(&config.database).to_string_lossy().into_owned()
    };
    DuckDBStore::open(&db_path).with_context(|| format!("Failed to open DuckDB at {}", db_path))
}

/// `inf` for unbounded scores, 2 decimals otherwise.
pub fn fmt_score(z: Option<f64>) -> String {
    match z {
        None => "-".to_string(),
        Some(v) if v == f64::INFINITY => "+inf".to_string(),
        Some(v) if v == f64::NEG_INFINITY => "-inf".to_string(),
        Some(v) => format!("{:.2}", v),
    }
}
