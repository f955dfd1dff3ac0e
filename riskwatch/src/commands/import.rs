// riskwatch/src/commands/import.rs
//
// USE CASE: Load facts from CSV files.

use anyhow::bail;
use std::path::{Path, PathBuf};

pub fn execute(
    project_dir: &Path,
    tickets: Option<PathBuf>,
    events: Option<PathBuf>,
) -> anyhow::Result<()> {
    if tickets.is_none() && events.is_none() {
        bail!("Nothing to import: pass --tickets and/or --events");
    }

    let config = super::load_config(project_dir)?;
    let store = super::open_store(project_dir, &config)?;

    if let Some(path) = tickets {
        let path = resolve(project_dir, path);
        let n = store.import_tickets_csv(&path)?;
        println!("📥 Imported {} tickets from {}", n, path.display());
    }
    if let Some(path) = events {
        let path = resolve(project_dir, path);
        let n = store.import_events_csv(&path)?;
        println!("📥 Imported {} events from {}", n, path.display());
    }
    Ok(())
}

fn resolve(project_dir: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() || path.exists() {
        path
    } else {
        project_dir.join(path)
    }
}
