// riskwatch/src/commands/init.rs
//
// USE CASE: Create the schema.

use std::path::Path;

pub fn execute(project_dir: &Path) -> anyhow::Result<()> {
    let config = super::load_config(project_dir)?;
    println!("🏗️  Initializing '{}' (database: {})", config.name, config.database);

    // Opening the store creates every missing table.
    super::open_store(project_dir, &config)?;

    println!("✨ Schema ready.");
    Ok(())
}
