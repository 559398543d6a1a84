use anyhow::{Context, Result};
use indexable_redirect::config::Config;
use std::path::PathBuf;

pub fn init_config(path: PathBuf) -> Result<()> {
    let config_path = path.join("config.toml");
    if config_path.exists() {
        anyhow::bail!("{} already exists", config_path.display());
    }

    std::fs::create_dir_all(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    let content = format!(
        "# Indexable redirect configuration\n\n{}",
        Config::default().to_toml()?
    );
    std::fs::write(&config_path, content)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    println!("Created configuration file: {}", config_path.display());
    println!();
    println!("Set [mirror].backend_origin to the mirror's backing store, then run:");
    println!("  indexable-redirect serve");
    Ok(())
}
