//! Guided out-of-box experience.
//!
//! This performs automatic setup for people running `cvault`
//! without specifying any configurations, so they can try it out
//! with a config template that shows how to achieve a more
//! permanent setup.
//!
//! Paths:
//! - Config: `~/.config/chunkvault/node.toml`
//! - SQLite: `~/.local/share/chunkvault/metadata.db`
//! - Chunks: `~/.local/share/chunkvault/chunks`

use anyhow::{anyhow, Result};
use tokio::fs::{self, OpenOptions};

use crate::config;

const CONFIG_TEMPLATE: &str = include_str!("config-template.toml");

pub async fn run_oobe() -> Result<()> {
    let config_path = config::get_xdg_config_path()?;

    if config_path.exists() {
        return Ok(());
    }

    let data_path = config::get_xdg_data_path()?;

    // Generate a simple config
    let database_path = data_path.join("metadata.db");
    let database_path_str = database_path
        .to_str()
        .ok_or_else(|| anyhow!("Data path {:?} is not valid UTF-8", database_path))?;
    let database_url = format!("sqlite://{}?mode=rwc", database_path_str);
    OpenOptions::new()
        .create(true)
        .write(true)
        .open(&database_path)
        .await?;

    let storage_path = data_path.join("chunks");
    fs::create_dir_all(&storage_path).await?;
    let storage_path_str = storage_path
        .to_str()
        .ok_or_else(|| anyhow!("Data path {:?} is not valid UTF-8", storage_path))?;

    let config_content = CONFIG_TEMPLATE
        .replace("%database_url%", &database_url)
        .replace("%storage_path%", storage_path_str);

    fs::write(&config_path, config_content.as_bytes()).await?;

    eprintln!();
    eprintln!("-----------------");
    eprintln!("Welcome to Chunkvault!");
    eprintln!();
    eprintln!("A simple setup using SQLite and local storage has been configured for you in:");
    eprintln!();
    eprintln!("    {}", config_path.display());
    eprintln!();
    eprintln!("Chunks will be stored in:");
    eprintln!();
    eprintln!("    {}", storage_path_str);
    eprintln!("-----------------");
    eprintln!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::config::load_config_from_str;

    #[test]
    fn test_template_is_valid() {
        let content = CONFIG_TEMPLATE
            .replace("%database_url%", "sqlite:///tmp/metadata.db?mode=rwc")
            .replace("%storage_path%", "/tmp/chunks");

        let config = load_config_from_str(&content).unwrap();
        assert_eq!(1, config.storage.providers.len());
        assert_eq!("local", config.storage.providers[0].id);
    }
}
