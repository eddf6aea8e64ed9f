//! Node configuration.

use std::collections::HashSet;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use derivative::Derivative;
use serde::Deserialize;
use xdg::BaseDirectories;

use crate::oobe;
use crate::storage::LocalStorageConfig;
use chunkvault::chunking::ChunkSizePolicy;

/// Application prefix in XDG base directories.
///
/// This will be concatenated into `$XDG_CONFIG_HOME/chunkvault`.
const XDG_PREFIX: &str = "chunkvault";

/// Environment variable holding the entire configuration.
///
/// This takes precedence over the XDG config file but not over an
/// explicitly given path.
const ENV_CONFIG: &str = "CHUNKVAULT_CONFIG";

/// Configuration for a Chunkvault node.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Database connection.
    pub database: DatabaseConfig,

    /// Chunk size selection.
    #[serde(default = "Default::default")]
    pub chunking: ChunkSizePolicy,

    /// Storage.
    pub storage: StorageConfig,
}

/// Database connection configuration.
#[derive(Clone, Derivative, Deserialize)]
#[derivative(Debug)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Connection URL.
    ///
    /// This may contain credentials.
    #[derivative(Debug = "ignore")]
    pub url: String,

    /// Maximum number of connections in the pool.
    #[serde(rename = "max-connections")]
    pub max_connections: Option<u32>,
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Upper bound for a single storage provider call.
    #[serde(rename = "operation-timeout")]
    #[serde(with = "humantime_serde", default = "default_operation_timeout")]
    pub operation_timeout: Duration,

    /// Maximum number of concurrent provider calls when deleting or
    /// verifying a file.
    #[serde(rename = "max-concurrency")]
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// The storage providers.
    ///
    /// Chunks are placed round-robin in this order. Provider IDs are
    /// recorded on every chunk and must never be changed once chunks
    /// refer to them.
    #[serde(default = "Vec::new")]
    pub providers: Vec<ProviderConfig>,
}

/// A storage provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Stable ID of the provider.
    pub id: String,

    /// Human-readable name.
    pub name: Option<String>,

    #[serde(flatten)]
    pub backend: BackendConfig,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum BackendConfig {
    /// Local file storage.
    #[serde(rename = "local")]
    Local(LocalStorageConfig),

    /// Storage in the metadata database.
    #[serde(rename = "database")]
    Database,
}

impl Config {
    /// Checks the configuration for consistency.
    pub fn validate(&self) -> Result<()> {
        self.chunking
            .validate()
            .context("Invalid chunking configuration")?;

        if self.storage.max_concurrency == 0 {
            return Err(anyhow!("storage.max-concurrency must be at least 1"));
        }

        if self.storage.operation_timeout.is_zero() {
            return Err(anyhow!("storage.operation-timeout must be non-zero"));
        }

        if self.storage.providers.is_empty() {
            return Err(anyhow!("At least one storage provider must be configured"));
        }

        let mut seen = HashSet::new();
        for provider in &self.storage.providers {
            if provider.id.trim().is_empty() {
                return Err(anyhow!("Storage provider IDs must not be empty"));
            }

            if !seen.insert(provider.id.as_str()) {
                return Err(anyhow!(
                    "Storage provider \"{}\" is configured more than once",
                    provider.id
                ));
            }
        }

        Ok(())
    }
}

impl ProviderConfig {
    /// Returns the name, falling back to the ID.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

fn default_operation_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_concurrency() -> usize {
    10
}

pub fn load_config_from_path(path: &Path) -> Result<Config> {
    tracing::info!("Using configurations: {:?}", path);

    let config = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file {:?}", path))?;
    parse_config(&config)
}

pub fn load_config_from_str(s: &str) -> Result<Config> {
    tracing::info!("Using configurations from environment variable");
    parse_config(s)
}

fn parse_config(s: &str) -> Result<Config> {
    let config: Config = toml::from_str(s).context("Invalid configuration file")?;
    config.validate()?;
    Ok(config)
}

/// Loads the configuration.
///
/// An explicit path wins, then the `CHUNKVAULT_CONFIG` environment
/// variable, then the XDG config file. If none exist and `allow_oobe`
/// is set, a default configuration is generated first.
pub async fn load_config(config_path: Option<&Path>, allow_oobe: bool) -> Result<Config> {
    if let Some(config_path) = config_path {
        return load_config_from_path(config_path);
    }

    if let Ok(config_env) = env::var(ENV_CONFIG) {
        return load_config_from_str(&config_env);
    }

    let config_path = get_xdg_config_path()?;

    if !config_path.exists() {
        if !allow_oobe {
            return Err(anyhow!(
                "No configuration file found at {:?}",
                config_path
            ));
        }

        oobe::run_oobe().await?;
    }

    load_config_from_path(&config_path)
}

pub fn get_xdg_config_path() -> Result<PathBuf> {
    let xdg_dirs = BaseDirectories::with_prefix(XDG_PREFIX)?;
    let config_path = xdg_dirs.place_config_file("node.toml")?;

    Ok(config_path)
}

pub fn get_xdg_data_path() -> Result<PathBuf> {
    let xdg_dirs = BaseDirectories::with_prefix(XDG_PREFIX)?;
    let data_path = xdg_dirs.create_data_directory("")?;

    Ok(data_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = r#"
[database]
url = "sqlite:///var/lib/chunkvault/metadata.db?mode=rwc"

[chunking]
min-size = 65536
default-size = 1048576
max-size = 10485760

[storage]
operation-timeout = "45s"
max-concurrency = 4

[[storage.providers]]
id = "disk0"
name = "Local disk"
type = "local"
path = "/var/lib/chunkvault/chunks"

[[storage.providers]]
id = "db"
type = "database"
"#;

    #[test]
    fn test_parse_example() {
        let config = load_config_from_str(EXAMPLE).unwrap();

        assert_eq!(ChunkSizePolicy::new(65536, 1048576, 10485760), config.chunking);
        assert_eq!(Duration::from_secs(45), config.storage.operation_timeout);
        assert_eq!(4, config.storage.max_concurrency);
        assert_eq!(None, config.database.max_connections);

        let providers = &config.storage.providers;
        assert_eq!(2, providers.len());

        assert_eq!("disk0", providers[0].id);
        assert_eq!("Local disk", providers[0].display_name());
        match &providers[0].backend {
            BackendConfig::Local(local) => {
                assert_eq!(Path::new("/var/lib/chunkvault/chunks"), local.path)
            }
            other => panic!("Expected a local backend, got {:?}", other),
        }

        assert_eq!("db", providers[1].display_name());
        assert!(matches!(providers[1].backend, BackendConfig::Database));
    }

    #[test]
    fn test_defaults() {
        let config = load_config_from_str(
            r#"
[database]
url = "sqlite://db.sqlite"

[[storage.providers]]
id = "db"
type = "database"
"#,
        )
        .unwrap();

        assert_eq!(ChunkSizePolicy::default(), config.chunking);
        assert_eq!(Duration::from_secs(30), config.storage.operation_timeout);
        assert_eq!(10, config.storage.max_concurrency);
    }

    #[test]
    fn test_debug_hides_url() {
        let config = load_config_from_str(EXAMPLE).unwrap();
        let debug = format!("{:?}", config);

        assert!(!debug.contains("metadata.db"));
    }

    #[test]
    fn test_invalid() {
        // no providers
        assert!(load_config_from_str(
            r#"
[database]
url = "sqlite://db.sqlite"

[storage]
"#
        )
        .is_err());

        // duplicate provider IDs
        assert!(load_config_from_str(
            r#"
[database]
url = "sqlite://db.sqlite"

[[storage.providers]]
id = "a"
type = "database"

[[storage.providers]]
id = "a"
type = "local"
path = "/tmp/a"
"#
        )
        .is_err());

        // inconsistent chunk sizes
        assert!(load_config_from_str(
            r#"
[database]
url = "sqlite://db.sqlite"

[chunking]
min-size = 2048
default-size = 1024
max-size = 4096

[[storage.providers]]
id = "db"
type = "database"
"#
        )
        .is_err());

        // unknown provider type
        assert!(load_config_from_str(
            r#"
[database]
url = "sqlite://db.sqlite"

[[storage.providers]]
id = "s3"
type = "s3"
"#
        )
        .is_err());

        // unknown key
        assert!(load_config_from_str(
            r#"
listen = "[::]:8080"

[database]
url = "sqlite://db.sqlite"

[[storage.providers]]
id = "db"
type = "database"
"#
        )
        .is_err());
    }
}
