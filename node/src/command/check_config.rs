use anyhow::Result;
use clap::Parser;

use crate::cli::Opts;
use chunkvault_node::config;

/// Check the configuration then exit.
///
/// This does not connect to the database.
#[derive(Debug, Parser)]
pub struct CheckConfig {}

pub async fn run(opts: Opts) -> Result<()> {
    let config = config::load_config(opts.config.as_deref(), false).await?;

    eprintln!(
        "Configuration is valid ({} storage providers)",
        config.storage.providers.len()
    );

    Ok(())
}
