use anyhow::{anyhow, Result};
use clap::Parser;

use super::open_pipeline;
use crate::cli::Opts;

/// Check the health of all storage providers.
#[derive(Debug, Parser)]
pub struct Health {}

pub async fn run(opts: Opts) -> Result<()> {
    let pipeline = open_pipeline(&opts).await?;

    let health = pipeline.check_providers().await;

    for provider in &health {
        println!(
            "{:<16}  {:<8}  {}",
            provider.provider_id,
            if provider.healthy { "ok" } else { "FAILED" },
            provider.display_name
        );
    }

    let unhealthy = health.iter().filter(|p| !p.healthy).count();
    if unhealthy > 0 {
        return Err(anyhow!("{} storage providers are unhealthy", unhealthy));
    }

    Ok(())
}
