use anyhow::Result;
use clap::Parser;

use super::open_pipeline;
use crate::cli::Opts;

/// List stored files.
///
/// Deleted files are not shown.
#[derive(Debug, Parser)]
pub struct List {}

pub async fn run(opts: Opts) -> Result<()> {
    let pipeline = open_pipeline(&opts).await?;

    let files = pipeline.list_files().await?;

    if files.is_empty() {
        eprintln!("No files");
        return Ok(());
    }

    for file in files {
        println!(
            "{}  {:>12}  {:<10}  {}",
            file.id,
            file.size,
            format!("{:?}", file.state),
            file.name
        );
    }

    Ok(())
}
