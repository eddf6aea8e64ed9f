use anyhow::{anyhow, Result};
use clap::Parser;
use uuid::Uuid;

use super::open_pipeline;
use crate::cli::Opts;

/// Verify the integrity of a file.
///
/// Every chunk is retrieved and checked against its digest. Chunk
/// and file states are updated with the outcome.
#[derive(Debug, Parser)]
pub struct Verify {
    /// ID of the file.
    file_id: Uuid,
}

pub async fn run(opts: Opts) -> Result<()> {
    let sub = opts.command.as_verify().unwrap();
    let pipeline = open_pipeline(&opts).await?;

    let report = pipeline.verify_integrity(sub.file_id).await?;

    for chunk in report.failures() {
        println!(
            "{:>6}  {:<10}  {:<16}  {}",
            chunk.seq,
            format!("{:?}", chunk.state),
            chunk.provider_id,
            chunk.error.as_deref().unwrap_or("")
        );
    }

    if !report.intact {
        return Err(anyhow!(
            "File {} is corrupted ({} of {} chunks failed)",
            report.file_id,
            report.failures().count(),
            report.chunks.len()
        ));
    }

    eprintln!(
        "File {} is intact ({} chunks)",
        report.file_id,
        report.chunks.len()
    );

    Ok(())
}
