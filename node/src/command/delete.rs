use anyhow::Result;
use clap::Parser;
use uuid::Uuid;

use super::open_pipeline;
use crate::cli::Opts;
use chunkvault_node::distribution::PayloadDeletion;

/// Delete a file.
///
/// Chunk payloads are removed on a best-effort basis. The file is
/// deleted even if some payloads cannot be removed.
#[derive(Debug, Parser)]
pub struct Delete {
    /// ID of the file.
    file_id: Uuid,
}

pub async fn run(opts: Opts) -> Result<()> {
    let sub = opts.command.as_delete().unwrap();
    let pipeline = open_pipeline(&opts).await?;

    let report = pipeline.delete(sub.file_id).await?;

    if !report.deleted {
        eprintln!("File {} was already deleted", report.file_id);
        return Ok(());
    }

    for (seq, outcome) in &report.payloads {
        match outcome {
            PayloadDeletion::Deleted => {}
            PayloadDeletion::NotFound => eprintln!("Chunk {}: already gone", seq),
            PayloadDeletion::Failed => eprintln!("Chunk {}: could not be removed", seq),
        }
    }

    eprintln!(
        "Deleted file {} ({} of {} payloads removed)",
        report.file_id,
        report.payloads.len() - report.failures(),
        report.payloads.len()
    );

    Ok(())
}
