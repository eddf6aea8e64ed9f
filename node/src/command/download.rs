use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use uuid::Uuid;

use super::open_pipeline;
use crate::cli::Opts;

/// Download a file.
///
/// Every chunk and the reassembled file are verified. If the file
/// does not match its digest, the output is removed.
#[derive(Debug, Parser)]
pub struct Download {
    /// ID of the file.
    file_id: Uuid,

    /// Where to write the file.
    ///
    /// An existing file is overwritten.
    output: PathBuf,
}

pub async fn run(opts: Opts) -> Result<()> {
    let sub = opts.command.as_download().unwrap();
    let pipeline = open_pipeline(&opts).await?;

    let file = pipeline.download(sub.file_id, &sub.output).await?;

    eprintln!(
        "Downloaded {:?} ({} bytes) to {}",
        file.name,
        file.size,
        sub.output.display()
    );

    Ok(())
}
