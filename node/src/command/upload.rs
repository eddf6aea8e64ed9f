use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use super::open_pipeline;
use crate::cli::Opts;
use chunkvault_node::pipeline::UploadResultKind;

/// Upload a file.
///
/// If a file with identical contents is already stored, the
/// existing file is returned and nothing is uploaded.
#[derive(Debug, Parser)]
pub struct Upload {
    /// The file to upload.
    path: PathBuf,

    /// The name to store the file under.
    ///
    /// Defaults to the file name.
    #[clap(long)]
    name: Option<String>,
}

pub async fn run(opts: Opts) -> Result<()> {
    let sub = opts.command.as_upload().unwrap();
    let pipeline = open_pipeline(&opts).await?;

    let result = pipeline.upload(&sub.path, sub.name.as_deref()).await?;
    let file = result.file;

    match result.kind {
        UploadResultKind::Uploaded => {
            eprintln!(
                "Uploaded {:?} ({} bytes in {} chunks)",
                file.name, file.size, file.num_chunks
            );
        }
        UploadResultKind::Deduplicated => {
            eprintln!("Already stored as {:?}", file.name);
        }
    }

    println!("{}", file.id);

    Ok(())
}
