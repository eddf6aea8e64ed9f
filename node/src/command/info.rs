use anyhow::Result;
use clap::Parser;
use uuid::Uuid;

use super::open_pipeline;
use crate::cli::Opts;

/// Show information about a file and its chunks.
#[derive(Debug, Parser)]
pub struct Info {
    /// ID of the file.
    file_id: Uuid,
}

pub async fn run(opts: Opts) -> Result<()> {
    let sub = opts.command.as_info().unwrap();
    let pipeline = open_pipeline(&opts).await?;

    let (file, chunks) = pipeline.get_metadata(sub.file_id).await?;

    println!("ID:          {}", file.id);
    println!("Name:        {}", file.name);
    println!("Size:        {} bytes", file.size);
    println!("MIME type:   {}", file.mime_type);
    println!("SHA-256:     {}", file.file_hash);
    println!("State:       {:?}", file.state);
    println!("Chunk size:  {} bytes", file.chunk_size);
    println!("Chunks:      {}", file.num_chunks);
    println!("Created:     {}", file.created_at.to_rfc3339());

    if let Some(last_accessed_at) = file.last_accessed_at {
        println!("Accessed:    {}", last_accessed_at.to_rfc3339());
    }

    println!();

    for chunk in chunks {
        println!(
            "{:>6}  {:>10}  {:<10}  {:<16}  {}",
            chunk.seq,
            chunk.chunk_size,
            format!("{:?}", chunk.state),
            chunk.provider_id,
            chunk.chunk_hash
        );
    }

    Ok(())
}
