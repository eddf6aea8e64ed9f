use std::io;
use std::path::Path;

use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::instrument;
use uuid::Uuid;

use super::FilePipeline;
use crate::database::entity::chunk::ChunkModel;
use crate::database::entity::file::FileModel;
use crate::database::MetadataRepository;
use crate::distribution;
use crate::error::{NodeError, NodeResult};
use chunkvault::chunking::ChunkPayload;
use chunkvault::hash;

impl FilePipeline {
    /// Downloads a file to `output`, overwriting it.
    ///
    /// Every chunk is verified as it is retrieved, and the whole file
    /// is verified again after it has been written. If anything fails
    /// once the file is known to be live, the output is removed so that
    /// no stale or partial file is left at that path.
    #[instrument(skip_all, fields(file_id = %file_id, output = ?output))]
    pub async fn download(&self, file_id: Uuid, output: &Path) -> NodeResult<FileModel> {
        let (file, chunks) = self.load_live_file(file_id).await?;

        if let Err(e) = self.reassemble(&file, &chunks, output).await {
            remove_output(output).await;
            return Err(e);
        }

        self.database.bump_file_last_accessed(&file.id).await?;

        tracing::info!("Downloaded file {} to {:?}", file.id, output);

        Ok(file)
    }

    async fn reassemble(
        &self,
        file: &FileModel,
        chunks: &[ChunkModel],
        output: &Path,
    ) -> NodeResult<()> {
        if chunks.len() != file.num_chunks as usize {
            return Err(NodeError::IntegrityError(format!(
                "File {} should have {} chunks, found {}",
                file.id,
                file.num_chunks,
                chunks.len()
            )));
        }

        let payloads = distribution::collect(chunks, &self.providers).await?;
        write_payloads(output, &payloads).await?;

        let written = File::open(output).await?;
        let digest = hash::digest_stream(written).await?;

        if !digest.eq_ignore_ascii_case(&file.file_hash) {
            tracing::warn!("Reassembled file {} does not match its digest", file.id);

            return Err(NodeError::IntegrityError(format!(
                "Reassembled file {} does not match its digest",
                file.id
            )));
        }

        Ok(())
    }
}

/// Removes a failed download. A missing file is fine.
async fn remove_output(output: &Path) {
    match fs::remove_file(output).await {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove {:?}: {}", output, e),
    }
}

async fn write_payloads(output: &Path, payloads: &[ChunkPayload]) -> NodeResult<()> {
    let mut file = File::create(output).await?;

    for payload in payloads {
        file.write_all(&payload.data).await?;
    }

    file.sync_all().await?;

    Ok(())
}
