use chrono::Utc;
use sea_orm::TransactionTrait;
use tracing::instrument;
use uuid::Uuid;

use super::FilePipeline;
use crate::database::entity::chunk::{ChunkModel, ChunkState};
use crate::database::entity::file::FileState;
use crate::database::MetadataRepository;
use crate::distribution;
use crate::error::{ErrorKind, NodeError, NodeResult};
use crate::storage::ProviderSet;

/// The result of an integrity scan.
#[derive(Debug, Clone)]
pub struct VerifyReport {
    pub file_id: String,

    /// Whether every chunk was found intact.
    pub intact: bool,

    /// Outcome for each chunk, in sequence order.
    pub chunks: Vec<ChunkVerification>,
}

/// The outcome of verifying one chunk.
#[derive(Debug, Clone)]
pub struct ChunkVerification {
    pub chunk_id: String,
    pub seq: i32,
    pub provider_id: String,

    /// One of `Verified`, `Corrupted` or `Missing`.
    pub state: ChunkState,

    /// What went wrong, if anything.
    pub error: Option<String>,
}

impl VerifyReport {
    /// Returns the chunks that failed verification.
    pub fn failures(&self) -> impl Iterator<Item = &ChunkVerification> {
        self.chunks
            .iter()
            .filter(|c| c.state != ChunkState::Verified)
    }
}

impl FilePipeline {
    /// Checks that every chunk of a file is present and intact.
    ///
    /// Each chunk is marked Verified, Corrupted or Missing. The file is
    /// marked Corrupted if any chunk failed, and Completed otherwise.
    #[instrument(skip_all, fields(file_id = %file_id))]
    pub async fn verify_integrity(&self, file_id: Uuid) -> NodeResult<VerifyReport> {
        let (mut file, mut chunks) = self.load_live_file(file_id).await?;

        let providers = &self.providers;
        let outcomes = self
            .fan_out(&chunks, |chunk| verify_chunk(chunk, providers))
            .await;

        let now = Utc::now();
        let mut report = Vec::with_capacity(chunks.len());

        for (chunk, (state, error)) in chunks.iter_mut().zip(outcomes) {
            if let Some(error) = &error {
                tracing::warn!("Chunk {} of file {}: {}", chunk.seq, file.id, error);
            }

            chunk.state = state;
            chunk.last_verified_at = Some(now);

            report.push(ChunkVerification {
                chunk_id: chunk.id.clone(),
                seq: chunk.seq,
                provider_id: chunk.provider_id.clone(),
                state,
                error,
            });
        }

        let intact = chunks.len() == file.num_chunks as usize
            && report.iter().all(|c| c.state == ChunkState::Verified);

        file.state = if intact {
            FileState::Completed
        } else {
            FileState::Corrupted
        };

        let txn = self
            .database
            .begin()
            .await
            .map_err(NodeError::database_error)?;

        txn.save_chunks(&chunks).await?;
        txn.set_file_state(&file.id, file.state).await?;

        txn.commit().await.map_err(NodeError::database_error)?;

        if intact {
            tracing::info!("File {} is intact", file.id);
        } else {
            tracing::warn!("File {} is corrupted", file.id);
        }

        Ok(VerifyReport {
            file_id: file.id,
            intact,
            chunks: report,
        })
    }
}

/// Verifies one chunk, classifying any failure.
async fn verify_chunk(chunk: &ChunkModel, providers: &ProviderSet) -> (ChunkState, Option<String>) {
    match distribution::retrieve_verified(chunk, providers).await {
        Ok(_) => (ChunkState::Verified, None),
        Err(e) => {
            let state = match e.kind() {
                ErrorKind::IntegrityFailure => ChunkState::Corrupted,
                _ => ChunkState::Missing,
            };

            (state, Some(e.to_string()))
        }
    }
}
