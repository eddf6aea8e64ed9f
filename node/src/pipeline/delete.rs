use tracing::instrument;
use uuid::Uuid;

use super::FilePipeline;
use crate::database::entity::file::FileState;
use crate::database::MetadataRepository;
use crate::distribution::{self, PayloadDeletion};
use crate::error::{NodeError, NodeResult};

/// The result of a delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteReport {
    pub file_id: String,

    /// Whether the file went from live to deleted.
    ///
    /// This is false if the file was already deleted.
    pub deleted: bool,

    /// Outcome for each chunk payload, in sequence order.
    pub payloads: Vec<(i32, PayloadDeletion)>,
}

impl DeleteReport {
    /// Returns the number of payloads that could not be deleted.
    pub fn failures(&self) -> usize {
        self.payloads
            .iter()
            .filter(|(_, outcome)| *outcome == PayloadDeletion::Failed)
            .count()
    }
}

impl FilePipeline {
    /// Deletes a file.
    ///
    /// Payloads are deleted on a best-effort basis. The file is marked
    /// deleted regardless of payload failures, which are only logged
    /// and reported.
    #[instrument(skip_all, fields(file_id = %file_id))]
    pub async fn delete(&self, file_id: Uuid) -> NodeResult<DeleteReport> {
        let (file, chunks) = self
            .database
            .load_file_with_chunks(&file_id.to_string())
            .await?
            .ok_or(NodeError::NoSuchFile)?;

        if file.is_deleted() {
            tracing::debug!("File {} is already deleted", file.id);

            return Ok(DeleteReport {
                file_id: file.id,
                deleted: false,
                payloads: Vec::new(),
            });
        }

        let providers = &self.providers;
        let outcomes = self
            .fan_out(&chunks, |chunk| distribution::delete_chunk(chunk, providers))
            .await;

        let payloads: Vec<(i32, PayloadDeletion)> = chunks
            .iter()
            .map(|chunk| chunk.seq)
            .zip(outcomes)
            .collect();

        self.database
            .set_file_state(&file.id, FileState::Deleted)
            .await?;

        let report = DeleteReport {
            file_id: file.id,
            deleted: true,
            payloads,
        };

        if report.failures() > 0 {
            tracing::warn!(
                "Deleted file {}, but {} payloads could not be removed",
                report.file_id,
                report.failures()
            );
        } else {
            tracing::info!("Deleted file {}", report.file_id);
        }

        Ok(report)
    }
}
