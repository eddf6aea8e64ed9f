use std::io;
use std::path::Path;

use chrono::Utc;
use sea_orm::TransactionTrait;
use tokio::fs::{self, File};
use tracing::instrument;
use uuid::Uuid;

use super::FilePipeline;
use crate::database::entity::chunk::ChunkModel;
use crate::database::entity::file::{FileModel, FileState};
use crate::database::MetadataRepository;
use crate::distribution::{self, RoundRobin};
use crate::error::{NodeError, NodeResult};
use chunkvault::chunking;
use chunkvault::error::ChunkvaultError;
use chunkvault::{hash, mime};

/// The result of an upload.
#[derive(Debug, Clone)]
pub struct UploadResult {
    pub kind: UploadResultKind,

    /// The stored file.
    ///
    /// For deduplicated uploads this is the existing file, unchanged.
    pub file: FileModel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadResultKind {
    /// The file was split and stored.
    Uploaded,

    /// A file with identical contents already existed.
    Deduplicated,
}

impl FilePipeline {
    /// Uploads a file.
    ///
    /// If `name` is not given, the file name of `path` is used.
    #[instrument(skip_all, fields(path = ?path))]
    pub async fn upload(&self, path: &Path, name: Option<&str>) -> NodeResult<UploadResult> {
        let metadata = fs::metadata(path).await.map_err(|e| source_error(path, e))?;

        if !metadata.is_file() {
            return Err(NodeError::invalid_input(format!(
                "{:?} is not a regular file",
                path
            )));
        }

        let file = File::open(path).await.map_err(|e| source_error(path, e))?;
        let file_hash = hash::digest_stream(file).await?;

        if let Some(existing) = self.database.find_file_by_digest(&file_hash).await? {
            tracing::info!(
                "Contents already stored as file {} ({:?})",
                existing.id,
                existing.name
            );

            return Ok(UploadResult {
                kind: UploadResultKind::Deduplicated,
                file: existing,
            });
        }

        let size = metadata.len();
        if size == 0 {
            return Err(NodeError::invalid_input("Cannot upload an empty file"));
        }

        let name = match name {
            Some(name) => name.to_owned(),
            None => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| NodeError::invalid_input("The path has no file name"))?,
        };

        let chunk_size = self.sizing.choose(size);
        let payloads = chunking::split_file(path, chunk_size).await?;

        // The file may have changed since we hashed it
        let split_size: u64 = payloads.iter().map(|p| p.size() as u64).sum();
        let split_hash = hash::digest_parts(payloads.iter().map(|p| &p.data[..]));
        if split_size != size || split_hash != file_hash {
            return Err(NodeError::IntegrityError(format!(
                "{:?} changed while being uploaded",
                path
            )));
        }

        let mut file = FileModel {
            id: Uuid::new_v4().to_string(),
            name,
            size: size as i64,
            mime_type: mime::classify(path),
            file_hash,
            num_chunks: payloads.len() as i32,
            chunk_size: chunk_size as i64,
            state: FileState::Uploading,
            created_at: Utc::now(),
            last_accessed_at: None,
        };

        let chunks =
            distribution::distribute(&file.id, &payloads, &self.providers, &mut RoundRobin::new())
                .await?;

        file.state = FileState::Completed;

        if let Err(e) = self.persist(&file, &chunks).await {
            tracing::warn!("Failed to persist file {}: {}", file.id, e);
            distribution::discard(&chunks, &self.providers).await;
            return Err(e);
        }

        tracing::info!(
            "Uploaded {:?} as file {} ({} chunks of {} bytes)",
            file.name,
            file.id,
            file.num_chunks,
            file.chunk_size
        );

        Ok(UploadResult {
            kind: UploadResultKind::Uploaded,
            file,
        })
    }

    /// Saves a file and its chunks in one transaction.
    async fn persist(&self, file: &FileModel, chunks: &[ChunkModel]) -> NodeResult<()> {
        let txn = self
            .database
            .begin()
            .await
            .map_err(NodeError::database_error)?;

        // The file row must exist before chunks can reference it
        txn.save_file(file).await?;
        txn.save_chunks(chunks).await?;

        txn.commit().await.map_err(NodeError::database_error)?;

        Ok(())
    }
}

fn source_error(path: &Path, error: io::Error) -> NodeError {
    if error.kind() == io::ErrorKind::NotFound {
        ChunkvaultError::NoSuchSource {
            path: path.to_owned(),
        }
        .into()
    } else {
        error.into()
    }
}
