//! The file pipeline.
//!
//! This sequences whole-file operations on top of the splitter, the
//! storage providers and the metadata database.
//!
//! A file goes through `Uploading -> Completed -> {Corrupted | Deleted}`.
//! Uploading files only exist in memory. Deleted is terminal.

mod delete;
mod download;
mod upload;
mod verify;


use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use sea_orm::DatabaseConnection;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::config::Config;
use crate::database::entity::chunk::ChunkModel;
use crate::database::entity::file::FileModel;
use crate::database::MetadataRepository;
use crate::error::{NodeError, NodeResult};
use crate::storage::{ProviderHealth, ProviderSet};
use chunkvault::chunking::ChunkSizePolicy;

pub use delete::DeleteReport;
pub use upload::{UploadResult, UploadResultKind};
pub use verify::{ChunkVerification, VerifyReport};

/// The file pipeline.
#[derive(Debug, Clone)]
pub struct FilePipeline {
    /// Handle to the metadata database.
    database: DatabaseConnection,

    /// The registered storage providers.
    providers: Arc<ProviderSet>,

    /// Chunk size selection.
    sizing: ChunkSizePolicy,

    /// Maximum number of concurrent provider calls in fan-outs.
    max_concurrency: usize,
}

impl FilePipeline {
    pub fn new(
        database: DatabaseConnection,
        providers: Arc<ProviderSet>,
        sizing: ChunkSizePolicy,
        max_concurrency: usize,
    ) -> Self {
        Self {
            database,
            providers,
            sizing,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Builds a pipeline from the configuration.
    pub async fn from_config(config: &Config, database: DatabaseConnection) -> NodeResult<Self> {
        let providers = ProviderSet::from_config(&config.storage, &database).await?;

        Ok(Self::new(
            database,
            Arc::new(providers),
            config.chunking,
            config.storage.max_concurrency,
        ))
    }

    pub fn providers(&self) -> &Arc<ProviderSet> {
        &self.providers
    }

    /// Returns a file with its chunks ordered by sequence number.
    ///
    /// Deleted files are returned as well.
    pub async fn get_metadata(&self, file_id: Uuid) -> NodeResult<(FileModel, Vec<ChunkModel>)> {
        self.database
            .load_file_with_chunks(&file_id.to_string())
            .await?
            .ok_or(NodeError::NoSuchFile)
    }

    /// Lists all non-deleted files ordered by creation time.
    pub async fn list_files(&self) -> NodeResult<Vec<FileModel>> {
        self.database.list_non_deleted_files().await
    }

    /// Checks the health of all storage providers.
    pub async fn check_providers(&self) -> Vec<ProviderHealth> {
        self.providers.check_health().await
    }

    /// Loads a file that is not deleted.
    async fn load_live_file(&self, file_id: Uuid) -> NodeResult<(FileModel, Vec<ChunkModel>)> {
        let (file, chunks) = self.get_metadata(file_id).await?;

        if file.is_deleted() {
            return Err(NodeError::NoSuchFile);
        }

        Ok((file, chunks))
    }

    /// Runs an operation on every chunk concurrently.
    ///
    /// At most `max_concurrency` operations are in flight. All
    /// outcomes are returned in the order of `chunks`.
    async fn fan_out<'a, T, F, Fut>(&self, chunks: &'a [ChunkModel], f: F) -> Vec<T>
    where
        F: Fn(&'a ChunkModel) -> Fut,
        Fut: Future<Output = T>,
    {
        let limit = Semaphore::new(self.max_concurrency);
        let limit = &limit;

        let futures = chunks.iter().map(|chunk| {
            let fut = f(chunk);
            async move {
                let _permit = limit.acquire().await;
                fut.await
            }
        });

        join_all(futures).await
    }
}
