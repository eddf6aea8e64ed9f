pub mod entity;
pub mod migration;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::entity::prelude::*;
use sea_orm::query::QueryOrder;
use sea_orm::sea_query::OnConflict;
use sea_orm::ActiveValue::Set;
use sea_orm::ConnectionTrait;

use crate::error::{NodeError, NodeResult};
use entity::chunk::{self, ChunkModel, Entity as Chunk};
use entity::file::{self, Entity as File, FileModel, FileState};

/// Persistence of file and chunk descriptors.
///
/// This is implemented for every SeaORM connection, so the same calls
/// work on a `DatabaseConnection` as well as inside a transaction.
#[async_trait]
pub trait MetadataRepository: Send + Sync {
    /// Finds a non-deleted file with the given whole-file digest.
    ///
    /// If several match, the oldest one is returned.
    async fn find_file_by_digest(&self, file_hash: &str) -> NodeResult<Option<FileModel>>;

    /// Retrieves a file in any state.
    async fn find_file(&self, file_id: &str) -> NodeResult<Option<FileModel>>;

    /// Retrieves a file and all its chunks ordered by sequence number.
    async fn load_file_with_chunks(
        &self,
        file_id: &str,
    ) -> NodeResult<Option<(FileModel, Vec<ChunkModel>)>>;

    /// Lists all non-deleted files ordered by creation time.
    async fn list_non_deleted_files(&self) -> NodeResult<Vec<FileModel>>;

    /// Inserts or replaces a file.
    async fn save_file(&self, file: &FileModel) -> NodeResult<()>;

    /// Inserts or replaces a batch of chunks.
    async fn save_chunks(&self, chunks: &[ChunkModel]) -> NodeResult<()>;

    /// Sets the state of a file.
    async fn set_file_state(&self, file_id: &str, state: FileState) -> NodeResult<()>;

    /// Bumps the last accessed timestamp of a file.
    async fn bump_file_last_accessed(&self, file_id: &str) -> NodeResult<()>;
}

#[async_trait]
impl<C> MetadataRepository for C
where
    C: ConnectionTrait + Send + Sync,
{
    async fn find_file_by_digest(&self, file_hash: &str) -> NodeResult<Option<FileModel>> {
        File::find()
            .filter(file::Column::FileHash.eq(file_hash))
            .filter(file::Column::State.ne(FileState::Deleted))
            .order_by_asc(file::Column::CreatedAt)
            .one(self)
            .await
            .map_err(NodeError::database_error)
    }

    async fn find_file(&self, file_id: &str) -> NodeResult<Option<FileModel>> {
        File::find_by_id(file_id.to_owned())
            .one(self)
            .await
            .map_err(NodeError::database_error)
    }

    async fn load_file_with_chunks(
        &self,
        file_id: &str,
    ) -> NodeResult<Option<(FileModel, Vec<ChunkModel>)>> {
        let file = match self.find_file(file_id).await? {
            Some(file) => file,
            None => return Ok(None),
        };

        let chunks = Chunk::find()
            .filter(chunk::Column::FileId.eq(file_id))
            .order_by_asc(chunk::Column::Seq)
            .all(self)
            .await
            .map_err(NodeError::database_error)?;

        Ok(Some((file, chunks)))
    }

    async fn list_non_deleted_files(&self) -> NodeResult<Vec<FileModel>> {
        File::find()
            .filter(file::Column::State.ne(FileState::Deleted))
            .order_by_asc(file::Column::CreatedAt)
            .all(self)
            .await
            .map_err(NodeError::database_error)
    }

    async fn save_file(&self, model: &FileModel) -> NodeResult<()> {
        File::insert(model.to_active_model())
            .on_conflict(
                OnConflict::column(file::Column::Id)
                    .update_columns([
                        file::Column::Name,
                        file::Column::Size,
                        file::Column::MimeType,
                        file::Column::FileHash,
                        file::Column::NumChunks,
                        file::Column::ChunkSize,
                        file::Column::State,
                        file::Column::LastAccessedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(self)
            .await
            .map_err(NodeError::database_error)?;

        Ok(())
    }

    async fn save_chunks(&self, chunks: &[ChunkModel]) -> NodeResult<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        Chunk::insert_many(chunks.iter().map(ChunkModel::to_active_model))
            .on_conflict(
                OnConflict::column(chunk::Column::Id)
                    .update_columns([
                        chunk::Column::ChunkSize,
                        chunk::Column::ChunkHash,
                        chunk::Column::ProviderId,
                        chunk::Column::Location,
                        chunk::Column::State,
                        chunk::Column::LastVerifiedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(self)
            .await
            .map_err(NodeError::database_error)?;

        Ok(())
    }

    async fn set_file_state(&self, file_id: &str, state: FileState) -> NodeResult<()> {
        File::update(file::ActiveModel {
            id: Set(file_id.to_owned()),
            state: Set(state),
            ..Default::default()
        })
        .exec(self)
        .await
        .map_err(NodeError::database_error)?;

        Ok(())
    }

    async fn bump_file_last_accessed(&self, file_id: &str) -> NodeResult<()> {
        let now = Utc::now();

        File::update(file::ActiveModel {
            id: Set(file_id.to_owned()),
            last_accessed_at: Set(Some(now)),
            ..Default::default()
        })
        .exec(self)
        .await
        .map_err(NodeError::database_error)?;

        Ok(())
    }
}
