//! Storage in the metadata database.
//!
//! Payloads are rows in the `chunk_payload` table. The location token
//! is simply the chunk ID.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::OnConflict;
use sea_orm::ActiveValue::Set;
use sea_orm::{ConnectionTrait, DatabaseConnection, PaginatorTrait, Statement};

use super::StorageProvider;
use crate::database::entity::chunk_payload::{self, Entity as ChunkPayload};
use crate::error::{NodeError, NodeResult};

#[derive(Debug)]
pub struct DatabaseBackend {
    id: String,
    name: String,
    database: DatabaseConnection,
}

impl DatabaseBackend {
    pub fn new(id: String, name: String, database: DatabaseConnection) -> Self {
        Self { id, name, database }
    }

    fn check_location(chunk_id: &str, location: &str) -> NodeResult<()> {
        if chunk_id != location {
            return Err(NodeError::invalid_input(format!(
                "Location token {:?} does not belong to chunk {}",
                location, chunk_id
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl StorageProvider for DatabaseBackend {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    async fn store(&self, chunk_id: &str, data: Bytes) -> NodeResult<String> {
        let model = chunk_payload::ActiveModel {
            chunk_id: Set(chunk_id.to_owned()),
            data: Set(data.to_vec()),
            created_at: Set(Utc::now()),
        };

        ChunkPayload::insert(model)
            .on_conflict(
                OnConflict::column(chunk_payload::Column::ChunkId)
                    .update_columns([
                        chunk_payload::Column::Data,
                        chunk_payload::Column::CreatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.database)
            .await
            .map_err(NodeError::storage_error)?;

        Ok(chunk_id.to_owned())
    }

    async fn retrieve(&self, chunk_id: &str, location: &str) -> NodeResult<Bytes> {
        Self::check_location(chunk_id, location)?;

        ChunkPayload::find_by_id(location.to_owned())
            .one(&self.database)
            .await
            .map_err(NodeError::storage_error)?
            .map(|payload| Bytes::from(payload.data))
            .ok_or_else(|| NodeError::NoSuchChunk {
                chunk_id: chunk_id.to_owned(),
                provider_id: self.id.clone(),
            })
    }

    async fn delete(&self, chunk_id: &str, location: &str) -> NodeResult<bool> {
        Self::check_location(chunk_id, location)?;

        let result = ChunkPayload::delete_by_id(location.to_owned())
            .exec(&self.database)
            .await
            .map_err(NodeError::storage_error)?;

        Ok(result.rows_affected > 0)
    }

    async fn exists(&self, chunk_id: &str, location: &str) -> NodeResult<bool> {
        Self::check_location(chunk_id, location)?;

        let count = ChunkPayload::find()
            .filter(chunk_payload::Column::ChunkId.eq(location))
            .count(&self.database)
            .await
            .map_err(NodeError::storage_error)?;

        Ok(count > 0)
    }

    async fn health_check(&self) -> bool {
        let backend = self.database.get_database_backend();
        let stmt = Statement::from_string(backend, "SELECT 1".to_string());

        match self.database.execute(stmt).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Database health check failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use sea_orm::Database;
    use tempfile::TempDir;
    use uuid::Uuid;

    use crate::database::migration::{Migrator, MigratorTrait};

    async fn make_backend() -> (TempDir, DatabaseBackend) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("db.sqlite").display());
        let database = Database::connect(&url).await.unwrap();
        Migrator::up(&database, None).await.unwrap();

        let backend = DatabaseBackend::new("db".to_string(), "Database".to_string(), database);
        (dir, backend)
    }

    #[tokio::test]
    async fn test_store_retrieve_delete() {
        let (_dir, backend) = make_backend().await;
        let chunk_id = Uuid::new_v4().to_string();
        let data = Bytes::from_static(b"hello world");

        let location = backend.store(&chunk_id, data.clone()).await.unwrap();
        assert_eq!(chunk_id, location);

        assert!(backend.exists(&chunk_id, &location).await.unwrap());
        assert_eq!(data, backend.retrieve(&chunk_id, &location).await.unwrap());

        // overwrite
        backend
            .store(&chunk_id, Bytes::from_static(b"other"))
            .await
            .unwrap();
        assert_eq!(
            Bytes::from_static(b"other"),
            backend.retrieve(&chunk_id, &location).await.unwrap()
        );

        assert!(backend.delete(&chunk_id, &location).await.unwrap());
        assert!(!backend.delete(&chunk_id, &location).await.unwrap());
        assert!(!backend.exists(&chunk_id, &location).await.unwrap());

        let e = backend.retrieve(&chunk_id, &location).await.unwrap_err();
        assert_eq!("NoSuchChunk", e.name());
    }

    #[tokio::test]
    async fn test_health_check() {
        let (_dir, backend) = make_backend().await;
        assert!(backend.health_check().await);
    }
}
