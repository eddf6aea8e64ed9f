//! Local file storage.
//!
//! Each payload is a file named `<chunk id>.chunk` directly under the
//! configured directory. The file holds the raw bytes with no header.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::StorageProvider;
use crate::error::{NodeError, NodeResult};

/// Extension of payload files.
const CHUNK_EXTENSION: &str = "chunk";

/// Name of the file written by health checks.
const HEALTH_PROBE: &str = ".health-probe";

#[derive(Debug)]
pub struct LocalBackend {
    id: String,
    name: String,
    config: LocalStorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocalStorageConfig {
    /// The directory to store all chunks under.
    pub path: PathBuf,
}

impl LocalBackend {
    pub async fn new(id: String, name: String, config: LocalStorageConfig) -> NodeResult<Self> {
        fs::create_dir_all(&config.path)
            .await
            .map_err(NodeError::storage_error)?;

        Ok(Self { id, name, config })
    }

    /// Returns the root directory.
    pub fn root(&self) -> &Path {
        &self.config.path
    }

    /// Returns the path of a payload after checking the token is a plain file name.
    fn get_path(&self, location: &str) -> NodeResult<PathBuf> {
        let plain = !location.is_empty()
            && location != "."
            && location != ".."
            && !location.contains(&['/', '\\', '\0'][..]);

        if !plain {
            return Err(NodeError::invalid_input(format!(
                "Invalid location token {:?}",
                location
            )));
        }

        Ok(self.config.path.join(location))
    }

    fn no_such_chunk(&self, chunk_id: &str) -> NodeError {
        NodeError::NoSuchChunk {
            chunk_id: chunk_id.to_owned(),
            provider_id: self.id.clone(),
        }
    }
}

/// Returns the location token for a chunk.
fn make_location(chunk_id: &str) -> NodeResult<String> {
    let uuid = Uuid::parse_str(chunk_id)
        .map_err(|_| NodeError::invalid_input(format!("Invalid chunk ID {:?}", chunk_id)))?;

    Ok(format!("{}.{}", uuid.hyphenated(), CHUNK_EXTENSION))
}

#[async_trait]
impl StorageProvider for LocalBackend {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    async fn store(&self, chunk_id: &str, data: Bytes) -> NodeResult<String> {
        let location = make_location(chunk_id)?;
        let path = self.get_path(&location)?;

        let mut file = File::create(&path)
            .await
            .map_err(NodeError::storage_error)?;

        file.write_all(&data)
            .await
            .map_err(NodeError::storage_error)?;

        file.sync_all().await.map_err(NodeError::storage_error)?;

        Ok(location)
    }

    async fn retrieve(&self, chunk_id: &str, location: &str) -> NodeResult<Bytes> {
        let path = self.get_path(location)?;

        match fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(self.no_such_chunk(chunk_id)),
            Err(e) => Err(NodeError::storage_error(e)),
        }
    }

    async fn delete(&self, _chunk_id: &str, location: &str) -> NodeResult<bool> {
        let path = self.get_path(location)?;

        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(NodeError::storage_error(e)),
        }
    }

    async fn exists(&self, _chunk_id: &str, location: &str) -> NodeResult<bool> {
        let path = self.get_path(location)?;

        match fs::metadata(&path).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(NodeError::storage_error(e)),
        }
    }

    async fn health_check(&self) -> bool {
        let path = self.config.path.join(HEALTH_PROBE);
        let probe = b"chunkvault";

        let result: io::Result<bool> = async {
            fs::write(&path, probe).await?;
            let read = fs::read(&path).await?;
            fs::remove_file(&path).await?;
            Ok(read == probe)
        }
        .await;

        match result {
            Ok(healthy) => healthy,
            Err(e) => {
                tracing::warn!("Health check on {:?} failed: {}", self.config.path, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    async fn make_backend() -> (TempDir, LocalBackend) {
        let dir = tempfile::tempdir().unwrap();
        let config = LocalStorageConfig {
            path: dir.path().join("chunks"),
        };
        let backend = LocalBackend::new("disk0".to_string(), "Disk".to_string(), config)
            .await
            .unwrap();

        (dir, backend)
    }

    #[tokio::test]
    async fn test_store_retrieve_delete() {
        let (_dir, backend) = make_backend().await;
        let chunk_id = Uuid::new_v4().to_string();
        let data = Bytes::from_static(b"hello world");

        let location = backend.store(&chunk_id, data.clone()).await.unwrap();
        assert_eq!(format!("{}.chunk", chunk_id), location);

        // raw bytes, no header
        let on_disk = std::fs::read(backend.root().join(&location)).unwrap();
        assert_eq!(&data[..], &on_disk[..]);

        assert!(backend.exists(&chunk_id, &location).await.unwrap());
        assert_eq!(data, backend.retrieve(&chunk_id, &location).await.unwrap());

        assert!(backend.delete(&chunk_id, &location).await.unwrap());
        assert!(!backend.delete(&chunk_id, &location).await.unwrap());
        assert!(!backend.exists(&chunk_id, &location).await.unwrap());

        let e = backend.retrieve(&chunk_id, &location).await.unwrap_err();
        assert_eq!("NoSuchChunk", e.name());
    }

    #[tokio::test]
    async fn test_overwrite() {
        let (_dir, backend) = make_backend().await;
        let chunk_id = Uuid::new_v4().to_string();

        backend
            .store(&chunk_id, Bytes::from_static(b"first"))
            .await
            .unwrap();
        let location = backend
            .store(&chunk_id, Bytes::from_static(b"second"))
            .await
            .unwrap();

        assert_eq!(
            Bytes::from_static(b"second"),
            backend.retrieve(&chunk_id, &location).await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_invalid_input() {
        let (_dir, backend) = make_backend().await;

        let e = backend
            .store("../../etc/passwd", Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert_eq!("InvalidInput", e.name());

        let e = backend.retrieve("x", "../outside.chunk").await.unwrap_err();
        assert_eq!("InvalidInput", e.name());

        let e = backend.delete("x", "").await.unwrap_err();
        assert_eq!("InvalidInput", e.name());
    }

    #[tokio::test]
    async fn test_health_check() {
        let (_dir, backend) = make_backend().await;

        assert!(backend.health_check().await);
        assert!(!backend.root().join(HEALTH_PROBE).exists());
    }
}
