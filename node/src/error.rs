//! Error handling.

use std::error::Error as StdError;
use std::io;
use std::time::Duration;

use anyhow::Error as AnyError;
use displaydoc::Display;

use chunkvault::error::ChunkvaultError;

pub type NodeResult<T> = Result<T, NodeError>;

/// An error.
#[derive(Debug, Display)]
pub enum NodeError {
    /// The requested file does not exist.
    NoSuchFile,

    /// Chunk {chunk_id} was not found on storage provider "{provider_id}".
    NoSuchChunk {
        chunk_id: String,
        provider_id: String,
    },

    /// Storage provider "{provider_id}" is not registered.
    NoSuchProvider { provider_id: String },

    /// Integrity check failed: {0}
    IntegrityError(String),

    /// Invalid input: {0}
    InvalidInput(String),

    /// Storage operation timed out after {0:?}.
    StorageTimeout(Duration),

    /// Database error: {0}
    DatabaseError(AnyError),

    /// Storage error: {0}
    StorageError(AnyError),

    /// I/O error: {0}
    IoError(io::Error),

    /// {0}
    ChunkvaultError(ChunkvaultError),
}

/// The broad category of an error.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// not found
    NotFound,

    /// integrity failure
    IntegrityFailure,

    /// provider unavailable
    ProviderUnavailable,

    /// invalid input
    InvalidInput,

    /// I/O failure
    IoFailure,
}

impl NodeError {
    pub fn database_error(error: impl StdError + Send + Sync + 'static) -> Self {
        Self::DatabaseError(AnyError::new(error))
    }

    pub fn storage_error(error: impl StdError + Send + Sync + 'static) -> Self {
        Self::StorageError(AnyError::new(error))
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::NoSuchFile => "NoSuchFile",
            Self::NoSuchChunk { .. } => "NoSuchChunk",
            Self::NoSuchProvider { .. } => "NoSuchProvider",
            Self::IntegrityError(_) => "IntegrityError",
            Self::InvalidInput(_) => "InvalidInput",
            Self::StorageTimeout(_) => "StorageTimeout",
            Self::DatabaseError(_) => "DatabaseError",
            Self::StorageError(_) => "StorageError",
            Self::IoError(_) => "IoError",
            Self::ChunkvaultError(e) => e.name(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoSuchFile | Self::NoSuchChunk { .. } => ErrorKind::NotFound,
            Self::IntegrityError(_) => ErrorKind::IntegrityFailure,
            Self::NoSuchProvider { .. } => ErrorKind::ProviderUnavailable,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::ChunkvaultError(e) if e.is_not_found() => ErrorKind::NotFound,
            Self::ChunkvaultError(e) if e.is_invalid_input() => ErrorKind::InvalidInput,
            _ => ErrorKind::IoFailure,
        }
    }
}

impl StdError for NodeError {}

impl From<ChunkvaultError> for NodeError {
    fn from(error: ChunkvaultError) -> Self {
        Self::ChunkvaultError(error)
    }
}

impl From<io::Error> for NodeError {
    fn from(error: io::Error) -> Self {
        Self::IoError(error)
    }
}
