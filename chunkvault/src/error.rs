//! Error handling.

use std::error::Error as StdError;
use std::io;
use std::path::PathBuf;

use displaydoc::Display;

pub type ChunkvaultResult<T> = Result<T, ChunkvaultError>;

/// An error.
#[derive(Debug, Display)]
pub enum ChunkvaultError {
    /// Source file {path:?} does not exist
    NoSuchSource { path: PathBuf },

    /// Invalid chunk size {size}: {reason}
    InvalidChunkSize { size: usize, reason: &'static str },

    /// Hashing error: {0}
    HashError(super::hash::Error),

    /// I/O error: {error}.
    IoError { error: io::Error },
}

impl ChunkvaultError {
    pub fn name(&self) -> &'static str {
        match self {
            Self::NoSuchSource { .. } => "NoSuchSource",
            Self::InvalidChunkSize { .. } => "InvalidChunkSize",
            Self::HashError(_) => "HashError",
            Self::IoError { .. } => "IoError",
        }
    }

    /// Returns whether the error denotes something that is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NoSuchSource { .. })
    }

    /// Returns whether the error was caused by bad caller input.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidChunkSize { .. } | Self::HashError(_))
    }
}

impl StdError for ChunkvaultError {}

impl From<io::Error> for ChunkvaultError {
    fn from(error: io::Error) -> Self {
        Self::IoError { error }
    }
}

impl From<super::hash::Error> for ChunkvaultError {
    fn from(error: super::hash::Error) -> Self {
        Self::HashError(error)
    }
}
