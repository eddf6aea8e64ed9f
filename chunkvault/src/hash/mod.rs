//! Hashing utilities.
//!
//! All digests in Chunkvault are SHA-256, rendered as 64 lowercase
//! hexadecimal characters. This is the representation persisted on
//! file and chunk descriptors.

#[cfg(test)]
mod tests;

use std::fmt;
use std::str::FromStr;

use displaydoc::Display;
use serde::{de, ser, Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ChunkvaultResult;

/// Length of a SHA-256 digest in bytes.
pub const SHA256_LEN: usize = 32;

/// A hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hash {
    /// An SHA-256 hash.
    Sha256([u8; SHA256_LEN]),
}

/// A hashing error.
#[derive(Debug, Display)]
pub enum Error {
    /// Invalid hexadecimal hash: {0}
    InvalidBase16Hash(hex::FromHexError),

    /// Invalid length for hash string: Must be {expected} hexadecimal characters, got {actual}.
    InvalidHashStringLength { expected: usize, actual: usize },
}

impl Hash {
    /// Convenience function to generate a SHA-256 hash from a slice.
    pub fn sha256_from_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self::Sha256(hasher.finalize().into())
    }

    /// Parses a hexadecimal hash string.
    ///
    /// Upper-case digits are accepted.
    pub fn from_hex(s: &str) -> ChunkvaultResult<Self> {
        let expected = SHA256_LEN * 2;
        if s.len() != expected {
            return Err(Error::InvalidHashStringLength {
                expected,
                actual: s.len(),
            }
            .into());
        }

        let mut data = [0u8; SHA256_LEN];
        hex::decode_to_slice(s, &mut data).map_err(Error::InvalidBase16Hash)?;

        Ok(Self::Sha256(data))
    }

    /// Returns the hash in lowercase hexadecimal format.
    ///
    /// This is the canonical representation of hashes in the database.
    pub fn to_hex(&self) -> String {
        hex::encode(self.data())
    }

    pub fn data(&self) -> &[u8] {
        match self {
            Self::Sha256(d) => d,
        }
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Hash {
    type Err = crate::error::ChunkvaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl<'de> Deserialize<'de> for Hash {
    /// Deserializes a hexadecimal hash string.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        use de::Error;

        String::deserialize(deserializer)
            .and_then(|s| Self::from_hex(&s).map_err(|e| Error::custom(e.to_string())))
    }
}

impl Serialize for Hash {
    /// Serializes a hash into a hexadecimal hash string.
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Returns the hexadecimal SHA-256 digest of some bytes.
pub fn digest(bytes: &[u8]) -> String {
    Hash::sha256_from_bytes(bytes).to_hex()
}

/// Returns the hexadecimal SHA-256 digest of several slices concatenated.
pub fn digest_parts<'a, I>(parts: I) -> String
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }

    hex::encode(hasher.finalize())
}

/// Returns whether some bytes match an expected hexadecimal digest.
///
/// The comparison is case-insensitive. A malformed expected digest
/// simply doesn't match.
pub fn verify(bytes: &[u8], expected: &str) -> bool {
    let matches = digest(bytes).eq_ignore_ascii_case(expected.trim());

    if !matches {
        tracing::debug!("Digest mismatch over {} bytes", bytes.len());
    }

    matches
}

/// Computes the hexadecimal SHA-256 digest of a stream.
///
/// The stream is consumed in bounded reads and never held in memory
/// as a whole.
#[cfg(feature = "stream")]
pub async fn digest_stream<R>(stream: R) -> std::io::Result<String>
where
    R: tokio::io::AsyncRead + Unpin,
{
    use crate::stream::StreamHasher;

    let (mut stream, finalized) = StreamHasher::new(stream, Sha256::new());
    tokio::io::copy(&mut stream, &mut tokio::io::sink()).await?;

    let (hash, _) = finalized.get().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "Stream was not read until EOF",
        )
    })?;

    Ok(hex::encode(hash))
}
