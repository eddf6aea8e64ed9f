//! Chunking.
//!
//! Files are split into fixed-size chunks. The chunk size is picked
//! from the file size with a step function over four bands, so small
//! files don't end up with a large number of tiny chunks and large
//! files don't produce oversized payloads.

use std::io;
use std::path::Path;

use async_stream::try_stream;
use bytes::{Bytes, BytesMut};
use futures::stream::{Stream, StreamExt};
use serde::Deserialize;
use tokio::fs::File;
use tokio::io::AsyncRead;

use crate::error::{ChunkvaultError, ChunkvaultResult};
use crate::hash::Hash;
use crate::stream::read_chunk_async;

/// One mebibyte.
pub const MIB: usize = 1024 * 1024;

/// Files up to this size use the minimum chunk size.
pub const SMALL_FILE_LIMIT: u64 = 10 * MIB as u64;

/// Files up to this size use the default chunk size.
pub const MEDIUM_FILE_LIMIT: u64 = 100 * MIB as u64;

/// Files up to this size use [`LARGE_FILE_CHUNK_SIZE`].
pub const LARGE_FILE_LIMIT: u64 = 500 * MIB as u64;

/// Chunk size for files between [`MEDIUM_FILE_LIMIT`] and [`LARGE_FILE_LIMIT`].
pub const LARGE_FILE_CHUNK_SIZE: usize = 5 * MIB;

/// Chunk size selection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChunkSizePolicy {
    /// The minimum chunk size.
    #[serde(rename = "min-size")]
    pub min_size: usize,

    /// The chunk size for medium-sized files.
    ///
    /// This is also the fallback if the policy is inconsistent.
    #[serde(rename = "default-size")]
    pub default_size: usize,

    /// The maximum chunk size.
    #[serde(rename = "max-size")]
    pub max_size: usize,
}

/// A chunk of a file held in memory.
///
/// It only lives between splitting and storage, or between
/// retrieval and reassembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPayload {
    /// The zero-indexed sequence number of the chunk.
    pub seq: u32,

    /// The raw bytes.
    pub data: Bytes,

    /// The hash of `data`.
    pub hash: Hash,
}

impl ChunkSizePolicy {
    pub fn new(min_size: usize, default_size: usize, max_size: usize) -> Self {
        Self {
            min_size,
            default_size,
            max_size,
        }
    }

    /// Chooses the chunk size for a file.
    ///
    /// This never fails. If the policy itself is inconsistent, the
    /// default size is returned.
    pub fn choose(&self, file_size: u64) -> usize {
        match self.try_choose(file_size) {
            Ok(size) => size,
            Err(e) => {
                tracing::warn!(
                    "Falling back to the default chunk size ({} bytes): {}",
                    self.default_size,
                    e
                );
                self.default_size
            }
        }
    }

    fn try_choose(&self, file_size: u64) -> ChunkvaultResult<usize> {
        self.validate()?;

        let size = if file_size <= SMALL_FILE_LIMIT {
            self.min_size
        } else if file_size <= MEDIUM_FILE_LIMIT {
            self.default_size
        } else if file_size <= LARGE_FILE_LIMIT {
            // Keeps the bands monotonic when the default is above 5 MiB
            LARGE_FILE_CHUNK_SIZE.max(self.default_size)
        } else {
            self.max_size
        };

        Ok(size.clamp(self.min_size, self.max_size))
    }

    /// Checks that `0 < min <= default <= max`.
    pub fn validate(&self) -> ChunkvaultResult<()> {
        if self.min_size == 0 {
            return Err(ChunkvaultError::InvalidChunkSize {
                size: self.min_size,
                reason: "The minimum chunk size must be non-zero",
            });
        }

        if self.min_size > self.max_size {
            return Err(ChunkvaultError::InvalidChunkSize {
                size: self.min_size,
                reason: "The minimum chunk size exceeds the maximum chunk size",
            });
        }

        if self.default_size < self.min_size || self.default_size > self.max_size {
            return Err(ChunkvaultError::InvalidChunkSize {
                size: self.default_size,
                reason: "The default chunk size must be between the minimum and the maximum",
            });
        }

        Ok(())
    }
}

impl Default for ChunkSizePolicy {
    fn default() -> Self {
        Self {
            min_size: 64 * 1024,
            default_size: MIB,
            max_size: 10 * MIB,
        }
    }
}

impl ChunkPayload {
    /// Creates a payload, hashing the bytes.
    pub fn new(seq: u32, data: Bytes) -> Self {
        let hash = Hash::sha256_from_bytes(&data);
        Self { seq, data, hash }
    }

    /// Returns the size of the payload.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Returns the hexadecimal digest of the payload.
    pub fn digest(&self) -> String {
        self.hash.to_hex()
    }
}

/// Splits a stream into fixed-size chunks.
///
/// Every chunk is exactly `chunk_size` bytes long except the last one,
/// which may be shorter. An empty stream yields no chunks.
pub fn chunk_stream<R>(mut stream: R, chunk_size: usize) -> impl Stream<Item = io::Result<Bytes>>
where
    R: AsyncRead + Unpin + Send,
{
    let s = try_stream! {
        loop {
            let read = read_chunk_async(&mut stream, BytesMut::with_capacity(chunk_size)).await?;

            if read.is_empty() {
                // Already EOF
                break;
            }

            let eof = read.len() < chunk_size;
            yield read;

            if eof {
                break;
            }
        }
    };

    Box::pin(s)
}

/// Splits a stream into hashed chunk payloads.
///
/// Any read error aborts the split. No partial list is returned.
pub async fn split_stream<R>(stream: R, chunk_size: usize) -> ChunkvaultResult<Vec<ChunkPayload>>
where
    R: AsyncRead + Unpin + Send,
{
    if chunk_size == 0 {
        return Err(ChunkvaultError::InvalidChunkSize {
            size: chunk_size,
            reason: "Chunks must be non-empty",
        });
    }

    let mut chunks = chunk_stream(stream, chunk_size);
    let mut payloads = Vec::new();
    let mut seq = 0u32;

    while let Some(bytes) = chunks.next().await {
        let bytes = bytes?;
        payloads.push(ChunkPayload::new(seq, bytes));
        seq = next_seq(seq, chunk_size)?;
    }

    Ok(payloads)
}

/// Returns the sequence number after `seq`.
fn next_seq(seq: u32, chunk_size: usize) -> ChunkvaultResult<u32> {
    seq.checked_add(1)
        .ok_or(ChunkvaultError::InvalidChunkSize {
            size: chunk_size,
            reason: "Too many chunks for this file",
        })
}

/// Splits a file into hashed chunk payloads.
pub async fn split_file(path: &Path, chunk_size: usize) -> ChunkvaultResult<Vec<ChunkPayload>> {
    let file = File::open(path).await.map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            ChunkvaultError::NoSuchSource {
                path: path.to_owned(),
            }
        } else {
            e.into()
        }
    })?;

    let payloads = split_stream(file, chunk_size).await?;

    tracing::debug!(
        "Split {:?} into {} chunks of up to {} bytes",
        path,
        payloads.len(),
        chunk_size
    );

    Ok(payloads)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;

    use tokio_test::block_on;

    use crate::testing::get_fake_data;

    fn policy() -> ChunkSizePolicy {
        ChunkSizePolicy::new(64 * 1024, MIB, 10 * MIB)
    }

    #[test]
    fn test_choose_bands() {
        let policy = policy();
        let mib = MIB as u64;

        assert_eq!(64 * 1024, policy.choose(0));
        assert_eq!(64 * 1024, policy.choose(10 * mib));
        assert_eq!(MIB, policy.choose(10 * mib + 1));
        assert_eq!(MIB, policy.choose(50 * mib));
        assert_eq!(MIB, policy.choose(100 * mib));
        assert_eq!(5 * MIB, policy.choose(100 * mib + 1));
        assert_eq!(5 * MIB, policy.choose(150 * mib));
        assert_eq!(5 * MIB, policy.choose(500 * mib));
        assert_eq!(10 * MIB, policy.choose(500 * mib + 1));
        assert_eq!(10 * MIB, policy.choose(u64::MAX));
    }

    #[test]
    fn test_choose_bounded_and_monotonic() {
        let policies = [
            policy(),
            ChunkSizePolicy::new(MIB, 2 * MIB, 4 * MIB),
            ChunkSizePolicy::new(6 * MIB, 8 * MIB, 16 * MIB),
            ChunkSizePolicy::new(1024, 1024, 1024),
        ];

        let mib = MIB as u64;
        let sizes = [
            0,
            1,
            10 * mib - 1,
            10 * mib,
            10 * mib + 1,
            100 * mib - 1,
            100 * mib,
            100 * mib + 1,
            500 * mib - 1,
            500 * mib,
            500 * mib + 1,
            64 * 1024 * mib,
        ];

        for policy in policies {
            let mut last = 0;
            for size in sizes {
                let chosen = policy.choose(size);
                assert!(chosen >= policy.min_size, "{:?} {}", policy, size);
                assert!(chosen <= policy.max_size, "{:?} {}", policy, size);
                assert!(chosen >= last, "{:?} {}", policy, size);
                last = chosen;
            }
        }
    }

    #[test]
    fn test_choose_falls_back_to_default() {
        let inverted = ChunkSizePolicy::new(10 * MIB, MIB, 64 * 1024);
        assert!(inverted.validate().is_err());
        assert_eq!(MIB, inverted.choose(0));
        assert_eq!(MIB, inverted.choose(u64::MAX));

        let zero = ChunkSizePolicy::new(0, 4096, 8192);
        assert!(zero.validate().is_err());
        assert_eq!(4096, zero.choose(1));
    }

    #[test]
    fn test_chunk_count_for_medium_file() {
        let policy = policy();
        let file_size = 50 * MIB as u64 + 3;
        let chunk_size = policy.choose(file_size) as u64;

        assert_eq!(MIB as u64, chunk_size);
        assert_eq!(51, (file_size + chunk_size - 1) / chunk_size);
    }

    #[test]
    fn test_split_stream() {
        fn case(size: usize, chunk_size: usize) {
            block_on(async move {
                let data = get_fake_data(size);
                let payloads = split_stream(Cursor::new(data.clone()), chunk_size)
                    .await
                    .unwrap();

                assert_eq!((size + chunk_size - 1) / chunk_size, payloads.len());

                let mut reconstructed = Vec::new();
                for (i, payload) in payloads.iter().enumerate() {
                    assert_eq!(i as u32, payload.seq);
                    assert_eq!(Hash::sha256_from_bytes(&payload.data), payload.hash);

                    if i + 1 < payloads.len() {
                        assert_eq!(chunk_size, payload.size());
                    } else {
                        assert!(payload.size() <= chunk_size);
                        assert!(payload.size() > 0);
                    }

                    reconstructed.extend_from_slice(&payload.data);
                }

                assert_eq!(data, reconstructed);
            });
        }

        case(0, 1024);
        case(1, 1024);
        case(1024 * 1024 - 1, 64 * 1024);
        case(1024 * 1024, 64 * 1024);
        case(1024 * 1024 + 1, 64 * 1024);
        case(100, 1);
    }

    #[test]
    fn test_split_rejects_zero_chunk_size() {
        let res = block_on(split_stream(Cursor::new(vec![1u8; 10]), 0));
        assert!(matches!(
            res,
            Err(ChunkvaultError::InvalidChunkSize { size: 0, .. })
        ));
    }

    #[test]
    fn test_next_seq_overflow() {
        assert_eq!(8, next_seq(7, 16).unwrap());
        assert!(matches!(
            next_seq(u32::MAX, 16),
            Err(ChunkvaultError::InvalidChunkSize { size: 16, .. })
        ));
    }

    #[tokio::test]
    async fn test_split_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.bin");
        let data = get_fake_data(300 * 1024 + 5);
        tokio::fs::write(&path, &data).await.unwrap();

        let payloads = split_file(&path, 64 * 1024).await.unwrap();
        assert_eq!(5, payloads.len());
        assert_eq!(
            data,
            payloads
                .iter()
                .flat_map(|p| p.data.iter().copied())
                .collect::<Vec<_>>()
        );

        let missing = dir.path().join("missing.bin");
        let res = split_file(&missing, 64 * 1024).await;
        match res {
            Err(e @ ChunkvaultError::NoSuchSource { .. }) => assert!(e.is_not_found()),
            other => panic!("Unexpected result: {:?}", other),
        }
    }
}
