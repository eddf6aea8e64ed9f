//! Chunk placement and retrieval.
//!
//! Chunks are placed round-robin over the registered providers in
//! order. Each chunk lives on exactly one provider.

use bytes::Bytes;
use chrono::Utc;
use uuid::Uuid;

use crate::database::entity::chunk::{ChunkModel, ChunkState};
use crate::error::{NodeError, NodeResult};
use crate::storage::ProviderSet;
use chunkvault::chunking::ChunkPayload;
use chunkvault::hash;

/// A round-robin placement counter.
///
/// Each upload threads its own counter through `distribute`, so
/// placement is deterministic for a given provider order.
#[derive(Debug, Clone, Default)]
pub struct RoundRobin {
    next: usize,
}

/// The outcome of deleting one payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadDeletion {
    /// The payload was deleted.
    Deleted,

    /// There was nothing to delete.
    NotFound,

    /// The provider failed or is not registered.
    Failed,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts placement at an offset.
    pub fn starting_at(start: usize) -> Self {
        Self { next: start }
    }

    /// Returns the next provider index out of `len`.
    pub fn next_index(&mut self, len: usize) -> usize {
        let index = self.next % len;
        self.next = self.next.wrapping_add(1);
        index
    }
}

/// Stores chunk payloads across the providers.
///
/// Stores are sequential in sequence order. If any store fails, the
/// payloads stored so far are deleted on a best-effort basis and the
/// error is returned.
pub async fn distribute(
    file_id: &str,
    payloads: &[ChunkPayload],
    providers: &ProviderSet,
    placement: &mut RoundRobin,
) -> NodeResult<Vec<ChunkModel>> {
    if payloads.is_empty() {
        return Err(NodeError::invalid_input("There are no chunks to distribute"));
    }

    if providers.is_empty() {
        return Err(NodeError::invalid_input("No storage providers are registered"));
    }

    let mut stored: Vec<ChunkModel> = Vec::with_capacity(payloads.len());

    for payload in payloads {
        let index = placement.next_index(providers.len());
        let provider = providers
            .at(index)
            .ok_or_else(|| NodeError::invalid_input("Provider index out of range"))?;

        let seq = match i32::try_from(payload.seq) {
            Ok(seq) => seq,
            Err(_) => {
                discard(&stored, providers).await;
                return Err(NodeError::invalid_input(format!(
                    "Chunk sequence number {} is too large",
                    payload.seq
                )));
            }
        };

        let mut chunk = ChunkModel {
            id: Uuid::new_v4().to_string(),
            file_id: file_id.to_owned(),
            seq,
            chunk_size: payload.size() as i64,
            chunk_hash: payload.digest(),
            provider_id: provider.id().to_owned(),
            location: String::new(),
            state: ChunkState::Pending,
            created_at: Utc::now(),
            last_verified_at: None,
        };

        let result = providers
            .bounded(provider.store(&chunk.id, payload.data.clone()))
            .await;

        match result {
            Ok(location) => {
                chunk.location = location;
                chunk.state = ChunkState::Stored;
                stored.push(chunk);
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to store chunk {} on \"{}\": {}",
                    payload.seq,
                    provider.id(),
                    e
                );
                discard(&stored, providers).await;
                return Err(e);
            }
        }
    }

    tracing::debug!(
        "Distributed {} chunks of file {} over {} providers",
        stored.len(),
        file_id,
        providers.len()
    );

    Ok(stored)
}

/// Retrieves and verifies all chunks of a file in sequence order.
///
/// The chunks must form a contiguous sequence starting at zero.
pub async fn collect(
    chunks: &[ChunkModel],
    providers: &ProviderSet,
) -> NodeResult<Vec<ChunkPayload>> {
    let mut sorted: Vec<&ChunkModel> = chunks.iter().collect();
    sorted.sort_by_key(|c| c.seq);

    let mut payloads = Vec::with_capacity(sorted.len());

    for (expected, chunk) in sorted.into_iter().enumerate() {
        if chunk.seq as usize != expected {
            return Err(NodeError::IntegrityError(format!(
                "Chunk sequence is broken: expected {}, found {}",
                expected, chunk.seq
            )));
        }

        let data = retrieve_verified(chunk, providers).await?;
        payloads.push(ChunkPayload::new(chunk.seq as u32, data));
    }

    Ok(payloads)
}

/// Retrieves one chunk and checks its size and digest.
pub async fn retrieve_verified(chunk: &ChunkModel, providers: &ProviderSet) -> NodeResult<Bytes> {
    let provider = providers.resolve(&chunk.provider_id)?;
    let data = providers
        .bounded(provider.retrieve(&chunk.id, &chunk.location))
        .await?;

    if data.len() as i64 != chunk.chunk_size {
        return Err(NodeError::IntegrityError(format!(
            "Chunk {} has {} bytes, expected {}",
            chunk.id,
            data.len(),
            chunk.chunk_size
        )));
    }

    if !hash::verify(&data, &chunk.chunk_hash) {
        return Err(NodeError::IntegrityError(format!(
            "Chunk {} does not match its digest",
            chunk.id
        )));
    }

    Ok(data)
}

/// Deletes the payload of one chunk.
///
/// This never fails. Errors are logged and reported as `Failed`.
pub async fn delete_chunk(chunk: &ChunkModel, providers: &ProviderSet) -> PayloadDeletion {
    let provider = match providers.resolve(&chunk.provider_id) {
        Ok(provider) => provider,
        Err(e) => {
            tracing::warn!("Cannot delete chunk {}: {}", chunk.id, e);
            return PayloadDeletion::Failed;
        }
    };

    match providers
        .bounded(provider.delete(&chunk.id, &chunk.location))
        .await
    {
        Ok(true) => PayloadDeletion::Deleted,
        Ok(false) => PayloadDeletion::NotFound,
        Err(e) => {
            tracing::warn!(
                "Failed to delete chunk {} from \"{}\": {}",
                chunk.id,
                chunk.provider_id,
                e
            );
            PayloadDeletion::Failed
        }
    }
}

/// Deletes payloads of chunks that will never be referenced.
pub(crate) async fn discard(chunks: &[ChunkModel], providers: &ProviderSet) {
    if chunks.is_empty() {
        return;
    }

    tracing::info!("Discarding {} stored chunks", chunks.len());

    for chunk in chunks {
        if delete_chunk(chunk, providers).await == PayloadDeletion::Failed {
            tracing::warn!("Chunk {} was left behind on \"{}\"", chunk.id, chunk.provider_id);
        }
    }
}
