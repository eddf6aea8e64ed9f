//! A chunk payload held by the database storage provider.

use sea_orm::entity::prelude::*;

pub type ChunkPayloadModel = Model;

#[derive(Debug, Clone, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "chunk_payload")]
pub struct Model {
    /// ID of the chunk.
    #[sea_orm(primary_key, auto_increment = false)]
    pub chunk_id: String,

    /// The raw bytes.
    pub data: Vec<u8>,

    /// Timestamp when the payload is stored.
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
