//! A chunk of a file stored on one storage provider.
//!
//! Each chunk lives on exactly one provider. The provider is
//! referenced by its configured ID, which is resolved against the
//! registered providers at runtime. A chunk pointing to a provider
//! that is no longer configured cannot be retrieved, but it is still
//! a valid row.

use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;

pub type ChunkModel = Model;

/// The state of a chunk.
#[derive(EnumIter, DeriveActiveEnum, Debug, Clone, Copy, PartialEq, Eq)]
#[sea_orm(rs_type = "String", db_type = "String(Some(1))")]
pub enum ChunkState {
    /// The chunk is being stored.
    #[sea_orm(string_value = "P")]
    Pending,

    /// The storage provider accepted the chunk.
    #[sea_orm(string_value = "S")]
    Stored,

    /// The last integrity scan found the chunk intact.
    #[sea_orm(string_value = "V")]
    Verified,

    /// The last integrity scan found the chunk with the wrong contents.
    #[sea_orm(string_value = "X")]
    Corrupted,

    /// The last integrity scan could not retrieve the chunk.
    #[sea_orm(string_value = "M")]
    Missing,
}

/// A chunk.
#[derive(Debug, Clone, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "chunk")]
pub struct Model {
    /// Unique ID of the chunk.
    ///
    /// This is a hyphenated UUID. Storage providers use it to name
    /// the payload.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// ID of the file.
    #[sea_orm(indexed)]
    pub file_id: String,

    /// The zero-indexed sequence number of the chunk.
    pub seq: i32,

    /// The size of the chunk in bytes.
    pub chunk_size: i64,

    /// The hash of the chunk.
    ///
    /// This is the lowercase hexadecimal SHA-256 digest.
    pub chunk_hash: String,

    /// ID of the storage provider holding the payload.
    pub provider_id: String,

    /// Provider-specific location of the payload.
    ///
    /// This is opaque and must be passed back to the provider
    /// verbatim.
    pub location: String,

    /// The state of the chunk.
    pub state: ChunkState,

    /// Timestamp when the chunk is created.
    pub created_at: ChronoDateTimeUtc,

    /// Timestamp of the last integrity scan.
    pub last_verified_at: Option<ChronoDateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::file::Entity",
        from = "Column::FileId",
        to = "super::file::Column::Id"
    )]
    File,
}

impl Model {
    /// Returns an active model with all columns set.
    pub fn to_active_model(&self) -> ActiveModel {
        ActiveModel {
            id: Set(self.id.clone()),
            file_id: Set(self.file_id.clone()),
            seq: Set(self.seq),
            chunk_size: Set(self.chunk_size),
            chunk_hash: Set(self.chunk_hash.clone()),
            provider_id: Set(self.provider_id.clone()),
            location: Set(self.location.clone()),
            state: Set(self.state),
            created_at: Set(self.created_at),
            last_verified_at: Set(self.last_verified_at),
        }
    }
}

impl Related<super::file::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::File.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
