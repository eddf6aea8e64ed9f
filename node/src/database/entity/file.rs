//! A file stored as a sequence of chunks.

use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;

pub type FileModel = Model;

/// The state of a file.
#[derive(EnumIter, DeriveActiveEnum, Debug, Clone, Copy, PartialEq, Eq)]
#[sea_orm(rs_type = "String", db_type = "String(Some(1))")]
pub enum FileState {
    /// The file is being uploaded.
    ///
    /// Files in this state only exist in memory. A row is written
    /// once all chunks have been stored.
    #[sea_orm(string_value = "U")]
    Uploading,

    /// All chunks are stored and the file can be downloaded.
    #[sea_orm(string_value = "C")]
    Completed,

    /// An integrity scan found at least one bad chunk.
    #[sea_orm(string_value = "X")]
    Corrupted,

    /// The file has been deleted.
    ///
    /// Deleted files are invisible to everything except metadata
    /// lookups by ID.
    #[sea_orm(string_value = "D")]
    Deleted,
}

/// A file.
#[derive(Debug, Clone, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "file")]
pub struct Model {
    /// Unique ID of the file.
    ///
    /// This is a hyphenated UUID.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The display name of the file.
    pub name: String,

    /// The size of the file in bytes.
    pub size: i64,

    /// The MIME type of the file.
    pub mime_type: String,

    /// The hash of the entire file.
    ///
    /// This is the lowercase hexadecimal SHA-256 digest. It is used
    /// to deduplicate uploads.
    #[sea_orm(indexed)]
    pub file_hash: String,

    /// Number of chunks that make up this file.
    pub num_chunks: i32,

    /// The chunk size the file was split with.
    ///
    /// The last chunk may be shorter.
    pub chunk_size: i64,

    /// The state of the file.
    pub state: FileState,

    /// Timestamp when the file is created.
    pub created_at: ChronoDateTimeUtc,

    /// Timestamp when the file was last downloaded.
    pub last_accessed_at: Option<ChronoDateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::chunk::Entity")]
    Chunk,
}

impl Model {
    /// Returns an active model with all columns set.
    pub fn to_active_model(&self) -> ActiveModel {
        ActiveModel {
            id: Set(self.id.clone()),
            name: Set(self.name.clone()),
            size: Set(self.size),
            mime_type: Set(self.mime_type.clone()),
            file_hash: Set(self.file_hash.clone()),
            num_chunks: Set(self.num_chunks),
            chunk_size: Set(self.chunk_size),
            state: Set(self.state),
            created_at: Set(self.created_at),
            last_accessed_at: Set(self.last_accessed_at),
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.state == FileState::Deleted
    }
}

impl Related<super::chunk::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Chunk.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
