//! Database entities.
//!
//! We use SeaORM and target PostgreSQL (production) and SQLite (development).

pub mod chunk;
pub mod chunk_payload;
pub mod file;
