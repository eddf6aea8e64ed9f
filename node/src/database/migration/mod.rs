//! Database migrations.

pub use sea_orm_migration::*;

mod m20240301_000001_create_file_table;
mod m20240301_000002_create_chunk_table;
mod m20240301_000003_create_chunk_payload_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_file_table::Migration),
            Box::new(m20240301_000002_create_chunk_table::Migration),
            Box::new(m20240301_000003_create_chunk_payload_table::Migration),
        ]
    }
}
