use sea_orm_migration::prelude::*;

use crate::database::entity::chunk::*;
use crate::database::entity::file;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20240301_000002_create_chunk_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Entity)
                    .col(
                        ColumnDef::new(Column::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Column::FileId).string().not_null())
                    .col(ColumnDef::new(Column::Seq).integer().not_null())
                    .col(ColumnDef::new(Column::ChunkSize).big_integer().not_null())
                    .col(ColumnDef::new(Column::ChunkHash).string().not_null())
                    .col(ColumnDef::new(Column::ProviderId).string().not_null())
                    .col(ColumnDef::new(Column::Location).string().not_null())
                    .col(
                        ColumnDef::new(Column::State)
                            .r#char()
                            .char_len(1)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Column::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Column::LastVerifiedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKeyCreateStatement::new()
                            .name("fk_chunk_file")
                            .from_tbl(Entity)
                            .from_col(Column::FileId)
                            .to_tbl(file::Entity)
                            .to_col(file::Column::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-chunk-file-id-seq")
                    .table(Entity)
                    .col(Column::FileId)
                    .col(Column::Seq)
                    .unique()
                    .to_owned(),
            )
            .await
    }
}
