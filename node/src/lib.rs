//! A single-node chunk store.
//!
//! Files are split into chunks which are spread over a set of storage
//! providers, while file and chunk descriptors live in a SeaORM
//! database. [`FilePipeline`] is the entry point for whole-file
//! operations.

#![deny(
    asm_sub_register,
    deprecated,
    missing_abi,
    unsafe_code,
    unused_macros,
    unused_must_use,
    unused_unsafe
)]
#![deny(clippy::from_over_into, clippy::needless_question_mark)]
#![cfg_attr(
    not(debug_assertions),
    deny(unused_imports, unused_mut, unused_variables,)
)]

pub mod config;
pub mod database;
pub mod distribution;
pub mod error;
pub mod oobe;
pub mod pipeline;
pub mod storage;

use anyhow::Result;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use config::Config;
use database::migration::{Migrator, MigratorTrait};
use error::{NodeError, NodeResult};

pub use pipeline::FilePipeline;

/// Connects to the metadata database.
pub async fn connect_database(config: &Config) -> NodeResult<DatabaseConnection> {
    let mut options = ConnectOptions::new(config.database.url.clone());
    options.sqlx_logging(false);

    if let Some(max_connections) = config.database.max_connections {
        options.max_connections(max_connections);
    }

    Database::connect(options)
        .await
        .map_err(NodeError::database_error)
}

/// Runs database migrations.
pub async fn run_migrations(database: &DatabaseConnection) -> Result<()> {
    tracing::debug!("Running migrations...");

    Migrator::up(database, None).await?;

    Ok(())
}

/// Connects to the database, brings it up to date and builds the pipeline.
pub async fn open_pipeline(config: &Config) -> Result<FilePipeline> {
    let database = connect_database(config).await?;
    run_migrations(&database).await?;

    let pipeline = FilePipeline::from_config(config, database).await?;

    Ok(pipeline)
}
