pub mod check_config;
pub mod delete;
pub mod download;
pub mod health;
pub mod info;
pub mod list;
pub mod upload;
pub mod verify;

use anyhow::Result;

use crate::cli::Opts;
use chunkvault_node::config;
use chunkvault_node::FilePipeline;

/// Loads the configuration and opens the pipeline.
///
/// Migrations are run before anything else touches the database.
async fn open_pipeline(opts: &Opts) -> Result<FilePipeline> {
    let config = config::load_config(opts.config.as_deref(), true).await?;
    chunkvault_node::open_pipeline(&config).await
}
