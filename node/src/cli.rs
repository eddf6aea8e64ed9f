//! Global CLI Setup.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use enum_as_inner::EnumAsInner;

use crate::command::check_config::{self, CheckConfig};
use crate::command::delete::{self, Delete};
use crate::command::download::{self, Download};
use crate::command::health::{self, Health};
use crate::command::info::{self, Info};
use crate::command::list::{self, List};
use crate::command::upload::{self, Upload};
use crate::command::verify::{self, Verify};

/// Chunked file storage over interchangeable backends.
#[derive(Debug, Parser)]
#[clap(version)]
#[clap(propagate_version = true)]
pub struct Opts {
    /// Path to the config file.
    #[clap(short = 'f', long, global = true)]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, EnumAsInner)]
pub enum Command {
    Upload(Upload),
    Download(Download),
    Delete(Delete),
    Verify(Verify),
    Info(Info),
    List(List),
    Health(Health),
    CheckConfig(CheckConfig),
}

pub async fn run() -> Result<()> {
    let opts = Opts::parse();

    match opts.command {
        Command::Upload(_) => upload::run(opts).await,
        Command::Download(_) => download::run(opts).await,
        Command::Delete(_) => delete::run(opts).await,
        Command::Verify(_) => verify::run(opts).await,
        Command::Info(_) => info::run(opts).await,
        Command::List(_) => list::run(opts).await,
        Command::Health(_) => health::run(opts).await,
        Command::CheckConfig(_) => check_config::run(opts).await,
    }
}
