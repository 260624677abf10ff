pub mod assemble;
pub mod cli;
pub mod compare;
pub mod config;
pub mod data;
pub mod fields;
pub mod frame;
pub mod frequency;
pub mod io_utils;
pub mod join;
pub mod pipeline;
pub mod report;
pub mod schema;
pub mod table;
pub mod temporal;
pub mod vocabulary;
pub mod yaml_provider;

use std::{env, sync::OnceLock};

use anyhow::{Result, bail};
use clap::Parser;
use log::{LevelFilter, info};

use crate::{
    cli::{Cli, Commands},
    config::MatchConfig,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("geoname_match", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Match(args) => pipeline::execute(&args),
        Commands::Fields(args) => fields::execute(&args),
        Commands::Init(args) => handle_init(&args),
    }
}

fn handle_init(args: &cli::InitArgs) -> Result<()> {
    if args.output.exists() && !args.force {
        bail!(
            "{:?} already exists; pass --force to overwrite it",
            args.output
        );
    }
    MatchConfig::template().save(&args.output)?;
    info!("Starter configuration written to {:?}", args.output);
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
