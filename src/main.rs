mod cli;
mod commands;
mod config;
mod database;
mod error;
mod http;
mod message_service;
mod result_ext;
mod schema;
mod sync_ext;

use crate::cli::{Cli, Command};
use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

#[actix_web::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    simple_logger::SimpleLogger::new()
        .with_module_level("actix_server", LevelFilter::Off)
        .with_module_level("mio", LevelFilter::Off)
        .with_level(if cli.quiet {
            LevelFilter::Warn
        } else {
            LevelFilter::Debug
        })
        .init()?;

    let data_dir = commands::get_data_dir(cli.data_dir)?;
    match cli.command {
        Command::Serve(args) => commands::serve(&data_dir, args).await,
        Command::Migrate => commands::migrate(&data_dir),
    }
}
