use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(about, version, author)]
pub struct Cli {
    /// Directory holding the database and the default media directory
    #[arg(long, global = true, env = "PARLEY_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Log fewer messages
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),

    /// Apply pending database migrations and exit
    Migrate,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// HTTP server port, overriding the config file
    #[arg(short = 'p', long, env = "PORT")]
    pub port: Option<u16>,

    /// Path to the TOML config file
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,
}
