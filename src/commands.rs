use crate::cli::ServeArgs;
use crate::config::Config;
use crate::database::Database;
use crate::http;
use crate::message_service::MessageService;
use anyhow::{Context, Result};
use log::info;
use std::fs::create_dir_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Return the directory where parley will store application data, creating it if necessary
pub fn get_data_dir(data_dir: Option<PathBuf>) -> Result<PathBuf> {
    let data_dir = match data_dir {
        Some(data_dir) => data_dir,
        None => directories::ProjectDirs::from("com", "parley", "parley")
            .context("Failed to determine application directories")?
            .data_local_dir()
            .to_owned(),
    };
    create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;
    Ok(data_dir)
}

/// Implementation for the `serve` CLI command
pub async fn serve(data_dir: &Path, args: ServeArgs) -> Result<()> {
    let mut config = Config::load(args.config.as_deref(), data_dir)?;
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let db = Database::open(data_dir)?;
    let service = Arc::new(MessageService::new(db, &config));
    http::start_server(service, &config)
        .await
        .context("Failed to run HTTP server")
}

/// Implementation for the `migrate` CLI command
pub fn migrate(data_dir: &Path) -> Result<()> {
    Database::open(data_dir)?;
    info!("Database in {} is up to date", data_dir.display());
    Ok(())
}
