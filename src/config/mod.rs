mod env;
mod expand_tilde;

use self::env::Env;
use self::expand_tilde::expand_tilde;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs::read_to_string;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_PAGE_SIZE: u32 = 50;
const DEFAULT_MAX_PAGE_SIZE: u32 = 200;
const DEFAULT_MAX_FILE_SIZE: usize = 25 * 1024 * 1024;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    server: RawServerConfig,

    #[serde(default)]
    history: RawHistoryConfig,

    #[serde(default)]
    media: RawMediaConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct RawServerConfig {
    host: Option<String>,
    port: Option<u16>,
    #[serde(default, with = "humantime_serde")]
    shutdown_timeout: Option<Duration>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct RawHistoryConfig {
    default_page_size: Option<u32>,
    max_page_size: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct RawMediaConfig {
    dir: Option<PathBuf>,
    max_file_size: Option<usize>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout: Duration,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct HistoryConfig {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MediaConfig {
    pub dir: PathBuf,
    pub max_file_size: usize,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    pub server: ServerConfig,
    pub history: HistoryConfig,
    pub media: MediaConfig,
}

impl Config {
    /// Validate a raw config, only resolving the host environment when a path needs expanding
    fn from_raw(
        raw: RawConfig,
        env: impl FnOnce() -> Result<Env>,
        data_dir: &Path,
    ) -> Result<Self> {
        let max_page_size = raw.history.max_page_size.unwrap_or(DEFAULT_MAX_PAGE_SIZE);
        if max_page_size == 0 {
            bail!("`maxPageSize` must be at least 1");
        }
        let default_page_size = raw
            .history
            .default_page_size
            .unwrap_or_else(|| DEFAULT_PAGE_SIZE.min(max_page_size));
        if default_page_size == 0 || default_page_size > max_page_size {
            bail!("`defaultPageSize` must be between 1 and `maxPageSize` ({max_page_size})");
        }

        let max_file_size = raw.media.max_file_size.unwrap_or(DEFAULT_MAX_FILE_SIZE);
        if max_file_size == 0 {
            bail!("`maxFileSize` must be at least 1 byte");
        }
        let media_dir = match raw.media.dir {
            Some(dir) => expand_tilde(&dir, &env()?),
            None => data_dir.join("media"),
        };

        Ok(Self {
            server: ServerConfig {
                host: raw.server.host.unwrap_or_else(|| DEFAULT_HOST.to_owned()),
                port: raw.server.port.unwrap_or(DEFAULT_PORT),
                shutdown_timeout: raw
                    .server
                    .shutdown_timeout
                    .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT),
            },
            history: HistoryConfig {
                default_page_size,
                max_page_size,
            },
            media: MediaConfig {
                dir: media_dir,
                max_file_size,
            },
        })
    }

    /// Load the config file at a path, or use the defaults when there is no config file
    pub fn load(path: Option<&Path>, data_dir: &Path) -> Result<Self> {
        let raw = match path {
            Some(path) => {
                let toml_str = read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                toml::from_str(&toml_str).with_context(|| {
                    format!("Failed to deserialize TOML config file {}", path.display())
                })?
            }
            None => RawConfig::default(),
        };
        Self::from_raw(raw, Env::from_host, data_dir)
    }

    /// The configuration used when no config file is provided
    #[cfg(test)]
    pub fn defaults(data_dir: &Path) -> Self {
        Self::from_raw(RawConfig::default(), || Ok(Env::mock()), data_dir)
            .expect("default config is valid")
    }
}
