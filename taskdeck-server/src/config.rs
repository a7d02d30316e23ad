//! Server settings.
//!
//! Each setting is taken from the first source that has it: command line
//! (or its `TASKDECK_*` environment variable), then
//! `~/.config/taskdeck-server/config.toml`, then the built-in default.

use std::path::{Path, PathBuf};

/// Errors that can occur when loading server configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file exists (or was named explicitly) but is unreadable.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

/// Config file layout:
///
/// ```toml
/// [server]
/// bind_addr = "127.0.0.1:5001"
/// max_body_size = 65536
/// log_level = "debug"
///
/// [storage]
/// data_dir = "/var/lib/taskdeck"
/// ```
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileSettings {
    server: ServerSection,
    storage: StorageSection,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ServerSection {
    bind_addr: Option<String>,
    max_body_size: Option<usize>,
    log_level: Option<String>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
struct StorageSection {
    data_dir: Option<PathBuf>,
}

/// Command line of `taskdeck-server`.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Taskdeck API server")]
pub struct ServerCliArgs {
    /// Address to listen on.
    #[arg(short, long, env = "TASKDECK_ADDR")]
    pub bind: Option<String>,

    /// Config file to read instead of the default one; must exist.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Largest accepted request body, in bytes.
    #[arg(long)]
    pub max_body_size: Option<usize>,

    /// Directory holding `tasks.json` and `accounts.json`. Without it all
    /// data lives in memory only.
    #[arg(long, env = "TASKDECK_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, env = "TASKDECK_LOG")]
    pub log_level: Option<String>,
}

/// Settings the server runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Listen address, `0.0.0.0:5001` by default.
    pub bind_addr: String,
    /// Largest accepted request body, 64 KiB by default.
    pub max_body_size: usize,
    /// Snapshot directory; `None` keeps everything in memory.
    pub data_dir: Option<PathBuf>,
    /// Log filter, `info` by default.
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5001".to_string(),
            max_body_size: 64 * 1024,
            data_dir: None,
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Reads the config file (if any) and merges it under `cli`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an explicit `--config` file is missing, or
    /// any config file present cannot be read or parsed.
    pub fn load(cli: &ServerCliArgs) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) => read_settings(path)?,
            None => match dirs::config_dir() {
                Some(dir) => read_optional_settings(&dir.join("taskdeck-server/config.toml"))?,
                None => FileSettings::default(),
            },
        };
        Ok(Self::merge(cli, file))
    }

    fn merge(cli: &ServerCliArgs, file: FileSettings) -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: cli
                .bind
                .clone()
                .or(file.server.bind_addr)
                .unwrap_or(defaults.bind_addr),
            max_body_size: cli
                .max_body_size
                .or(file.server.max_body_size)
                .unwrap_or(defaults.max_body_size),
            data_dir: cli.data_dir.clone().or(file.storage.data_dir),
            log_level: cli
                .log_level
                .clone()
                .or(file.server.log_level)
                .unwrap_or(defaults.log_level),
        }
    }
}

fn read_settings(path: &Path) -> Result<FileSettings, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&text)?)
}

fn read_optional_settings(path: &Path) -> Result<FileSettings, ConfigError> {
    match read_settings(path) {
        Err(ConfigError::ReadFile { source, .. })
            if source.kind() == std::io::ErrorKind::NotFound =>
        {
            Ok(FileSettings::default())
        }
        other => other,
    }
}
