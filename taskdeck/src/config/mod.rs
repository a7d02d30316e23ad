//! Configuration system for the `taskdeck` client.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/taskdeck/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::FixedOffset;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// `utc_offset_minutes` is outside +/- 24 hours.
    #[error("utc_offset_minutes out of range: {0}")]
    UtcOffset(i32),

    /// Failed to read, write, or remove the saved token.
    #[error("token file {path}: {source}")]
    TokenFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    server: ServerFileConfig,
    display: DisplayFileConfig,
}

/// `[server]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerFileConfig {
    url: Option<String>,
    request_timeout_secs: Option<u64>,
    connect_timeout_secs: Option<u64>,
    token_file: Option<PathBuf>,
}

/// `[display]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct DisplayFileConfig {
    utc_offset_minutes: Option<i32>,
}

// ---------------------------------------------------------------------------
// Resolved configuration (concrete types, all fields populated)
// ---------------------------------------------------------------------------

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the Taskdeck server (e.g. `http://127.0.0.1:5001`).
    pub server_url: String,
    /// Bearer token given explicitly, overriding the saved one.
    pub token: Option<String>,
    /// Timeout for a whole HTTP request.
    pub request_timeout: Duration,
    /// Timeout for establishing a connection.
    pub connect_timeout: Duration,
    /// Where the CLI keeps the token between runs.
    pub token_file: Option<PathBuf>,
    /// Offset used for "due today". `None` means the local offset.
    pub utc_offset: Option<FixedOffset>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5001".to_string(),
            token: None,
            request_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            token_file: dirs::config_dir().map(|dir| dir.join("taskdeck").join("token")),
            utc_offset: None,
        }
    }
}

impl ClientConfig {
    /// Configuration pointing at `server_url` with every other field at its
    /// default and no token file.
    #[must_use]
    pub fn for_server(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            token_file: None,
            ..Self::default()
        }
    }

    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read
    /// or parsed, or if it holds an invalid UTC offset.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Self::resolve(cli, &file)
    }

    /// Resolve a `ClientConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default.
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let utc_offset = match cli.utc_offset_minutes.or(file.display.utc_offset_minutes) {
            Some(minutes) => Some(
                minutes
                    .checked_mul(60)
                    .and_then(FixedOffset::east_opt)
                    .ok_or(ConfigError::UtcOffset(minutes))?,
            ),
            None => None,
        };

        Ok(Self {
            server_url: cli
                .server_url
                .clone()
                .or_else(|| file.server.url.clone())
                .unwrap_or(defaults.server_url),
            token: cli.token.clone(),
            request_timeout: file
                .server
                .request_timeout_secs
                .map_or(defaults.request_timeout, Duration::from_secs),
            connect_timeout: file
                .server
                .connect_timeout_secs
                .map_or(defaults.connect_timeout, Duration::from_secs),
            token_file: file.server.token_file.clone().or(defaults.token_file),
            utc_offset,
        })
    }

    /// The offset "due today" is evaluated in.
    #[must_use]
    pub fn offset(&self) -> FixedOffset {
        self.utc_offset
            .unwrap_or_else(|| *chrono::Local::now().offset())
    }
}

/// CLI arguments shared by every subcommand.
#[derive(clap::Args, Debug, Default)]
pub struct CliArgs {
    /// Base URL of the Taskdeck server.
    #[arg(long, global = true, env = "TASKDECK_URL")]
    pub server_url: Option<String>,

    /// Bearer token to use instead of the saved one.
    #[arg(long, global = true, env = "TASKDECK_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Path to config file (default: `~/.config/taskdeck/config.toml`).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Offset from UTC in minutes used for "due today".
    #[arg(long, global = true, allow_negative_numbers = true)]
    pub utc_offset_minutes: Option<i32>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info", env = "TASKDECK_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/taskdeck.log`).
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Saved token
// ---------------------------------------------------------------------------

/// Reads the saved token, if any.
///
/// # Errors
///
/// Returns [`ConfigError::TokenFile`] for read failures other than "not found".
pub fn load_token(path: &Path) -> Result<Option<String>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            let token = contents.trim();
            Ok((!token.is_empty()).then(|| token.to_string()))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ConfigError::TokenFile {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Saves `token`, creating the parent directory if needed.
///
/// # Errors
///
/// Returns [`ConfigError::TokenFile`] if the file cannot be written.
pub fn save_token(path: &Path, token: &str) -> Result<(), ConfigError> {
    let err = |source| ConfigError::TokenFile {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(err)?;
    }
    std::fs::write(path, token).map_err(err)
}

/// Removes the saved token. A missing file is not an error.
///
/// # Errors
///
/// Returns [`ConfigError::TokenFile`] if the file exists but cannot be removed.
pub fn clear_token(path: &Path) -> Result<(), ConfigError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(ConfigError::TokenFile {
            path: path.to_path_buf(),
            source,
        }),
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and missing file
/// is treated as empty config.
fn load_config_file(explicit_path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(ConfigFile::default());
        };
        config_dir.join("taskdeck").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
