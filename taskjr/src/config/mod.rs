//! Configuration system for the `Taskjr` client.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/taskjr/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::PathBuf;
use std::time::Duration;

use taskjr_proto::task::MAX_TASK_TITLE_LENGTH;
use taskjr_proto::view::{StatusFilter, ViewMode};
use url::Url;

use crate::backend::rest::RestConfig;
use crate::store::StoreOptions;

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

    /// The backend URL is not a valid absolute URL.
    #[error("invalid backend url {url:?}: {source}")]
    InvalidUrl {
        /// The configured value.
        url: String,
        /// Parser error.
        source: url::ParseError,
    },
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    backend: BackendFileConfig,
    store: StoreFileConfig,
    display: DisplayFileConfig,
}

/// `[backend]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct BackendFileConfig {
    url: Option<String>,
    api_key: Option<String>,
    access_token: Option<String>,
    timeout_secs: Option<u64>,
}

/// `[store]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct StoreFileConfig {
    serialize_per_task: Option<bool>,
    max_title_len: Option<usize>,
}

/// `[display]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct DisplayFileConfig {
    default_view: Option<ViewMode>,
    default_filter: Option<StatusFilter>,
}

// ---------------------------------------------------------------------------
// Resolved configuration (concrete types, all fields populated)
// ---------------------------------------------------------------------------

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // -- Backend --
    /// Project base URL of the hosted backend.
    pub backend_url: Option<String>,
    /// Public project API key.
    pub api_key: Option<String>,
    /// The signed-in user's access token.
    pub access_token: Option<String>,
    /// Per-request timeout.
    pub request_timeout: Duration,

    // -- Store --
    /// Serialize mutations per task id.
    pub serialize_per_task: bool,
    /// Maximum task title length in characters.
    pub max_title_len: usize,

    // -- Display --
    /// View shown when no subcommand is given.
    pub default_view: ViewMode,
    /// Status filter applied when none is given.
    pub default_filter: StatusFilter,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: None,
            api_key: None,
            access_token: None,
            request_timeout: Duration::from_secs(10),
            serialize_per_task: false,
            max_title_len: MAX_TASK_TITLE_LENGTH,
            default_view: ViewMode::List,
            default_filter: StatusFilter::All,
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// CLI args and env vars are parsed via `clap`. If `--config` is given
    /// and the file does not exist, returns an error. If no `--config` is
    /// given, the default path (`~/.config/taskjr/config.toml`) is tried
    /// and silently ignored if missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config file cannot be read or parsed.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// Resolve a `ClientConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default.
    #[must_use]
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            backend_url: cli
                .backend_url
                .clone()
                .or_else(|| file.backend.url.clone()),
            api_key: cli.api_key.clone().or_else(|| file.backend.api_key.clone()),
            access_token: cli
                .access_token
                .clone()
                .or_else(|| file.backend.access_token.clone()),
            request_timeout: cli
                .timeout_secs
                .or(file.backend.timeout_secs)
                .map_or(defaults.request_timeout, Duration::from_secs),
            serialize_per_task: cli.serialize_per_task
                || file
                    .store
                    .serialize_per_task
                    .unwrap_or(defaults.serialize_per_task),
            max_title_len: file.store.max_title_len.unwrap_or(defaults.max_title_len),
            default_view: file.display.default_view.unwrap_or(defaults.default_view),
            default_filter: file
                .display
                .default_filter
                .unwrap_or(defaults.default_filter),
        }
    }

    /// Build a [`RestConfig`] from this configuration.
    ///
    /// Returns `Ok(None)` if the backend URL or API key is missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUrl`] if the backend URL does not parse.
    pub fn to_rest_config(&self) -> Result<Option<RestConfig>, ConfigError> {
        let (Some(url), Some(api_key)) = (&self.backend_url, &self.api_key) else {
            return Ok(None);
        };
        let base_url = Url::parse(url).map_err(|source| ConfigError::InvalidUrl {
            url: url.clone(),
            source,
        })?;
        Ok(Some(RestConfig {
            base_url,
            api_key: api_key.clone(),
            access_token: self.access_token.clone(),
            timeout: self.request_timeout,
        }))
    }

    /// Store options derived from the `[store]` section.
    #[must_use]
    pub const fn store_options(&self) -> StoreOptions {
        StoreOptions {
            serialize_per_task: self.serialize_per_task,
            max_title_len: self.max_title_len,
        }
    }
}

/// Global CLI arguments parsed by clap.
#[derive(clap::Args, Debug, Default)]
pub struct CliArgs {
    /// Base URL of the task backend.
    #[arg(long, global = true, env = "TASKJR_URL")]
    pub backend_url: Option<String>,

    /// Public project API key.
    #[arg(long, global = true, env = "TASKJR_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Access token of the signed-in user.
    #[arg(long, global = true, env = "TASKJR_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// Run mutations on the same task one at a time.
    #[arg(long, global = true)]
    pub serialize_per_task: bool,

    /// Path to config file (default: `~/.config/taskjr/config.toml`).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info", env = "TASKJR_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/taskjr.log`).
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and missing file
/// is treated as empty config.
fn load_config_file(explicit_path: Option<&std::path::Path>) -> Result<ConfigFile, ConfigError> {
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
        config_dir.join("taskjr").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
