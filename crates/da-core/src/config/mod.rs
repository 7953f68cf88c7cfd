//! Configuration loading and validation for da-core.
//!
//! This module handles:
//! - Loading `config.json` (resolution order CLI > env > XDG > defaults)
//! - Shape checking via serde, semantic checks via [`validate_config`]
//! - Resolving the adb executable once, into an immutable [`AdbConfig`]

use crate::collect::AdbConfig;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Default XDG config directory name.
const CONFIG_DIR_NAME: &str = "device_audit";

/// File looked up inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Overrides the config directory.
pub const ENV_CONFIG_DIR: &str = "DA_CONFIG_DIR";

/// Explicit adb executable.
pub const ENV_ADB_PATH: &str = "ADB_PATH";

/// SDK root variables, checked in order.
const ENV_SDK_ROOTS: [&str; 2] = ["ANDROID_HOME", "ANDROID_SDK_ROOT"];

/// Name looked up on `PATH` when nothing else resolves.
pub const SYSTEM_ADB: &str = "adb";

const MIN_OUTPUT_BYTES: usize = 1024;

/// Errors that can occur during config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("invalid JSON in config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error reading {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid value for `{field}`: {message}")]
    Invalid { field: &'static str, message: String },
}

impl From<ConfigError> for da_common::Error {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Invalid { .. } => da_common::Error::InvalidConfig(err.to_string()),
            other => da_common::Error::Config(other.to_string()),
        }
    }
}

/// Settings read from `config.json`. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct AuditorConfig {
    /// Explicit adb executable.
    pub adb_path: Option<PathBuf>,

    /// Listen address for `serve`.
    pub bind: String,

    pub port: u16,

    /// HTTP worker threads.
    pub workers: usize,

    /// Per-command timeout for device commands.
    pub command_timeout_secs: u64,

    /// Per-stream output cap for device commands.
    pub max_output_bytes: usize,

    /// Page served at `/`.
    pub index_html: Option<PathBuf>,

    /// Value of `Access-Control-Allow-Origin`.
    pub cors_allow_origin: String,
}

impl Default for AuditorConfig {
    fn default() -> Self {
        Self {
            adb_path: None,
            bind: "127.0.0.1".to_string(),
            port: 8000,
            workers: 4,
            command_timeout_secs: crate::collect::DEFAULT_TIMEOUT_SECS,
            max_output_bytes: crate::collect::DEFAULT_MAX_OUTPUT_BYTES,
            index_html: None,
            cors_allow_origin: "*".to_string(),
        }
    }
}

/// Semantic validation beyond what serde checks.
pub fn validate_config(config: &AuditorConfig) -> Result<(), ConfigError> {
    if config.port == 0 {
        return Err(ConfigError::Invalid {
            field: "port",
            message: "must be between 1 and 65535".to_string(),
        });
    }
    if config.workers == 0 {
        return Err(ConfigError::Invalid {
            field: "workers",
            message: "at least one worker is required".to_string(),
        });
    }
    if config.command_timeout_secs == 0 {
        return Err(ConfigError::Invalid {
            field: "command_timeout_secs",
            message: "must be at least 1 second".to_string(),
        });
    }
    if config.max_output_bytes < MIN_OUTPUT_BYTES {
        return Err(ConfigError::Invalid {
            field: "max_output_bytes",
            message: format!("must be at least {} bytes", MIN_OUTPUT_BYTES),
        });
    }
    if config.bind.trim().is_empty() {
        return Err(ConfigError::Invalid {
            field: "bind",
            message: "must not be empty".to_string(),
        });
    }
    Ok(())
}

/// Configuration resolution options.
#[derive(Debug, Default, Clone)]
pub struct ConfigOptions {
    /// Explicit config file (highest priority; must exist).
    pub config_path: Option<PathBuf>,
    /// Explicit config directory.
    pub config_dir: Option<PathBuf>,
}

/// Resolved configuration with provenance information.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: AuditorConfig,
    /// Path of the loaded file (None if using defaults).
    pub config_path: Option<PathBuf>,
    /// SHA-256 of the loaded file (None if using defaults).
    pub config_hash: Option<String>,
    /// The config directory used for resolution.
    pub config_dir: PathBuf,
}

/// What `config show` prints.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ConfigSnapshot {
    pub config: AuditorConfig,
    pub config_path: Option<PathBuf>,
    pub config_hash: Option<String>,
    pub config_dir: PathBuf,
    pub adb: AdbResolution,
}

impl ResolvedConfig {
    /// Built-in defaults, with no file behind them.
    pub fn defaults() -> Self {
        Self {
            config: AuditorConfig::default(),
            config_path: None,
            config_hash: None,
            config_dir: PathBuf::from("."),
        }
    }

    /// Resolve the adb executable against the process environment.
    pub fn resolve_adb(&self, cli_adb: Option<&Path>) -> AdbResolution {
        resolve_adb_path(
            cli_adb,
            self.config.adb_path.as_deref(),
            |key| std::env::var(key).ok(),
            dirs::home_dir().as_deref(),
        )
    }

    /// Immutable bridge settings for the client.
    pub fn adb_config(&self, adb: &AdbResolution) -> AdbConfig {
        AdbConfig {
            executable: adb.path.clone(),
            timeout: Duration::from_secs(self.config.command_timeout_secs),
            max_output_bytes: self.config.max_output_bytes,
        }
    }

    pub fn snapshot(&self, adb: AdbResolution) -> ConfigSnapshot {
        ConfigSnapshot {
            config: self.config.clone(),
            config_path: self.config_path.clone(),
            config_hash: self.config_hash.clone(),
            config_dir: self.config_dir.clone(),
            adb,
        }
    }
}

/// Load configuration with the standard resolution order.
///
/// 1. Explicit file (`--config`)
/// 2. `DA_CONFIG_DIR` (or an explicit directory)
/// 3. `$XDG_CONFIG_HOME/device_audit` (`~/.config/device_audit`)
/// 4. Built-in defaults
pub fn load_config(options: &ConfigOptions) -> Result<ResolvedConfig, ConfigError> {
    let config_dir = resolve_config_dir(options, |key| std::env::var(key).ok());

    let (config, config_path, config_hash) = match &options.config_path {
        Some(path) => {
            if !path.exists() {
                return Err(ConfigError::NotFound { path: path.clone() });
            }
            let (config, hash) = load_config_from_file(path)?;
            (config, Some(path.clone()), Some(hash))
        }
        None => {
            let default_path = config_dir.join(CONFIG_FILE_NAME);
            if default_path.exists() {
                let (config, hash) = load_config_from_file(&default_path)?;
                (config, Some(default_path), Some(hash))
            } else {
                debug!(dir = %config_dir.display(), "no config file, using defaults");
                (AuditorConfig::default(), None, None)
            }
        }
    };

    validate_config(&config)?;

    Ok(ResolvedConfig {
        config,
        config_path,
        config_hash,
        config_dir,
    })
}

fn resolve_config_dir<F>(options: &ConfigOptions, lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(dir) = &options.config_dir {
        return dir.clone();
    }
    if let Some(dir) = lookup(ENV_CONFIG_DIR) {
        return PathBuf::from(dir);
    }
    let xdg_config = lookup("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config")
        });
    xdg_config.join(CONFIG_DIR_NAME)
}

fn load_config_from_file(path: &Path) -> Result<(AuditorConfig, String), ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let hash = compute_hash(&content);

    let config: AuditorConfig =
        serde_json::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

    Ok((config, hash))
}

/// SHA-256 of file content, lowercase hex.
fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Where the adb executable came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AdbSource {
    Cli,
    Config,
    Env,
    SdkEnv,
    SdkDefault,
    SystemPath,
}

impl std::fmt::Display for AdbSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AdbSource::Cli => "--adb",
            AdbSource::Config => "config file",
            AdbSource::Env => "ADB_PATH",
            AdbSource::SdkEnv => "ANDROID_HOME/ANDROID_SDK_ROOT",
            AdbSource::SdkDefault => "SDK default location",
            AdbSource::SystemPath => "PATH",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AdbResolution {
    pub path: PathBuf,
    pub source: AdbSource,
}

fn adb_file_name() -> &'static str {
    if cfg!(windows) {
        "adb.exe"
    } else {
        "adb"
    }
}

/// Per-OS location the SDK installer uses, relative to the home directory.
fn sdk_default_dir(home: &Path) -> PathBuf {
    if cfg!(windows) {
        home.join("AppData").join("Local").join("Android").join("Sdk")
    } else if cfg!(target_os = "macos") {
        home.join("Library").join("Android").join("sdk")
    } else {
        home.join("Android").join("Sdk")
    }
}

/// A bare command name is looked up on `PATH` by the OS, not checked here.
fn is_bare_name(path: &Path) -> bool {
    path.components().count() == 1 && !path.is_absolute()
}

/// Resolve the adb executable.
///
/// Explicit choices (CLI, config, `ADB_PATH`) are taken as given; SDK
/// locations only when the executable exists there. An explicit path that
/// does not exist falls back to `adb` on `PATH`.
pub fn resolve_adb_path<F>(
    cli: Option<&Path>,
    configured: Option<&Path>,
    lookup: F,
    home: Option<&Path>,
) -> AdbResolution
where
    F: Fn(&str) -> Option<String>,
{
    let explicit = cli
        .map(|p| (p.to_path_buf(), AdbSource::Cli))
        .or_else(|| configured.map(|p| (p.to_path_buf(), AdbSource::Config)))
        .or_else(|| {
            lookup(ENV_ADB_PATH)
                .filter(|v| !v.is_empty())
                .map(|v| (PathBuf::from(v), AdbSource::Env))
        });

    if let Some((path, source)) = explicit {
        if is_bare_name(&path) || path.exists() {
            return AdbResolution { path, source };
        }
        warn!(
            path = %path.display(),
            "adb not found at configured path, falling back to system adb"
        );
        return AdbResolution {
            path: PathBuf::from(SYSTEM_ADB),
            source: AdbSource::SystemPath,
        };
    }

    for var in ENV_SDK_ROOTS {
        if let Some(root) = lookup(var).filter(|v| !v.is_empty()) {
            let candidate = PathBuf::from(root).join("platform-tools").join(adb_file_name());
            if candidate.exists() {
                return AdbResolution {
                    path: candidate,
                    source: AdbSource::SdkEnv,
                };
            }
        }
    }

    if let Some(home) = home {
        let candidate = sdk_default_dir(home)
            .join("platform-tools")
            .join(adb_file_name());
        if candidate.exists() {
            return AdbResolution {
                path: candidate,
                source: AdbSource::SdkDefault,
            };
        }
    }

    AdbResolution {
        path: PathBuf::from(SYSTEM_ADB),
        source: AdbSource::SystemPath,
    }
}
