//! Configuration for Galley
//!
//! Everything the orchestrator used to read from module-level constants
//! lives here, so tests can build a config per case.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::error::DiagnosticOptions;
use crate::filters::{Category, FilterValidator, Mode};

/// Default worker deadline (10 seconds)
const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Per-stream capture cap (1 MiB)
const DEFAULT_MAX_STREAM_BYTES: usize = 1024 * 1024;

/// Largest accepted upload (5 MiB)
const DEFAULT_MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Resolve the Galley home directory.
///
/// Priority:
/// 1) GALLEY_HOME
/// 2) HOME/USERPROFILE
/// 3) ./.galley
pub fn galley_home() -> PathBuf {
    if let Ok(override_path) = std::env::var("GALLEY_HOME") {
        return PathBuf::from(override_path);
    }
    if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
        return PathBuf::from(home).join(".galley");
    }
    PathBuf::from(".").join(".galley")
}

/// Default config path: ~/.galley/config.toml
pub fn default_config_path() -> PathBuf {
    galley_home().join("config.toml")
}

/// Default logs directory: ~/.galley/logs
pub fn default_logs_dir() -> PathBuf {
    galley_home().join("logs")
}

/// How the external worker is launched and supervised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Interpreter executable (default: "python")
    #[serde(default = "default_interpreter")]
    pub interpreter: PathBuf,

    /// Worker entry script passed as the first argument (default: "main.py")
    #[serde(default = "default_script")]
    pub script: PathBuf,

    /// Directory the worker runs in. Inherits ours when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,

    /// Hard deadline for one invocation
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Capture cap applied to stdout and stderr separately
    #[serde(default = "default_max_stream_bytes")]
    pub max_stream_bytes: usize,

    /// Fold worker stderr into error messages
    #[serde(default = "default_true")]
    pub include_stderr_in_errors: bool,

    #[serde(default = "default_modes")]
    pub allowed_modes: Vec<Mode>,

    #[serde(default = "default_categories")]
    pub allowed_categories: Vec<Category>,
}

fn default_interpreter() -> PathBuf {
    PathBuf::from("python")
}

fn default_script() -> PathBuf {
    PathBuf::from("main.py")
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_max_stream_bytes() -> usize {
    DEFAULT_MAX_STREAM_BYTES
}

fn default_true() -> bool {
    true
}

fn default_modes() -> Vec<Mode> {
    Mode::ALL.to_vec()
}

fn default_categories() -> Vec<Category> {
    Category::ALL.to_vec()
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            script: default_script(),
            working_dir: None,
            timeout_ms: default_timeout_ms(),
            max_stream_bytes: default_max_stream_bytes(),
            include_stderr_in_errors: true,
            allowed_modes: default_modes(),
            allowed_categories: default_categories(),
        }
    }
}

impl WorkerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validator(&self) -> FilterValidator {
        FilterValidator::new(self.allowed_modes.clone(), self.allowed_categories.clone())
    }

    pub fn diagnostics(&self) -> DiagnosticOptions {
        DiagnosticOptions {
            include_stderr: self.include_stderr_in_errors,
        }
    }
}

/// Where uploads are staged and which uploads are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagingConfig {
    #[serde(default = "default_staging_dir")]
    pub dir: PathBuf,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,

    /// Accepted extensions, lowercase, without the dot
    #[serde(default = "default_extensions")]
    pub allowed_extensions: Vec<String>,

    /// Leave input/output artifacts on disk after the invocation
    #[serde(default)]
    pub keep_artifacts: bool,
}

fn default_staging_dir() -> PathBuf {
    galley_home().join("staging")
}

fn default_max_upload_bytes() -> u64 {
    DEFAULT_MAX_UPLOAD_BYTES
}

fn default_extensions() -> Vec<String> {
    vec!["xls".to_string()]
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            dir: default_staging_dir(),
            max_upload_bytes: default_max_upload_bytes(),
            allowed_extensions: default_extensions(),
            keep_artifacts: false,
        }
    }
}

/// Top-level config file layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GalleyConfig {
    #[serde(default)]
    pub worker: WorkerConfig,

    #[serde(default)]
    pub staging: StagingConfig,
}

impl GalleyConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from `path`, falling back to defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
