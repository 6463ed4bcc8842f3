//! Core runtime configuration.
//!
//! Load order: TOML file → `PHYLODB_*` environment variables → defaults.
//!
//! # Invariants
//! - Missing sections and keys fall back to defaults.
//! - Loading never touches the database or the logger.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Default page size for listings when the caller does not pick one.
pub const DEFAULT_PAGE_LIMIT: i64 = 100;
/// Default recursion cap for tree reconstruction.
pub const DEFAULT_MAX_TREE_DEPTH: usize = 4096;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub paging: PagingConfig,
    pub visualization: VisualizationConfig,
}

/// Where the store lives and how it waits on a locked database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file path. Ignored when `in_memory` is set.
    pub path: Option<PathBuf>,
    /// Use a throwaway in-memory database.
    pub in_memory: bool,
    /// How long a writer waits for the write lock before failing.
    pub busy_timeout_ms: u64,
}

/// Logger settings consumed by `logging::init_logging`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace|debug|info|warn|error
    pub level: String,
    /// Absolute log directory. Logging stays off when unset.
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PagingConfig {
    pub default_limit: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizationConfig {
    /// Deeper trees fail with `TreeError::DepthExceeded`.
    pub max_tree_depth: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            in_memory: false,
            busy_timeout_ms: 5_000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: crate::logging::default_log_level().to_string(),
            dir: None,
        }
    }
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            max_tree_depth: DEFAULT_MAX_TREE_DEPTH,
        }
    }
}

/// Errors from configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: toml::de::Error },
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse config `{}`: {source}", path.display())
            }
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Invalid(_) => None,
        }
    }
}

impl CoreConfig {
    /// Loads config from `path` when it exists, then applies env overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            Self::from_toml_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML document without touching the environment.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("PHYLODB_DB_PATH") {
            if !path.trim().is_empty() {
                self.database.path = Some(PathBuf::from(path));
            }
        }
        env_override("PHYLODB_BUSY_TIMEOUT_MS", &mut self.database.busy_timeout_ms);
        env_override("PHYLODB_PAGE_LIMIT", &mut self.paging.default_limit);
        env_override("PHYLODB_MAX_TREE_DEPTH", &mut self.visualization.max_tree_depth);
        if let Ok(level) = std::env::var("PHYLODB_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(dir) = std::env::var("PHYLODB_LOG_DIR") {
            if !dir.trim().is_empty() {
                self.logging.dir = Some(PathBuf::from(dir));
            }
        }
    }

    /// Rejects values the store cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.paging.default_limit <= 0 {
            return Err(ConfigError::Invalid(format!(
                "paging.default_limit must be positive, got {}",
                self.paging.default_limit
            )));
        }
        if self.visualization.max_tree_depth == 0 {
            return Err(ConfigError::Invalid(
                "visualization.max_tree_depth must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_override<T: std::str::FromStr>(var: &str, target: &mut T) {
    if let Ok(value) = std::env::var(var) {
        if let Ok(parsed) = value.trim().parse() {
            *target = parsed;
        }
    }
}
