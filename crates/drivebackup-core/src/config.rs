//! Configuration module for drive-backup.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, saving, validation, defaults, and a builder pattern for
//! programmatic use.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{BackupName, BackupType, ExportFormat};

/// File name the effective configuration is saved under next to the backups.
pub const SAVED_CONFIG_FILE: &str = "drive-backup.yaml";

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for drive-backup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backup: BackupConfig,
    pub logging: LoggingConfig,
    pub remote: RemoteConfig,
    /// When the last successful backup finished.
    pub last_backup: Option<DateTime<Utc>>,
}

/// What to back up and where.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Directory holding the backup roots.
    pub destination: PathBuf,
    /// Backup root name. `None` uses `Google Drive Backup M-D-YYYY`.
    pub backup_name: Option<String>,
    /// `complete`, `update`, or `increment`.
    pub backup_type: BackupType,
    /// Previous backup to reuse. `None` picks the most recent dated one.
    pub prev_backup_name: Option<String>,
    /// Source folder name in the drive root. Takes precedence over `source_id`.
    pub source: Option<String>,
    /// Source folder id; `root` is the whole drive.
    pub source_id: String,
    /// `msoffice` or `pdf`.
    pub export_format: ExportFormat,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Log file path. `None` writes `drive-backup.log` inside the backup root.
    pub file: Option<PathBuf>,
    /// Only log events from drive-backup's own crates.
    pub crate_only: bool,
    /// Omit per-file lines for files that were already current.
    pub changes_only: bool,
}

/// Remote API settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the Drive v3 REST API.
    pub api_base_url: String,
    /// Items requested per listing page.
    pub page_size: u32,
    /// Size of each ranged download request (in KiB).
    pub chunk_size_kb: u64,
    /// Retries for rate-limited, server-error, or failed connections.
    pub max_retries: u32,
    /// Environment variable holding the OAuth bearer token.
    pub access_token_env: String,
}

// ---------------------------------------------------------------------------
// Config::load() / save()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Write the configuration as YAML to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/drive-backup/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("drive-backup")
            .join("config.yaml")
    }

    /// Where a finished run stores its configuration when no explicit
    /// config path was given.
    pub fn saved_path(&self) -> PathBuf {
        self.backup.destination.join(SAVED_CONFIG_FILE)
    }

    /// Chunk size in bytes.
    pub fn chunk_size_bytes(&self) -> u64 {
        self.remote.chunk_size_kb.saturating_mul(1024)
    }
}

// ---------------------------------------------------------------------------
// Config::default()
// ---------------------------------------------------------------------------

// Config derives Default because all its fields implement Default.
// (clippy::derivable_impls)

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            destination: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("~"))
                .join("Backups"),
            backup_name: None,
            backup_type: BackupType::Complete,
            prev_backup_name: None,
            source: None,
            source_id: "root".to_string(),
            export_format: ExportFormat::MsOffice,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            crate_only: false,
            changes_only: false,
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://www.googleapis.com/drive/v3".to_string(),
            page_size: 1000,
            chunk_size_kb: 1024,
            max_retries: 5,
            access_token_env: "DRIVE_BACKUP_ACCESS_TOKEN".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"remote.page_size"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Largest page the listing endpoint accepts.
const MAX_PAGE_SIZE: u32 = 1000;

/// Upper bound for `remote.max_retries`.
const MAX_RETRIES_LIMIT: u32 = 10;

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid. The destination's
    /// existence is checked when a run starts, not here.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- backup ---
        if self.backup.destination.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "backup.destination".into(),
                message: "must not be empty".into(),
            });
        }
        if let Some(name) = &self.backup.backup_name {
            if let Err(e) = BackupName::new(name.clone()) {
                errors.push(ValidationError {
                    field: "backup.backup_name".into(),
                    message: e.to_string(),
                });
            }
        }
        if let Some(name) = &self.backup.prev_backup_name {
            if let Err(e) = BackupName::new(name.clone()) {
                errors.push(ValidationError {
                    field: "backup.prev_backup_name".into(),
                    message: e.to_string(),
                });
            } else if self.backup.backup_name.as_ref() == Some(name) {
                errors.push(ValidationError {
                    field: "backup.prev_backup_name".into(),
                    message: "must differ from backup.backup_name".into(),
                });
            }
        }
        if self.backup.source.as_deref().is_some_and(str::is_empty) {
            errors.push(ValidationError {
                field: "backup.source".into(),
                message: "must not be empty when set".into(),
            });
        }
        if self.backup.source_id.is_empty() {
            errors.push(ValidationError {
                field: "backup.source_id".into(),
                message: "must not be empty".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        // --- remote ---
        if !self.remote.api_base_url.starts_with("http://")
            && !self.remote.api_base_url.starts_with("https://")
        {
            errors.push(ValidationError {
                field: "remote.api_base_url".into(),
                message: format!("not an http(s) URL: {}", self.remote.api_base_url),
            });
        }
        if self.remote.page_size == 0 || self.remote.page_size > MAX_PAGE_SIZE {
            errors.push(ValidationError {
                field: "remote.page_size".into(),
                message: format!("must be in range 1..={MAX_PAGE_SIZE}"),
            });
        }
        if self.remote.chunk_size_kb == 0 {
            errors.push(ValidationError {
                field: "remote.chunk_size_kb".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.remote.max_retries > MAX_RETRIES_LIMIT {
            errors.push(ValidationError {
                field: "remote.max_retries".into(),
                message: format!("must be at most {MAX_RETRIES_LIMIT}"),
            });
        }
        if self.remote.access_token_env.is_empty() {
            errors.push(ValidationError {
                field: "remote.access_token_env".into(),
                message: "must not be empty".into(),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use drivebackup_core::config::ConfigBuilder;
/// use drivebackup_core::domain::BackupType;
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .destination(PathBuf::from("/mnt/backups"))
///     .backup_type(BackupType::Increment)
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Start from an existing configuration.
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    // --- backup ---

    pub fn destination(mut self, destination: PathBuf) -> Self {
        self.config.backup.destination = destination;
        self
    }

    pub fn backup_name(mut self, name: impl Into<String>) -> Self {
        self.config.backup.backup_name = Some(name.into());
        self
    }

    pub fn backup_type(mut self, backup_type: BackupType) -> Self {
        self.config.backup.backup_type = backup_type;
        self
    }

    pub fn prev_backup_name(mut self, name: impl Into<String>) -> Self {
        self.config.backup.prev_backup_name = Some(name.into());
        self
    }

    pub fn source(mut self, name: impl Into<String>) -> Self {
        self.config.backup.source = Some(name.into());
        self
    }

    pub fn source_id(mut self, id: impl Into<String>) -> Self {
        self.config.backup.source_id = id.into();
        self
    }

    pub fn export_format(mut self, format: ExportFormat) -> Self {
        self.config.backup.export_format = format;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_file(mut self, file: PathBuf) -> Self {
        self.config.logging.file = Some(file);
        self
    }

    pub fn logging_crate_only(mut self, crate_only: bool) -> Self {
        self.config.logging.crate_only = crate_only;
        self
    }

    pub fn logging_changes_only(mut self, changes_only: bool) -> Self {
        self.config.logging.changes_only = changes_only;
        self
    }

    // --- remote ---

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.remote.api_base_url = url.into();
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.config.remote.page_size = page_size;
        self
    }

    pub fn chunk_size_kb(mut self, kb: u64) -> Self {
        self.config.remote.chunk_size_kb = kb;
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.remote.max_retries = retries;
        self
    }

    pub fn access_token_env(mut self, name: impl Into<String>) -> Self {
        self.config.remote.access_token_env = name.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
