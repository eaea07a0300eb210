//! Config command - View and manage the drive-backup configuration
//!
//! Provides the `drive-backup config` CLI command which:
//! 1. Shows the current configuration (YAML or JSON)
//! 2. Writes a default configuration file to start from
//! 3. Sets individual configuration values via dot-notation keys
//! 4. Validates the configuration file and reports errors

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use tracing::info;

use drivebackup_core::config::Config;

use crate::commands::backup::load_config;
use crate::output::{get_formatter, OutputFormat};

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "backup.backup_type")
        key: String,
        /// New value
        value: String,
    },
    /// Validate configuration file
    Validate,
}

impl ConfigCommand {
    /// Execute the config command against `config_path` or the default file
    pub async fn execute(&self, format: OutputFormat, config_path: Option<&Path>) -> Result<()> {
        let path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(Config::default_path);
        match self {
            ConfigCommand::Show => execute_show(&path, format),
            ConfigCommand::Init { force } => execute_init(&path, *force, format),
            ConfigCommand::Set { key, value } => execute_set(&path, key, value, format),
            ConfigCommand::Validate => execute_validate(&path, format),
        }
    }
}

fn execute_show(path: &Path, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    let config = load_config(Some(path))?;

    info!(config_path = %path.display(), "Showing configuration");

    if format == OutputFormat::Json {
        let json =
            serde_json::to_value(&config).context("Failed to serialize configuration to JSON")?;
        formatter.print_json(&json);
    } else {
        formatter.success(&format!("Configuration ({})", path.display()));
        formatter.info("");

        let yaml =
            serde_yaml::to_string(&config).context("Failed to serialize configuration to YAML")?;
        for line in yaml.lines() {
            formatter.info(line);
        }
    }

    Ok(())
}

fn execute_init(path: &Path, force: bool, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);

    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    Config::default().save(path)?;

    if format == OutputFormat::Json {
        formatter.print_json(&serde_json::json!({
            "success": true,
            "config_path": path.display().to_string(),
        }));
    } else {
        formatter.success(&format!("Wrote default configuration to {}", path.display()));
    }
    Ok(())
}

fn execute_set(path: &Path, key: &str, value: &str, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    let mut config = load_config(Some(path))?;

    info!(key = %key, value = %value, "Setting configuration value");

    apply_config_value(&mut config, key, value)
        .with_context(|| format!("Failed to set '{key}' (supported keys: {})", SUPPORTED_KEYS.join(", ")))?;

    let errors = config.validate();
    if !errors.is_empty() {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        anyhow::bail!("Invalid value for '{}': {}", key, messages.join("; "));
    }

    config.save(path)?;

    if format == OutputFormat::Json {
        formatter.print_json(&serde_json::json!({
            "success": true,
            "key": key,
            "value": value,
            "config_path": path.display().to_string(),
        }));
    } else {
        formatter.success(&format!("Set {} = {}", key, value));
        formatter.info(&format!("Saved to {}", path.display()));
    }
    Ok(())
}

fn execute_validate(path: &Path, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);

    if !path.exists() {
        anyhow::bail!(
            "Configuration file not found at {} (run 'drive-backup config init')",
            path.display()
        );
    }
    let config = Config::load(path)?;

    info!(config_path = %path.display(), "Validating configuration");

    let errors = config.validate();

    if format == OutputFormat::Json {
        let error_strings: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        formatter.print_json(&serde_json::json!({
            "valid": errors.is_empty(),
            "config_path": path.display().to_string(),
            "errors": error_strings,
        }));
    } else if errors.is_empty() {
        formatter.success("Configuration is valid");
        formatter.info(&format!("File: {}", path.display()));
    } else {
        formatter.error(&format!(
            "Configuration has {} error{}:",
            errors.len(),
            if errors.len() == 1 { "" } else { "s" }
        ));
        formatter.info(&format!("File: {}", path.display()));
        formatter.info("");
        for error in &errors {
            formatter.info(&format!("  {} - {}", error.field, error.message));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("Configuration is invalid")
    }
}

/// Keys accepted by `config set`
const SUPPORTED_KEYS: &[&str] = &[
    "backup.destination",
    "backup.backup_name",
    "backup.backup_type",
    "backup.prev_backup_name",
    "backup.source",
    "backup.source_id",
    "backup.export_format",
    "logging.level",
    "logging.file",
    "logging.crate_only",
    "logging.changes_only",
    "remote.api_base_url",
    "remote.page_size",
    "remote.chunk_size_kb",
    "remote.max_retries",
    "remote.access_token_env",
];

/// `none` or an empty value clears an optional setting
fn optional(value: &str) -> Option<String> {
    if value.is_empty() || value == "none" {
        None
    } else {
        Some(value.to_string())
    }
}

/// Apply a dot-notation key/value pair to a Config struct
fn apply_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        // --- backup ---
        "backup.destination" => config.backup.destination = PathBuf::from(value),
        "backup.backup_name" => config.backup.backup_name = optional(value),
        "backup.backup_type" => config.backup.backup_type = value.parse()?,
        "backup.prev_backup_name" => config.backup.prev_backup_name = optional(value),
        "backup.source" => config.backup.source = optional(value),
        "backup.source_id" => config.backup.source_id = value.to_string(),
        "backup.export_format" => config.backup.export_format = value.parse()?,

        // --- logging ---
        "logging.level" => config.logging.level = value.to_string(),
        "logging.file" => config.logging.file = optional(value).map(PathBuf::from),
        "logging.crate_only" => {
            config.logging.crate_only = value.parse().context("Expected true or false")?
        }
        "logging.changes_only" => {
            config.logging.changes_only = value.parse().context("Expected true or false")?
        }

        // --- remote ---
        "remote.api_base_url" => config.remote.api_base_url = value.to_string(),
        "remote.page_size" => {
            config.remote.page_size = value.parse().context("Expected a positive integer")?
        }
        "remote.chunk_size_kb" => {
            config.remote.chunk_size_kb = value.parse().context("Expected a positive integer")?
        }
        "remote.max_retries" => {
            config.remote.max_retries = value.parse().context("Expected a positive integer")?
        }
        "remote.access_token_env" => config.remote.access_token_env = value.to_string(),

        _ => anyhow::bail!("Unknown configuration key: '{}'", key),
    }

    Ok(())
}
