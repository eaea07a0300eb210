//! Backup command - Snapshot a Drive folder to local disk
//!
//! Provides the `drive-backup backup` CLI command which:
//! 1. Loads the configuration and applies the command-line overrides
//! 2. Installs logging and reads the access token from the environment
//! 3. Plans the backup root, then opens the per-backup log file inside it
//! 4. Runs the BackupEngine and prints the summary
//! 5. Stores the effective configuration for the next run

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use clap::Args;
use tracing::{error, info, warn};

use drivebackup_core::config::Config;
use drivebackup_core::domain::{BackupType, ExportFormat};
use drivebackup_core::ports::{FixedAnswer, IConfirmation, IProgressSink, NoProgress};
use drivebackup_gdrive::provider::GoogleDriveProvider;
use drivebackup_sync::engine::{BackupEngine, BackupRequest};
use drivebackup_sync::filesystem::LocalFileSystemAdapter;

use crate::logging;
use crate::output::{print_summary, OutputFormat};
use crate::progress::ConsoleProgress;
use crate::prompt::TerminalConfirmation;

/// Log file name used inside the backup root
pub const LOG_FILE_NAME: &str = "drive-backup.log";

/// Run a backup; every flag overrides the configuration file
#[derive(Debug, Default, Args)]
pub struct BackupCommand {
    /// Directory holding the backups
    #[arg(short, long)]
    pub destination: Option<PathBuf>,

    /// Name of the new backup folder
    #[arg(short, long)]
    pub name: Option<String>,

    /// complete, update, or increment
    #[arg(short = 't', long = "type")]
    pub backup_type: Option<BackupType>,

    /// Previous backup to reuse files from
    #[arg(long)]
    pub prev: Option<String>,

    /// Folder name in the drive root to back up
    #[arg(short, long, conflicts_with = "source_id")]
    pub source: Option<String>,

    /// Folder id to back up ("root" for the whole drive)
    #[arg(long)]
    pub source_id: Option<String>,

    /// Format for native documents: msoffice or pdf
    #[arg(long)]
    pub export_format: Option<ExportFormat>,

    /// Do not log files that were already up to date
    #[arg(long)]
    pub changes_only: bool,

    /// Only log events from drive-backup itself
    #[arg(long)]
    pub crate_only: bool,

    /// Log file (default: drive-backup.log inside the backup)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Download files flagged as malware or spam without asking
    #[arg(short, long)]
    pub yes: bool,
}

impl BackupCommand {
    /// Applies the command-line overrides to `config`
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(destination) = &self.destination {
            config.backup.destination = destination.clone();
        }
        if let Some(name) = &self.name {
            config.backup.backup_name = Some(name.clone());
        }
        if let Some(backup_type) = self.backup_type {
            config.backup.backup_type = backup_type;
        }
        if let Some(prev) = &self.prev {
            config.backup.prev_backup_name = Some(prev.clone());
        }
        if let Some(source) = &self.source {
            config.backup.source = Some(source.clone());
        }
        if let Some(source_id) = &self.source_id {
            // A configured name would otherwise win over the id
            config.backup.source = None;
            config.backup.source_id = source_id.clone();
        }
        if let Some(format) = self.export_format {
            config.backup.export_format = format;
        }
        if self.changes_only {
            config.logging.changes_only = true;
        }
        if self.crate_only {
            config.logging.crate_only = true;
        }
        if let Some(file) = &self.log_file {
            config.logging.file = Some(file.clone());
        }
    }

    /// Execute the backup command
    pub async fn execute(
        &self,
        format: OutputFormat,
        config_path: Option<&Path>,
        verbose: u8,
    ) -> Result<()> {
        let mut config = load_config(config_path)?;
        self.apply_to(&mut config);

        let log_file = logging::init(
            &config.logging.level,
            verbose,
            config.logging.crate_only,
        )?;

        let errors = config.validate();
        if !errors.is_empty() {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            error!(errors = ?messages, "Invalid configuration");
            anyhow::bail!("Invalid configuration: {}", messages.join("; "));
        }

        let token_var = &config.remote.access_token_env;
        let token = std::env::var(token_var)
            .ok()
            .filter(|token| !token.trim().is_empty())
            .with_context(|| format!("Set {token_var} to a Google Drive access token"))?;

        let provider = Arc::new(GoogleDriveProvider::from_config(&config.remote, token));
        let confirmation: Arc<dyn IConfirmation> = if self.yes {
            Arc::new(FixedAnswer(true))
        } else {
            Arc::new(TerminalConfirmation)
        };
        let progress: Arc<dyn IProgressSink> = match format {
            OutputFormat::Human => Arc::new(ConsoleProgress::default()),
            OutputFormat::Json => Arc::new(NoProgress),
        };
        let engine = BackupEngine::new(
            provider.clone(),
            provider,
            Arc::new(LocalFileSystemAdapter::new()),
        )
        .with_confirmation(confirmation)
        .with_progress(progress);

        let request = BackupRequest::from_config(&config, Local::now().date_naive());

        let run = match engine.plan(&request).await {
            Ok(run) => run,
            Err(e) => {
                error!(error = %e, "Could not prepare backup destination");
                log_file.discard();
                return Err(e.into());
            }
        };

        let log_path = config
            .logging
            .file
            .clone()
            .unwrap_or_else(|| run.new_root.join(LOG_FILE_NAME));
        match log_file.open(&log_path) {
            Ok(()) => info!(path = %log_path.display(), "Logging to file"),
            Err(e) => {
                warn!(error = %format!("{e:#}"), "Continuing without a log file");
                log_file.discard();
            }
        }

        let summary = engine.execute(&request, run).await?;
        print_summary(format, &summary);

        config.last_backup = Some(Utc::now());
        let saved_path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| config.saved_path());
        match config.save(&saved_path) {
            Ok(()) => info!(path = %saved_path.display(), "Saved backup configuration"),
            Err(e) => warn!(error = %format!("{e:#}"), "Could not save backup configuration"),
        }

        Ok(())
    }
}

/// Loads `path`, or the default configuration file when no path is given
///
/// A missing file yields the defaults; an unreadable or malformed one is
/// an error when it was named explicitly.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) if path.exists() => Config::load(path),
        Some(_) => Ok(Config::default()),
        None => Ok(Config::load_or_default(&Config::default_path())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        backup: BackupCommand,
    }

    fn parse(args: &[&str]) -> BackupCommand {
        let mut argv = vec!["drive-backup"];
        argv.extend_from_slice(args);
        Harness::parse_from(argv).backup
    }

    #[test]
    fn test_flags_override_config() {
        let mut config = Config::default();
        parse(&[
            "--destination",
            "/mnt/backups",
            "--name",
            "Weekly",
            "--type",
            "increment",
            "--prev",
            "Last week",
            "--export-format",
            "pdf",
            "--changes-only",
        ])
        .apply_to(&mut config);

        assert_eq!(config.backup.destination, PathBuf::from("/mnt/backups"));
        assert_eq!(config.backup.backup_name.as_deref(), Some("Weekly"));
        assert_eq!(config.backup.backup_type, BackupType::Increment);
        assert_eq!(config.backup.prev_backup_name.as_deref(), Some("Last week"));
        assert_eq!(config.backup.export_format, ExportFormat::Pdf);
        assert!(config.logging.changes_only);
    }

    #[test]
    fn test_no_flags_keep_config() {
        let mut config = Config::default();
        config.backup.backup_type = BackupType::Update;
        config.backup.source = Some("Photos".to_string());
        let before = config.clone();

        parse(&[]).apply_to(&mut config);
        assert_eq!(config, before);
    }

    #[test]
    fn test_source_id_replaces_configured_name() {
        let mut config = Config::default();
        config.backup.source = Some("Photos".to_string());

        parse(&["--source-id", "folder-123"]).apply_to(&mut config);
        assert_eq!(config.backup.source, None);
        assert_eq!(config.backup.source_id, "folder-123");
    }

    #[test]
    fn test_source_and_source_id_conflict() {
        let result = Harness::try_parse_from([
            "drive-backup",
            "--source",
            "Photos",
            "--source-id",
            "folder-123",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_backup_type_rejected() {
        assert!(Harness::try_parse_from(["drive-backup", "--type", "mirror"]).is_err());
    }

    #[test]
    fn test_load_config_missing_explicit_path_uses_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = load_config(Some(&dir.path().join("absent.yaml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_config_malformed_file_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.yaml");
        std::fs::write(&path, "backup: [not, a, map").unwrap();
        assert!(load_config(Some(&path)).is_err());
    }
}
