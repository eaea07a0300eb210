//! Drive Backup Sync - Snapshot reconciliation engine
//!
//! Provides:
//! - Materialization of the remote tree onto local disk
//! - Per-file reuse of a previous backup (copy or move)
//! - Retention cleanup for update and increment backups
//! - Backup root planning and the run orchestrator
//!
//! ## Modules
//!
//! - [`engine`] - Run orchestrator from source resolution to cleanup
//! - [`reconciler`] - Recursive tree walk with the consecutive-failure breaker
//! - [`materializer`] - Per-file download, export, or reuse decision
//! - [`retention`] - Post-walk pruning of previous backups
//! - [`destination`] - Backup root naming and previous-backup discovery
//! - [`context`] - Explicit run state, counters, and collaborators
//! - [`filesystem`] - Local filesystem adapter (`tokio::fs` + `filetime`)

pub mod context;
pub mod destination;
pub mod engine;
pub mod filesystem;
pub mod materializer;
pub mod reconciler;
pub mod retention;

use std::path::PathBuf;

use drivebackup_core::domain::DomainError;
use drivebackup_core::usecases::SourceError;
use thiserror::Error;

/// Fatal conditions that abort a backup run
///
/// Per-file failures are not errors at this level; they are counted by the
/// run context until too many happen in a row.
#[derive(Debug, Error)]
pub enum BackupError {
    /// A directory of the backup tree could not be created
    #[error("Could not create folder {path}: {reason}")]
    CreateDirectory {
        /// Directory that failed
        path: PathBuf,
        /// Underlying error
        reason: String,
    },

    /// A folder of the backup tree vanished while the walk was in it
    #[error("Backup destination folder does not exist: {0}")]
    DestinationMissing(PathBuf),

    /// No source folder matched
    #[error("Source folder not found: {0}")]
    SourceNotFound(String),

    /// More than one item matched the source folder name
    #[error("Multiple items named '{name}' in the drive root ({count})")]
    SourceAmbiguous {
        /// Requested name
        name: String,
        /// Number of matches
        count: usize,
    },

    /// The source matched something other than a folder
    #[error("Source is not a folder: {0}")]
    SourceNotFolder(String),

    /// The consecutive-failure breaker tripped
    #[error("{0} consecutive file downloads failed")]
    TooManyFailures(u32),

    /// The remote tree or account could not be read
    #[error("Remote listing failed: {0}")]
    Listing(String),

    /// The configured backup name cannot be used locally
    #[error(transparent)]
    InvalidBackupName(DomainError),

    /// Filesystem failure outside per-file processing
    #[error("Filesystem error at {path}: {reason}")]
    Filesystem {
        /// Path involved
        path: PathBuf,
        /// Underlying error
        reason: String,
    },

    /// The run state machine rejected a transition
    #[error(transparent)]
    InvalidTransition(DomainError),

    /// The remote tree index rejected an update during the walk
    #[error("Remote tree index: {0}")]
    Index(DomainError),
}

impl BackupError {
    /// Wraps a filesystem error for `path`
    pub fn filesystem(path: impl Into<PathBuf>, err: anyhow::Error) -> Self {
        BackupError::Filesystem {
            path: path.into(),
            reason: format!("{err:#}"),
        }
    }
}

impl From<SourceError> for BackupError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::NotFound(name) => BackupError::SourceNotFound(name),
            SourceError::Ambiguous { name, count } => BackupError::SourceAmbiguous { name, count },
            SourceError::NotFolder(name) => BackupError::SourceNotFolder(name),
            SourceError::Listing(e) => BackupError::Listing(format!("{e:#}")),
        }
    }
}
