//! Backup run parameters
//!
//! [`BackupType`] selects the per-file reuse policy and the retention pass;
//! [`BackupRun`] carries the resolved roots a run operates on.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// Kind of backup to produce
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupType {
    /// New independent snapshot; unchanged files are copied from the
    /// previous backup, which is left untouched
    #[default]
    Complete,
    /// In-place refresh of the most recent backup, which is renamed to the
    /// new backup root; stale entries are deleted afterwards
    Update,
    /// New snapshot that moves unchanged files out of the previous backup;
    /// fully absorbed directories of the previous backup are pruned
    Increment,
}

impl BackupType {
    /// Returns the lowercase configuration name of this type
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupType::Complete => "complete",
            BackupType::Update => "update",
            BackupType::Increment => "increment",
        }
    }

    /// Returns true if a previous backup root can be reused file by file
    pub fn reuses_previous(&self) -> bool {
        !matches!(self, BackupType::Update)
    }
}

impl fmt::Display for BackupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackupType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "complete" => Ok(BackupType::Complete),
            "update" => Ok(BackupType::Update),
            "increment" => Ok(BackupType::Increment),
            _ => Err(DomainError::UnknownBackupType(s.to_string())),
        }
    }
}

/// Preferred byte format for exported native documents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    /// Office Open XML (docx, xlsx, pptx)
    #[default]
    #[serde(rename = "msoffice")]
    MsOffice,
    /// Portable Document Format
    Pdf,
}

impl ExportFormat {
    /// Returns the lowercase configuration name of this format
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::MsOffice => "msoffice",
            ExportFormat::Pdf => "pdf",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "msoffice" => Ok(ExportFormat::MsOffice),
            "pdf" => Ok(ExportFormat::Pdf),
            _ => Err(DomainError::UnknownExportFormat(s.to_string())),
        }
    }
}

/// Resolved roots and policy for a single backup run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRun {
    /// Directory the remote source folder is materialized under
    pub new_root: PathBuf,
    /// Previous backup root used for reuse, if any
    pub previous_root: Option<PathBuf>,
    /// Reuse and retention policy
    pub backup_type: BackupType,
}

impl BackupRun {
    /// Creates a run description
    ///
    /// The previous root is dropped for [`BackupType::Update`] because an
    /// update works on the renamed previous backup directly.
    pub fn new(new_root: PathBuf, previous_root: Option<PathBuf>, backup_type: BackupType) -> Self {
        let previous_root = if backup_type.reuses_previous() {
            previous_root
        } else {
            None
        };
        Self {
            new_root,
            previous_root,
            backup_type,
        }
    }
}
