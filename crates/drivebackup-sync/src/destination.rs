//! Backup root planning
//!
//! Every backup lives in its own directory below the configured
//! destination. Unnamed backups are called `Google Drive Backup M-D-YYYY`,
//! which also lets the next run find the most recent one to reuse.

use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use drivebackup_core::domain::{BackupName, BackupRun, BackupType};
use drivebackup_core::ports::ILocalFileSystem;
use tracing::{debug, info, warn};

use crate::BackupError;

/// Prefix of automatically named backups
pub const DEFAULT_NAME_PREFIX: &str = "Google Drive Backup ";

/// Name given to a backup started on `date` without an explicit name
///
/// Month and day are not zero-padded.
pub fn default_backup_name(date: NaiveDate) -> String {
    format!(
        "{DEFAULT_NAME_PREFIX}{}-{}-{}",
        date.month(),
        date.day(),
        date.year()
    )
}

/// Date of an automatically named backup directory
///
/// Accepts names starting with the default prefix followed by
/// `M-D-YYYY` (one or two digit month and day). Trailing text after the
/// date is ignored.
pub fn backup_date(name: &str) -> Option<NaiveDate> {
    let rest = name.strip_prefix(DEFAULT_NAME_PREFIX)?;
    let mut parts = rest.splitn(3, '-');
    let month = number_field(parts.next()?, 1, 2, true)?;
    let day = number_field(parts.next()?, 1, 2, true)?;
    let year = number_field(parts.next()?, 4, 4, false)?;
    NaiveDate::from_ymd_opt(year as i32, month, day)
}

/// Parses `min..=max` leading digits of `s`
///
/// With `whole` set nothing may follow the digits.
fn number_field(s: &str, min: usize, max: usize, whole: bool) -> Option<u32> {
    let digits = s.chars().take_while(char::is_ascii_digit).count();
    if digits < min || digits > max || (whole && digits != s.len()) {
        return None;
    }
    s[..digits].parse().ok()
}

/// Where a backup goes and what it may reuse
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationRequest<'a> {
    /// Directory holding all backups
    pub destination: &'a Path,
    /// Explicit backup name
    pub backup_name: Option<&'a str>,
    /// Explicit previous backup name
    pub prev_backup_name: Option<&'a str>,
    /// Reuse and retention policy
    pub backup_type: BackupType,
    /// Local date used for the default name
    pub today: NaiveDate,
}

/// Resolves the backup root and previous backup, and prepares the root
///
/// - `complete` and `increment` create the root when it is missing.
/// - `update` renames the most recent backup to the root when the root is
///   missing, and never keeps a separate previous root.
///
/// # Errors
/// Returns [`BackupError::InvalidBackupName`] for a name that cannot be a
/// directory, [`BackupError::CreateDirectory`] if the root cannot be made,
/// and [`BackupError::Filesystem`] for other I/O failures.
pub async fn plan_destination(
    filesystem: &dyn ILocalFileSystem,
    request: &DestinationRequest<'_>,
) -> Result<BackupRun, BackupError> {
    let name = match request.backup_name {
        Some(name) => name.to_string(),
        None => default_backup_name(request.today),
    };
    let name = BackupName::new(name).map_err(BackupError::InvalidBackupName)?;
    let root = request.destination.join(name.as_str());

    let recent = find_recent_backup(
        filesystem,
        request.destination,
        name.as_str(),
        request.prev_backup_name,
    )
    .await?;

    let root_exists = filesystem
        .get_state(&root)
        .await
        .map_err(|e| BackupError::filesystem(&root, e))?
        .exists;

    if !root_exists {
        match (&request.backup_type, &recent) {
            (BackupType::Update, Some(recent)) => {
                filesystem
                    .rename(recent, &root)
                    .await
                    .map_err(|e| BackupError::filesystem(recent, e))?;
                info!(from = %recent.display(), to = %root.display(), "Renamed previous backup");
            }
            _ => {
                filesystem.create_directory(&root).await.map_err(|e| {
                    BackupError::CreateDirectory {
                        path: root.clone(),
                        reason: format!("{e:#}"),
                    }
                })?;
                debug!(path = %root.display(), "Created backup folder");
            }
        }
    }

    Ok(BackupRun::new(root, recent, request.backup_type))
}

/// Finds the backup to reuse, if any
///
/// An explicit `prev_backup_name` wins when it names an existing
/// directory other than the current backup. Otherwise the directory with
/// the latest default-name date, other than the current backup, is used.
pub async fn find_recent_backup(
    filesystem: &dyn ILocalFileSystem,
    destination: &Path,
    current: &str,
    prev_backup_name: Option<&str>,
) -> Result<Option<PathBuf>, BackupError> {
    if let Some(previous) = prev_backup_name {
        if BackupName::new(previous).is_err() {
            warn!(name = previous, "Ignoring invalid previous backup name");
            return Ok(None);
        }
        let path = destination.join(previous);
        let is_dir = filesystem
            .get_state(&path)
            .await
            .map_err(|e| BackupError::filesystem(&path, e))?
            .is_directory();
        return Ok((is_dir && previous != current).then_some(path));
    }

    let exists = filesystem
        .get_state(destination)
        .await
        .map_err(|e| BackupError::filesystem(destination, e))?
        .exists;
    if !exists {
        return Ok(None);
    }

    let entries = filesystem
        .list_directory(destination)
        .await
        .map_err(|e| BackupError::filesystem(destination, e))?;

    let mut best: Option<(NaiveDate, PathBuf)> = None;
    for entry in entries {
        if !entry.is_dir || entry.name == current {
            continue;
        }
        let Some(date) = backup_date(&entry.name) else {
            continue;
        };
        if best.as_ref().map_or(true, |(best_date, _)| date > *best_date) {
            best = Some((date, entry.path));
        }
    }
    Ok(best.map(|(_, path)| path))
}
