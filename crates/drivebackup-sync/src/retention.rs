//! Post-walk cleanup of previous backups
//!
//! Runs once the whole tree has been materialized, never interleaved with
//! the walk.
//!
//! - **increment**: prunes directories of the previous backup whose files
//!   were all moved into the new backup. Files left behind (deleted on the
//!   remote, or never reached) stay where they are.
//! - **update**: deletes everything in the refreshed backup that the
//!   remote tree no longer has.
//! - **complete**: nothing; the previous backup was only read.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use drivebackup_core::domain::{
    local_file_name, BackupRun, BackupType, ExportFormat, RemoteId, RemoteTreeIndex,
};
use drivebackup_core::ports::ILocalFileSystem;
use tracing::{debug, info, warn};

use crate::BackupError;

type BoxFuture<'a, T> = std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Prunes previous-backup leftovers according to the backup type
pub struct RetentionCleaner {
    filesystem: Arc<dyn ILocalFileSystem>,
}

impl RetentionCleaner {
    /// Creates a cleaner over the given filesystem
    pub fn new(filesystem: Arc<dyn ILocalFileSystem>) -> Self {
        Self { filesystem }
    }

    /// Applies the cleanup policy of `run.backup_type`
    ///
    /// # Errors
    /// Returns [`BackupError::Filesystem`] if a directory cannot be listed
    /// or an entry cannot be removed.
    pub async fn clean(
        &self,
        run: &BackupRun,
        index: &RemoteTreeIndex,
        export_format: ExportFormat,
    ) -> Result<(), BackupError> {
        match run.backup_type {
            BackupType::Complete => Ok(()),
            BackupType::Increment => match &run.previous_root {
                Some(previous) => {
                    info!(previous = %previous.display(), "Cleaning up previous backup");
                    self.clean_incremental(&run.new_root, previous).await?;
                    Ok(())
                }
                None => Ok(()),
            },
            BackupType::Update => {
                info!(root = %run.new_root.display(), "Removing items deleted from the drive");
                self.clean_updated(&run.new_root, index, export_format).await
            }
        }
    }

    /// Removes the directories of `previous_dir` the new backup took over
    ///
    /// A directory is kept when it still holds a file, when one of its
    /// subdirectories is kept, or when `new_dir` does not exist. Returns
    /// whether `previous_dir` was kept.
    pub fn clean_incremental<'a>(
        &'a self,
        new_dir: &'a Path,
        previous_dir: &'a Path,
    ) -> BoxFuture<'a, Result<bool, BackupError>> {
        Box::pin(async move {
            let entries = self
                .filesystem
                .list_directory(previous_dir)
                .await
                .map_err(|e| BackupError::filesystem(previous_dir, e))?;

            let mut keep = false;
            for entry in entries {
                if entry.is_dir {
                    let counterpart = new_dir.join(&entry.name);
                    keep = self.clean_incremental(&counterpart, &entry.path).await? || keep;
                } else {
                    keep = true;
                }
            }

            if !keep {
                let taken_over = self
                    .filesystem
                    .get_state(new_dir)
                    .await
                    .map_err(|e| BackupError::filesystem(new_dir, e))?
                    .exists;
                if taken_over {
                    self.filesystem
                        .remove_empty_dir(previous_dir)
                        .await
                        .map_err(|e| BackupError::filesystem(previous_dir, e))?;
                    debug!(path = %previous_dir.display(), "Removed emptied folder");
                } else {
                    keep = true;
                }
            }

            Ok(keep)
        })
    }

    /// Deletes local entries below `root_parent` that the index no longer has
    ///
    /// `root_parent` is the directory holding the source root folder.
    pub async fn clean_updated(
        &self,
        root_parent: &Path,
        index: &RemoteTreeIndex,
        export_format: ExportFormat,
    ) -> Result<(), BackupError> {
        let mut ancestors = Vec::new();
        self.prune_folder(
            root_parent.to_path_buf(),
            index,
            index.root_id().clone(),
            export_format,
            &mut ancestors,
        )
        .await
    }

    fn prune_folder<'a>(
        &'a self,
        parent: PathBuf,
        index: &'a RemoteTreeIndex,
        folder_id: RemoteId,
        export_format: ExportFormat,
        ancestors: &'a mut Vec<RemoteId>,
    ) -> BoxFuture<'a, Result<(), BackupError>> {
        Box::pin(async move {
            let Some(record) = index.get_folder(&folder_id) else {
                return Ok(());
            };
            let location = parent.join(record.name().unwrap_or(folder_id.as_str()));

            let mut expected: HashSet<String> = record
                .files()
                .filter_map(|file| local_file_name(file, export_format))
                .collect();
            let subfolders: Vec<RemoteId> = record.subfolder_ids();
            expected.extend(
                subfolders
                    .iter()
                    .filter_map(|id| index.get_folder(id)?.name().map(str::to_string)),
            );

            let entries = self
                .filesystem
                .list_directory(&location)
                .await
                .map_err(|e| BackupError::filesystem(&location, e))?;

            for entry in entries.into_iter().filter(|e| !expected.contains(&e.name)) {
                if entry.is_dir {
                    self.filesystem
                        .remove_dir_all(&entry.path)
                        .await
                        .map_err(|e| BackupError::filesystem(&entry.path, e))?;
                    info!(path = %entry.path.display(), "Removed folder");
                } else {
                    self.filesystem
                        .delete_file(&entry.path)
                        .await
                        .map_err(|e| BackupError::filesystem(&entry.path, e))?;
                    info!(path = %entry.path.display(), "Removed file");
                }
            }

            ancestors.push(folder_id);
            for child in subfolders {
                if ancestors.contains(&child) {
                    warn!(path = %location.display(), "Folder contains one of its ancestors, not descending");
                    continue;
                }
                self.prune_folder(location.clone(), index, child, export_format, ancestors)
                    .await?;
            }
            ancestors.pop();

            Ok(())
        })
    }
}
