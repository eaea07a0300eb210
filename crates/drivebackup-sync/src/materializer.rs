//! Per-file materialization
//!
//! Decides for one remote file whether anything has to happen locally and,
//! if so, where the bytes come from:
//!
//! 1. Native documents without an export conversion are skipped.
//! 2. A local copy at least as new as the remote is left alone.
//! 3. An equally current copy in the previous backup is copied (complete)
//!    or moved (increment) into place.
//! 4. Otherwise the file is downloaded (or exported) chunk by chunk, and its
//!    modification time is set to the remote time.
//!
//! A file the remote flags as potentially abusive pauses the run for a
//! yes/no question; on yes the download restarts at the current offset
//! with the acknowledgement flag.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use drivebackup_core::domain::{export_target, BackupType, ExportTarget, RemoteObject};
use drivebackup_core::ports::{
    IChunkReader, IFileSink, ILocalFileSystem, IRemoteTransfer, TransferError,
};
use tracing::{error, info, warn};

use crate::context::{FileResult, RunContext};
use crate::BackupError;

/// Why a file needed no transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The local copy is already current
    Current,
    /// The remote file is empty; an empty local file was created
    Empty,
    /// Native document type with no export conversion
    NotExportable,
}

/// Result of materializing one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Fetched from the remote into this path
    Downloaded(PathBuf),
    /// Copied or moved from the previous backup into this path
    Reused(PathBuf),
    /// No transfer needed
    Skipped(SkipReason),
    /// Hard failure; the partial file was deleted
    Failed(String),
}

impl FileOutcome {
    /// Counter bucket for this outcome
    pub fn result(&self) -> FileResult {
        match self {
            FileOutcome::Downloaded(_) => FileResult::Downloaded,
            FileOutcome::Reused(_) => FileResult::Reused,
            FileOutcome::Skipped(_) => FileResult::Skipped,
            FileOutcome::Failed(_) => FileResult::Failed,
        }
    }
}

/// How a finished transfer ended
enum TransferEnd {
    Complete,
    SizeUnknown,
}

/// Materializes single files of the remote tree
#[derive(Clone)]
pub struct FileMaterializer {
    transfer: Arc<dyn IRemoteTransfer>,
    filesystem: Arc<dyn ILocalFileSystem>,
}

impl FileMaterializer {
    /// Creates a materializer over the given transfer and filesystem ports
    pub fn new(transfer: Arc<dyn IRemoteTransfer>, filesystem: Arc<dyn ILocalFileSystem>) -> Self {
        Self {
            transfer,
            filesystem,
        }
    }

    /// Brings `file` into `local_dir`, reusing `previous_dir` when possible
    ///
    /// `file.name` must already be unique among its siblings.
    ///
    /// # Errors
    /// Returns [`BackupError::DestinationMissing`] if `local_dir` does not
    /// exist. Every other problem is a per-file [`FileOutcome::Failed`].
    pub async fn materialize(
        &self,
        ctx: &mut RunContext,
        file: &RemoteObject,
        local_dir: &Path,
        previous_dir: Option<&Path>,
    ) -> Result<FileOutcome, BackupError> {
        let settings = *ctx.settings();

        let (file_name, export) = if file.is_native_document() {
            match export_target(&file.mime_type, settings.export_format) {
                Some(target) => (format!("{}.{}", file.name, target.extension), Some(target)),
                None => {
                    info!(
                        path = %local_dir.join(&file.name).display(),
                        mime_type = %file.mime_type,
                        "File is not a downloadable document"
                    );
                    return Ok(FileOutcome::Skipped(SkipReason::NotExportable));
                }
            }
        } else {
            (file.name.clone(), None)
        };

        let dir_state = self
            .filesystem
            .get_state(local_dir)
            .await
            .map_err(|e| BackupError::filesystem(local_dir, e))?;
        if !dir_state.is_directory() {
            error!(path = %local_dir.display(), "Backup destination folder does not exist");
            return Err(BackupError::DestinationMissing(local_dir.to_path_buf()));
        }

        let target = local_dir.join(&file_name);
        let previous = previous_dir.map(|dir| dir.join(&file_name));

        match self
            .reuse_if_current(
                file,
                &target,
                previous.as_deref(),
                settings.backup_type,
                settings.changes_only,
            )
            .await
        {
            Ok(Some(outcome)) => return Ok(outcome),
            Ok(None) => {}
            Err(e) => {
                error!(path = %target.display(), error = %format!("{e:#}"), "Could not reuse previous backup");
                return Ok(FileOutcome::Failed(format!("{e:#}")));
            }
        }

        Ok(self.download(ctx, file, &target, &file_name, export).await)
    }

    /// Returns an outcome if no transfer is needed
    async fn reuse_if_current(
        &self,
        file: &RemoteObject,
        target: &Path,
        previous: Option<&Path>,
        backup_type: BackupType,
        changes_only: bool,
    ) -> anyhow::Result<Option<FileOutcome>> {
        let Some(remote_modified) = file.modified_time else {
            return Ok(None);
        };

        if self.filesystem.get_state(target).await?.is_current(remote_modified) {
            if !changes_only {
                info!(path = %target.display(), "Already downloaded current version");
            }
            return Ok(Some(FileOutcome::Skipped(SkipReason::Current)));
        }

        let Some(previous) = previous else {
            return Ok(None);
        };
        if !self.filesystem.get_state(previous).await?.is_current(remote_modified) {
            return Ok(None);
        }

        match backup_type {
            BackupType::Complete => self.filesystem.copy_file(previous, target).await?,
            BackupType::Increment => self.filesystem.move_file(previous, target).await?,
            // An update walks the renamed previous backup itself
            BackupType::Update => return Ok(None),
        }
        if !changes_only {
            info!(
                path = %target.display(),
                from = %previous.display(),
                backup_type = %backup_type,
                "Reused current version from previous backup"
            );
        }
        Ok(Some(FileOutcome::Reused(target.to_path_buf())))
    }

    /// Creates `target` and fills it from the remote
    async fn download(
        &self,
        ctx: &mut RunContext,
        file: &RemoteObject,
        target: &Path,
        display_name: &str,
        export: Option<ExportTarget>,
    ) -> FileOutcome {
        let mut sink = match self.filesystem.create_file(target).await {
            Ok(sink) => sink,
            Err(e) => {
                error!(path = %target.display(), error = %format!("{e:#}"), "Could not create file");
                return FileOutcome::Failed(format!("{e:#}"));
            }
        };

        if export.is_none() && file.is_empty_file() {
            if let Err(e) = sink.finish().await {
                return self.abandon(target, format!("{e:#}")).await;
            }
            info!(path = %target.display(), "File has no data");
            return FileOutcome::Skipped(SkipReason::Empty);
        }

        let streamed = self
            .stream(ctx, file, display_name, export, sink.as_mut())
            .await;
        let finished = sink.finish().await;

        let end = match (streamed, finished) {
            (Ok(end), Ok(())) => end,
            (Err(e), _) => return self.abandon(target, e.to_string()).await,
            (Ok(_), Err(e)) => return self.abandon(target, format!("{e:#}")).await,
        };

        if let TransferEnd::SizeUnknown = end {
            warn!(path = %target.display(), "File may not have been fully downloaded");
        }

        if let Some(modified) = file.modified_time {
            if let Err(e) = self.filesystem.set_modified(target, modified).await {
                warn!(path = %target.display(), error = %format!("{e:#}"), "Could not set modification time");
            }
        }

        info!(path = %target.display(), "Created");
        FileOutcome::Downloaded(target.to_path_buf())
    }

    /// Pumps chunks into `sink` until the reader reports completion
    async fn stream(
        &self,
        ctx: &mut RunContext,
        file: &RemoteObject,
        display_name: &str,
        export: Option<ExportTarget>,
        sink: &mut dyn IFileSink,
    ) -> Result<TransferEnd, TransferError> {
        let mut acknowledge_abuse = false;
        let mut offset = 0u64;
        let mut reader = self.open(file, export, acknowledge_abuse, offset).await?;

        loop {
            match reader.next_chunk().await {
                Ok(chunk) => {
                    sink.write_all(&chunk.data).await.map_err(|e| {
                        TransferError::Io(std::io::Error::new(
                            std::io::ErrorKind::Other,
                            format!("{e:#}"),
                        ))
                    })?;
                    offset += chunk.data.len() as u64;
                    if chunk.done {
                        return Ok(match chunk.total_size {
                            Some(_) => TransferEnd::Complete,
                            None => TransferEnd::SizeUnknown,
                        });
                    }
                }
                Err(TransferError::AbusiveFile) if export.is_none() && !acknowledge_abuse => {
                    let prompt = format!(
                        "Problem downloading: '{display_name}' is marked as potential malware or spam. \
                         Are you sure you want to download it?"
                    );
                    if !ctx.confirm(&prompt) {
                        warn!(name = display_name, "Download of flagged file declined");
                        return Err(TransferError::Cancelled);
                    }
                    acknowledge_abuse = true;
                    reader = self.open(file, export, acknowledge_abuse, offset).await?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn open(
        &self,
        file: &RemoteObject,
        export: Option<ExportTarget>,
        acknowledge_abuse: bool,
        offset: u64,
    ) -> Result<Box<dyn IChunkReader>, TransferError> {
        match export {
            Some(target) => self.transfer.open_export(&file.id, target.mime_type).await,
            None => {
                self.transfer
                    .open_download(&file.id, acknowledge_abuse, offset)
                    .await
            }
        }
    }

    /// Removes a partial file and reports the failure
    async fn abandon(&self, target: &Path, reason: String) -> FileOutcome {
        error!(
            path = %target.display(),
            error = %reason,
            "Was not downloaded due to an error"
        );
        if let Err(e) = self.filesystem.delete_file(target).await {
            warn!(path = %target.display(), error = %format!("{e:#}"), "Could not remove partial file");
        }
        FileOutcome::Failed(reason)
    }
}
