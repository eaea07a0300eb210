//! Local filesystem adapter (secondary/driven adapter)
//!
//! Implements [`ILocalFileSystem`] using `tokio::fs` for async file operations.
//!
//! ## Design Decisions
//!
//! - **Modification times**: set through `filetime` on a blocking thread;
//!   copies carry the source's modification time over so a file reused
//!   from a previous backup is recognised as current next time.
//! - **Buffered writes**: downloads stream into a `BufWriter` sink; the
//!   file is only complete once [`IFileSink::finish`] returns.
//! - **Moves**: a plain rename, falling back to copy-then-delete when the
//!   previous backup lives on another filesystem.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use drivebackup_core::ports::{DirEntry, FileSystemState, IFileSink, ILocalFileSystem};
use filetime::FileTime;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument};

// ============================================================================
// LocalFileSystemAdapter struct
// ============================================================================

/// Adapter that bridges the [`ILocalFileSystem`] port to the real filesystem.
///
/// This is a zero-sized struct because all operations derive their context
/// from the path arguments. The backup roots live at a higher layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystemAdapter;

impl LocalFileSystemAdapter {
    /// Creates a new adapter
    pub fn new() -> Self {
        Self
    }
}

/// Writes a modification time on a blocking thread
async fn set_mtime(path: &Path, mtime: FileTime) -> anyhow::Result<()> {
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || filetime::set_file_mtime(&owned, mtime))
        .await
        .context("mtime task panicked")?
        .with_context(|| format!("Failed to set modification time of {}", path.display()))
}

// ============================================================================
// File sink
// ============================================================================

/// Buffered writer for a file being downloaded
struct TokioFileSink {
    path: PathBuf,
    writer: BufWriter<tokio::fs::File>,
}

#[async_trait::async_trait]
impl IFileSink for TokioFileSink {
    async fn write_all(&mut self, data: &[u8]) -> anyhow::Result<()> {
        self.writer
            .write_all(data)
            .await
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }

    async fn finish(mut self: Box<Self>) -> anyhow::Result<()> {
        self.writer
            .flush()
            .await
            .with_context(|| format!("Failed to flush {}", self.path.display()))?;
        self.writer.shutdown().await?;
        Ok(())
    }
}

// ============================================================================
// ILocalFileSystem implementation
// ============================================================================

#[async_trait::async_trait]
impl ILocalFileSystem for LocalFileSystemAdapter {
    #[instrument(skip(self), fields(path = %path.display()))]
    async fn get_state(&self, path: &Path) -> anyhow::Result<FileSystemState> {
        let metadata = match tokio::fs::metadata(path).await {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("path not found");
                return Ok(FileSystemState::not_found());
            }
            Err(e) => return Err(e.into()),
        };

        let is_file = metadata.is_file();
        let size = if is_file { metadata.len() } else { 0 };

        // Convert system modified time to DateTime<Utc>.
        let modified = metadata.modified().ok().and_then(|st| {
            st.duration_since(std::time::UNIX_EPOCH)
                .ok()
                .and_then(|dur| DateTime::from_timestamp(dur.as_secs() as i64, dur.subsec_nanos()))
        });

        Ok(FileSystemState {
            exists: true,
            is_file,
            size,
            modified,
        })
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    async fn create_directory(&self, path: &Path) -> anyhow::Result<()> {
        debug!("creating directory");
        tokio::fs::create_dir_all(path).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    async fn create_file(&self, path: &Path) -> anyhow::Result<Box<dyn IFileSink>> {
        let file = tokio::fs::File::create(path)
            .await
            .with_context(|| format!("Failed to create {}", path.display()))?;
        Ok(Box::new(TokioFileSink {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        }))
    }

    async fn set_modified(&self, path: &Path, modified: DateTime<Utc>) -> anyhow::Result<()> {
        set_mtime(path, FileTime::from_unix_time(modified.timestamp(), 0)).await
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    async fn delete_file(&self, path: &Path) -> anyhow::Result<()> {
        debug!("removing file");
        tokio::fs::remove_file(path).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    async fn remove_dir_all(&self, path: &Path) -> anyhow::Result<()> {
        debug!("removing directory recursively");
        tokio::fs::remove_dir_all(path).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    async fn remove_empty_dir(&self, path: &Path) -> anyhow::Result<()> {
        tokio::fs::remove_dir(path).await?;
        Ok(())
    }

    async fn list_directory(&self, path: &Path) -> anyhow::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        let mut reader = tokio::fs::read_dir(path)
            .await
            .with_context(|| format!("Failed to list {}", path.display()))?;

        while let Some(entry) = reader.next_entry().await? {
            let file_type = entry.file_type().await?;
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: entry.path(),
                is_dir: file_type.is_dir(),
            });
        }

        // read_dir order is filesystem dependent
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    #[instrument(skip(self), fields(from = %from.display(), to = %to.display()))]
    async fn rename(&self, from: &Path, to: &Path) -> anyhow::Result<()> {
        tokio::fs::rename(from, to).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(from = %from.display(), to = %to.display()))]
    async fn copy_file(&self, from: &Path, to: &Path) -> anyhow::Result<()> {
        tokio::fs::copy(from, to).await?;
        let metadata = tokio::fs::metadata(from).await?;
        set_mtime(to, FileTime::from_last_modification_time(&metadata)).await
    }

    #[instrument(skip(self), fields(from = %from.display(), to = %to.display()))]
    async fn move_file(&self, from: &Path, to: &Path) -> anyhow::Result<()> {
        match tokio::fs::rename(from, to).await {
            Ok(()) => Ok(()),
            Err(e) => {
                debug!(error = %e, "rename failed, copying instead");
                self.copy_file(from, to).await?;
                tokio::fs::remove_file(from).await?;
                Ok(())
            }
        }
    }
}

// ============================================================================
// Unit tests
// ============================================================================
