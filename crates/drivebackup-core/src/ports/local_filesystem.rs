//! Local filesystem port (driven/secondary port)
//!
//! This module defines the interface for the backup tree on local disk:
//! directory management, streaming file writes, modification times, and
//! the copy/move/rename primitives used to reuse a previous backup.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because filesystem errors are adapter-specific.
//! - `get_state` reports a missing path as `FileSystemState::not_found()`
//!   instead of an error.
//! - File content is written through an [`IFileSink`] so transfers never
//!   hold a whole file in memory.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

// ============================================================================
// FileSystemState struct
// ============================================================================

/// Snapshot of a path's state on the local filesystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSystemState {
    /// Whether the path exists on disk
    pub exists: bool,
    /// Whether this is a regular file (false for directories and other types)
    pub is_file: bool,
    /// Size in bytes (0 for directories or non-existent files)
    pub size: u64,
    /// Last modification time (None if not available or the path doesn't exist)
    pub modified: Option<DateTime<Utc>>,
}

impl FileSystemState {
    /// Returns a state representing a non-existent path
    pub fn not_found() -> Self {
        Self {
            exists: false,
            is_file: false,
            size: 0,
            modified: None,
        }
    }

    /// Returns true if the path exists and is a regular file
    pub fn is_regular_file(&self) -> bool {
        self.exists && self.is_file
    }

    /// Returns true if the path exists and is a directory
    pub fn is_directory(&self) -> bool {
        self.exists && !self.is_file
    }

    /// Returns true if this is a file at least as new as `remote_modified`
    ///
    /// Times are compared at whole-second resolution since the local
    /// modification time is set from the remote time truncated to seconds.
    pub fn is_current(&self, remote_modified: DateTime<Utc>) -> bool {
        match self.modified {
            Some(local) if self.is_regular_file() => {
                local.timestamp() >= remote_modified.timestamp()
            }
            _ => false,
        }
    }
}

/// A directory entry returned by [`ILocalFileSystem::list_directory`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Entry name (last path component)
    pub name: String,
    /// Full path of the entry
    pub path: PathBuf,
    /// True for directories
    pub is_dir: bool,
}

// ============================================================================
// IFileSink trait
// ============================================================================

/// Writable handle to a file being created
#[async_trait::async_trait]
pub trait IFileSink: Send {
    /// Appends bytes to the file
    async fn write_all(&mut self, data: &[u8]) -> anyhow::Result<()>;

    /// Flushes and closes the file
    async fn finish(self: Box<Self>) -> anyhow::Result<()>;
}

// ============================================================================
// ILocalFileSystem trait
// ============================================================================

/// Port trait for local filesystem operations
///
/// ## Implementation Notes
///
/// - All paths are absolute.
/// - `copy_file` keeps the source's modification time so the copy is
///   recognised as current on the next run.
/// - `move_file` falls back to copy-then-delete across filesystems.
#[async_trait::async_trait]
pub trait ILocalFileSystem: Send + Sync {
    /// Gets the current state of a file or directory
    async fn get_state(&self, path: &Path) -> anyhow::Result<FileSystemState>;

    /// Creates a directory and all parent directories as needed
    ///
    /// This is equivalent to `mkdir -p` behavior.
    async fn create_directory(&self, path: &Path) -> anyhow::Result<()>;

    /// Creates or truncates a file and returns a sink for its content
    ///
    /// Parent directories are NOT automatically created.
    async fn create_file(&self, path: &Path) -> anyhow::Result<Box<dyn IFileSink>>;

    /// Sets a file's modification time
    async fn set_modified(&self, path: &Path, modified: DateTime<Utc>) -> anyhow::Result<()>;

    /// Deletes a file
    async fn delete_file(&self, path: &Path) -> anyhow::Result<()>;

    /// Deletes a directory and everything below it
    async fn remove_dir_all(&self, path: &Path) -> anyhow::Result<()>;

    /// Deletes an empty directory
    async fn remove_empty_dir(&self, path: &Path) -> anyhow::Result<()>;

    /// Lists the entries of a directory
    async fn list_directory(&self, path: &Path) -> anyhow::Result<Vec<DirEntry>>;

    /// Renames a file or directory
    async fn rename(&self, from: &Path, to: &Path) -> anyhow::Result<()>;

    /// Copies a file, keeping its modification time
    async fn copy_file(&self, from: &Path, to: &Path) -> anyhow::Result<()>;

    /// Moves a file
    async fn move_file(&self, from: &Path, to: &Path) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn file_at(secs: i64) -> FileSystemState {
        FileSystemState {
            exists: true,
            is_file: true,
            size: 1,
            modified: Some(Utc.timestamp_opt(secs, 0).unwrap()),
        }
    }

    #[test]
    fn test_not_found() {
        let state = FileSystemState::not_found();
        assert!(!state.is_regular_file());
        assert!(!state.is_directory());
        assert!(!state.is_current(Utc::now()));
    }

    #[test]
    fn test_is_current() {
        let remote = Utc.timestamp_opt(1_000, 0).unwrap();
        assert!(file_at(1_000).is_current(remote));
        assert!(file_at(2_000).is_current(remote));
        assert!(!file_at(999).is_current(remote));
    }

    #[test]
    fn test_is_current_ignores_subsecond_remote_time() {
        let remote = Utc.timestamp_opt(1_000, 500_000_000).unwrap();
        assert!(file_at(1_000).is_current(remote));
    }

    #[test]
    fn test_directory_is_never_current() {
        let dir = FileSystemState {
            is_file: false,
            ..file_at(5_000)
        };
        assert!(dir.is_directory());
        assert!(!dir.is_current(Utc.timestamp_opt(1, 0).unwrap()));
    }
}
