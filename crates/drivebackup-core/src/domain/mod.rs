//! Domain entities and business logic
//!
//! This module contains the core domain types for drive-backup:
//! - Newtypes for remote identifiers and backup directory names
//! - Remote objects and the native-document export table
//! - The remote tree index built from the listing
//! - Local naming rules (sanitising, duplicate disambiguation)
//! - Backup type, run parameters and run lifecycle
//! - Domain-specific error types

pub mod backup;
pub mod errors;
pub mod naming;
pub mod newtypes;
pub mod remote_object;
pub mod run;
pub mod tree_index;

// Re-export commonly used types
pub use backup::{BackupRun, BackupType, ExportFormat};
pub use errors::DomainError;
pub use naming::{next_duplicate_name, sanitize_name, SiblingNames};
pub use newtypes::*;
pub use remote_object::{
    export_target, local_file_name, ExportTarget, RemoteObject, FOLDER_MIME_TYPE,
    NATIVE_MIME_PREFIX, SHORTCUT_MIME_TYPE,
};
pub use run::{BackupState, ProgressSnapshot};
pub use tree_index::{FolderName, FolderRecord, RemoteTreeIndex, TreeTotals};
