//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! including validation failures and invalid run-state transitions.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid remote ID format
    #[error("Invalid remote ID: {0}")]
    InvalidRemoteId(String),

    /// Backup directory name that cannot be used on the local filesystem
    #[error("Invalid backup name '{name}': {reason}")]
    InvalidBackupName {
        /// The rejected name
        name: String,
        /// Why the name was rejected
        reason: String,
    },

    /// Invalid state transition attempt
    #[error("Invalid state transition from {from} to {to}")]
    InvalidState {
        /// The current state
        from: String,
        /// The attempted target state
        to: String,
    },

    /// Folder id not present in the remote tree index
    #[error("Unknown folder: {0}")]
    UnknownFolder(String),

    /// Unknown backup type string
    #[error("Unknown backup type: {0} (expected complete, update or increment)")]
    UnknownBackupType(String),

    /// Unknown export format string
    #[error("Unknown export format: {0} (expected msoffice or pdf)")]
    UnknownExportFormat(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}
