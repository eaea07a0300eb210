//! Backup run lifecycle
//!
//! A run moves through `Ready -> Initiated -> Preparing -> Downloading ->
//! Complete`. `Paused` is only entered from `Downloading` while a human
//! answers the risky-download prompt, and `Stopped` is the terminal error
//! state reachable from anywhere.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// State of a backup run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupState {
    /// Nothing started yet
    #[default]
    Ready,
    /// Destination and source are being resolved
    Initiated,
    /// The remote tree index is being built
    Preparing,
    /// The tree walk is materializing files
    Downloading,
    /// Waiting for the user to answer a confirmation prompt
    Paused,
    /// The walk finished (retention cleanup may still follow)
    Complete,
    /// The run was aborted by a fatal condition
    Stopped,
}

impl BackupState {
    /// Returns true if `to` is a legal successor of `self`
    pub fn can_transition_to(self, to: BackupState) -> bool {
        use BackupState::*;
        match (self, to) {
            (Stopped, _) => false,
            (_, Stopped) => true,
            (Ready, Initiated)
            | (Initiated, Preparing)
            | (Preparing, Downloading)
            | (Downloading, Paused)
            | (Paused, Downloading)
            | (Downloading, Complete) => true,
            _ => false,
        }
    }

    /// Validates and returns the next state
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidState`] when the transition is not part
    /// of the lifecycle.
    pub fn transition(self, to: BackupState) -> Result<BackupState, DomainError> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(DomainError::InvalidState {
                from: self.to_string(),
                to: to.to_string(),
            })
        }
    }

    /// Returns true for `Complete` and `Stopped`
    pub fn is_terminal(self) -> bool {
        matches!(self, BackupState::Complete | BackupState::Stopped)
    }
}

impl fmt::Display for BackupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BackupState::Ready => "ready",
            BackupState::Initiated => "initiated",
            BackupState::Preparing => "preparing",
            BackupState::Downloading => "downloading",
            BackupState::Paused => "paused",
            BackupState::Complete => "complete",
            BackupState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Point-in-time progress of a run, handed to the progress sink
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Current lifecycle state
    pub state: BackupState,
    /// Files processed so far, whatever their outcome
    pub files_done: u64,
    /// Files in the remote tree
    pub total_files: u64,
    /// Folders processed so far
    pub folders_done: u64,
    /// Folders in the remote tree, including the source folder
    pub total_folders: u64,
}

impl ProgressSnapshot {
    /// Fraction of files processed, in `0.0..=1.0`
    pub fn file_ratio(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            (self.files_done as f64 / self.total_files as f64).min(1.0)
        }
    }
}
