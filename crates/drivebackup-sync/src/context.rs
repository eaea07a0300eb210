//! Explicit per-run state
//!
//! [`RunContext`] owns everything that changes while a backup runs: the
//! lifecycle state, the progress counters, and the consecutive-failure
//! streak. The engine creates one per run and lends it mutably to the
//! reconciler and materializer; nothing is global.

use std::sync::Arc;

use drivebackup_core::domain::{BackupState, BackupType, ExportFormat, ProgressSnapshot, TreeTotals};
use drivebackup_core::ports::{IConfirmation, IProgressSink};
use tracing::{debug, error};

use crate::BackupError;

/// Consecutive per-file failures that abort the run
pub const MAX_CONSECUTIVE_FAILURES: u32 = 5;

/// Policy settings a run is started with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSettings {
    /// Reuse and retention policy
    pub backup_type: BackupType,
    /// Preferred export format for native documents
    pub export_format: ExportFormat,
    /// Suppress per-file log lines for files that were already current
    pub changes_only: bool,
}

/// What happened to a single file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileResult {
    /// Content fetched from the remote
    Downloaded,
    /// Content copied or moved from the previous backup
    Reused,
    /// Nothing to do (already current, empty, or not exportable)
    Skipped,
    /// Hard failure; partial output was removed
    Failed,
}

/// Running totals of a backup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    /// Files processed, whatever the outcome
    pub files_done: u64,
    /// Folders processed
    pub folders_done: u64,
    /// Files fetched from the remote
    pub files_downloaded: u64,
    /// Files taken from the previous backup
    pub files_reused: u64,
    /// Files that needed no work
    pub files_skipped: u64,
    /// Files that failed
    pub files_failed: u64,
}

/// State, counters, and collaborators of one backup run
pub struct RunContext {
    state: BackupState,
    counters: RunCounters,
    consecutive_failures: u32,
    totals: TreeTotals,
    settings: RunSettings,
    confirmation: Arc<dyn IConfirmation>,
    progress: Arc<dyn IProgressSink>,
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("state", &self.state)
            .field("counters", &self.counters)
            .field("consecutive_failures", &self.consecutive_failures)
            .field("totals", &self.totals)
            .field("settings", &self.settings)
            .finish()
    }
}

impl RunContext {
    /// Creates a context in the `Ready` state
    pub fn new(
        settings: RunSettings,
        confirmation: Arc<dyn IConfirmation>,
        progress: Arc<dyn IProgressSink>,
    ) -> Self {
        Self {
            state: BackupState::Ready,
            counters: RunCounters::default(),
            consecutive_failures: 0,
            totals: TreeTotals::default(),
            settings,
            confirmation,
            progress,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> BackupState {
        self.state
    }

    /// Run policy
    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Counters so far
    pub fn counters(&self) -> RunCounters {
        self.counters
    }

    /// Current failure streak
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Moves to `to` and reports the change
    ///
    /// # Errors
    /// Returns [`BackupError::InvalidTransition`] for transitions outside
    /// the lifecycle.
    pub fn transition(&mut self, to: BackupState) -> Result<(), BackupError> {
        self.state = self
            .state
            .transition(to)
            .map_err(BackupError::InvalidTransition)?;
        debug!(state = %self.state, "Backup state changed");
        self.emit();
        Ok(())
    }

    /// Moves to `Stopped` from wherever the run is
    pub fn stop(&mut self) {
        if self.state != BackupState::Stopped {
            self.state = BackupState::Stopped;
            self.emit();
        }
    }

    /// Fixes the totals reported with every snapshot
    pub fn set_totals(&mut self, totals: TreeTotals) {
        self.totals = totals;
    }

    /// Current progress snapshot
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            state: self.state,
            files_done: self.counters.files_done,
            total_files: self.totals.files,
            folders_done: self.counters.folders_done,
            total_folders: self.totals.folders,
        }
    }

    fn emit(&self) {
        self.progress.on_progress(self.snapshot());
    }

    /// Counts one processed file and applies the failure breaker
    ///
    /// Any non-failure resets the streak.
    ///
    /// # Errors
    /// Returns [`BackupError::TooManyFailures`] on the
    /// [`MAX_CONSECUTIVE_FAILURES`]th failure in a row.
    pub fn record_file(&mut self, result: FileResult) -> Result<(), BackupError> {
        self.counters.files_done += 1;
        match result {
            FileResult::Downloaded => self.counters.files_downloaded += 1,
            FileResult::Reused => self.counters.files_reused += 1,
            FileResult::Skipped => self.counters.files_skipped += 1,
            FileResult::Failed => self.counters.files_failed += 1,
        }
        self.emit();

        if result == FileResult::Failed {
            self.consecutive_failures += 1;
            if self.consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
                error!(
                    failures = self.consecutive_failures,
                    "Multiple consecutive failed file downloads, stopping backup"
                );
                return Err(BackupError::TooManyFailures(self.consecutive_failures));
            }
        } else {
            self.consecutive_failures = 0;
        }
        Ok(())
    }

    /// Counts one finished folder
    pub fn record_folder(&mut self) {
        self.counters.folders_done += 1;
        self.emit();
    }

    /// Pauses the run while the user answers `prompt`
    ///
    /// Blocks until the confirmation collaborator returns, then resumes
    /// the previous state.
    pub fn confirm(&mut self, prompt: &str) -> bool {
        let resume = self.state;
        let pausable = resume.can_transition_to(BackupState::Paused);
        if pausable {
            self.state = BackupState::Paused;
            self.emit();
        }

        let answer = self.confirmation.confirm(prompt);

        if pausable {
            self.state = resume;
            self.emit();
        }
        answer
    }
}
