//! Terminal progress sink
//!
//! Prints one line per state change and one whenever the processed share
//! of files crosses another percent.

use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use drivebackup_core::domain::{BackupState, ProgressSnapshot};
use drivebackup_core::ports::IProgressSink;

/// Formats a snapshot as a single status line
pub fn progress_line(snapshot: &ProgressSnapshot) -> String {
    match snapshot.state {
        BackupState::Downloading | BackupState::Paused | BackupState::Complete => format!(
            "[{}] {}/{} files ({:.0}%), {}/{} folders",
            snapshot.state,
            snapshot.files_done,
            snapshot.total_files,
            snapshot.file_ratio() * 100.0,
            snapshot.folders_done,
            snapshot.total_folders
        ),
        state => format!("[{state}]"),
    }
}

/// Progress sink writing to stderr
#[derive(Debug, Default)]
pub struct ConsoleProgress {
    last: Mutex<Option<(BackupState, u64)>>,
}

impl ConsoleProgress {
    /// Returns the line to print for `snapshot`, if anything changed enough
    fn next_line(&self, snapshot: &ProgressSnapshot) -> Option<String> {
        let percent = (snapshot.file_ratio() * 100.0) as u64;
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        if *last == Some((snapshot.state, percent)) {
            return None;
        }
        *last = Some((snapshot.state, percent));
        Some(progress_line(snapshot))
    }
}

impl IProgressSink for ConsoleProgress {
    fn on_progress(&self, snapshot: ProgressSnapshot) {
        if let Some(line) = self.next_line(&snapshot) {
            let _ = writeln!(io::stderr(), "{line}");
        }
    }
}
