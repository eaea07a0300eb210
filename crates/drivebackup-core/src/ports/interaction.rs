//! User interaction ports (driving side collaborators)
//!
//! The engine needs two things from whoever runs it: an answer to the
//! risky-download question and somewhere to send progress.
//!
//! ## Design Notes
//!
//! - Both traits are synchronous. Confirmation blocks the walk until a
//!   human answers, with no timeout; progress delivery must return
//!   promptly and never fails from the engine's point of view.
//! - Test doubles return canned answers without I/O.

use crate::domain::run::ProgressSnapshot;

/// Port trait for yes/no questions to the user
pub trait IConfirmation: Send + Sync {
    /// Asks `prompt` and returns true on an affirmative answer
    fn confirm(&self, prompt: &str) -> bool;
}

/// Port trait receiving run progress
pub trait IProgressSink: Send + Sync {
    /// Called on every state change, after every file and after every folder
    fn on_progress(&self, snapshot: ProgressSnapshot);
}

/// Confirmation that always gives the same answer
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl IConfirmation for FixedAnswer {
    fn confirm(&self, _prompt: &str) -> bool {
        self.0
    }
}

/// Progress sink that drops every snapshot
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl IProgressSink for NoProgress {
    fn on_progress(&self, _snapshot: ProgressSnapshot) {}
}
