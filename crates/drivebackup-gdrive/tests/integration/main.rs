//! Integration tests for drivebackup-gdrive
//!
//! Uses wiremock to simulate the Drive v3 API and verifies end-to-end
//! behavior of the client, listing pagination, ranged downloads, exports
//! and the retry policy.

mod common;

mod test_listing;
mod test_retry;
mod test_transfer;
mod test_user_info;
