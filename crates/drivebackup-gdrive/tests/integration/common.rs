//! Shared test helpers for Drive API integration tests
//!
//! Provides wiremock-based mock server setup for Drive API endpoints.
//! Each helper mounts the necessary mock endpoints and returns a client or
//! provider pointing at the mock server.

use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use drivebackup_core::ports::{Chunk, IChunkReader, TransferError};
use drivebackup_gdrive::client::DriveClient;
use drivebackup_gdrive::provider::GoogleDriveProvider;

/// Sets up a mock server with the account endpoint and returns
/// a (MockServer, DriveClient) tuple.
///
/// Pre-configured endpoints:
/// - GET /about → user profile
pub async fn setup_drive_mock() -> (MockServer, DriveClient) {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "user": {
                "displayName": "Test User",
                "emailAddress": "test@example.com"
            }
        })))
        .mount(&server)
        .await;

    let client = fast_client(&server);
    (server, client)
}

/// Client for `server` with millisecond backoff
pub fn fast_client(server: &MockServer) -> DriveClient {
    DriveClient::with_base_url("test-access-token", server.uri())
        .with_base_delay(Duration::from_millis(5))
}

/// Provider for `server` with the given chunk size
pub fn provider(server: &MockServer, chunk_size: u64) -> GoogleDriveProvider {
    GoogleDriveProvider::new(fast_client(server)).with_chunk_size(chunk_size)
}

/// Error body the API returns for files flagged as malware or spam
pub fn abusive_file_body() -> serde_json::Value {
    serde_json::json!({
        "error": {
            "errors": [{
                "domain": "global",
                "reason": "cannotDownloadAbusiveFile",
                "message": "This file has been identified as malware or spam and cannot be downloaded."
            }],
            "code": 403,
            "message": "This file has been identified as malware or spam and cannot be downloaded."
        }
    })
}

/// Reads chunks until the reader reports completion
///
/// Returns the concatenated data and the chunks' last reported total.
pub async fn read_all(
    reader: &mut dyn IChunkReader,
) -> Result<(Vec<u8>, Option<u64>, usize), TransferError> {
    let mut data = Vec::new();
    let mut calls = 0;
    loop {
        let Chunk {
            data: piece,
            total_size,
            done,
        } = reader.next_chunk().await?;
        calls += 1;
        data.extend_from_slice(&piece);
        if done {
            return Ok((data, total_size, calls));
        }
        assert!(calls < 100, "reader never finished");
    }
}
