//! Integration tests for downloads and exports
//!
//! Verifies ranged chunking, size reporting, the abusive-file refusal and
//! acknowledgement, and streamed exports.

use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use drivebackup_core::domain::RemoteId;
use drivebackup_core::ports::{IRemoteTransfer, TransferError};

use crate::common;

fn id(value: &str) -> RemoteId {
    RemoteId::new(value).unwrap()
}

async fn mount_range(server: &wiremock::MockServer, range: &str, content_range: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path("/files/file-1"))
        .and(query_param("alt", "media"))
        .and(header("range", range))
        .respond_with(
            ResponseTemplate::new(206)
                .insert_header("Content-Range", content_range)
                .set_body_bytes(body.to_vec()),
        )
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_download_in_ranges() {
    let (server, _) = common::setup_drive_mock().await;
    mount_range(&server, "bytes=0-3", "bytes 0-3/10", b"0123").await;
    mount_range(&server, "bytes=4-7", "bytes 4-7/10", b"4567").await;
    mount_range(&server, "bytes=8-11", "bytes 8-9/10", b"89").await;

    let provider = common::provider(&server, 4);
    let mut reader = provider.open_download(&id("file-1"), false, 0).await.unwrap();
    let (data, total, calls) = common::read_all(reader.as_mut()).await.unwrap();

    assert_eq!(data, b"0123456789");
    assert_eq!(total, Some(10));
    assert_eq!(calls, 3);
}

#[tokio::test]
async fn test_download_resumes_at_offset() {
    let (server, _) = common::setup_drive_mock().await;
    mount_range(&server, "bytes=6-9", "bytes 6-9/10", b"6789").await;

    let provider = common::provider(&server, 4);
    let mut reader = provider.open_download(&id("file-1"), false, 6).await.unwrap();
    let (data, total, _) = common::read_all(reader.as_mut()).await.unwrap();

    assert_eq!(data, b"6789");
    assert_eq!(total, Some(10));
}

#[tokio::test]
async fn test_full_response_without_range_support() {
    let (server, _) = common::setup_drive_mock().await;
    Mock::given(method("GET"))
        .and(path("/files/file-1"))
        .and(query_param("alt", "media"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"whole file".to_vec()))
        .mount(&server)
        .await;

    let provider = common::provider(&server, 4);
    let mut reader = provider.open_download(&id("file-1"), false, 0).await.unwrap();
    let (data, total, calls) = common::read_all(reader.as_mut()).await.unwrap();

    assert_eq!(data, b"whole file");
    assert_eq!(total, Some(10));
    assert_eq!(calls, 1);
}

#[tokio::test]
async fn test_resume_rejects_full_response() {
    let (server, _) = common::setup_drive_mock().await;
    Mock::given(method("GET"))
        .and(path("/files/file-1"))
        .and(query_param("alt", "media"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"whole file".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let provider = common::provider(&server, 4);
    let mut reader = provider.open_download(&id("file-1"), false, 6).await.unwrap();
    let err = reader.next_chunk().await.unwrap_err();

    match err {
        TransferError::Http { status, message } => {
            assert_eq!(status, 200);
            assert!(message.contains("byte 6"), "{message}");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn test_abusive_file_refused_then_acknowledged() {
    let (server, _) = common::setup_drive_mock().await;
    Mock::given(method("GET"))
        .and(path("/files/file-1"))
        .and(query_param("acknowledgeAbuse", "true"))
        .respond_with(
            ResponseTemplate::new(206)
                .insert_header("Content-Range", "bytes 0-6/7")
                .set_body_bytes(b"payload".to_vec()),
        )
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/file-1"))
        .respond_with(ResponseTemplate::new(403).set_body_json(common::abusive_file_body()))
        .expect(1)
        .mount(&server)
        .await;

    let provider = common::provider(&server, 1024);

    let mut refused = provider.open_download(&id("file-1"), false, 0).await.unwrap();
    let err = refused.next_chunk().await.unwrap_err();
    assert!(matches!(err, TransferError::AbusiveFile));

    let mut acknowledged = provider.open_download(&id("file-1"), true, 0).await.unwrap();
    let (data, _, _) = common::read_all(acknowledged.as_mut()).await.unwrap();
    assert_eq!(data, b"payload");
}

#[tokio::test]
async fn test_download_not_found_is_http_error() {
    let (server, _) = common::setup_drive_mock().await;
    Mock::given(method("GET"))
        .and(path("/files/file-1"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "error": {"code": 404, "message": "File not found: file-1."}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = common::provider(&server, 1024);
    let mut reader = provider.open_download(&id("file-1"), false, 0).await.unwrap();
    match reader.next_chunk().await.unwrap_err() {
        TransferError::Http { status, message } => {
            assert_eq!(status, 404);
            assert!(message.contains("File not found"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_export_streams_body() {
    let (server, _) = common::setup_drive_mock().await;
    let body = vec![b'x'; 3000];
    Mock::given(method("GET"))
        .and(path("/files/doc-1/export"))
        .and(query_param("mimeType", "application/pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let provider = common::provider(&server, 1024);
    let mut reader = provider
        .open_export(&id("doc-1"), "application/pdf")
        .await
        .unwrap();
    let (data, total, _) = common::read_all(reader.as_mut()).await.unwrap();

    assert_eq!(data, body);
    assert_eq!(total, Some(3000));
}
