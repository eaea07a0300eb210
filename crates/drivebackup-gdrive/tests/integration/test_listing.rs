//! Integration tests for file listing
//!
//! Verifies query construction, pagination, size parsing and item
//! lookups against a mocked `files` endpoint.

use std::sync::Arc;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use drivebackup_core::domain::RemoteId;
use drivebackup_core::ports::{IRemoteListing, ListFilter};
use drivebackup_core::usecases::{BuildIndexUseCase, ResolveSourceUseCase, SourceSelector};

use crate::common;

#[tokio::test]
async fn test_list_page_sends_query_and_parses_items() {
    let (server, _) = common::setup_drive_mock().await;
    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("q", "trashed=false"))
        .and(query_param("pageSize", "1000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": [{
                "id": "file-1",
                "name": "a.txt",
                "mimeType": "text/plain",
                "modifiedTime": "2024-02-20T12:30:00.000Z",
                "parents": ["folder-1"],
                "size": "42"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = common::provider(&server, 1024);
    let page = provider.list_page(&ListFilter::all(), None).await.unwrap();

    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].size, Some(42));
    assert_eq!(page.items[0].parents, vec!["folder-1".to_string()]);
    assert!(page.next_page_token.is_none());
}

#[tokio::test]
async fn test_build_index_follows_pages() {
    let (server, _) = common::setup_drive_mock().await;

    // Second page, requested with the token from the first
    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("pageToken", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": [{
                "id": "docs",
                "name": "docs",
                "mimeType": "application/vnd.google-apps.folder",
                "parents": ["root-id"]
            }]
        })))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;

    // First page: a file whose folder has not been listed yet
    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "nextPageToken": "page-2",
            "files": [{
                "id": "file-1",
                "name": "plan.txt",
                "mimeType": "text/plain",
                "parents": ["docs"],
                "size": "7"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = Arc::new(common::provider(&server, 1024));
    let index = BuildIndexUseCase::new(provider)
        .execute(RemoteId::new("root-id").unwrap(), "My Drive")
        .await
        .unwrap();

    assert_eq!(index.total_files(), 1);
    assert_eq!(index.total_folders(), 2);
    let docs = index.get_folder(&RemoteId::new("docs").unwrap()).unwrap();
    assert_eq!(docs.name(), Some("docs"));
}

#[tokio::test]
async fn test_resolve_source_by_name() {
    let (server, _) = common::setup_drive_mock().await;
    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param(
            "q",
            "trashed=false and 'root' in parents and name='Work'",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": [{
                "id": "work-1",
                "name": "Work",
                "mimeType": "application/vnd.google-apps.folder",
                "parents": ["root-id"]
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = Arc::new(common::provider(&server, 1024));
    let source = ResolveSourceUseCase::new(provider)
        .execute(&SourceSelector::Name("Work".to_string()))
        .await
        .unwrap();

    assert_eq!(source.id.as_str(), "work-1");
    assert_eq!(source.name, "Work");
}

#[tokio::test]
async fn test_get_item_for_root_alias() {
    let (server, _) = common::setup_drive_mock().await;
    Mock::given(method("GET"))
        .and(path("/files/root"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "0AbCdEf",
            "name": "Mi unidad",
            "mimeType": "application/vnd.google-apps.folder"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = common::provider(&server, 1024);
    let item = provider.get_item("root").await.unwrap();
    assert_eq!(item.id, "0AbCdEf");
    assert!(item.parents.is_empty());
}

#[tokio::test]
async fn test_get_item_not_found() {
    let (server, _) = common::setup_drive_mock().await;
    Mock::given(method("GET"))
        .and(path("/files/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "error": {"code": 404, "message": "File not found: missing."}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = common::provider(&server, 1024);
    let err = provider.get_item("missing").await.unwrap_err();
    assert!(format!("{err:#}").contains("File not found"));
}
