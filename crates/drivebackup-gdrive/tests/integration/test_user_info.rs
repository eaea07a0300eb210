//! Integration test for the account endpoint
//!
//! Verifies that DriveClient::get_user_info() correctly fetches
//! and parses the /about response.

use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use drivebackup_gdrive::client::DriveClient;

use crate::common;

#[tokio::test]
async fn test_get_user_info_returns_profile() {
    let (_server, client) = common::setup_drive_mock().await;

    let user_info = client.get_user_info().await.expect("get_user_info failed");

    assert_eq!(user_info.email, "test@example.com");
    assert_eq!(user_info.display_name, "Test User");
}

#[tokio::test]
async fn test_get_user_info_sends_bearer_token_and_fields() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .and(query_param("fields", "user(displayName,emailAddress)"))
        .and(header("authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "user": {"displayName": "Owner", "emailAddress": "owner@example.com"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = DriveClient::with_base_url("secret-token", server.uri());
    let user_info = client.get_user_info().await.unwrap();
    assert_eq!(user_info.display_name, "Owner");
}

#[tokio::test]
async fn test_get_user_info_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": {"code": 401, "message": "Invalid Credentials"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::fast_client(&server);
    let err = client.get_user_info().await.unwrap_err();
    assert!(format!("{err:#}").contains("Invalid Credentials"));
}
