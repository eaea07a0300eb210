//! Integration tests for the retry policy
//!
//! Verifies that rate limiting (429 or a 403 quota reason) and server errors
//! are retried with backoff, and that client errors and exhausted retries
//! surface immediately.

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common;

fn about_ok() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "user": {"displayName": "Test User", "emailAddress": "test@example.com"}
    }))
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .with_priority(1)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(about_ok())
        .expect(1)
        .mount(&server)
        .await;

    let client = common::fast_client(&server);
    let user = client.get_user_info().await.unwrap();
    assert_eq!(user.display_name, "Test User");
}

#[tokio::test]
async fn test_rate_limit_honours_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(about_ok())
        .expect(1)
        .mount(&server)
        .await;

    let client = common::fast_client(&server);
    assert!(client.get_user_info().await.is_ok());
}

#[tokio::test]
async fn test_forbidden_rate_limit_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "error": {
                "errors": [{"domain": "usageLimits", "reason": "userRateLimitExceeded"}],
                "code": 403,
                "message": "User Rate Limit Exceeded"
            }
        })))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(about_ok())
        .expect(1)
        .mount(&server)
        .await;

    let client = common::fast_client(&server);
    let user = client.get_user_info().await.unwrap();
    assert_eq!(user.email, "test@example.com");
}

#[tokio::test]
async fn test_retries_are_bounded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let client = common::fast_client(&server).with_max_retries(2);
    let err = client.get_user_info().await.unwrap_err();
    assert!(format!("{err:#}").contains("500"));
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(ResponseTemplate::new(400))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::fast_client(&server);
    assert!(client.get_user_info().await.is_err());
}
