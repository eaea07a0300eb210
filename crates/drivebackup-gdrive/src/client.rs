//! Google Drive API client
//!
//! Provides a typed HTTP client for the Drive v3 REST API.
//! Handles authentication headers, endpoint construction and retries.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use drivebackup_gdrive::client::DriveClient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = DriveClient::new("access-token-here");
//! let user_info = client.get_user_info().await?;
//! println!("Hello, {}", user_info.display_name);
//! # Ok(())
//! # }
//! ```
//!
//! ## Retry Logic
//!
//! HTTP 429, 5xx and connection errors are retried with exponential
//! backoff: 1s, 2s, 4s, 8s, 16s (max 5 retries by default). A 429 waits
//! for the `Retry-After` duration instead when the header is present.

use std::time::Duration;

use anyhow::{Context, Result};
use drivebackup_core::ports::UserInfo;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::DriveError;

/// Base URL for the Drive API v3
pub const DRIVE_BASE_URL: &str = "https://www.googleapis.com/drive/v3";

/// Maximum number of retries for transient errors
const DEFAULT_MAX_RETRIES: u32 = 5;

/// Base delay for exponential backoff (1 second)
const BASE_DELAY: Duration = Duration::from_secs(1);

/// Upper bound accepted from a `Retry-After` header
const MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);

// ============================================================================
// Drive API response types
// ============================================================================

/// Response from `GET /about?fields=user`
#[derive(Debug, Deserialize)]
struct AboutResponse {
    user: Option<AboutUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AboutUser {
    display_name: Option<String>,
    email_address: Option<String>,
}

// ============================================================================
// Retry-After parsing
// ============================================================================

/// Parses a `Retry-After` header value
///
/// Accepts integer seconds or an HTTP date. Falls back to `default` for
/// anything else, including dates in the past or more than an hour ahead.
pub fn parse_retry_after(value: &str, default: Duration) -> Duration {
    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Duration::from_secs(seconds).min(MAX_RETRY_AFTER);
    }

    if let Ok(date) = chrono::DateTime::parse_from_rfc2822(value.trim()) {
        let wait = date.with_timezone(&chrono::Utc) - chrono::Utc::now();
        if let Ok(wait) = wait.to_std() {
            if wait <= MAX_RETRY_AFTER {
                return wait;
            }
        }
    }

    warn!(value, "Could not parse Retry-After header, using default");
    default
}

// ============================================================================
// DriveClient
// ============================================================================

/// HTTP client for Drive API calls
///
/// Wraps `reqwest::Client` with bearer authentication, base URL
/// construction and the retry policy.
#[derive(Debug, Clone)]
pub struct DriveClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL for API requests
    base_url: String,
    /// OAuth2 access token
    access_token: String,
    /// Retries after the first attempt
    max_retries: u32,
    /// First backoff delay; doubles on every retry
    base_delay: Duration,
}

impl DriveClient {
    /// Creates a new DriveClient with the given access token
    pub fn new(access_token: impl Into<String>) -> Self {
        Self::with_base_url(access_token, DRIVE_BASE_URL)
    }

    /// Creates a new DriveClient with a custom base URL (useful for testing)
    pub fn with_base_url(access_token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: BASE_DELAY,
        }
    }

    /// Sets how many times a transient failure is retried
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the first backoff delay
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Returns a reference to the current access token
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Returns the base URL for API requests
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the configured retry limit
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Creates an authenticated request builder for the given method and path
    ///
    /// # Arguments
    /// * `method` - HTTP method
    /// * `path` - API path relative to base URL (e.g., "/files")
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, &url)
            .bearer_auth(&self.access_token)
    }

    /// Delay before retry number `attempt` (0-based)
    fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << attempt.min(16))
    }

    /// Sends a request with automatic retry of transient failures
    ///
    /// `build` is called once per attempt. Returns the first successful
    /// response, or the classified error once the failure is not
    /// retryable or the retries are exhausted.
    pub async fn execute_with_retry<F>(&self, build: F) -> Result<Response, DriveError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            let err = match build().send().await {
                Ok(response) if response.status().is_success() => {
                    if attempt > 0 {
                        info!(url = %response.url(), attempt, "Request succeeded after retry");
                    }
                    return Ok(response);
                }
                Ok(response) => Self::error_from_response(response).await,
                Err(e) => DriveError::NetworkError(e),
            };

            if !err.is_retryable() || attempt >= self.max_retries {
                if err.is_retryable() {
                    warn!(attempts = attempt + 1, error = %err, "Retry limit exhausted");
                }
                return Err(err);
            }

            let delay = match &err {
                DriveError::TooManyRequests { retry_after } => *retry_after,
                _ => self.backoff(attempt),
            };
            info!(
                attempt = attempt + 1,
                max_retries = self.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Transient error, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// Reads an unsuccessful response into a [`DriveError`]
    async fn error_from_response(response: Response) -> DriveError {
        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(|v| parse_retry_after(v, BASE_DELAY))
            .unwrap_or(BASE_DELAY);
        let body = response.text().await.unwrap_or_default();
        if status != StatusCode::TOO_MANY_REQUESTS {
            debug!(status = status.as_u16(), body = %body, "Drive API error response");
        }
        DriveError::from_status(status, &body, retry_after)
    }

    /// Sends a GET with query parameters and parses the JSON body
    pub async fn get_json<T>(&self, path: &str, query: &[(&str, &str)]) -> Result<T, DriveError>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = self
            .execute_with_retry(|| self.request(Method::GET, path).query(query))
            .await?;
        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| DriveError::InvalidResponse(format!("{path}: {e}")))
    }

    /// Retrieves information about the authenticated user
    ///
    /// Makes `GET /about?fields=user`.
    pub async fn get_user_info(&self) -> Result<UserInfo> {
        debug!("Fetching user info from /about");

        let about: AboutResponse = self
            .get_json("/about", &[("fields", "user(displayName,emailAddress)")])
            .await
            .context("Failed to fetch account information")?;

        let user = about
            .user
            .context("Account information response has no user")?;

        Ok(UserInfo {
            email: user
                .email_address
                .unwrap_or_else(|| "unknown@unknown.com".to_string()),
            display_name: user.display_name.unwrap_or_else(|| "Unknown User".to_string()),
        })
    }
}
