//! Drive Backup GDrive - Google Drive v3 API client
//!
//! Provides async client for:
//! - Paginated `files.list` queries over the whole drive
//! - Item metadata and account information
//! - Ranged media downloads and native-document exports
//!
//! ## Modules
//!
//! - [`client`] - Authenticated HTTP client with retry and backoff
//! - [`listing`] - File listing, item metadata, query construction
//! - [`transfer`] - Chunk readers for downloads and exports
//! - [`provider`] - Port implementations over the client

pub mod client;
pub mod listing;
pub mod provider;
pub mod transfer;

use std::time::Duration;

use drivebackup_core::ports::TransferError;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Reason the API gives when a download needs `acknowledgeAbuse=true`
pub const ABUSIVE_FILE_REASON: &str = "cannotDownloadAbusiveFile";

/// 403 reasons that signal quota throttling rather than a permission problem
pub const RATE_LIMIT_REASONS: &[&str] = &["userRateLimitExceeded", "rateLimitExceeded"];

/// Errors that can occur when communicating with the Drive API
#[derive(Debug, Error)]
pub enum DriveError {
    /// Access token missing, invalid or expired
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The request was refused
    #[error("Forbidden: {message}")]
    Forbidden {
        /// First machine-readable reason in the error body
        reason: Option<String>,
        /// Human-readable message
        message: String,
    },

    /// The requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded; retry after the specified duration
    #[error("Too many requests, retry after {retry_after:?}")]
    TooManyRequests {
        /// Duration to wait before retrying
        retry_after: Duration,
    },

    /// A server-side error occurred (5xx)
    #[error("Server error {status}: {message}")]
    ServerError {
        /// HTTP status code
        status: u16,
        /// Message from the error body
        message: String,
    },

    /// Any other unsuccessful status
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Message from the error body
        message: String,
    },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Error document returned by the Drive API
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error: ApiError,
}

#[derive(Debug, Default, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    reason: Option<String>,
}

impl DriveError {
    /// Classifies an unsuccessful response
    ///
    /// `body` is the raw response body; the Drive error document is parsed
    /// from it when present.
    pub fn from_status(status: StatusCode, body: &str, retry_after: Duration) -> Self {
        let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();
        let message = if parsed.error.message.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
        } else {
            parsed.error.message
        };
        let reason = parsed
            .error
            .errors
            .into_iter()
            .find_map(|detail| detail.reason);

        match status {
            StatusCode::UNAUTHORIZED => DriveError::Unauthorized(message),
            StatusCode::FORBIDDEN => DriveError::Forbidden { reason, message },
            StatusCode::NOT_FOUND => DriveError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => DriveError::TooManyRequests { retry_after },
            s if s.is_server_error() => DriveError::ServerError {
                status: s.as_u16(),
                message,
            },
            s => DriveError::Status {
                status: s.as_u16(),
                message,
            },
        }
    }

    /// Returns true if the request may succeed when repeated
    pub fn is_retryable(&self) -> bool {
        match self {
            DriveError::TooManyRequests { .. } | DriveError::ServerError { .. } => true,
            DriveError::Forbidden {
                reason: Some(reason),
                ..
            } => RATE_LIMIT_REASONS.contains(&reason.as_str()),
            DriveError::NetworkError(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }

    /// Returns true for the refusal to serve a file flagged as abusive
    pub fn is_abusive_file(&self) -> bool {
        matches!(
            self,
            DriveError::Forbidden { reason: Some(reason), .. } if reason == ABUSIVE_FILE_REASON
        )
    }

    /// HTTP status behind this error, if there was a response
    pub fn status(&self) -> Option<u16> {
        match self {
            DriveError::Unauthorized(_) => Some(401),
            DriveError::Forbidden { .. } => Some(403),
            DriveError::NotFound(_) => Some(404),
            DriveError::TooManyRequests { .. } => Some(429),
            DriveError::ServerError { status, .. } | DriveError::Status { status, .. } => {
                Some(*status)
            }
            DriveError::NetworkError(e) => e.status().map(|s| s.as_u16()),
            DriveError::InvalidResponse(_) => None,
        }
    }
}

impl From<DriveError> for TransferError {
    fn from(err: DriveError) -> Self {
        if err.is_abusive_file() {
            return TransferError::AbusiveFile;
        }
        match err.status() {
            Some(status) => TransferError::Http {
                status,
                message: err.to_string(),
            },
            None => TransferError::Network(err.to_string()),
        }
    }
}
