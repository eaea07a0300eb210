//! Chunked downloads and exports
//!
//! Two [`IChunkReader`] implementations back the transfer port:
//!
//! - [`RangedDownload`] fetches `files/{id}?alt=media` in fixed-size
//!   `Range` requests, reading the total size from `Content-Range`.
//! - [`ExportStream`] issues one `files/{id}/export` request and yields
//!   its body piece by piece; exports do not support ranges.
//!
//! Neither reader touches the network until the first `next_chunk` call.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{CONTENT_RANGE, RANGE};
use reqwest::{Method, Response, StatusCode};
use tracing::{debug, trace, warn};

use drivebackup_core::domain::RemoteId;
use drivebackup_core::ports::{Chunk, IChunkReader, TransferError};

use crate::client::DriveClient;
use crate::DriveError;

/// Parses the total size out of a `Content-Range` header
///
/// `bytes 0-1023/4096` yields `Some(4096)`; an unknown total (`*`) or a
/// malformed header yields `None`.
pub fn content_range_total(value: &str) -> Option<u64> {
    let (_, total) = value.trim().rsplit_once('/')?;
    total.trim().parse().ok()
}

// ============================================================================
// RangedDownload
// ============================================================================

/// Reads a binary file in `Range` requests of `chunk_size` bytes
pub struct RangedDownload {
    client: Arc<DriveClient>,
    id: RemoteId,
    acknowledge_abuse: bool,
    offset: u64,
    chunk_size: u64,
}

impl RangedDownload {
    /// Creates a reader starting at `offset`
    pub fn new(
        client: Arc<DriveClient>,
        id: RemoteId,
        acknowledge_abuse: bool,
        offset: u64,
        chunk_size: u64,
    ) -> Self {
        Self {
            client,
            id,
            acknowledge_abuse,
            offset,
            chunk_size: chunk_size.max(1),
        }
    }

    fn range_header(&self) -> String {
        format!(
            "bytes={}-{}",
            self.offset,
            self.offset + self.chunk_size - 1
        )
    }
}

#[async_trait]
impl IChunkReader for RangedDownload {
    async fn next_chunk(&mut self) -> Result<Chunk, TransferError> {
        let path = format!("/files/{}", self.id);
        let range = self.range_header();
        let mut query = vec![("alt", "media")];
        if self.acknowledge_abuse {
            query.push(("acknowledgeAbuse", "true"));
        }

        let result = self
            .client
            .execute_with_retry(|| {
                self.client
                    .request(Method::GET, &path)
                    .query(&query)
                    .header(RANGE, &range)
            })
            .await;

        let response = match result {
            Ok(response) => response,
            // Asking past the end of the file (an empty file, or a file
            // that shrank) means there is nothing left
            Err(DriveError::Status { status: 416, .. }) => {
                return Ok(Chunk {
                    data: Vec::new(),
                    total_size: Some(self.offset),
                    done: true,
                });
            }
            Err(e) => return Err(e.into()),
        };

        let status = response.status();
        // A full body here would be appended after the bytes already written
        if status != StatusCode::PARTIAL_CONTENT && self.offset > 0 {
            warn!(id = %self.id, offset = self.offset, status = status.as_u16(), "Range ignored on resume");
            return Err(TransferError::Http {
                status: status.as_u16(),
                message: format!(
                    "Server ignored the range request while resuming at byte {}",
                    self.offset
                ),
            });
        }

        let total_size = if status == StatusCode::PARTIAL_CONTENT {
            response
                .headers()
                .get(CONTENT_RANGE)
                .and_then(|v| v.to_str().ok())
                .and_then(content_range_total)
        } else {
            // Range ignored: the body is the whole file
            response.content_length()
        };

        let data = response
            .bytes()
            .await
            .map_err(|e| TransferError::Network(e.to_string()))?
            .to_vec();
        self.offset += data.len() as u64;

        let done = if status == StatusCode::PARTIAL_CONTENT {
            match total_size {
                Some(total) => self.offset >= total,
                None => (data.len() as u64) < self.chunk_size,
            }
        } else {
            true
        };

        trace!(
            id = %self.id,
            received = data.len(),
            offset = self.offset,
            total = ?total_size,
            "Received download chunk"
        );

        Ok(Chunk {
            data,
            total_size,
            done,
        })
    }
}

// ============================================================================
// ExportStream
// ============================================================================

/// Streams the body of a native-document export
pub struct ExportStream {
    client: Arc<DriveClient>,
    id: RemoteId,
    mime_type: String,
    response: Option<Response>,
    total_size: Option<u64>,
}

impl ExportStream {
    /// Creates a reader for exporting `id` as `mime_type`
    pub fn new(client: Arc<DriveClient>, id: RemoteId, mime_type: impl Into<String>) -> Self {
        Self {
            client,
            id,
            mime_type: mime_type.into(),
            response: None,
            total_size: None,
        }
    }
}

#[async_trait]
impl IChunkReader for ExportStream {
    async fn next_chunk(&mut self) -> Result<Chunk, TransferError> {
        if self.response.is_none() {
            let path = format!("/files/{}/export", self.id);
            let mime_type = self.mime_type.as_str();
            let response = self
                .client
                .execute_with_retry(|| {
                    self.client
                        .request(Method::GET, &path)
                        .query(&[("mimeType", mime_type)])
                })
                .await?;
            self.total_size = response.content_length();
            debug!(id = %self.id, mime_type, total = ?self.total_size, "Export started");
            self.response = Some(response);
        }

        let Some(response) = self.response.as_mut() else {
            return Err(TransferError::Cancelled);
        };
        let piece = response
            .chunk()
            .await
            .map_err(|e| TransferError::Network(e.to_string()))?;

        Ok(match piece {
            Some(bytes) => Chunk {
                data: bytes.to_vec(),
                total_size: self.total_size,
                done: false,
            },
            None => Chunk {
                data: Vec::new(),
                total_size: self.total_size,
                done: true,
            },
        })
    }
}
