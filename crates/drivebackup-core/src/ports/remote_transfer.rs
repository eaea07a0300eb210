//! Remote transfer port (driven/secondary port)
//!
//! This module defines the chunked download and export interface used by
//! the file materializer. Both endpoints hand out an [`IChunkReader`] that
//! yields the file in pieces and reports whether the total size is known.
//!
//! ## Design Notes
//!
//! - Errors are typed ([`TransferError`]) rather than `anyhow` because the
//!   materializer reacts to one specific case: a file the remote flags as
//!   potentially abusive, which can be retried with an acknowledgement.
//! - Opening a reader does not touch the network; the first
//!   `next_chunk` call does.

use thiserror::Error;

use crate::domain::newtypes::RemoteId;

// ============================================================================
// TransferError
// ============================================================================

/// Errors produced while transferring file content
#[derive(Debug, Error)]
pub enum TransferError {
    /// The remote refuses the download until abuse is acknowledged
    #[error("File is flagged as potentially abusive")]
    AbusiveFile,

    /// Non-retryable HTTP error, or a retryable one after retries ran out
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Error message reported by the remote
        message: String,
    },

    /// Connection-level failure after retries ran out
    #[error("Network error: {0}")]
    Network(String),

    /// Local I/O failure while writing the transferred content
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transfer abandoned by the caller
    #[error("Transfer cancelled")]
    Cancelled,
}

impl TransferError {
    /// Returns true for the abusive-file refusal
    pub fn is_abusive_file(&self) -> bool {
        matches!(self, TransferError::AbusiveFile)
    }
}

// ============================================================================
// Chunked reading
// ============================================================================

/// One piece of a transfer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chunk {
    /// Bytes of this piece (may be empty on the final chunk)
    pub data: Vec<u8>,
    /// Total size of the file when the remote reported it
    pub total_size: Option<u64>,
    /// True once the whole file has been delivered
    pub done: bool,
}

/// Sequential reader over a remote file
#[async_trait::async_trait]
pub trait IChunkReader: Send {
    /// Fetches the next chunk
    ///
    /// Must not be called again after a chunk with `done == true`.
    async fn next_chunk(&mut self) -> Result<Chunk, TransferError>;
}

// ============================================================================
// IRemoteTransfer trait
// ============================================================================

/// Port trait for fetching file content
#[async_trait::async_trait]
pub trait IRemoteTransfer: Send + Sync {
    /// Opens a download of a regular file
    ///
    /// # Arguments
    /// * `id` - Remote id of the file
    /// * `acknowledge_abuse` - Download even if the remote flags the file
    /// * `offset` - Byte offset to resume from
    async fn open_download(
        &self,
        id: &RemoteId,
        acknowledge_abuse: bool,
        offset: u64,
    ) -> Result<Box<dyn IChunkReader>, TransferError>;

    /// Opens an export of a native document
    ///
    /// # Arguments
    /// * `id` - Remote id of the document
    /// * `mime_type` - Target format of the conversion
    async fn open_export(
        &self,
        id: &RemoteId,
        mime_type: &str,
    ) -> Result<Box<dyn IChunkReader>, TransferError>;
}
