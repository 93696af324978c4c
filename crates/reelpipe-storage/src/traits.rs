//! Storage abstraction traits
//!
//! This module defines the two protocol traits the pipeline uploads through:
//! `ResumableStore` for the chunked resumable-upload protocol that carries the
//! raw source video, and `ObjectStore` for the simple-put protocol that
//! carries the (much smaller) transcode artifacts.

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt::{Display, Formatter, Result as FmtResult};
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Session create failed: {0}")]
    SessionCreateFailed(String),

    #[error("Chunk upload failed at offset {offset}: {reason}")]
    ChunkFailed { offset: u64, reason: String },

    #[error("Offset query failed: {0}")]
    OffsetQueryFailed(String),

    #[error("Offset mismatch: client at {client}, server at {server}")]
    OffsetMismatch { client: u64, server: u64 },

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl StorageError {
    /// Whether the operation may succeed if retried. Offset mismatches are
    /// transient because the session recovers by re-querying the server
    /// offset and continuing from there.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StorageError::ChunkFailed { .. }
                | StorageError::OffsetQueryFailed(_)
                | StorageError::OffsetMismatch { .. }
                | StorageError::UploadFailed(_)
                | StorageError::IoError(_)
        )
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Opaque handle to a resumable-upload session, assigned by the server at
/// session creation and presented on every subsequent call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUri(String);

impl SessionUri {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SessionUri {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

/// Resumable-upload protocol.
///
/// The server owns the authoritative byte offset for each session. Clients
/// must append at exactly the server's offset; appending elsewhere fails with
/// `OffsetMismatch` and the session recovers via `query_offset`.
#[async_trait]
pub trait ResumableStore: Send + Sync {
    /// Create an upload session for `key` with a declared total length.
    /// Returns the session handle used by all other operations.
    async fn create_session(
        &self,
        key: &str,
        total_bytes: u64,
        content_type: &str,
    ) -> StorageResult<SessionUri>;

    /// Append a chunk at the given offset. Returns the new server offset.
    async fn append_chunk(
        &self,
        session: &SessionUri,
        offset: u64,
        data: Bytes,
    ) -> StorageResult<u64>;

    /// Query the server's authoritative offset for the session.
    async fn query_offset(&self, session: &SessionUri) -> StorageResult<u64>;

    /// Complete the session. Must only be called once the server offset has
    /// reached the declared total length.
    async fn finalize(&self, session: &SessionUri, total_bytes: u64) -> StorageResult<()>;

    /// Discard the session and any bytes it holds.
    async fn delete(&self, session: &SessionUri) -> StorageResult<()>;
}

/// Simple-put protocol for small artifacts (playlists, segments, posters).
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `data` at `key`, replacing any existing object. Returns the
    /// public URL of the stored object.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<String>;

    /// Resolve the public URL for `key`. Pure string transformation; performs
    /// no I/O and does not check existence.
    fn public_url(&self, key: &str) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(StorageError::ChunkFailed {
            offset: 0,
            reason: "connection reset".to_string()
        }
        .is_transient());
        assert!(StorageError::OffsetMismatch {
            client: 100,
            server: 50
        }
        .is_transient());
        assert!(!StorageError::InvalidKey("../etc".to_string()).is_transient());
        assert!(!StorageError::SessionNotFound("gone".to_string()).is_transient());
        assert!(!StorageError::ProtocolViolation("short upload".to_string()).is_transient());
    }

    #[test]
    fn test_session_uri_display() {
        let uri = SessionUri::new("https://storage.example.com/upload/abc");
        assert_eq!(uri.to_string(), "https://storage.example.com/upload/abc");
        assert_eq!(uri.as_str(), "https://storage.example.com/upload/abc");
    }
}
