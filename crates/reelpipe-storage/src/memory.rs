//! In-memory storage backend.
//!
//! Implements both storage protocols against process-local state, with
//! fault injection hooks so upload and pipeline tests can exercise retry
//! and failure paths without a real endpoint.

use bytes::Bytes;
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::keys::validate_key;
use crate::traits::{ObjectStore, ResumableStore, SessionUri, StorageError, StorageResult};

/// One accepted chunk append, in arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendRecord {
    pub offset: u64,
    pub len: usize,
}

#[derive(Debug)]
struct SessionState {
    key: String,
    total_bytes: u64,
    data: Vec<u8>,
}

#[derive(Debug, Default)]
struct Inner {
    next_session: u64,
    sessions: HashMap<String, SessionState>,
    objects: HashMap<String, (Bytes, String)>,
    append_log: Vec<AppendRecord>,
    put_order: Vec<String>,
    fail_next_appends: u32,
    fail_next_puts: u32,
    fail_puts_matching: Option<String>,
}

/// Process-local store used by unit and pipeline tests.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` chunk appends with a transient error.
    pub async fn fail_next_appends(&self, count: u32) {
        self.inner.lock().await.fail_next_appends = count;
    }

    /// Fail the next `count` artifact puts with a transient error.
    pub async fn fail_next_puts(&self, count: u32) {
        self.inner.lock().await.fail_next_puts = count;
    }

    /// Persistently fail every put whose key contains `pattern`.
    pub async fn fail_puts_matching(&self, pattern: impl Into<String>) {
        self.inner.lock().await.fail_puts_matching = Some(pattern.into());
    }

    pub async fn object(&self, key: &str) -> Option<Bytes> {
        self.inner
            .lock()
            .await
            .objects
            .get(key)
            .map(|(data, _)| data.clone())
    }

    pub async fn object_content_type(&self, key: &str) -> Option<String> {
        self.inner
            .lock()
            .await
            .objects
            .get(key)
            .map(|(_, content_type)| content_type.clone())
    }

    pub async fn object_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.inner.lock().await.objects.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Put keys in the order they were accepted.
    pub async fn put_order(&self) -> Vec<String> {
        self.inner.lock().await.put_order.clone()
    }

    pub async fn append_log(&self) -> Vec<AppendRecord> {
        self.inner.lock().await.append_log.clone()
    }

    pub async fn session_offset(&self, session: &SessionUri) -> Option<u64> {
        self.inner
            .lock()
            .await
            .sessions
            .get(session.as_str())
            .map(|state| state.data.len() as u64)
    }

    /// The object key a session was created for.
    pub async fn session_key(&self, session: &SessionUri) -> Option<String> {
        self.inner
            .lock()
            .await
            .sessions
            .get(session.as_str())
            .map(|state| state.key.clone())
    }

    pub async fn session_count(&self) -> usize {
        self.inner.lock().await.sessions.len()
    }
}

#[async_trait::async_trait]
impl ResumableStore for InMemoryStore {
    async fn create_session(
        &self,
        key: &str,
        total_bytes: u64,
        _content_type: &str,
    ) -> StorageResult<SessionUri> {
        validate_key(key)?;
        let mut inner = self.inner.lock().await;
        inner.next_session += 1;
        let uri = format!("mem://session/{}", inner.next_session);
        inner.sessions.insert(
            uri.clone(),
            SessionState {
                key: key.to_string(),
                total_bytes,
                data: Vec::new(),
            },
        );
        Ok(SessionUri::new(uri))
    }

    async fn append_chunk(
        &self,
        session: &SessionUri,
        offset: u64,
        data: Bytes,
    ) -> StorageResult<u64> {
        let mut inner = self.inner.lock().await;

        if inner.fail_next_appends > 0 {
            inner.fail_next_appends -= 1;
            return Err(StorageError::ChunkFailed {
                offset,
                reason: "injected append failure".to_string(),
            });
        }

        let state = inner
            .sessions
            .get_mut(session.as_str())
            .ok_or_else(|| StorageError::SessionNotFound(session.to_string()))?;

        let server = state.data.len() as u64;
        if offset != server {
            return Err(StorageError::OffsetMismatch {
                client: offset,
                server,
            });
        }
        if server + data.len() as u64 > state.total_bytes {
            return Err(StorageError::ProtocolViolation(format!(
                "append past declared length {}",
                state.total_bytes
            )));
        }

        state.data.extend_from_slice(&data);
        let new_offset = state.data.len() as u64;
        inner.append_log.push(AppendRecord {
            offset,
            len: data.len(),
        });
        Ok(new_offset)
    }

    async fn query_offset(&self, session: &SessionUri) -> StorageResult<u64> {
        let inner = self.inner.lock().await;
        inner
            .sessions
            .get(session.as_str())
            .map(|state| state.data.len() as u64)
            .ok_or_else(|| StorageError::SessionNotFound(session.to_string()))
    }

    async fn finalize(&self, session: &SessionUri, total_bytes: u64) -> StorageResult<()> {
        let mut inner = self.inner.lock().await;
        let state = inner
            .sessions
            .get(session.as_str())
            .ok_or_else(|| StorageError::SessionNotFound(session.to_string()))?;

        let received = state.data.len() as u64;
        if received != total_bytes {
            return Err(StorageError::ProtocolViolation(format!(
                "finalize at offset {} of {}",
                received, total_bytes
            )));
        }

        // A finished session materializes as a stored object.
        let key = state.key.clone();
        let data = Bytes::from(state.data.clone());
        inner
            .objects
            .insert(key, (data, "application/octet-stream".to_string()));
        Ok(())
    }

    async fn delete(&self, session: &SessionUri) -> StorageResult<()> {
        // Deleting an unknown session is a no-op.
        self.inner.lock().await.sessions.remove(session.as_str());
        Ok(())
    }
}

#[async_trait::async_trait]
impl ObjectStore for InMemoryStore {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<String> {
        validate_key(key)?;
        let mut inner = self.inner.lock().await;

        if inner.fail_next_puts > 0 {
            inner.fail_next_puts -= 1;
            return Err(StorageError::UploadFailed(
                "injected put failure".to_string(),
            ));
        }
        if let Some(pattern) = &inner.fail_puts_matching {
            if key.contains(pattern.as_str()) {
                return Err(StorageError::UploadFailed(format!(
                    "injected put failure for {}",
                    key
                )));
            }
        }

        inner
            .objects
            .insert(key.to_string(), (data, content_type.to_string()));
        inner.put_order.push(key.to_string());
        Ok(self.public_url(key))
    }

    fn public_url(&self, key: &str) -> String {
        format!("memory://{}", key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_session_round_trip() {
        let store = InMemoryStore::new();
        let session = store
            .create_session("user-1/clip.mp4", 10, "video/mp4")
            .await
            .unwrap();

        let offset = store
            .append_chunk(&session, 0, Bytes::from_static(b"hello"))
            .await
            .unwrap();
        assert_eq!(offset, 5);

        let offset = store
            .append_chunk(&session, 5, Bytes::from_static(b"world"))
            .await
            .unwrap();
        assert_eq!(offset, 10);

        assert_eq!(store.query_offset(&session).await.unwrap(), 10);
        store.finalize(&session, 10).await.unwrap();
        assert_eq!(
            store.object("user-1/clip.mp4").await.unwrap(),
            Bytes::from_static(b"helloworld")
        );
    }

    #[tokio::test]
    async fn test_append_at_wrong_offset_reports_server_offset() {
        let store = InMemoryStore::new();
        let session = store
            .create_session("user-1/clip.mp4", 10, "video/mp4")
            .await
            .unwrap();
        store
            .append_chunk(&session, 0, Bytes::from_static(b"hello"))
            .await
            .unwrap();

        let err = store
            .append_chunk(&session, 3, Bytes::from_static(b"xx"))
            .await
            .unwrap_err();
        match err {
            StorageError::OffsetMismatch { client, server } => {
                assert_eq!(client, 3);
                assert_eq!(server, 5);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_injected_append_failures_are_transient() {
        let store = InMemoryStore::new();
        let session = store
            .create_session("user-1/clip.mp4", 5, "video/mp4")
            .await
            .unwrap();
        store.fail_next_appends(2).await;

        for _ in 0..2 {
            let err = store
                .append_chunk(&session, 0, Bytes::from_static(b"hello"))
                .await
                .unwrap_err();
            assert!(err.is_transient());
        }

        let offset = store
            .append_chunk(&session, 0, Bytes::from_static(b"hello"))
            .await
            .unwrap();
        assert_eq!(offset, 5);
    }

    #[tokio::test]
    async fn test_finalize_before_complete_fails() {
        let store = InMemoryStore::new();
        let session = store
            .create_session("user-1/clip.mp4", 10, "video/mp4")
            .await
            .unwrap();
        store
            .append_chunk(&session, 0, Bytes::from_static(b"hello"))
            .await
            .unwrap();

        let err = store.finalize(&session, 10).await.unwrap_err();
        assert!(matches!(err, StorageError::ProtocolViolation(_)));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = InMemoryStore::new();
        let session = store
            .create_session("user-1/clip.mp4", 5, "video/mp4")
            .await
            .unwrap();
        store.delete(&session).await.unwrap();
        store.delete(&session).await.unwrap();

        let err = store.query_offset(&session).await.unwrap_err();
        assert!(matches!(err, StorageError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn test_put_records_order() {
        let store = InMemoryStore::new();
        store
            .put("a/1.ts", Bytes::from_static(b"x"), "video/mp2t")
            .await
            .unwrap();
        store
            .put("a/poster.jpg", Bytes::from_static(b"y"), "image/jpeg")
            .await
            .unwrap();
        assert_eq!(store.put_order().await, vec!["a/1.ts", "a/poster.jpg"]);
    }

    #[tokio::test]
    async fn test_fail_puts_matching_is_persistent() {
        let store = InMemoryStore::new();
        store.fail_puts_matching("poster").await;

        for _ in 0..3 {
            let err = store
                .put("a/poster.jpg", Bytes::from_static(b"y"), "image/jpeg")
                .await
                .unwrap_err();
            assert!(err.is_transient());
        }
        store
            .put("a/1.ts", Bytes::from_static(b"x"), "video/mp2t")
            .await
            .unwrap();
    }
}
