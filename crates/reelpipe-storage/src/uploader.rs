//! Chunked resumable upload sessions.
//!
//! An [`UploadSession`] slices a local file into fixed-size chunks and drives
//! them sequentially through a [`ResumableStore`]. The server's offset is
//! authoritative at every step: the session queries it on resume and realigns
//! when an append is rejected. Transient chunk failures back off through a
//! bounded delay schedule; once the schedule is exhausted the session parks
//! itself in `Paused` and stays resumable.

use bytes::Bytes;
use std::io::{self, ErrorKind, SeekFrom};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::traits::{ResumableStore, SessionUri, StorageError, StorageResult};

/// Fixed chunk size for resumable uploads.
pub const DEFAULT_CHUNK_SIZE: usize = 6 * 1024 * 1024;

/// Backoff schedule applied to transient failures, in seconds.
pub const RETRY_DELAYS_SECS: [u64; 5] = [0, 3, 5, 10, 20];

/// Lifecycle of an upload session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    Uploading,
    Paused,
    Retrying,
    Completed,
    Aborted,
}

/// Progress and outcome notifications emitted by a session.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    Progress { bytes_uploaded: u64, bytes_total: u64 },
    Completed { object_key: String },
    Failed { error: String },
}

/// Tunables for an upload session.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub chunk_size: usize,
    pub retry_delays: Vec<Duration>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            retry_delays: RETRY_DELAYS_SECS.iter().map(|s| Duration::from_secs(*s)).collect(),
        }
    }
}

impl UploadConfig {
    pub fn from_config(config: &reelpipe_core::Config) -> Self {
        Self {
            chunk_size: config.upload_chunk_size_bytes,
            ..Self::default()
        }
    }
}

struct Control {
    state: UploadState,
    /// High-water mark for progress events; never decreases.
    bytes_uploaded: u64,
    /// Bumped on every pause/resume/abort; a drive loop whose generation is
    /// stale must not publish events or mutate state.
    generation: u64,
    cancel: CancellationToken,
}

struct Shared {
    store: Arc<dyn ResumableStore>,
    source: PathBuf,
    object_key: String,
    session: SessionUri,
    bytes_total: u64,
    chunk_size: usize,
    retry_delays: Vec<Duration>,
    events: mpsc::UnboundedSender<UploadEvent>,
    control: Mutex<Control>,
}

impl Shared {
    async fn set_state(&self, generation: u64, state: UploadState) -> bool {
        let mut control = self.control.lock().await;
        if control.generation != generation {
            return false;
        }
        control.state = state;
        true
    }

    async fn publish_progress(&self, generation: u64, offset: u64, force: bool) {
        let mut control = self.control.lock().await;
        if control.generation != generation {
            return;
        }
        let clamped = offset.min(self.bytes_total);
        if clamped > control.bytes_uploaded || force {
            control.bytes_uploaded = control.bytes_uploaded.max(clamped);
            let _ = self.events.send(UploadEvent::Progress {
                bytes_uploaded: control.bytes_uploaded,
                bytes_total: self.bytes_total,
            });
        }
    }

    /// Stop driving but stay resumable: `Paused` plus a `Failed` event.
    async fn park(&self, generation: u64, error: StorageError) {
        let mut control = self.control.lock().await;
        if control.generation != generation {
            return;
        }
        control.state = UploadState::Paused;
        tracing::warn!(
            key = %self.object_key,
            error = %error,
            "Upload parked after exhausting retries"
        );
        let _ = self.events.send(UploadEvent::Failed {
            error: error.to_string(),
        });
    }

    async fn complete(&self, generation: u64) {
        let mut control = self.control.lock().await;
        if control.generation != generation {
            return;
        }
        control.state = UploadState::Completed;
        tracing::info!(key = %self.object_key, bytes = self.bytes_total, "Upload completed");
        let _ = self.events.send(UploadEvent::Completed {
            object_key: self.object_key.clone(),
        });
    }

    async fn backoff(&self, delay_idx: usize, cancel: &CancellationToken) -> bool {
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(self.retry_delays[delay_idx]) => true,
        }
    }
}

/// Handle over a chunked upload of one local file.
///
/// Dropping the handle cancels any in-flight transfer without deleting the
/// remote session.
pub struct UploadSession {
    shared: Arc<Shared>,
    root: CancellationToken,
}

impl UploadSession {
    /// Create the remote session and start uploading immediately.
    pub async fn start(
        store: Arc<dyn ResumableStore>,
        source: impl Into<PathBuf>,
        object_key: impl Into<String>,
        content_type: &str,
        config: UploadConfig,
    ) -> StorageResult<(Self, mpsc::UnboundedReceiver<UploadEvent>)> {
        if config.chunk_size == 0 {
            return Err(StorageError::ConfigError(
                "chunk_size must be non-zero".to_string(),
            ));
        }

        let source = source.into();
        let object_key = object_key.into();
        let bytes_total = tokio::fs::metadata(&source).await?.len();

        let session = store
            .create_session(&object_key, bytes_total, content_type)
            .await?;

        let root = CancellationToken::new();
        let cancel = root.child_token();
        let (events, receiver) = mpsc::unbounded_channel();

        let shared = Arc::new(Shared {
            store,
            source,
            object_key,
            session,
            bytes_total,
            chunk_size: config.chunk_size,
            retry_delays: config.retry_delays,
            events,
            control: Mutex::new(Control {
                state: UploadState::Uploading,
                bytes_uploaded: 0,
                generation: 1,
                cancel: cancel.clone(),
            }),
        });

        tracing::info!(
            key = %shared.object_key,
            bytes_total = bytes_total,
            chunk_size = shared.chunk_size,
            "Upload session started"
        );

        tokio::spawn(drive(Arc::clone(&shared), 1, cancel));

        Ok((Self { shared, root }, receiver))
    }

    /// Cancel the in-flight chunk and hold position. No-op unless uploading.
    pub async fn pause(&self) {
        let mut control = self.shared.control.lock().await;
        match control.state {
            UploadState::Uploading | UploadState::Retrying => {
                control.state = UploadState::Paused;
                control.generation += 1;
                control.cancel.cancel();
                tracing::info!(key = %self.shared.object_key, "Upload paused");
            }
            _ => {}
        }
    }

    /// Restart from the server's authoritative offset. No-op while running.
    pub async fn resume(&self) -> StorageResult<()> {
        let mut control = self.shared.control.lock().await;
        match control.state {
            UploadState::Paused => {
                control.state = UploadState::Uploading;
                control.generation += 1;
                control.cancel = self.root.child_token();
                let generation = control.generation;
                let cancel = control.cancel.clone();
                drop(control);

                tracing::info!(key = %self.shared.object_key, "Upload resumed");
                tokio::spawn(drive(Arc::clone(&self.shared), generation, cancel));
                Ok(())
            }
            UploadState::Uploading | UploadState::Retrying | UploadState::Completed => Ok(()),
            UploadState::Aborted => Err(StorageError::ProtocolViolation(
                "resume on aborted session".to_string(),
            )),
        }
    }

    /// Stop the transfer and discard the remote session. Terminal and
    /// idempotent.
    pub async fn abort(&self) -> StorageResult<()> {
        {
            let mut control = self.shared.control.lock().await;
            match control.state {
                UploadState::Aborted | UploadState::Completed => return Ok(()),
                _ => {
                    control.state = UploadState::Aborted;
                    control.generation += 1;
                    control.cancel.cancel();
                }
            }
        }

        tracing::info!(key = %self.shared.object_key, "Upload aborted");
        match self.shared.store.delete(&self.shared.session).await {
            Ok(()) | Err(StorageError::SessionNotFound(_)) => Ok(()),
            Err(err) => Err(err),
        }
    }

    pub async fn state(&self) -> UploadState {
        self.shared.control.lock().await.state
    }

    pub async fn bytes_uploaded(&self) -> u64 {
        self.shared.control.lock().await.bytes_uploaded
    }

    pub fn bytes_total(&self) -> u64 {
        self.shared.bytes_total
    }

    pub fn object_key(&self) -> &str {
        &self.shared.object_key
    }

    pub fn session_uri(&self) -> &SessionUri {
        &self.shared.session
    }
}

impl Drop for UploadSession {
    fn drop(&mut self) {
        self.root.cancel();
    }
}

async fn read_chunk(file: &mut File, offset: u64, len: usize) -> io::Result<Bytes> {
    file.seek(SeekFrom::Start(offset)).await?;
    let mut buf = vec![0u8; len];
    let mut filled = 0;
    while filled < len {
        let n = file.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    buf.truncate(filled);
    Ok(Bytes::from(buf))
}

async fn drive(shared: Arc<Shared>, generation: u64, cancel: CancellationToken) {
    let total = shared.bytes_total;

    // Never trust a local counter across restarts; ask the server.
    let mut delay_idx = 0;
    let mut offset = loop {
        let attempt = tokio::select! {
            _ = cancel.cancelled() => return,
            result = shared.store.query_offset(&shared.session) => result,
        };
        match attempt {
            Ok(offset) => break offset.min(total),
            Err(err) if err.is_transient() && delay_idx < shared.retry_delays.len() => {
                shared.set_state(generation, UploadState::Retrying).await;
                tracing::warn!(error = %err, retry = delay_idx, "Offset query failed, backing off");
                if !shared.backoff(delay_idx, &cancel).await {
                    return;
                }
                delay_idx += 1;
            }
            Err(err) => {
                shared.park(generation, err).await;
                return;
            }
        }
    };

    if !shared.set_state(generation, UploadState::Uploading).await {
        return;
    }
    shared.publish_progress(generation, offset, true).await;

    let mut file = match File::open(&shared.source).await {
        Ok(file) => file,
        Err(err) => {
            shared.park(generation, StorageError::IoError(err)).await;
            return;
        }
    };

    let mut delay_idx = 0;
    while offset < total {
        let want = shared.chunk_size.min((total - offset) as usize);
        let chunk = match read_chunk(&mut file, offset, want).await {
            Ok(chunk) if chunk.len() == want => chunk,
            Ok(_) => {
                let err = io::Error::new(ErrorKind::UnexpectedEof, "source file truncated");
                shared.park(generation, StorageError::IoError(err)).await;
                return;
            }
            Err(err) => {
                shared.park(generation, StorageError::IoError(err)).await;
                return;
            }
        };

        let attempt = tokio::select! {
            _ = cancel.cancelled() => return,
            result = shared.store.append_chunk(&shared.session, offset, chunk) => result,
        };

        match attempt {
            Ok(new_offset) => {
                offset = new_offset.min(total);
                delay_idx = 0;
                if !shared.set_state(generation, UploadState::Uploading).await {
                    return;
                }
                shared.publish_progress(generation, offset, false).await;
            }
            Err(StorageError::OffsetMismatch { client, server }) => {
                // The server's offset wins; re-read the chunk from there.
                tracing::warn!(client = client, server = server, "Offset mismatch, realigning");
                offset = server.min(total);
                shared.publish_progress(generation, offset, false).await;
                if delay_idx >= shared.retry_delays.len() {
                    shared
                        .park(generation, StorageError::OffsetMismatch { client, server })
                        .await;
                    return;
                }
                if !shared.backoff(delay_idx, &cancel).await {
                    return;
                }
                delay_idx += 1;
            }
            Err(err) if err.is_transient() => {
                if delay_idx >= shared.retry_delays.len() {
                    shared.park(generation, err).await;
                    return;
                }
                shared.set_state(generation, UploadState::Retrying).await;
                tracing::warn!(
                    error = %err,
                    offset = offset,
                    retry = delay_idx,
                    "Chunk failed, backing off"
                );
                if !shared.backoff(delay_idx, &cancel).await {
                    return;
                }
                delay_idx += 1;
            }
            Err(err) => {
                shared.park(generation, err).await;
                return;
            }
        }
    }

    let mut delay_idx = 0;
    loop {
        let attempt = tokio::select! {
            _ = cancel.cancelled() => return,
            result = shared.store.finalize(&shared.session, total) => result,
        };
        match attempt {
            Ok(()) => break,
            Err(err) if err.is_transient() && delay_idx < shared.retry_delays.len() => {
                shared.set_state(generation, UploadState::Retrying).await;
                tracing::warn!(error = %err, retry = delay_idx, "Finalize failed, backing off");
                if !shared.backoff(delay_idx, &cancel).await {
                    return;
                }
                delay_idx += 1;
            }
            Err(err) => {
                shared.park(generation, err).await;
                return;
            }
        }
    }

    shared.complete(generation).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::TempDir;
    use tokio::sync::Semaphore;

    fn fast_config(chunk_size: usize) -> UploadConfig {
        UploadConfig {
            chunk_size,
            retry_delays: vec![Duration::ZERO; 5],
        }
    }

    async fn write_source(dir: &TempDir, len: usize) -> (PathBuf, Vec<u8>) {
        let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        let path = dir.path().join("source.mp4");
        tokio::fs::write(&path, &data).await.unwrap();
        (path, data)
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<UploadEvent>) -> UploadEvent {
        rx.recv().await.expect("event channel closed")
    }

    /// Collect events until a terminal one, returning all of them.
    async fn collect_until_terminal(
        rx: &mut mpsc::UnboundedReceiver<UploadEvent>,
    ) -> Vec<UploadEvent> {
        let mut events = Vec::new();
        loop {
            let event = next_event(rx).await;
            let terminal = !matches!(event, UploadEvent::Progress { .. });
            events.push(event);
            if terminal {
                return events;
            }
        }
    }

    fn assert_progress_monotonic(events: &[UploadEvent]) {
        let mut last = 0u64;
        for event in events {
            if let UploadEvent::Progress {
                bytes_uploaded,
                bytes_total,
            } = event
            {
                assert!(*bytes_uploaded >= last, "progress went backwards");
                assert!(*bytes_uploaded <= *bytes_total, "progress exceeded total");
                last = *bytes_uploaded;
            }
        }
    }

    /// Lets a test meter out chunk appends one permit at a time.
    struct GatedStore {
        inner: Arc<InMemoryStore>,
        gate: Semaphore,
    }

    #[async_trait::async_trait]
    impl ResumableStore for GatedStore {
        async fn create_session(
            &self,
            key: &str,
            total_bytes: u64,
            content_type: &str,
        ) -> StorageResult<SessionUri> {
            self.inner.create_session(key, total_bytes, content_type).await
        }

        async fn append_chunk(
            &self,
            session: &SessionUri,
            offset: u64,
            data: Bytes,
        ) -> StorageResult<u64> {
            self.gate.acquire().await.unwrap().forget();
            self.inner.append_chunk(session, offset, data).await
        }

        async fn query_offset(&self, session: &SessionUri) -> StorageResult<u64> {
            self.inner.query_offset(session).await
        }

        async fn finalize(&self, session: &SessionUri, total_bytes: u64) -> StorageResult<()> {
            self.inner.finalize(session, total_bytes).await
        }

        async fn delete(&self, session: &SessionUri) -> StorageResult<()> {
            self.inner.delete(session).await
        }
    }

    /// Applies one append server-side but reports it as failed, simulating a
    /// lost response.
    struct LostResponseStore {
        inner: Arc<InMemoryStore>,
        lose_next: AtomicBool,
    }

    #[async_trait::async_trait]
    impl ResumableStore for LostResponseStore {
        async fn create_session(
            &self,
            key: &str,
            total_bytes: u64,
            content_type: &str,
        ) -> StorageResult<SessionUri> {
            self.inner.create_session(key, total_bytes, content_type).await
        }

        async fn append_chunk(
            &self,
            session: &SessionUri,
            offset: u64,
            data: Bytes,
        ) -> StorageResult<u64> {
            let result = self.inner.append_chunk(session, offset, data).await;
            if result.is_ok() && self.lose_next.swap(false, Ordering::SeqCst) {
                return Err(StorageError::ChunkFailed {
                    offset,
                    reason: "response lost".to_string(),
                });
            }
            result
        }

        async fn query_offset(&self, session: &SessionUri) -> StorageResult<u64> {
            self.inner.query_offset(session).await
        }

        async fn finalize(&self, session: &SessionUri, total_bytes: u64) -> StorageResult<()> {
            self.inner.finalize(session, total_bytes).await
        }

        async fn delete(&self, session: &SessionUri) -> StorageResult<()> {
            self.inner.delete(session).await
        }
    }

    #[tokio::test]
    async fn test_upload_completes_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let (path, data) = write_source(&dir, 10).await;
        let store = Arc::new(InMemoryStore::new());

        let (session, mut rx) = UploadSession::start(
            store.clone(),
            &path,
            "user-1/1700000000000-source.mp4",
            "video/mp4",
            fast_config(4),
        )
        .await
        .unwrap();

        let events = collect_until_terminal(&mut rx).await;
        assert_progress_monotonic(&events);
        assert_eq!(
            events.last(),
            Some(&UploadEvent::Completed {
                object_key: "user-1/1700000000000-source.mp4".to_string()
            })
        );

        let last_progress = events
            .iter()
            .filter_map(|e| match e {
                UploadEvent::Progress { bytes_uploaded, .. } => Some(*bytes_uploaded),
                _ => None,
            })
            .last()
            .unwrap();
        assert_eq!(last_progress, 10);

        assert_eq!(session.state().await, UploadState::Completed);
        assert_eq!(session.object_key(), "user-1/1700000000000-source.mp4");
        assert_eq!(session.bytes_total(), 10);
        assert_eq!(
            store.object("user-1/1700000000000-source.mp4").await.unwrap(),
            Bytes::from(data)
        );

        // 10 bytes in 4-byte chunks: sequential offsets, short tail.
        let log = store.append_log().await;
        assert_eq!(
            log.iter().map(|r| (r.offset, r.len)).collect::<Vec<_>>(),
            vec![(0, 4), (4, 4), (8, 2)]
        );
    }

    #[tokio::test]
    async fn test_pause_resume_continues_from_server_offset() {
        let dir = tempfile::tempdir().unwrap();
        let (path, data) = write_source(&dir, 12).await;
        let inner = Arc::new(InMemoryStore::new());
        let gated = Arc::new(GatedStore {
            inner: inner.clone(),
            gate: Semaphore::new(1),
        });

        let (session, mut rx) = UploadSession::start(
            gated.clone() as Arc<dyn ResumableStore>,
            &path,
            "user-1/clip.mp4",
            "video/mp4",
            fast_config(4),
        )
        .await
        .unwrap();

        // Wait for the single permitted chunk to land.
        loop {
            if let UploadEvent::Progress { bytes_uploaded, .. } = next_event(&mut rx).await {
                if bytes_uploaded == 4 {
                    break;
                }
            }
        }

        session.pause().await;
        assert_eq!(session.state().await, UploadState::Paused);
        assert_eq!(session.bytes_uploaded().await, 4);
        assert_eq!(
            inner.session_key(session.session_uri()).await.as_deref(),
            Some("user-1/clip.mp4")
        );

        // Unblock the gate and resume; the drive re-queries the offset.
        gated.gate.add_permits(8);
        session.resume().await.unwrap();

        let events = collect_until_terminal(&mut rx).await;
        assert_progress_monotonic(&events);
        assert!(matches!(events.last(), Some(UploadEvent::Completed { .. })));
        assert_eq!(inner.object("user-1/clip.mp4").await.unwrap(), Bytes::from(data));

        // Every accepted append continues exactly at the server offset.
        let log = inner.append_log().await;
        assert_eq!(
            log.iter().map(|r| (r.offset, r.len)).collect::<Vec<_>>(),
            vec![(0, 4), (4, 4), (8, 4)]
        );
    }

    #[tokio::test]
    async fn test_lost_response_realigns_to_server_offset() {
        let dir = tempfile::tempdir().unwrap();
        let (path, data) = write_source(&dir, 10).await;
        let inner = Arc::new(InMemoryStore::new());
        let store = Arc::new(LostResponseStore {
            inner: inner.clone(),
            lose_next: AtomicBool::new(true),
        });

        let (session, mut rx) =
            UploadSession::start(store, &path, "user-1/clip.mp4", "video/mp4", fast_config(4))
                .await
                .unwrap();

        let events = collect_until_terminal(&mut rx).await;
        assert_progress_monotonic(&events);
        assert!(matches!(events.last(), Some(UploadEvent::Completed { .. })));
        assert_eq!(session.state().await, UploadState::Completed);
        assert_eq!(inner.object("user-1/clip.mp4").await.unwrap(), Bytes::from(data));

        // Accepted appends never rewind past the server offset.
        let log = inner.append_log().await;
        let mut expected = 0u64;
        for record in &log {
            assert_eq!(record.offset, expected);
            expected += record.len as u64;
        }
        assert_eq!(expected, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_schedule_then_parks_resumable() {
        let dir = tempfile::tempdir().unwrap();
        let (path, data) = write_source(&dir, 8).await;
        let store = Arc::new(InMemoryStore::new());
        store.fail_next_appends(6).await;

        let config = UploadConfig {
            chunk_size: 4,
            ..UploadConfig::default()
        };
        let started = tokio::time::Instant::now();
        let (session, mut rx) =
            UploadSession::start(store.clone(), &path, "user-1/clip.mp4", "video/mp4", config)
                .await
                .unwrap();

        let events = collect_until_terminal(&mut rx).await;
        assert!(matches!(events.last(), Some(UploadEvent::Failed { .. })));
        assert_eq!(session.state().await, UploadState::Paused);

        // 0 + 3 + 5 + 10 + 20 seconds of backoff before giving up.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(38), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(39), "elapsed {:?}", elapsed);

        // Parked, not dead: a resume picks up from the server offset.
        session.resume().await.unwrap();
        let events = collect_until_terminal(&mut rx).await;
        assert!(matches!(events.last(), Some(UploadEvent::Completed { .. })));
        assert_eq!(store.object("user-1/clip.mp4").await.unwrap(), Bytes::from(data));
    }

    #[tokio::test]
    async fn test_abort_is_terminal_and_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let (path, _) = write_source(&dir, 12).await;
        let inner = Arc::new(InMemoryStore::new());
        let store = Arc::new(GatedStore {
            inner: inner.clone(),
            gate: Semaphore::new(0),
        });

        let (session, mut rx) =
            UploadSession::start(store, &path, "user-1/clip.mp4", "video/mp4", fast_config(4))
                .await
                .unwrap();

        session.abort().await.unwrap();
        assert_eq!(session.state().await, UploadState::Aborted);
        assert_eq!(inner.session_count().await, 0);

        // Second abort is a no-op; resume is refused.
        session.abort().await.unwrap();
        assert!(session.resume().await.is_err());

        // No terminal event was ever published.
        tokio::task::yield_now().await;
        while let Ok(event) = rx.try_recv() {
            assert!(matches!(event, UploadEvent::Progress { .. }));
        }
    }

    #[tokio::test]
    async fn test_zero_chunk_size_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (path, _) = write_source(&dir, 4).await;
        let store = Arc::new(InMemoryStore::new());

        let config = UploadConfig {
            chunk_size: 0,
            retry_delays: Vec::new(),
        };
        let result = UploadSession::start(store, &path, "user-1/clip.mp4", "video/mp4", config).await;
        assert!(matches!(result, Err(StorageError::ConfigError(_))));
    }

    #[test]
    fn test_default_config() {
        let config = UploadConfig::default();
        assert_eq!(config.chunk_size, 6 * 1024 * 1024);
        assert_eq!(
            config.retry_delays,
            vec![
                Duration::ZERO,
                Duration::from_secs(3),
                Duration::from_secs(5),
                Duration::from_secs(10),
                Duration::from_secs(20),
            ]
        );
    }
}
