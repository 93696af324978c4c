//! Video record persistence port.
//!
//! Records are created as placeholders in `processing` status before any
//! transcoding starts, then finalized with artifact URLs once everything is
//! live. The HTTP implementation talks to the catalog's REST surface; the
//! in-memory one backs the pipeline tests.

use async_trait::async_trait;
use reelpipe_core::{Config, FinalizeRecord, NewVideoRecord, RecordStatus, VideoId};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Record create failed: {0}")]
    CreateFailed(String),

    #[error("Record finalize failed: {0}")]
    FinalizeFailed(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Invalid record response: {0}")]
    InvalidResponse(String),

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

pub type RecordResult<T> = Result<T, RecordError>;

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create the metadata record ahead of transcoding. The record starts in
    /// `processing` status and is invisible to viewers.
    async fn create_placeholder(&self, record: &NewVideoRecord) -> RecordResult<VideoId>;

    /// Attach artifact URLs and the measured duration, flipping the record
    /// publishable.
    async fn finalize(&self, id: &VideoId, publish: &FinalizeRecord) -> RecordResult<()>;
}

/// REST client for the video catalog.
#[derive(Clone, Debug)]
pub struct HttpRecordStore {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct CreateResponse {
    id: VideoId,
}

impl HttpRecordStore {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> RecordResult<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn from_config(config: &Config) -> RecordResult<Self> {
        Self::new(config.records_endpoint.clone(), config.records_api_key.clone())
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("Authorization", format!("Bearer {}", key)),
            None => request,
        }
    }

    fn videos_url(&self) -> String {
        format!("{}/videos", self.endpoint)
    }

    fn video_url(&self, id: &VideoId) -> String {
        format!("{}/videos/{}", self.endpoint, id)
    }
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn create_placeholder(&self, record: &NewVideoRecord) -> RecordResult<VideoId> {
        let response = self
            .apply_auth(self.client.post(self.videos_url()).json(record))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RecordError::CreateFailed(format!("status {}: {}", status, body)));
        }

        let created: CreateResponse = response
            .json()
            .await
            .map_err(|e| RecordError::InvalidResponse(e.to_string()))?;

        tracing::info!(video_id = %created.id, title = %record.title, "Video record created");
        Ok(created.id)
    }

    async fn finalize(&self, id: &VideoId, publish: &FinalizeRecord) -> RecordResult<()> {
        let response = self
            .apply_auth(self.client.patch(self.video_url(id)).json(publish))
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RecordError::NotFound(id.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RecordError::FinalizeFailed(format!("status {}: {}", status, body)));
        }

        tracing::info!(video_id = %id, "Video record finalized");
        Ok(())
    }
}

/// One stored record and its finalization payload, if any.
#[derive(Debug, Clone)]
pub struct RecordRow {
    pub record: NewVideoRecord,
    pub finalized: Option<FinalizeRecord>,
}

#[derive(Debug, Default)]
struct InnerRecords {
    rows: HashMap<VideoId, RecordRow>,
    created_order: Vec<VideoId>,
    fail_create: bool,
    fail_finalize: bool,
}

/// Process-local record store for tests.
#[derive(Debug, Default)]
pub struct InMemoryRecords {
    inner: Mutex<InnerRecords>,
}

impl InMemoryRecords {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fail_create(&self) {
        self.inner.lock().await.fail_create = true;
    }

    pub async fn fail_finalize(&self) {
        self.inner.lock().await.fail_finalize = true;
    }

    pub async fn row(&self, id: &VideoId) -> Option<RecordRow> {
        self.inner.lock().await.rows.get(id).cloned()
    }

    /// Record ids in creation order.
    pub async fn created(&self) -> Vec<VideoId> {
        self.inner.lock().await.created_order.clone()
    }

    pub async fn count(&self) -> usize {
        self.inner.lock().await.rows.len()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecords {
    async fn create_placeholder(&self, record: &NewVideoRecord) -> RecordResult<VideoId> {
        let mut inner = self.inner.lock().await;
        if inner.fail_create {
            return Err(RecordError::CreateFailed("injected create failure".to_string()));
        }
        let id = VideoId::new();
        inner.rows.insert(
            id,
            RecordRow {
                record: record.clone(),
                finalized: None,
            },
        );
        inner.created_order.push(id);
        Ok(id)
    }

    async fn finalize(&self, id: &VideoId, publish: &FinalizeRecord) -> RecordResult<()> {
        let mut inner = self.inner.lock().await;
        if inner.fail_finalize {
            return Err(RecordError::FinalizeFailed("injected finalize failure".to_string()));
        }
        let row = inner
            .rows
            .get_mut(id)
            .ok_or_else(|| RecordError::NotFound(id.to_string()))?;
        row.record.status = RecordStatus::Published;
        row.record.duration_seconds = publish.duration_seconds;
        row.finalized = Some(publish.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use reelpipe_core::VideoMetadata;

    fn new_record() -> NewVideoRecord {
        NewVideoRecord::placeholder(
            "user-1",
            VideoMetadata::new("My clip"),
            "clip.mp4",
            "video/mp4",
            1024,
            "user-1/1700000000000-clip.mp4",
        )
    }

    fn publish_payload() -> FinalizeRecord {
        FinalizeRecord {
            hls_master_url: "https://cdn.example.com/master.m3u8".to_string(),
            poster_url: "https://cdn.example.com/poster.jpg".to_string(),
            duration_seconds: 42.5,
            published_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_placeholder_starts_processing() {
        let store = InMemoryRecords::new();
        let id = store.create_placeholder(&new_record()).await.unwrap();

        let row = store.row(&id).await.unwrap();
        assert_eq!(row.record.status, RecordStatus::Processing);
        assert_eq!(row.record.duration_seconds, 0.0);
        assert!(row.finalized.is_none());
    }

    #[tokio::test]
    async fn test_finalize_flips_published() {
        let store = InMemoryRecords::new();
        let id = store.create_placeholder(&new_record()).await.unwrap();

        let publish = publish_payload();
        store.finalize(&id, &publish).await.unwrap();

        let row = store.row(&id).await.unwrap();
        assert_eq!(row.record.status, RecordStatus::Published);
        assert_eq!(row.record.duration_seconds, 42.5);
        assert_eq!(row.finalized, Some(publish));
    }

    #[tokio::test]
    async fn test_finalize_unknown_record() {
        let store = InMemoryRecords::new();
        let err = store
            .finalize(&VideoId::new(), &publish_payload())
            .await
            .unwrap_err();
        assert!(matches!(err, RecordError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let store = InMemoryRecords::new();
        store.fail_create().await;
        let err = store.create_placeholder(&new_record()).await.unwrap_err();
        assert!(matches!(err, RecordError::CreateFailed(_)));
        assert_eq!(store.count().await, 0);
    }

    #[test]
    fn test_http_url_layout() {
        let store = HttpRecordStore::new("https://api.example.com/v1/", None).unwrap();
        assert_eq!(store.videos_url(), "https://api.example.com/v1/videos");
        let id = VideoId::new();
        assert_eq!(
            store.video_url(&id),
            format!("https://api.example.com/v1/videos/{}", id)
        );
    }
}
