//! HTTP implementations of the storage protocols.
//!
//! `HttpResumableStore` speaks the tus-style resumable dialect: sessions are
//! created with a POST carrying `Upload-Length` and metadata headers, chunks
//! are appended with PATCH at an explicit `Upload-Offset`, and the server's
//! authoritative offset is read back with HEAD. `HttpObjectStore` is a plain
//! upsert-PUT for the small transcode artifacts.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use reelpipe_core::Config;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;

use crate::keys::validate_key;
use crate::traits::{ObjectStore, ResumableStore, SessionUri, StorageError, StorageResult};

const TUS_VERSION: &str = "1.0.0";
const OFFSET_CONTENT_TYPE: &str = "application/offset+octet-stream";

// Chunk PATCH requests can legitimately take minutes on slow links.
const CHUNK_TIMEOUT: Duration = Duration::from_secs(300);
const CONTROL_TIMEOUT: Duration = Duration::from_secs(60);

/// Resumable-upload client for a tus-style storage endpoint.
#[derive(Clone, Debug)]
pub struct HttpResumableStore {
    client: Client,
    endpoint: String,
    bucket: String,
    api_key: Option<String>,
}

impl HttpResumableStore {
    pub fn new(
        endpoint: impl Into<String>,
        bucket: impl Into<String>,
        api_key: Option<String>,
    ) -> StorageResult<Self> {
        let client = Client::builder()
            .timeout(CHUNK_TIMEOUT)
            .build()
            .map_err(|e| StorageError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            bucket: bucket.into(),
            api_key,
        })
    }

    pub fn from_config(config: &Config) -> StorageResult<Self> {
        Self::new(
            config.storage_endpoint.clone(),
            config.storage_bucket.clone(),
            config.storage_api_key.clone(),
        )
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("Authorization", format!("Bearer {}", key)),
            None => request,
        }
    }

    fn create_url(&self) -> String {
        format!("{}/upload/resumable", self.endpoint)
    }
}

/// Encode tus `Upload-Metadata` pairs: comma-separated `key base64(value)`.
fn encode_upload_metadata(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| format!("{} {}", key, BASE64.encode(value)))
        .collect::<Vec<_>>()
        .join(",")
}

/// Resolve a possibly-relative `Location` header against the endpoint.
fn resolve_location(endpoint: &str, location: &str) -> String {
    if location.starts_with("http://") || location.starts_with("https://") {
        location.to_string()
    } else {
        let base = endpoint.trim_end_matches('/');
        format!("{}/{}", base, location.trim_start_matches('/'))
    }
}

fn parse_offset_header(response: &Response) -> StorageResult<u64> {
    response
        .headers()
        .get("Upload-Offset")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok())
        .ok_or_else(|| {
            StorageError::ProtocolViolation("missing or invalid Upload-Offset header".to_string())
        })
}

async fn error_text(response: Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string())
}

#[async_trait::async_trait]
impl ResumableStore for HttpResumableStore {
    async fn create_session(
        &self,
        key: &str,
        total_bytes: u64,
        content_type: &str,
    ) -> StorageResult<SessionUri> {
        validate_key(key)?;
        let start = std::time::Instant::now();

        let metadata = encode_upload_metadata(&[
            ("bucketName", &self.bucket),
            ("objectName", key),
            ("contentType", content_type),
            ("cacheControl", "3600"),
        ]);

        let request = self
            .client
            .post(self.create_url())
            .header("Tus-Resumable", TUS_VERSION)
            .header("Upload-Length", total_bytes.to_string())
            .header("Upload-Metadata", metadata)
            .timeout(CONTROL_TIMEOUT);

        let response = self
            .apply_auth(request)
            .send()
            .await
            .map_err(|e| StorageError::SessionCreateFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::SessionCreateFailed(format!(
                "status {}: {}",
                status,
                error_text(response).await
            )));
        }

        let location = response
            .headers()
            .get("Location")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                StorageError::ProtocolViolation("missing Location header".to_string())
            })?;

        let session = SessionUri::new(resolve_location(&self.endpoint, location));

        tracing::info!(
            key = %key,
            total_bytes = total_bytes,
            session = %session,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Resumable session created"
        );

        Ok(session)
    }

    async fn append_chunk(
        &self,
        session: &SessionUri,
        offset: u64,
        data: Bytes,
    ) -> StorageResult<u64> {
        let start = std::time::Instant::now();
        let len = data.len();

        let request = self
            .client
            .patch(session.as_str())
            .header("Tus-Resumable", TUS_VERSION)
            .header("Upload-Offset", offset.to_string())
            .header("Content-Type", OFFSET_CONTENT_TYPE)
            .body(data);

        let response = self.apply_auth(request).send().await.map_err(|e| {
            StorageError::ChunkFailed {
                offset,
                reason: e.to_string(),
            }
        })?;

        let status = response.status();
        if status == StatusCode::CONFLICT {
            // The server refused our offset; its own offset is authoritative.
            let server = parse_offset_header(&response).unwrap_or(0);
            return Err(StorageError::OffsetMismatch {
                client: offset,
                server,
            });
        }
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Err(StorageError::SessionNotFound(session.to_string()));
        }
        if !status.is_success() {
            return Err(StorageError::ChunkFailed {
                offset,
                reason: format!("status {}: {}", status, error_text(response).await),
            });
        }

        let new_offset = parse_offset_header(&response)?;

        tracing::debug!(
            session = %session,
            offset = offset,
            chunk_bytes = len,
            new_offset = new_offset,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Chunk appended"
        );

        Ok(new_offset)
    }

    async fn query_offset(&self, session: &SessionUri) -> StorageResult<u64> {
        let request = self
            .client
            .head(session.as_str())
            .header("Tus-Resumable", TUS_VERSION)
            .timeout(CONTROL_TIMEOUT);

        let response = self
            .apply_auth(request)
            .send()
            .await
            .map_err(|e| StorageError::OffsetQueryFailed(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Err(StorageError::SessionNotFound(session.to_string()));
        }
        if !status.is_success() {
            return Err(StorageError::OffsetQueryFailed(format!("status {}", status)));
        }

        parse_offset_header(&response)
    }

    async fn finalize(&self, session: &SessionUri, total_bytes: u64) -> StorageResult<()> {
        // This dialect completes implicitly once the offset reaches the
        // declared length; finalize verifies that the server agrees.
        let offset = self.query_offset(session).await?;
        if offset != total_bytes {
            return Err(StorageError::ProtocolViolation(format!(
                "finalize at offset {} of {}",
                offset, total_bytes
            )));
        }

        tracing::info!(session = %session, total_bytes = total_bytes, "Resumable session finalized");
        Ok(())
    }

    async fn delete(&self, session: &SessionUri) -> StorageResult<()> {
        let request = self
            .client
            .delete(session.as_str())
            .header("Tus-Resumable", TUS_VERSION)
            .timeout(CONTROL_TIMEOUT);

        let response = self
            .apply_auth(request)
            .send()
            .await
            .map_err(|e| StorageError::DeleteFailed(e.to_string()))?;

        let status = response.status();
        // Deleting an already-discarded session is not an error.
        if !status.is_success() && status != StatusCode::NOT_FOUND && status != StatusCode::GONE {
            return Err(StorageError::DeleteFailed(format!(
                "status {}: {}",
                status,
                error_text(response).await
            )));
        }

        tracing::info!(session = %session, "Resumable session deleted");
        Ok(())
    }
}

/// Simple-put client for the artifact upload path.
#[derive(Clone, Debug)]
pub struct HttpObjectStore {
    client: Client,
    endpoint: String,
    bucket: String,
    public_base: String,
    api_key: Option<String>,
}

impl HttpObjectStore {
    pub fn new(
        endpoint: impl Into<String>,
        bucket: impl Into<String>,
        public_base: impl Into<String>,
        api_key: Option<String>,
    ) -> StorageResult<Self> {
        let client = Client::builder()
            .timeout(CONTROL_TIMEOUT)
            .build()
            .map_err(|e| StorageError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            bucket: bucket.into(),
            public_base: public_base.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn from_config(config: &Config) -> StorageResult<Self> {
        Self::new(
            config.storage_endpoint.clone(),
            config.storage_bucket.clone(),
            config.public_base(),
            config.storage_api_key.clone(),
        )
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("Authorization", format!("Bearer {}", key)),
            None => request,
        }
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/object/{}/{}", self.endpoint, self.bucket, key)
    }
}

#[async_trait::async_trait]
impl ObjectStore for HttpObjectStore {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<String> {
        validate_key(key)?;
        let start = std::time::Instant::now();
        let size = data.len();

        let request = self
            .client
            .post(self.object_url(key))
            .header("Content-Type", content_type)
            .header("Cache-Control", "max-age=3600")
            .header("x-upsert", "true")
            .body(data);

        let response = self
            .apply_auth(request)
            .send()
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::UploadFailed(format!(
                "status {}: {}",
                status,
                error_text(response).await
            )));
        }

        let url = self.public_url(key);

        tracing::info!(
            key = %key,
            size_bytes = size,
            content_type = %content_type,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Artifact upload successful"
        );

        Ok(url)
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base, key)
    }
}
