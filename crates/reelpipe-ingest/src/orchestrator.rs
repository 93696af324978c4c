//! The upload-to-published state machine.
//!
//! One [`IngestPipeline`] drives one video at a time: validate, upload the
//! raw source in resumable chunks, create the catalog record, measure the
//! real duration, transcode, push artifacts, finalize. The record is only
//! flipped publishable after every artifact (renditions, master playlist,
//! poster) is live; a failure anywhere leaves it in `processing`.

use bytes::Bytes;
use chrono::Utc;
use reelpipe_core::{
    Config, FinalizeRecord, LogLevel, NewVideoRecord, PipelineError, Stage, VideoId, VideoMetadata,
    MASTER_PLAYLIST_NAME,
};
use reelpipe_storage::keys;
use reelpipe_storage::{ObjectStore, ResumableStore, UploadConfig, UploadEvent, UploadSession};
use reelpipe_transcode::{MediaProbe, TranscodeRequest, WorkerFactory, WorkerMessage};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::events::PipelineEvent;
use crate::records::RecordStore;

/// Pause after publishing so consumers can render the completion state
/// before the pipeline returns.
const COMPLETION_HANDOFF: Duration = Duration::from_millis(1500);

/// Where the pipeline currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    Idle,
    Uploading,
    Uploaded,
    Transcoding,
    Finalizing,
    Published,
    Failed { stage: Stage },
}

impl Display for PipelineState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            PipelineState::Idle => write!(f, "idle"),
            PipelineState::Uploading => write!(f, "uploading"),
            PipelineState::Uploaded => write!(f, "uploaded"),
            PipelineState::Transcoding => write!(f, "transcoding"),
            PipelineState::Finalizing => write!(f, "finalizing"),
            PipelineState::Published => write!(f, "published"),
            PipelineState::Failed { stage } => write!(f, "failed({})", stage),
        }
    }
}

/// A selected local source file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: u64,
}

impl SourceFile {
    /// Describe a local file, guessing the content type from its extension.
    pub async fn from_path(path: impl Into<PathBuf>) -> Result<Self, PipelineError> {
        let path = path.into();
        let metadata = tokio::fs::metadata(&path).await.map_err(|e| {
            PipelineError::InvalidSource(format!("cannot read {}: {}", path.display(), e))
        })?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                PipelineError::InvalidSource("source path has no file name".to_string())
            })?;
        let content_type = guess_content_type(&file_name).to_string();

        Ok(Self {
            path,
            file_name,
            content_type,
            size_bytes: metadata.len(),
        })
    }
}

fn guess_content_type(file_name: &str) -> &'static str {
    let extension = file_name.rsplit('.').next().unwrap_or_default();
    match extension.to_ascii_lowercase().as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        _ => "application/octet-stream",
    }
}

/// Everything a caller needs once a video is live.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedVideo {
    pub video_id: VideoId,
    pub manifest_url: String,
    pub poster_url: String,
    pub duration_seconds: f64,
}

#[derive(Default)]
struct ActiveJob {
    cancel: Option<CancellationToken>,
    upload: Option<Arc<UploadSession>>,
}

/// Drives one video from a local file to a published record.
pub struct IngestPipeline {
    config: Config,
    resumable: Arc<dyn ResumableStore>,
    objects: Arc<dyn ObjectStore>,
    records: Arc<dyn RecordStore>,
    workers: Arc<dyn WorkerFactory>,
    probe: MediaProbe,
    upload_config: UploadConfig,
    artifact_retry_delays: Vec<Duration>,
    completion_delay: Duration,
    events: mpsc::UnboundedSender<PipelineEvent>,
    state: Mutex<PipelineState>,
    active: Mutex<ActiveJob>,
}

impl IngestPipeline {
    pub fn new(
        config: Config,
        resumable: Arc<dyn ResumableStore>,
        objects: Arc<dyn ObjectStore>,
        records: Arc<dyn RecordStore>,
        workers: Arc<dyn WorkerFactory>,
    ) -> (Self, mpsc::UnboundedReceiver<PipelineEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let probe = MediaProbe::from_config(&config);
        let upload_config = UploadConfig::from_config(&config);
        let pipeline = Self {
            config,
            resumable,
            objects,
            records,
            workers,
            probe,
            upload_config,
            artifact_retry_delays: UploadConfig::default().retry_delays,
            completion_delay: COMPLETION_HANDOFF,
            events,
            state: Mutex::new(PipelineState::Idle),
            active: Mutex::new(ActiveJob::default()),
        };
        (pipeline, receiver)
    }

    pub fn with_upload_config(mut self, upload_config: UploadConfig) -> Self {
        self.upload_config = upload_config;
        self
    }

    pub fn with_artifact_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.artifact_retry_delays = delays;
        self
    }

    pub fn with_completion_delay(mut self, delay: Duration) -> Self {
        self.completion_delay = delay;
        self
    }

    pub async fn state(&self) -> PipelineState {
        *self.state.lock().await
    }

    /// Run the whole pipeline for one source file.
    pub async fn run(
        &self,
        source: SourceFile,
        metadata: VideoMetadata,
    ) -> Result<PublishedVideo, PipelineError> {
        // Reject bad selections before touching the network; this is a
        // caller error, not a stage failure.
        self.validate(&source, &metadata)?;
        let cancel = self.begin().await?;

        let result = self.run_stages(&source, metadata, &cancel).await;

        {
            let mut active = self.active.lock().await;
            active.cancel = None;
            active.upload = None;
        }

        match result {
            Ok(published) => Ok(published),
            Err(_) if cancel.is_cancelled() => Err(PipelineError::Cancelled),
            Err(err) => {
                let stage = err.stage();
                self.transition(PipelineState::Failed { stage }).await;
                let _ = self.events.send(PipelineEvent::Failed {
                    stage,
                    message: err.to_string(),
                });
                let recoverable = err.is_recoverable();
                match err.log_level() {
                    LogLevel::Debug => tracing::debug!(
                        stage = %stage,
                        recoverable = recoverable,
                        error = %err.detailed_message(),
                        "Pipeline failed"
                    ),
                    LogLevel::Warn => tracing::warn!(
                        stage = %stage,
                        recoverable = recoverable,
                        error = %err.detailed_message(),
                        "Pipeline failed"
                    ),
                    LogLevel::Error => tracing::error!(
                        stage = %stage,
                        recoverable = recoverable,
                        error = %err.detailed_message(),
                        "Pipeline failed"
                    ),
                }
                Err(err)
            }
        }
    }

    /// Abandon whatever is in flight and return to `Idle`. Safe to call at
    /// any time, any number of times.
    pub async fn cancel(&self) {
        {
            let mut active = self.active.lock().await;
            if let Some(token) = active.cancel.take() {
                token.cancel();
            }
            if let Some(upload) = active.upload.take() {
                if let Err(err) = upload.abort().await {
                    tracing::warn!(error = %err, "Upload abort during cancel failed");
                }
            }
        }

        let mut state = self.state.lock().await;
        if *state != PipelineState::Idle {
            *state = PipelineState::Idle;
            let _ = self.events.send(PipelineEvent::StageChanged {
                stage: PipelineState::Idle,
            });
            tracing::info!("Pipeline cancelled");
        }
    }

    /// Hold the in-flight upload, keeping it resumable.
    pub async fn pause_upload(&self) {
        let upload = self.active.lock().await.upload.clone();
        if let Some(upload) = upload {
            upload.pause().await;
        }
    }

    /// Continue a paused or parked upload from the server's offset.
    pub async fn resume_upload(&self) -> Result<(), PipelineError> {
        let upload = self.active.lock().await.upload.clone();
        match upload {
            Some(upload) => upload
                .resume()
                .await
                .map_err(|e| PipelineError::Upload(e.to_string())),
            None => Ok(()),
        }
    }

    fn validate(&self, source: &SourceFile, metadata: &VideoMetadata) -> Result<(), PipelineError> {
        metadata.validate()?;

        if source.size_bytes == 0 {
            return Err(PipelineError::InvalidSource(
                "source file is empty".to_string(),
            ));
        }
        if source.size_bytes > self.config.max_source_size_bytes {
            return Err(PipelineError::SourceTooLarge {
                size: source.size_bytes,
                limit: self.config.max_source_size_bytes,
            });
        }
        let allowed = self
            .config
            .allowed_content_prefixes
            .iter()
            .any(|prefix| source.content_type.starts_with(prefix.as_str()));
        if !allowed {
            return Err(PipelineError::InvalidSource(format!(
                "unsupported content type: {}",
                source.content_type
            )));
        }
        Ok(())
    }

    async fn begin(&self) -> Result<CancellationToken, PipelineError> {
        {
            let state = self.state.lock().await;
            match *state {
                PipelineState::Idle | PipelineState::Published | PipelineState::Failed { .. } => {}
                _ => {
                    return Err(PipelineError::Internal(
                        "another job is already in flight".to_string(),
                    ))
                }
            }
        }
        let token = CancellationToken::new();
        self.active.lock().await.cancel = Some(token.clone());
        Ok(token)
    }

    async fn transition(&self, next: PipelineState) {
        *self.state.lock().await = next;
        let _ = self.events.send(PipelineEvent::StageChanged { stage: next });
        tracing::info!(stage = %next, "Pipeline stage changed");
    }

    async fn run_stages(
        &self,
        source: &SourceFile,
        metadata: VideoMetadata,
        cancel: &CancellationToken,
    ) -> Result<PublishedVideo, PipelineError> {
        let owner = self.config.owner_id.clone();

        // Upload the raw source.
        self.transition(PipelineState::Uploading).await;
        let raw_key = keys::raw_upload_key(&owner, &source.file_name, Utc::now());
        let (session, mut upload_events) = UploadSession::start(
            Arc::clone(&self.resumable),
            &source.path,
            raw_key,
            &source.content_type,
            self.upload_config.clone(),
        )
        .await
        .map_err(|e| PipelineError::Upload(e.to_string()))?;

        let session = Arc::new(session);
        self.active.lock().await.upload = Some(Arc::clone(&session));

        let object_key = loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    if let Err(err) = session.abort().await {
                        tracing::warn!(error = %err, "Upload abort during cancel failed");
                    }
                    return Err(PipelineError::Cancelled);
                }
                event = upload_events.recv() => match event {
                    Some(UploadEvent::Progress { bytes_uploaded, bytes_total }) => {
                        let _ = self.events.send(PipelineEvent::UploadProgress {
                            bytes_uploaded,
                            bytes_total,
                        });
                    }
                    Some(UploadEvent::Failed { error }) => {
                        // Parked, not dead: hold here until the caller
                        // resumes or cancels.
                        let stalled = PipelineError::UploadStalled(error);
                        tracing::warn!(error = %stalled, "Upload stalled, awaiting resume");
                        let _ = self.events.send(PipelineEvent::Failed {
                            stage: stalled.stage(),
                            message: stalled.to_string(),
                        });
                    }
                    Some(UploadEvent::Completed { object_key }) => break object_key,
                    None => {
                        return Err(PipelineError::Upload(
                            "upload event channel closed".to_string(),
                        ))
                    }
                }
            }
        };
        self.transition(PipelineState::Uploaded).await;

        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        // Create the catalog record before any transcoding starts.
        let record = NewVideoRecord::placeholder(
            owner.clone(),
            metadata,
            source.file_name.clone(),
            source.content_type.clone(),
            source.size_bytes,
            object_key,
        );
        let video_id = self
            .records
            .create_placeholder(&record)
            .await
            .map_err(|e| PipelineError::Record(e.to_string()))?;

        // The probed duration is what gets persisted; a probe failure only
        // costs poster placement and progress accuracy.
        let duration = match self.probe.duration_seconds(&source.path).await {
            Ok(duration) => duration,
            Err(err) => {
                let probe_err = PipelineError::Probe(err.to_string());
                tracing::warn!(error = %probe_err, "Duration probe failed, continuing without");
                0.0
            }
        };

        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        // Transcode on a single-use worker.
        self.transition(PipelineState::Transcoding).await;
        let mut worker = self
            .workers
            .spawn(TranscodeRequest {
                input: source.path.clone(),
                duration_hint: duration,
            })
            .map_err(|e| PipelineError::Transcode(e.to_string()))?;

        let (files, poster) = loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    worker.terminate();
                    return Err(PipelineError::Cancelled);
                }
                message = worker.recv() => match message {
                    Some(WorkerMessage::Status { message }) => {
                        let _ = self.events.send(PipelineEvent::TranscodeStatus { message });
                    }
                    Some(WorkerMessage::Rendition { message, current, total }) => {
                        let _ = self.events.send(PipelineEvent::TranscodeRendition {
                            message,
                            current,
                            total,
                        });
                    }
                    Some(WorkerMessage::Progress { progress, time }) => {
                        let _ = self.events.send(PipelineEvent::TranscodeProgress {
                            percent: progress,
                            time,
                        });
                    }
                    Some(WorkerMessage::Log { message }) => {
                        let _ = self.events.send(PipelineEvent::TranscodeLog { message });
                    }
                    Some(WorkerMessage::Complete { files, poster }) => break (files, poster),
                    Some(WorkerMessage::Error { message }) => {
                        return Err(PipelineError::Transcode(message));
                    }
                    None => {
                        return Err(PipelineError::Transcode(
                            "worker channel closed before terminal message".to_string(),
                        ))
                    }
                }
            }
        };

        // Push artifacts, then the poster, then finalize. Order matters:
        // the record must never point at missing files.
        self.transition(PipelineState::Finalizing).await;
        for file in &files {
            let key = keys::hls_key(&owner, &video_id, &file.name);
            self.put_with_retries(&key, file.data.clone(), keys::content_type_for(&file.name), cancel)
                .await?;
        }
        let poster_key = keys::poster_key(&owner, &video_id);
        self.put_with_retries(&poster_key, poster, "image/jpeg", cancel)
            .await?;

        let manifest_key = keys::hls_key(&owner, &video_id, MASTER_PLAYLIST_NAME);
        let manifest_url = self.objects.public_url(&manifest_key);
        let poster_url = self.objects.public_url(&poster_key);

        let publish = FinalizeRecord {
            hls_master_url: manifest_url.clone(),
            poster_url: poster_url.clone(),
            duration_seconds: duration,
            published_at: Utc::now(),
        };
        self.records
            .finalize(&video_id, &publish)
            .await
            .map_err(|e| PipelineError::Finalize(e.to_string()))?;

        self.transition(PipelineState::Published).await;
        let _ = self.events.send(PipelineEvent::Published {
            video_id,
            manifest_url: manifest_url.clone(),
            poster_url: poster_url.clone(),
        });
        tracing::info!(video_id = %video_id, manifest_url = %manifest_url, "Video published");

        tokio::time::sleep(self.completion_delay).await;

        Ok(PublishedVideo {
            video_id,
            manifest_url,
            poster_url,
            duration_seconds: duration,
        })
    }

    async fn put_with_retries(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
        cancel: &CancellationToken,
    ) -> Result<String, PipelineError> {
        let mut delay_idx = 0;
        loop {
            let attempt = tokio::select! {
                _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
                result = self.objects.put(key, data.clone(), content_type) => result,
            };
            match attempt {
                Ok(url) => return Ok(url),
                Err(err) if err.is_transient() && delay_idx < self.artifact_retry_delays.len() => {
                    tracing::warn!(
                        key = %key,
                        error = %err,
                        retry = delay_idx,
                        "Artifact put failed, backing off"
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
                        _ = tokio::time::sleep(self.artifact_retry_delays[delay_idx]) => {}
                    }
                    delay_idx += 1;
                }
                Err(err) => {
                    return Err(PipelineError::ArtifactUpload(format!("{}: {}", key, err)))
                }
            }
        }
    }
}
