//! Single-use transcode worker.
//!
//! `spawn` starts one job in a dedicated task; the message channel is the
//! only path between job and controller. The job emits status, rendition,
//! progress and log messages while it runs, then exactly one terminal
//! (`Complete` or `Error`) and nothing after it. A worker never runs a
//! second job: the handle parks itself once the terminal has been observed.

use bytes::Bytes;
use reelpipe_core::{ladder_is_ascending, ProducedFile, Rendition};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::engine::{CodecEngine, EngineConfig, EngineEvent, FfmpegEngine, TranscodeError};
use crate::manifest::master_manifest;
use crate::messages::WorkerMessage;

/// One transcode job: a staged source and the poster-placement hint.
#[derive(Debug, Clone)]
pub struct TranscodeRequest {
    pub input: PathBuf,
    /// Caller-side duration estimate in seconds. Only shapes poster placement
    /// and progress percentages; it is never persisted.
    pub duration_hint: f64,
}

/// Controller handle over a running job.
pub struct TranscodeWorker {
    messages: mpsc::UnboundedReceiver<WorkerMessage>,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
    terminal_seen: bool,
}

impl TranscodeWorker {
    /// Start a job on a fresh ffmpeg engine.
    pub fn spawn(
        request: TranscodeRequest,
        ladder: Vec<Rendition>,
        config: EngineConfig,
    ) -> Result<Self, TranscodeError> {
        let engine = FfmpegEngine::new(config)?;
        Ok(Self::spawn_with_engine(request, ladder, engine))
    }

    /// Start a job on any engine. Test seam.
    pub fn spawn_with_engine<E: CodecEngine + 'static>(
        request: TranscodeRequest,
        ladder: Vec<Rendition>,
        engine: E,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = run_job(engine, request, ladder, tx) => {}
            }
        });

        Self {
            messages: rx,
            cancel,
            handle: Some(handle),
            terminal_seen: false,
        }
    }

    /// Next message from the job, `None` once it has nothing further to say.
    ///
    /// After a terminal message has been delivered, anything else that shows
    /// up on the channel is discarded.
    pub async fn recv(&mut self) -> Option<WorkerMessage> {
        if self.terminal_seen {
            while self.messages.try_recv().is_ok() {}
            return None;
        }
        let message = self.messages.recv().await?;
        if message.is_terminal() {
            self.terminal_seen = true;
        }
        Some(message)
    }

    /// Stop the job and kill any live codec process. Safe to call repeatedly,
    /// before, during, or after completion.
    pub fn terminate(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for TranscodeWorker {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// Creates a worker per job; the pipeline owns one of these.
pub trait WorkerFactory: Send + Sync {
    fn spawn(&self, request: TranscodeRequest) -> Result<TranscodeWorker, TranscodeError>;
}

pub struct FfmpegWorkerFactory {
    config: EngineConfig,
    ladder: Vec<Rendition>,
}

impl FfmpegWorkerFactory {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            ladder: reelpipe_core::default_ladder(),
        }
    }

    pub fn with_ladder(mut self, ladder: Vec<Rendition>) -> Self {
        if !ladder_is_ascending(&ladder) {
            tracing::warn!("Rendition ladder is not in ascending quality order");
        }
        self.ladder = ladder;
        self
    }
}

impl WorkerFactory for FfmpegWorkerFactory {
    fn spawn(&self, request: TranscodeRequest) -> Result<TranscodeWorker, TranscodeError> {
        let engine = FfmpegEngine::new(self.config.clone())?;
        Ok(TranscodeWorker::spawn_with_engine(
            request,
            self.ladder.clone(),
            engine,
        ))
    }
}

async fn run_job<E: CodecEngine>(
    mut engine: E,
    request: TranscodeRequest,
    ladder: Vec<Rendition>,
    messages: mpsc::UnboundedSender<WorkerMessage>,
) {
    let (engine_tx, engine_rx) = mpsc::unbounded_channel();
    let forwarder = tokio::spawn(forward_engine_events(engine_rx, messages.clone()));

    let result = execute(&mut engine, &request, &ladder, &messages, &engine_tx).await;

    // Flush every buffered log/progress event before the terminal message so
    // nothing ever follows it.
    drop(engine_tx);
    let _ = forwarder.await;

    let terminal = match result {
        Ok((files, poster)) => {
            tracing::info!(files = files.len(), "Transcode job complete");
            WorkerMessage::Complete { files, poster }
        }
        Err(err) => {
            tracing::error!(error = %err, "Transcode job failed");
            WorkerMessage::Error {
                message: err.to_string(),
            }
        }
    };
    let _ = messages.send(terminal);
}

async fn execute<E: CodecEngine>(
    engine: &mut E,
    request: &TranscodeRequest,
    ladder: &[Rendition],
    messages: &mpsc::UnboundedSender<WorkerMessage>,
    engine_events: &mpsc::UnboundedSender<EngineEvent>,
) -> Result<(Vec<ProducedFile>, Bytes), TranscodeError> {
    let _ = messages.send(WorkerMessage::Status {
        message: "Preparing source".to_string(),
    });
    engine.prepare(&request.input).await?;

    let total = ladder.len() as u32;
    let mut encoded = Vec::with_capacity(ladder.len());
    for (index, rendition) in ladder.iter().enumerate() {
        let _ = messages.send(WorkerMessage::Rendition {
            message: format!("Transcoding {}", rendition.label),
            current: index as u32 + 1,
            total,
        });
        let record = engine
            .encode_rendition(rendition, request.duration_hint, engine_events)
            .await?;
        encoded.push(record);
    }

    let _ = messages.send(WorkerMessage::Status {
        message: "Generating poster".to_string(),
    });
    let poster = engine.poster(request.duration_hint).await?;

    let _ = messages.send(WorkerMessage::Status {
        message: "Collecting artifacts".to_string(),
    });
    let master = master_manifest(&encoded);
    let files = engine.collect(&encoded, &master).await?;

    Ok((files, poster))
}

async fn forward_engine_events(
    mut events: mpsc::UnboundedReceiver<EngineEvent>,
    messages: mpsc::UnboundedSender<WorkerMessage>,
) {
    while let Some(event) = events.recv().await {
        let message = match event {
            EngineEvent::Log { line } => WorkerMessage::Log { message: line },
            EngineEvent::Progress { percent, seconds } => WorkerMessage::Progress {
                progress: percent,
                time: seconds,
            },
        };
        if messages.send(message).is_err() {
            return;
        }
    }
}
