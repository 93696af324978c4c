//! Multi-rendition HLS transcoding.
//!
//! A [`TranscodeWorker`] runs exactly one job in an isolated task and streams
//! [`WorkerMessage`]s back over a channel until a single terminal message.
//! The codec work itself lives behind the [`CodecEngine`] seam; the ffmpeg
//! implementation owns a private scratch directory per job.

pub mod engine;
pub mod manifest;
pub mod messages;
pub mod probe;
pub mod worker;

pub use engine::{CodecEngine, EngineConfig, EngineEvent, FfmpegEngine, TranscodeError};
pub use manifest::master_manifest;
pub use messages::WorkerMessage;
pub use probe::MediaProbe;
pub use worker::{FfmpegWorkerFactory, TranscodeRequest, TranscodeWorker, WorkerFactory};
