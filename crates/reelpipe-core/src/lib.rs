//! Reelpipe Core Library
//!
//! This crate provides the domain models, error types, and configuration
//! shared across all reelpipe components: the rendition ladder, produced
//! artifacts, video record payloads, and the pipeline error taxonomy.

pub mod config;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::Config;
pub use error::{LogLevel, PipelineError, Stage};
pub use models::{
    default_ladder, ladder_is_ascending, EncodedRendition, FinalizeRecord, NewVideoRecord,
    ProducedFile, RecordStatus, Rendition, VideoId, VideoMetadata, Visibility,
    MASTER_PLAYLIST_NAME, POSTER_NAME,
};
