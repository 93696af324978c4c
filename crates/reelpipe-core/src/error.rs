//! Error types module
//!
//! This module provides the core error types used throughout the reelpipe
//! pipeline. All errors are unified under the `PipelineError` enum, and every
//! variant maps to the pipeline stage it belongs to so that failures can be
//! reported (and a stuck pipeline inspected) by stage.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::io;

/// Pipeline stage a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Validation,
    Upload,
    Record,
    Probe,
    Transcode,
    Finalize,
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Stage::Validation => write!(f, "validation"),
            Stage::Upload => write!(f, "upload"),
            Stage::Record => write!(f, "record"),
            Stage::Probe => write!(f, "probe"),
            Stage::Transcode => write!(f, "transcode"),
            Stage::Finalize => write!(f, "finalize"),
        }
    }
}

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like transient network failures
    Warn,
    /// Error level - for unexpected failures
    Error,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Invalid source file: {0}")]
    InvalidSource(String),

    #[error("File too large: {size} bytes exceeds limit of {limit} bytes")]
    SourceTooLarge { size: u64, limit: u64 },

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Upload stalled after retries: {0}")]
    UploadStalled(String),

    #[error("Record store error: {0}")]
    Record(String),

    #[error("Duration probe failed: {0}")]
    Probe(String),

    #[error("Transcode failed: {0}")]
    Transcode(String),

    #[error("Artifact upload failed: {0}")]
    ArtifactUpload(String),

    #[error("Record finalization failed: {0}")]
    Finalize(String),

    #[error("Pipeline cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

// Error conversion implementations
impl From<anyhow::Error> for PipelineError {
    fn from(err: anyhow::Error) -> Self {
        PipelineError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for PipelineError {
    fn from(err: io::Error) -> Self {
        PipelineError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Internal(format!("JSON error: {}", err))
    }
}

/// Static metadata for each variant: (stage, recoverable, log_level).
/// Recoverable means the same pipeline may be resumed or retried without
/// discarding work already done (e.g. a stalled upload keeps its session).
fn pipeline_error_static_metadata(err: &PipelineError) -> (Stage, bool, LogLevel) {
    match err {
        PipelineError::InvalidSource(_) => (Stage::Validation, false, LogLevel::Debug),
        PipelineError::SourceTooLarge { .. } => (Stage::Validation, false, LogLevel::Debug),
        PipelineError::Upload(_) => (Stage::Upload, true, LogLevel::Warn),
        PipelineError::UploadStalled(_) => (Stage::Upload, true, LogLevel::Warn),
        PipelineError::Record(_) => (Stage::Record, true, LogLevel::Error),
        PipelineError::Probe(_) => (Stage::Probe, false, LogLevel::Warn),
        PipelineError::Transcode(_) => (Stage::Transcode, false, LogLevel::Error),
        PipelineError::ArtifactUpload(_) => (Stage::Finalize, true, LogLevel::Error),
        PipelineError::Finalize(_) => (Stage::Finalize, true, LogLevel::Error),
        PipelineError::Cancelled => (Stage::Validation, false, LogLevel::Debug),
        PipelineError::Internal(_) => (Stage::Validation, false, LogLevel::Error),
        PipelineError::InternalWithSource { .. } => (Stage::Validation, false, LogLevel::Error),
    }
}

impl PipelineError {
    /// Pipeline stage this error is attributed to.
    pub fn stage(&self) -> Stage {
        pipeline_error_static_metadata(self).0
    }

    /// Whether the pipeline can be resumed or retried after this error.
    pub fn is_recoverable(&self) -> bool {
        pipeline_error_static_metadata(self).1
    }

    /// Log level for this error.
    pub fn log_level(&self) -> LogLevel {
        pipeline_error_static_metadata(self).2
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}
