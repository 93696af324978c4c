//! Messages streamed from a transcode worker to its controller.

use bytes::Bytes;
use reelpipe_core::ProducedFile;
use serde::{Deserialize, Serialize};

/// One message on the worker channel.
///
/// A job emits any number of non-terminal messages followed by exactly one
/// terminal message (`Complete` or `Error`). Nothing follows a terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorkerMessage {
    /// Coarse phase announcement ("Loading codec engine", "Generating poster").
    Status { message: String },
    /// A rendition is starting: `current` of `total`, both 1-based.
    Rendition {
        message: String,
        current: u32,
        total: u32,
    },
    /// Encode progress for the rendition in flight, 0-100.
    Progress { progress: u8, time: f64 },
    /// Raw codec output line.
    Log { message: String },
    /// The job produced its full artifact set.
    Complete {
        files: Vec<ProducedFile>,
        poster: Bytes,
    },
    /// The job failed; no partial output exists.
    Error { message: String },
}

impl WorkerMessage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_shape() {
        let message = WorkerMessage::Status {
            message: "Loading codec engine".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&message).unwrap(),
            r#"{"type":"status","message":"Loading codec engine"}"#
        );
    }

    #[test]
    fn test_rendition_wire_shape() {
        let message = WorkerMessage::Rendition {
            message: "Transcoding 240p".to_string(),
            current: 1,
            total: 3,
        };
        assert_eq!(
            serde_json::to_string(&message).unwrap(),
            r#"{"type":"rendition","message":"Transcoding 240p","current":1,"total":3}"#
        );
    }

    #[test]
    fn test_progress_wire_shape() {
        let message = WorkerMessage::Progress {
            progress: 42,
            time: 12.5,
        };
        assert_eq!(
            serde_json::to_string(&message).unwrap(),
            r#"{"type":"progress","progress":42,"time":12.5}"#
        );
    }

    #[test]
    fn test_complete_round_trip() {
        let message = WorkerMessage::Complete {
            files: vec![ProducedFile::new("output_240p.m3u8", Bytes::from_static(b"#EXTM3U"))],
            poster: Bytes::from_static(b"\xff\xd8"),
        };
        let json = serde_json::to_string(&message).unwrap();
        let parsed: WorkerMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, message);
    }

    #[test]
    fn test_terminal_classification() {
        assert!(WorkerMessage::Complete {
            files: Vec::new(),
            poster: Bytes::new(),
        }
        .is_terminal());
        assert!(WorkerMessage::Error {
            message: "boom".to_string()
        }
        .is_terminal());
        assert!(!WorkerMessage::Status {
            message: "working".to_string()
        }
        .is_terminal());
        assert!(!WorkerMessage::Progress {
            progress: 10,
            time: 1.0
        }
        .is_terminal());
    }
}
