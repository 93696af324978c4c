//! Progress surface of the ingest pipeline.

use reelpipe_core::{Stage, VideoId};
use serde::{Deserialize, Serialize};

use crate::orchestrator::PipelineState;

/// One pipeline notification. Consumers render these; nothing in the
/// pipeline depends on anyone listening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    StageChanged {
        stage: PipelineState,
    },
    UploadProgress {
        bytes_uploaded: u64,
        bytes_total: u64,
    },
    TranscodeStatus {
        message: String,
    },
    TranscodeRendition {
        message: String,
        current: u32,
        total: u32,
    },
    TranscodeProgress {
        percent: u8,
        time: f64,
    },
    TranscodeLog {
        message: String,
    },
    Published {
        video_id: VideoId,
        manifest_url: String,
        poster_url: String,
    },
    Failed {
        stage: Stage,
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_progress_wire_shape() {
        let event = PipelineEvent::UploadProgress {
            bytes_uploaded: 6_291_456,
            bytes_total: 12_582_912,
        };
        assert_eq!(
            serde_json::to_string(&event).unwrap(),
            r#"{"event":"upload_progress","bytes_uploaded":6291456,"bytes_total":12582912}"#
        );
    }

    #[test]
    fn test_stage_changed_wire_shape() {
        let event = PipelineEvent::StageChanged {
            stage: PipelineState::Uploading,
        };
        assert_eq!(
            serde_json::to_string(&event).unwrap(),
            r#"{"event":"stage_changed","stage":"uploading"}"#
        );
    }

    #[test]
    fn test_failed_wire_shape() {
        let event = PipelineEvent::Failed {
            stage: Stage::Finalize,
            message: "poster upload failed".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&event).unwrap(),
            r#"{"event":"failed","stage":"finalize","message":"poster upload failed"}"#
        );
    }

    #[test]
    fn test_published_round_trip() {
        let event = PipelineEvent::Published {
            video_id: VideoId::new(),
            manifest_url: "https://cdn.example.com/master.m3u8".to_string(),
            poster_url: "https://cdn.example.com/poster.jpg".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let parsed: PipelineEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }
}
