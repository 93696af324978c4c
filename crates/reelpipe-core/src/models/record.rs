//! Video record payloads exchanged with the record store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use uuid::Uuid;

/// Unique identifier for a video record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(Uuid);

impl VideoId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for VideoId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for VideoId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl Display for VideoId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Unlisted,
    Private,
}

impl Display for Visibility {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Visibility::Public => write!(f, "public"),
            Visibility::Unlisted => write!(f, "unlisted"),
            Visibility::Private => write!(f, "private"),
        }
    }
}

/// Lifecycle status of a video record. Records are created in `Processing`
/// and flip to `Published` only when finalization succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Processing,
    Published,
    Failed,
}

impl Display for RecordStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            RecordStatus::Processing => write!(f, "processing"),
            RecordStatus::Published => write!(f, "published"),
            RecordStatus::Failed => write!(f, "failed"),
        }
    }
}

/// User-provided metadata collected before publishing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub title: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub visibility: Visibility,
    pub age_restricted: bool,
}

impl VideoMetadata {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            tags: Vec::new(),
            visibility: Visibility::Public,
            age_restricted: false,
        }
    }

    pub fn validate(&self) -> Result<(), crate::error::PipelineError> {
        if self.title.trim().is_empty() {
            return Err(crate::error::PipelineError::InvalidSource(
                "Title cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Payload for creating a placeholder record before transcoding starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVideoRecord {
    pub owner_id: String,
    pub title: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub visibility: Visibility,
    pub age_restricted: bool,
    pub original_filename: String,
    pub content_type: String,
    pub file_size: u64,
    /// Object key of the raw upload in storage.
    pub source_path: String,
    /// Zero until finalization persists the measured duration.
    pub duration_seconds: f64,
    pub status: RecordStatus,
}

impl NewVideoRecord {
    pub fn placeholder(
        owner_id: impl Into<String>,
        metadata: VideoMetadata,
        original_filename: impl Into<String>,
        content_type: impl Into<String>,
        file_size: u64,
        source_path: impl Into<String>,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            title: metadata.title,
            description: metadata.description,
            tags: metadata.tags,
            visibility: metadata.visibility,
            age_restricted: metadata.age_restricted,
            original_filename: original_filename.into(),
            content_type: content_type.into(),
            file_size,
            source_path: source_path.into(),
            duration_seconds: 0.0,
            status: RecordStatus::Processing,
        }
    }
}

/// Payload that finalizes a record after artifacts are live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizeRecord {
    pub hls_master_url: String,
    pub poster_url: String,
    pub duration_seconds: f64,
    pub published_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_id_display_roundtrip() {
        let id = VideoId::new();
        let parsed: Uuid = id.to_string().parse().unwrap();
        assert_eq!(VideoId::from(parsed), id);
    }

    #[test]
    fn test_visibility_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Visibility::Unlisted).unwrap(),
            "\"unlisted\""
        );
        assert_eq!(Visibility::Private.to_string(), "private");
    }

    #[test]
    fn test_metadata_requires_title() {
        let mut metadata = VideoMetadata::new("My clip");
        assert!(metadata.validate().is_ok());

        metadata.title = "   ".to_string();
        assert!(metadata.validate().is_err());
    }

    #[test]
    fn test_placeholder_starts_processing_with_zero_duration() {
        let record = NewVideoRecord::placeholder(
            "user-1",
            VideoMetadata::new("My clip"),
            "clip.mp4",
            "video/mp4",
            1024,
            "user-1/1700000000000-clip.mp4",
        );
        assert_eq!(record.status, RecordStatus::Processing);
        assert_eq!(record.duration_seconds, 0.0);
        assert_eq!(record.title, "My clip");
        assert_eq!(record.source_path, "user-1/1700000000000-clip.mp4");
    }
}
