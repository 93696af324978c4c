//! Shared key generation for storage backends.
//!
//! Key format: raw uploads land at `{owner}/{unix_millis}-{filename}`, HLS
//! artifacts at `{owner}/{video_id}/hls/{name}`, and the poster at
//! `{owner}/{video_id}/poster.jpg`. All backends must use this format for
//! consistency.

use chrono::{DateTime, Utc};
use reelpipe_core::models::{VideoId, POSTER_NAME};

use crate::traits::{StorageError, StorageResult};

/// Generate the object key for a raw source upload.
///
/// The timestamp prefix keeps repeated uploads of the same filename distinct.
pub fn raw_upload_key(owner: &str, filename: &str, uploaded_at: DateTime<Utc>) -> String {
    format!("{}/{}-{}", owner, uploaded_at.timestamp_millis(), filename)
}

/// Generate the object key for a named HLS artifact of a video.
pub fn hls_key(owner: &str, video_id: &VideoId, name: &str) -> String {
    format!("{}/{}/hls/{}", owner, video_id, name)
}

/// Generate the object key for a video's poster frame.
pub fn poster_key(owner: &str, video_id: &VideoId) -> String {
    format!("{}/{}/{}", owner, video_id, POSTER_NAME)
}

/// Content type for an artifact, by file extension.
pub fn content_type_for(name: &str) -> &'static str {
    match name.rsplit('.').next() {
        Some("m3u8") => "application/vnd.apple.mpegurl",
        Some("ts") => "video/mp2t",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("mp4") => "video/mp4",
        _ => "application/octet-stream",
    }
}

/// Validate a storage key before handing it to a backend.
///
/// Keys must not contain path traversal sequences or start at the root;
/// backends that map keys onto paths or URLs rely on this.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("empty key".to_string()));
    }
    if key.contains("..") || key.starts_with('/') {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    #[test]
    fn test_raw_upload_key_format() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let key = raw_upload_key("user-1", "clip.mp4", at);
        assert_eq!(key, "user-1/1700000000000-clip.mp4");
    }

    #[test]
    fn test_artifact_key_layout() {
        let video_id = VideoId::from(Uuid::nil());
        assert_eq!(
            hls_key("user-1", &video_id, "output_240p_000.ts"),
            "user-1/00000000-0000-0000-0000-000000000000/hls/output_240p_000.ts"
        );
        assert_eq!(
            hls_key("user-1", &video_id, "master.m3u8"),
            "user-1/00000000-0000-0000-0000-000000000000/hls/master.m3u8"
        );
        assert_eq!(
            poster_key("user-1", &video_id),
            "user-1/00000000-0000-0000-0000-000000000000/poster.jpg"
        );
    }

    #[test]
    fn test_content_types() {
        assert_eq!(content_type_for("master.m3u8"), "application/vnd.apple.mpegurl");
        assert_eq!(content_type_for("output_240p_000.ts"), "video/mp2t");
        assert_eq!(content_type_for("poster.jpg"), "image/jpeg");
        assert_eq!(content_type_for("clip.mp4"), "video/mp4");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }

    #[test]
    fn test_key_validation() {
        assert!(validate_key("user-1/clip.mp4").is_ok());
        assert!(matches!(
            validate_key("../etc/passwd"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            validate_key("/absolute"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(validate_key(""), Err(StorageError::InvalidKey(_))));
    }
}
