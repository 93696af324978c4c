//! Transcode artifacts: produced files and the per-rendition output summary.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Name of the synthesized master manifest.
pub const MASTER_PLAYLIST_NAME: &str = "master.m3u8";

/// Name of the extracted poster frame.
pub const POSTER_NAME: &str = "poster.jpg";

/// A named file produced by the transcode engine, held in memory until the
/// finalizing stage uploads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducedFile {
    pub name: String,
    pub data: Bytes,
}

impl ProducedFile {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

/// Structured description of one encoded rendition: the playlist, its
/// segments, and the manifest attributes. The engine reports these
/// explicitly; consumers never re-derive them from playlist text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedRendition {
    pub label: String,
    pub playlist_name: String,
    pub segment_names: Vec<String>,
    pub bandwidth_bits: u64,
    pub width: u32,
    pub height: u32,
}

impl EncodedRendition {
    /// Total number of files this rendition contributed.
    pub fn file_count(&self) -> usize {
        self.segment_names.len() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_count_includes_playlist() {
        let encoded = EncodedRendition {
            label: "240p".to_string(),
            playlist_name: "output_240p.m3u8".to_string(),
            segment_names: vec![
                "output_240p_000.ts".to_string(),
                "output_240p_001.ts".to_string(),
            ],
            bandwidth_bits: 400_000,
            width: 426,
            height: 240,
        };
        assert_eq!(encoded.file_count(), 3);
    }

    #[test]
    fn test_produced_file_from_static_bytes() {
        let file = ProducedFile::new("output_240p.m3u8", &b"#EXTM3U\n"[..]);
        assert_eq!(file.name, "output_240p.m3u8");
        assert_eq!(file.data.as_ref(), b"#EXTM3U\n");
    }
}
