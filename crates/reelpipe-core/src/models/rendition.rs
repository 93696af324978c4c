//! Rendition ladder: target resolutions and bitrates for adaptive playback.

use serde::{Deserialize, Serialize};

/// One rung of the transcode ladder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rendition {
    /// Quality label, e.g. "720p". Drives deterministic artifact naming.
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub video_bitrate_kbps: u32,
    pub audio_bitrate_kbps: u32,
}

impl Rendition {
    pub fn new(
        label: &str,
        width: u32,
        height: u32,
        video_bitrate_kbps: u32,
        audio_bitrate_kbps: u32,
    ) -> Self {
        Self {
            label: label.to_string(),
            width,
            height,
            video_bitrate_kbps,
            audio_bitrate_kbps,
        }
    }

    /// Resolution string for encoder arguments and manifest entries.
    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }

    /// Peak bandwidth in bits per second, as advertised in the master manifest.
    pub fn bandwidth_bits(&self) -> u64 {
        self.video_bitrate_kbps as u64 * 1000
    }

    /// Media playlist name for this rendition.
    pub fn playlist_name(&self) -> String {
        format!("output_{}.m3u8", self.label)
    }

    /// Segment filename pattern handed to the encoder (three-digit index).
    pub fn segment_pattern(&self) -> String {
        format!("output_{}_%03d.ts", self.label)
    }

    /// Name of the segment at `index`, matching `segment_pattern`.
    pub fn segment_name(&self, index: u32) -> String {
        format!("output_{}_{:03}.ts", self.label, index)
    }
}

/// The default three-rung ladder, ascending quality.
pub fn default_ladder() -> Vec<Rendition> {
    vec![
        Rendition::new("240p", 426, 240, 400, 64),
        Rendition::new("480p", 854, 480, 1000, 96),
        Rendition::new("720p", 1280, 720, 2500, 128),
    ]
}

/// Whether the ladder is ordered by ascending quality (strictly increasing
/// height, then bitrate as tie-breaker).
pub fn ladder_is_ascending(ladder: &[Rendition]) -> bool {
    ladder.windows(2).all(|pair| {
        (pair[0].height, pair[0].video_bitrate_kbps) < (pair[1].height, pair[1].video_bitrate_kbps)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ladder_rungs() {
        let ladder = default_ladder();
        assert_eq!(ladder.len(), 3);

        assert_eq!(ladder[0].label, "240p");
        assert_eq!((ladder[0].width, ladder[0].height), (426, 240));
        assert_eq!(ladder[0].video_bitrate_kbps, 400);
        assert_eq!(ladder[0].audio_bitrate_kbps, 64);

        assert_eq!(ladder[1].label, "480p");
        assert_eq!((ladder[1].width, ladder[1].height), (854, 480));
        assert_eq!(ladder[1].video_bitrate_kbps, 1000);
        assert_eq!(ladder[1].audio_bitrate_kbps, 96);

        assert_eq!(ladder[2].label, "720p");
        assert_eq!((ladder[2].width, ladder[2].height), (1280, 720));
        assert_eq!(ladder[2].video_bitrate_kbps, 2500);
        assert_eq!(ladder[2].audio_bitrate_kbps, 128);
    }

    #[test]
    fn test_default_ladder_is_ascending() {
        assert!(ladder_is_ascending(&default_ladder()));
    }

    #[test]
    fn test_descending_ladder_detected() {
        let mut ladder = default_ladder();
        ladder.reverse();
        assert!(!ladder_is_ascending(&ladder));
    }

    #[test]
    fn test_artifact_naming() {
        let rendition = Rendition::new("480p", 854, 480, 1000, 96);
        assert_eq!(rendition.playlist_name(), "output_480p.m3u8");
        assert_eq!(rendition.segment_pattern(), "output_480p_%03d.ts");
        assert_eq!(rendition.segment_name(0), "output_480p_000.ts");
        assert_eq!(rendition.segment_name(12), "output_480p_012.ts");
        assert_eq!(rendition.segment_name(123), "output_480p_123.ts");
    }

    #[test]
    fn test_bandwidth_scales_kbps_by_thousand() {
        let rendition = Rendition::new("720p", 1280, 720, 2500, 128);
        assert_eq!(rendition.bandwidth_bits(), 2_500_000);
        assert_eq!(rendition.resolution(), "1280x720");
    }
}
