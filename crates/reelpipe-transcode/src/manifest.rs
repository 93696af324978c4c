//! Master playlist synthesis.

use reelpipe_core::EncodedRendition;

/// Render the HLS master playlist for a set of encoded renditions.
///
/// Pure text assembly: renditions appear in input order, one
/// `#EXT-X-STREAM-INF` entry per rendition with only the BANDWIDTH and
/// RESOLUTION attributes. Output is byte-deterministic.
pub fn master_manifest(renditions: &[EncodedRendition]) -> String {
    let mut playlist = String::from("#EXTM3U\n#EXT-X-VERSION:3\n\n");

    for rendition in renditions {
        playlist.push_str(&format!(
            "#EXT-X-STREAM-INF:BANDWIDTH={},RESOLUTION={}x{}\n{}\n",
            rendition.bandwidth_bits, rendition.width, rendition.height, rendition.playlist_name
        ));
    }

    playlist
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelpipe_core::default_ladder;

    fn encoded(label: &str, bandwidth_bits: u64, width: u32, height: u32) -> EncodedRendition {
        EncodedRendition {
            label: label.to_string(),
            playlist_name: format!("output_{}.m3u8", label),
            segment_names: Vec::new(),
            bandwidth_bits,
            width,
            height,
        }
    }

    #[test]
    fn test_master_manifest_exact_text() {
        let renditions: Vec<EncodedRendition> = default_ladder()
            .iter()
            .map(|r| encoded(&r.label, r.bandwidth_bits(), r.width, r.height))
            .collect();

        let expected = "#EXTM3U\n\
                        #EXT-X-VERSION:3\n\
                        \n\
                        #EXT-X-STREAM-INF:BANDWIDTH=400000,RESOLUTION=426x240\n\
                        output_240p.m3u8\n\
                        #EXT-X-STREAM-INF:BANDWIDTH=1000000,RESOLUTION=854x480\n\
                        output_480p.m3u8\n\
                        #EXT-X-STREAM-INF:BANDWIDTH=2500000,RESOLUTION=1280x720\n\
                        output_720p.m3u8\n";

        assert_eq!(master_manifest(&renditions), expected);
    }

    #[test]
    fn test_master_manifest_single_rendition() {
        let renditions = vec![encoded("480p", 1_000_000, 854, 480)];
        assert_eq!(
            master_manifest(&renditions),
            "#EXTM3U\n#EXT-X-VERSION:3\n\n#EXT-X-STREAM-INF:BANDWIDTH=1000000,RESOLUTION=854x480\noutput_480p.m3u8\n"
        );
    }

    #[test]
    fn test_master_manifest_empty() {
        assert_eq!(master_manifest(&[]), "#EXTM3U\n#EXT-X-VERSION:3\n\n");
    }
}
