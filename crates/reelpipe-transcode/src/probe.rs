//! Source media inspection via ffprobe.

use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::engine::TranscodeError;

/// Thin ffprobe wrapper. The probed duration is authoritative for the
/// pipeline; caller-side estimates only place the poster frame.
#[derive(Debug, Clone)]
pub struct MediaProbe {
    ffprobe_path: String,
}

impl MediaProbe {
    pub fn new(ffprobe_path: impl Into<String>) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
        }
    }

    pub fn from_config(config: &reelpipe_core::Config) -> Self {
        Self::new(config.ffprobe_path.clone())
    }

    /// Container duration in seconds.
    pub async fn duration_seconds(&self, input: &Path) -> Result<f64, TranscodeError> {
        let output = Command::new(&self.ffprobe_path)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(input)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| TranscodeError::Launch {
                binary: self.ffprobe_path.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(TranscodeError::CodecFailed {
                binary: self.ffprobe_path.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let duration = parse_duration_output(&stdout)
            .ok_or_else(|| TranscodeError::ProbeOutput(stdout.trim().to_string()))?;

        tracing::debug!(input = %input.display(), duration_seconds = duration, "Probed source");
        Ok(duration)
    }
}

fn parse_duration_output(output: &str) -> Option<f64> {
    let value: f64 = output.trim().parse().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_duration() {
        assert_eq!(parse_duration_output("12.48\n"), Some(12.48));
        assert_eq!(parse_duration_output(" 0 "), Some(0.0));
        assert_eq!(parse_duration_output("3600"), Some(3600.0));
    }

    #[test]
    fn test_parse_rejects_unusable_output() {
        assert_eq!(parse_duration_output("N/A"), None);
        assert_eq!(parse_duration_output(""), None);
        assert_eq!(parse_duration_output("inf"), None);
        assert_eq!(parse_duration_output("-4.0"), None);
    }
}
