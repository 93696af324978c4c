//! Codec engine seam and the ffmpeg implementation.
//!
//! One engine serves exactly one job. [`FfmpegEngine`] owns a private scratch
//! directory: the source is staged there under a fixed name, every rendition
//! encodes into it, and the artifact set is read back out of it. Produced
//! files are identified by diffing the directory listing around each encode,
//! never by scanning playlist text.

use bytes::Bytes;
use reelpipe_core::{EncodedRendition, ProducedFile, Rendition, MASTER_PLAYLIST_NAME, POSTER_NAME};
use std::collections::HashSet;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

/// Fixed name the source is staged under inside the scratch directory.
pub const INPUT_NAME: &str = "input.mp4";

const STDERR_TAIL_LINES: usize = 20;

#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
    #[error("Failed to launch {binary}: {source}")]
    Launch {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{binary} exited with {status}: {stderr}")]
    CodecFailed {
        binary: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("Unusable probe output: {0:?}")]
    ProbeOutput(String),

    #[error("Expected output missing: {0}")]
    MissingOutput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Side-channel notifications emitted while a rendition encodes.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Raw codec stderr line.
    Log { line: String },
    /// Encode position against the duration hint, 0-100.
    Progress { percent: u8, seconds: f64 },
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub ffmpeg_path: String,
    pub segment_duration_seconds: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            segment_duration_seconds: 4,
        }
    }
}

impl EngineConfig {
    pub fn from_config(config: &reelpipe_core::Config) -> Self {
        Self {
            ffmpeg_path: config.ffmpeg_path.clone(),
            segment_duration_seconds: config.hls_segment_duration,
        }
    }
}

/// Per-job codec engine.
///
/// Implementations are single-use: `prepare` once, `encode_rendition` per
/// ladder rung in order, `poster`, then `collect`.
#[async_trait::async_trait]
pub trait CodecEngine: Send {
    /// Stage the source file into the job's working area.
    async fn prepare(&mut self, source: &Path) -> Result<(), TranscodeError>;

    /// Encode one ladder rung, streaming logs and progress as it runs.
    async fn encode_rendition(
        &mut self,
        rendition: &Rendition,
        duration_hint: f64,
        events: &mpsc::UnboundedSender<EngineEvent>,
    ) -> Result<EncodedRendition, TranscodeError>;

    /// Extract the poster frame, placed by the duration hint.
    async fn poster(&mut self, duration_hint: f64) -> Result<Bytes, TranscodeError>;

    /// Read the full artifact set back out, appending the master playlist.
    async fn collect(
        &mut self,
        renditions: &[EncodedRendition],
        master_text: &str,
    ) -> Result<Vec<ProducedFile>, TranscodeError>;
}

/// ffmpeg-backed engine over a private scratch directory.
pub struct FfmpegEngine {
    config: EngineConfig,
    workdir: TempDir,
}

impl FfmpegEngine {
    pub fn new(config: EngineConfig) -> Result<Self, TranscodeError> {
        let workdir = TempDir::new()?;
        Ok(Self { config, workdir })
    }

    async fn snapshot(&self) -> Result<HashSet<String>, TranscodeError> {
        let mut entries = tokio::fs::read_dir(self.workdir.path()).await?;
        let mut names = HashSet::new();
        while let Some(entry) = entries.next_entry().await? {
            names.insert(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    async fn read_produced(&self, name: &str) -> Result<Bytes, TranscodeError> {
        let path = self.workdir.path().join(name);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(_) => Err(TranscodeError::MissingOutput(name.to_string())),
        }
    }

    async fn poster_at(&self, seek_seconds: u64) -> Result<Bytes, TranscodeError> {
        let args = poster_args(seek_seconds);
        let output = Command::new(&self.config.ffmpeg_path)
            .current_dir(self.workdir.path())
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| TranscodeError::Launch {
                binary: self.config.ffmpeg_path.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(TranscodeError::CodecFailed {
                binary: self.config.ffmpeg_path.clone(),
                status: output.status,
                stderr: tail_of(&String::from_utf8_lossy(&output.stderr)),
            });
        }

        // A seek past the end can exit cleanly without writing a frame.
        match tokio::fs::read(self.workdir.path().join(POSTER_NAME)).await {
            Ok(data) if !data.is_empty() => Ok(Bytes::from(data)),
            _ => Err(TranscodeError::MissingOutput(POSTER_NAME.to_string())),
        }
    }
}

#[async_trait::async_trait]
impl CodecEngine for FfmpegEngine {
    async fn prepare(&mut self, source: &Path) -> Result<(), TranscodeError> {
        let staged = self.workdir.path().join(INPUT_NAME);
        tokio::fs::copy(source, &staged).await?;
        tracing::debug!(source = %source.display(), "Source staged for transcode");
        Ok(())
    }

    async fn encode_rendition(
        &mut self,
        rendition: &Rendition,
        duration_hint: f64,
        events: &mpsc::UnboundedSender<EngineEvent>,
    ) -> Result<EncodedRendition, TranscodeError> {
        let started = std::time::Instant::now();
        let before = self.snapshot().await?;
        let args = hls_args(rendition, self.config.segment_duration_seconds);

        let mut child = Command::new(&self.config.ffmpeg_path)
            .current_dir(self.workdir.path())
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| TranscodeError::Launch {
                binary: self.config.ffmpeg_path.clone(),
                source,
            })?;

        let progress_task = child.stdout.take().map(|stdout| {
            let events = events.clone();
            tokio::spawn(forward_progress(stdout, duration_hint, events))
        });
        let log_task = child.stderr.take().map(|stderr| {
            let events = events.clone();
            tokio::spawn(forward_logs(stderr, events))
        });

        let status = child.wait().await?;
        if let Some(task) = progress_task {
            let _ = task.await;
        }
        let stderr_tail = match log_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        if !status.success() {
            return Err(TranscodeError::CodecFailed {
                binary: self.config.ffmpeg_path.clone(),
                status,
                stderr: stderr_tail,
            });
        }

        let after = self.snapshot().await?;
        let playlist_name = rendition.playlist_name();
        let segment_names = classify_outputs(&before, &after, &playlist_name)?;

        tracing::info!(
            rendition = %rendition.label,
            resolution = %rendition.resolution(),
            segments = segment_names.len(),
            duration_ms = started.elapsed().as_secs_f64() * 1000.0,
            "Rendition encoded"
        );

        Ok(EncodedRendition {
            label: rendition.label.clone(),
            playlist_name,
            segment_names,
            bandwidth_bits: rendition.bandwidth_bits(),
            width: rendition.width,
            height: rendition.height,
        })
    }

    async fn poster(&mut self, duration_hint: f64) -> Result<Bytes, TranscodeError> {
        let seek = poster_seek_seconds(duration_hint);
        match self.poster_at(seek).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if seek > 0 => {
                tracing::warn!(
                    seek_seconds = seek,
                    error = %err,
                    "Poster seek produced nothing, retrying from start"
                );
                self.poster_at(0).await
            }
            Err(err) => Err(err),
        }
    }

    async fn collect(
        &mut self,
        renditions: &[EncodedRendition],
        master_text: &str,
    ) -> Result<Vec<ProducedFile>, TranscodeError> {
        let total: usize = renditions.iter().map(|r| r.file_count()).sum();
        let mut files = Vec::with_capacity(total + 1);
        for rendition in renditions {
            let playlist = self.read_produced(&rendition.playlist_name).await?;
            files.push(ProducedFile::new(rendition.playlist_name.clone(), playlist));
            for segment in &rendition.segment_names {
                let data = self.read_produced(segment).await?;
                files.push(ProducedFile::new(segment.clone(), data));
            }
        }
        files.push(ProducedFile::new(
            MASTER_PLAYLIST_NAME,
            Bytes::from(master_text.to_string()),
        ));
        Ok(files)
    }
}

/// Encode argv for one ladder rung. Paths are relative to the scratch
/// directory; the caller sets the working directory.
fn hls_args(rendition: &Rendition, segment_duration_seconds: u64) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-i".to_string(),
        INPUT_NAME.to_string(),
        "-vf".to_string(),
        format!("scale={}:{}", rendition.width, rendition.height),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-b:v".to_string(),
        format!("{}k", rendition.video_bitrate_kbps),
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        format!("{}k", rendition.audio_bitrate_kbps),
        "-hls_time".to_string(),
        segment_duration_seconds.to_string(),
        "-hls_playlist_type".to_string(),
        "vod".to_string(),
        "-hls_segment_filename".to_string(),
        rendition.segment_pattern(),
        "-progress".to_string(),
        "pipe:1".to_string(),
        "-nostats".to_string(),
        rendition.playlist_name(),
    ]
}

fn poster_args(seek_seconds: u64) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-ss".to_string(),
        seek_seconds.to_string(),
        "-i".to_string(),
        INPUT_NAME.to_string(),
        "-vframes".to_string(),
        "1".to_string(),
        "-vf".to_string(),
        "scale=1280:720".to_string(),
        "-q:v".to_string(),
        "2".to_string(),
        POSTER_NAME.to_string(),
    ]
}

/// Poster frame position: a fifth of the way in, floored, never negative.
fn poster_seek_seconds(duration_hint: f64) -> u64 {
    (duration_hint * 0.2).floor().max(0.0) as u64
}

/// Split a directory diff into the rendition's outputs: the named playlist
/// must exist; everything else new with a `.ts` extension is a segment,
/// sorted ascending.
fn classify_outputs(
    before: &HashSet<String>,
    after: &HashSet<String>,
    playlist_name: &str,
) -> Result<Vec<String>, TranscodeError> {
    if !after.contains(playlist_name) {
        return Err(TranscodeError::MissingOutput(playlist_name.to_string()));
    }

    let mut segments: Vec<String> = after
        .iter()
        .filter(|name| !before.contains(*name))
        .filter(|name| name.as_str() != playlist_name && name.ends_with(".ts"))
        .cloned()
        .collect();
    segments.sort();
    Ok(segments)
}

fn parse_out_time_us(line: &str) -> Option<u64> {
    line.strip_prefix("out_time_us=")?.trim().parse().ok()
}

fn progress_percent(out_time_us: u64, duration_seconds: f64) -> u8 {
    if duration_seconds <= 0.0 {
        return 0;
    }
    let seconds = out_time_us as f64 / 1_000_000.0;
    (seconds / duration_seconds * 100.0).clamp(0.0, 100.0).round() as u8
}

async fn forward_progress(
    stdout: tokio::process::ChildStdout,
    duration_seconds: f64,
    events: mpsc::UnboundedSender<EngineEvent>,
) {
    let mut lines = BufReader::new(stdout).lines();
    let mut last_sent = 0u8;
    while let Ok(Some(line)) = lines.next_line().await {
        if let Some(out_time_us) = parse_out_time_us(&line) {
            let percent = progress_percent(out_time_us, duration_seconds);
            if percent > last_sent {
                last_sent = percent;
                let _ = events.send(EngineEvent::Progress {
                    percent,
                    seconds: out_time_us as f64 / 1_000_000.0,
                });
            }
        }
    }
}

/// Forward stderr lines as log events, returning the tail for error reports.
async fn forward_logs(
    stderr: tokio::process::ChildStderr,
    events: mpsc::UnboundedSender<EngineEvent>,
) -> String {
    let mut lines = BufReader::new(stderr).lines();
    let mut tail = std::collections::VecDeque::with_capacity(STDERR_TAIL_LINES);
    while let Ok(Some(line)) = lines.next_line().await {
        if tail.len() == STDERR_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line.clone());
        let _ = events.send(EngineEvent::Log { line });
    }
    tail.into_iter().collect::<Vec<_>>().join("\n")
}

fn tail_of(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}
