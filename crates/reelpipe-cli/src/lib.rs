use reelpipe_ingest::PipelineEvent;

/// Human-readable byte count with binary units, one decimal place.
pub fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;
    const GIB: u64 = MIB * 1024;
    if bytes >= GIB {
        format!("{:.1} GiB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Whole-number percentage of `done` against `total`, clamped to 100.
pub fn percent(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    (done.saturating_mul(100) / total).min(100) as u8
}

/// One printable line per pipeline event, or `None` for events that belong
/// in the debug log rather than on the terminal.
pub fn format_event(event: &PipelineEvent) -> Option<String> {
    match event {
        PipelineEvent::StageChanged { stage } => Some(format!("stage: {}", stage)),
        PipelineEvent::UploadProgress {
            bytes_uploaded,
            bytes_total,
        } => Some(format!(
            "upload {:>3}% ({} / {})",
            percent(*bytes_uploaded, *bytes_total),
            format_bytes(*bytes_uploaded),
            format_bytes(*bytes_total),
        )),
        PipelineEvent::TranscodeStatus { message } => Some(message.clone()),
        PipelineEvent::TranscodeRendition {
            message,
            current,
            total,
        } => Some(format!("[{}/{}] {}", current, total, message)),
        PipelineEvent::TranscodeProgress { percent, time } => {
            Some(format!("transcode {:>3}% ({:.1}s)", percent, time))
        }
        PipelineEvent::TranscodeLog { .. } => None,
        PipelineEvent::Published { video_id, .. } => Some(format!("published {}", video_id)),
        PipelineEvent::Failed { stage, message } => {
            Some(format!("failed at {}: {}", stage, message))
        }
    }
}

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
