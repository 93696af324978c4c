//! Reelpipe CLI: upload a video and carry it through to published.
//!
//! Set STORAGE_ENDPOINT, RECORDS_ENDPOINT and OWNER_ID; see
//! `reelpipe_core::Config` for the optional knobs (bucket, API keys, chunk
//! size, ffmpeg paths). Requires ffmpeg and ffprobe on the PATH unless
//! FFMPEG_PATH/FFPROBE_PATH point elsewhere.

use anyhow::Context;
use clap::Parser;
use reelpipe_cli::{format_event, init_tracing};
use reelpipe_core::{Config, VideoMetadata, Visibility};
use reelpipe_ingest::{HttpRecordStore, IngestPipeline, PipelineEvent, SourceFile};
use reelpipe_storage::{HttpObjectStore, HttpResumableStore};
use reelpipe_transcode::{EngineConfig, FfmpegWorkerFactory};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "reelpipe")]
#[command(about = "Upload a video and publish it as multi-rendition HLS")]
struct Args {
    /// Path to the video file to upload
    file: std::path::PathBuf,

    /// Title shown in the catalog
    #[arg(long)]
    title: String,

    /// Longer description
    #[arg(long)]
    description: Option<String>,

    /// Tag to attach; repeat for multiple tags
    #[arg(long = "tag")]
    tags: Vec<String>,

    /// Visibility: public, unlisted or private
    #[arg(long, default_value = "public")]
    visibility: String,

    /// Mark the video as age restricted
    #[arg(long)]
    age_restricted: bool,
}

fn parse_visibility(value: &str) -> anyhow::Result<Visibility> {
    match value {
        "public" => Ok(Visibility::Public),
        "unlisted" => Ok(Visibility::Unlisted),
        "private" => Ok(Visibility::Private),
        other => anyhow::bail!(
            "unknown visibility '{}', expected public, unlisted or private",
            other
        ),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let config = Config::from_env().context(
        "Failed to load configuration. Set STORAGE_ENDPOINT, RECORDS_ENDPOINT and OWNER_ID",
    )?;
    tracing::debug!(
        environment = %config.environment,
        production = config.is_production(),
        storage_endpoint = %config.storage_endpoint,
        "Configuration loaded"
    );

    let metadata = VideoMetadata {
        title: args.title,
        description: args.description,
        tags: args.tags,
        visibility: parse_visibility(&args.visibility)?,
        age_restricted: args.age_restricted,
    };

    let resumable = Arc::new(HttpResumableStore::from_config(&config)?);
    let objects = Arc::new(HttpObjectStore::from_config(&config)?);
    let records = Arc::new(HttpRecordStore::new(
        config.records_endpoint.clone(),
        config.records_api_key.clone(),
    )?);
    let workers = Arc::new(FfmpegWorkerFactory::new(EngineConfig::from_config(&config)));

    let (pipeline, mut events) = IngestPipeline::new(config, resumable, objects, records, workers);

    let renderer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match format_event(&event) {
                Some(line) => println!("{}", line),
                None => {
                    if let PipelineEvent::TranscodeLog { message } = &event {
                        tracing::debug!(line = %message, "ffmpeg");
                    }
                }
            }
        }
    });

    let source = SourceFile::from_path(&args.file).await?;

    let outcome = tokio::select! {
        result = pipeline.run(source, metadata) => result,
        _ = tokio::signal::ctrl_c() => {
            pipeline.cancel().await;
            anyhow::bail!("interrupted, upload abandoned");
        }
    };
    let published = outcome?;

    // Dropping the pipeline closes the event channel and ends the renderer.
    drop(pipeline);
    let _ = renderer.await;

    println!("video id: {}", published.video_id);
    println!("manifest: {}", published.manifest_url);
    println!("poster:   {}", published.poster_url);
    println!("duration: {:.1}s", published.duration_seconds);
    Ok(())
}
