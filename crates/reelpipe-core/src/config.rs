//! Configuration module
//!
//! This module provides the environment-driven configuration for the
//! pipeline: storage and record service endpoints, upload limits, and
//! transcoder settings.

use std::env;

/// Application configuration, read from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    pub environment: String,
    /// Identifier of the uploading user; the first path segment of every
    /// object key written by the pipeline.
    pub owner_id: String,
    // Storage service configuration
    pub storage_endpoint: String,
    pub storage_bucket: String,
    /// Override for the public URL base. When unset, public URLs are derived
    /// from `storage_endpoint` and `storage_bucket`.
    pub storage_public_base: Option<String>,
    pub storage_api_key: Option<String>,
    // Record service configuration
    pub records_endpoint: String,
    pub records_api_key: Option<String>,
    // Upload behavior
    pub upload_chunk_size_bytes: usize,
    pub max_source_size_bytes: u64,
    pub allowed_content_prefixes: Vec<String>,
    // Transcoder configuration
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub hls_segment_duration: u64,
}

impl Config {
    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase().eq("production") || self.environment.to_lowercase().eq("prod")
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        const UPLOAD_CHUNK_SIZE_MB: usize = 6;
        const MAX_SOURCE_SIZE_GB: u64 = 5;
        const HLS_SEGMENT_DURATION: u64 = 4;

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let storage_endpoint = env::var("STORAGE_ENDPOINT")
            .map_err(|_| anyhow::anyhow!("STORAGE_ENDPOINT must be set"))?;

        let records_endpoint = env::var("RECORDS_ENDPOINT")
            .map_err(|_| anyhow::anyhow!("RECORDS_ENDPOINT must be set"))?;

        let owner_id =
            env::var("OWNER_ID").map_err(|_| anyhow::anyhow!("OWNER_ID must be set"))?;

        let allowed_content_prefixes = env::var("ALLOWED_CONTENT_PREFIXES")
            .unwrap_or_else(|_| "video/".to_string())
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        let config = Config {
            environment,
            owner_id,
            storage_endpoint,
            storage_bucket: env::var("STORAGE_BUCKET").unwrap_or_else(|_| "videos".to_string()),
            storage_public_base: env::var("STORAGE_PUBLIC_BASE").ok().filter(|s| !s.is_empty()),
            storage_api_key: env::var("STORAGE_API_KEY").ok().filter(|s| !s.is_empty()),
            records_endpoint,
            records_api_key: env::var("RECORDS_API_KEY").ok().filter(|s| !s.is_empty()),
            upload_chunk_size_bytes: env::var("UPLOAD_CHUNK_SIZE_MB")
                .unwrap_or_else(|_| UPLOAD_CHUNK_SIZE_MB.to_string())
                .parse::<usize>()
                .unwrap_or(UPLOAD_CHUNK_SIZE_MB)
                * 1024
                * 1024,
            max_source_size_bytes: env::var("MAX_SOURCE_SIZE_GB")
                .unwrap_or_else(|_| MAX_SOURCE_SIZE_GB.to_string())
                .parse::<u64>()
                .unwrap_or(MAX_SOURCE_SIZE_GB)
                * 1024
                * 1024
                * 1024,
            allowed_content_prefixes,
            ffmpeg_path: env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string()),
            ffprobe_path: env::var("FFPROBE_PATH").unwrap_or_else(|_| "ffprobe".to_string()),
            hls_segment_duration: env::var("HLS_SEGMENT_DURATION")
                .unwrap_or_else(|_| HLS_SEGMENT_DURATION.to_string())
                .parse()
                .unwrap_or(HLS_SEGMENT_DURATION),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.storage_endpoint.starts_with("http://")
            && !self.storage_endpoint.starts_with("https://")
        {
            return Err(anyhow::anyhow!(
                "STORAGE_ENDPOINT must be an http(s) URL, got '{}'",
                self.storage_endpoint
            ));
        }

        if !self.records_endpoint.starts_with("http://")
            && !self.records_endpoint.starts_with("https://")
        {
            return Err(anyhow::anyhow!(
                "RECORDS_ENDPOINT must be an http(s) URL, got '{}'",
                self.records_endpoint
            ));
        }

        if self.owner_id.trim().is_empty() {
            return Err(anyhow::anyhow!("OWNER_ID cannot be empty"));
        }

        if self.storage_bucket.trim().is_empty() {
            return Err(anyhow::anyhow!("STORAGE_BUCKET cannot be empty"));
        }

        if self.upload_chunk_size_bytes < 1024 * 1024 {
            return Err(anyhow::anyhow!(
                "UPLOAD_CHUNK_SIZE_MB must be at least 1 MiB"
            ));
        }

        if self.max_source_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_SOURCE_SIZE_GB must be greater than 0"));
        }

        if self.hls_segment_duration == 0 || self.hls_segment_duration > 10 {
            return Err(anyhow::anyhow!(
                "HLS_SEGMENT_DURATION must be between 1 and 10 seconds"
            ));
        }

        if self.allowed_content_prefixes.is_empty() {
            return Err(anyhow::anyhow!("ALLOWED_CONTENT_PREFIXES cannot be empty"));
        }

        Ok(())
    }

    /// Base URL for public artifact URLs: the configured override, or the
    /// storage endpoint's public object path for the configured bucket.
    pub fn public_base(&self) -> String {
        match &self.storage_public_base {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => format!(
                "{}/object/public/{}",
                self.storage_endpoint.trim_end_matches('/'),
                self.storage_bucket
            ),
        }
    }
}
