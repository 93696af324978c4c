//! Reelpipe Storage Library
//!
//! This crate provides the storage side of the pipeline: the resumable-upload
//! and simple-put protocol traits, an HTTP implementation of both, an
//! in-memory backend for tests and local development, the chunked resumable
//! upload session, and the artifact key layout.
//!
//! # Object key layout
//!
//! All keys are owner-scoped. The layout is shared by every backend:
//!
//! - **Raw upload**: `{owner}/{unix_millis}-{filename}`
//! - **HLS artifact**: `{owner}/{video_id}/hls/{name}`
//! - **Poster**: `{owner}/{video_id}/poster.jpg`
//!
//! Keys must not contain `..` or a leading `/`. Key generation is centralized
//! in the `keys` module so all callers stay consistent.

pub mod http;
pub mod keys;
pub mod memory;
pub mod traits;
pub mod uploader;

// Re-export commonly used types
pub use http::{HttpObjectStore, HttpResumableStore};
pub use memory::InMemoryStore;
pub use traits::{ObjectStore, ResumableStore, SessionUri, StorageError, StorageResult};
pub use uploader::{UploadConfig, UploadEvent, UploadSession, UploadState};
