//! Data models for the pipeline
//!
//! This module contains the data structures used throughout the pipeline,
//! organized by domain: the rendition ladder, produced artifacts, and the
//! video record payloads exchanged with the record store.

mod artifact;
mod record;
mod rendition;

// Re-export all models for convenient imports
pub use artifact::*;
pub use record::*;
pub use rendition::*;
