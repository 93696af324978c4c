//! Upload-to-published ingest pipeline.
//!
//! [`IngestPipeline`] carries one source file through upload, record
//! creation, transcoding, and finalization, surfacing progress as
//! [`PipelineEvent`]s. Storage and persistence sit behind ports so the whole
//! flow runs against in-memory fakes in tests.

pub mod events;
pub mod orchestrator;
pub mod records;

pub use events::PipelineEvent;
pub use orchestrator::{IngestPipeline, PipelineState, PublishedVideo, SourceFile};
pub use records::{HttpRecordStore, InMemoryRecords, RecordError, RecordResult, RecordStore};
