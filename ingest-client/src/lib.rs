//! Client-side ingestion of large files.
//!
//! A file is uploaded to object storage through a multipart protocol with
//! bounded part concurrency and per-part retry, while its text and metadata
//! are extracted concurrently. Both results meet when the document record is
//! created on the backend. Progress is published through a single
//! merge-only [`progress::ProgressReporter`].

pub mod client;
pub mod config;
pub mod error;
pub mod extraction;
pub mod pool;
pub mod progress;
pub mod retry;
pub mod source;
pub mod upload;

pub use client::{DocumentRecord, IngestApiClient};
pub use config::IngestConfig;
pub use error::{ApiError, ExtractionError, IngestError, IngestResult};
pub use extraction::{ExtractionResult, FileFormat, extract_file};
pub use progress::{ProgressRecord, ProgressReporter, ProgressUpdate};
pub use source::SourceFile;
pub use upload::{UploadOrchestrator, UploadStage};
