//! Multipart transfer of a local file followed by document creation.
//!
//! The orchestrator walks a linear state machine:
//! - `initiated`: ask the backend for an upload id and file key
//! - `planned`: cut the file into fixed-size parts
//! - `uploading_parts`: PUT each part to its own presigned URL
//! - `completing`: close the multipart upload with the sorted part list
//! - `finalizing`: create the document record with the extraction result
//!
//! Any unrecovered error moves the session to `error`.

mod orchestrator;
mod plan;
mod session;

use serde::Serialize;
use strum::{Display, EnumIter};

pub use orchestrator::UploadOrchestrator;
pub use plan::{ChunkPlan, PlannedChunk, plan_chunks};
pub use session::UploadSession;

/// Stages of one ingestion session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UploadStage {
    Initiated,
    Planned,
    UploadingParts,
    Completing,
    Finalizing,
    Done,
    Error,
}

impl UploadStage {
    /// Overall progress reported on entering this stage
    pub fn progress(self) -> f64 {
        match self {
            UploadStage::Initiated => 5.0,
            UploadStage::Planned => 10.0,
            UploadStage::UploadingParts => PARTS_BAND.0,
            UploadStage::Completing => 55.0,
            UploadStage::Finalizing => 70.0,
            UploadStage::Done => 100.0,
            UploadStage::Error => 0.0,
        }
    }
}

/// Band of the overall range filled by part uploads
pub const PARTS_BAND: (f64, f64) = (20.0, 50.0);

/// Band of the overall range filled by the extraction pass
pub const EXTRACTION_BAND: (f64, f64) = (0.0, 20.0);
