//! Per-invocation multipart upload state.

use std::collections::BTreeMap;

use crate::client::{CompletedPart, MultipartUpload};

use super::plan::ChunkPlan;

/// State owned by one orchestrator run. Never shared or reused.
#[derive(Debug)]
pub struct UploadSession {
    upload: MultipartUpload,
    plan: ChunkPlan,
    /// Keyed by part number so completion order does not matter
    parts: BTreeMap<u32, CompletedPart>,
}

impl UploadSession {
    pub fn new(upload: MultipartUpload, plan: ChunkPlan) -> Self {
        Self {
            upload,
            plan,
            parts: BTreeMap::new(),
        }
    }

    pub fn upload_id(&self) -> &str {
        &self.upload.upload_id
    }

    pub fn file_key(&self) -> &str {
        &self.upload.file_key
    }

    pub fn plan(&self) -> &ChunkPlan {
        &self.plan
    }

    /// Record a finished part. A repeated part number replaces the earlier entry.
    pub fn record_part(&mut self, part: CompletedPart) {
        self.parts.insert(part.part_number, part);
    }

    pub fn completed_count(&self) -> usize {
        self.parts.len()
    }

    /// True once every planned part has exactly one entry
    pub fn is_complete(&self) -> bool {
        self.parts.len() == self.plan.len()
            && self
                .plan
                .iter()
                .all(|chunk| self.parts.contains_key(&chunk.part_number))
    }

    /// Parts in ascending, deduplicated part-number order
    pub fn sorted_parts(&self) -> Vec<CompletedPart> {
        self.parts.values().cloned().collect()
    }
}
