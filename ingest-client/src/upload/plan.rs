//! Fixed-size chunk planning.

use serde::Serialize;

/// One part of a multipart upload: the byte range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlannedChunk {
    pub start: u64,
    pub end: u64,
    /// 1-based, as the storage protocol numbers parts
    pub part_number: u32,
}

impl PlannedChunk {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Ordered, immutable list of parts covering a file
pub type ChunkPlan = Vec<PlannedChunk>;

/// Cut a file of `size` bytes into `ceil(size / chunk_size)` parts.
///
/// Every part is `chunk_size` long except possibly the last. An empty file
/// has an empty plan. `chunk_size` of zero is treated as one byte.
pub fn plan_chunks(size: u64, chunk_size: u64) -> ChunkPlan {
    let chunk_size = chunk_size.max(1);
    (0..size.div_ceil(chunk_size))
        .map(|index| {
            let start = index * chunk_size;
            PlannedChunk {
                start,
                end: (start + chunk_size).min(size),
                part_number: index as u32 + 1,
            }
        })
        .collect()
}
