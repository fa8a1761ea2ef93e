//! EPUB extraction: spine items in reading order, markup stripped.

use std::io::Cursor;

use tracing::debug;

use crate::error::ExtractionError;
use crate::progress::BandReporter;

use super::html::strip_html_tags;
use super::{ExtractionResult, step_progress};

const METADATA_FIELDS: [&str; 4] = ["title", "creator", "publisher", "language"];

pub fn extract_epub(
    data: &[u8],
    progress: &BandReporter,
) -> Result<ExtractionResult, ExtractionError> {
    progress.report("loading EPUB", 10.0);
    let mut doc = ::epub::doc::EpubDoc::from_reader(Cursor::new(data.to_vec()))
        .map_err(|e| ExtractionError::Epub(e.to_string()))?;

    progress.report("extracting metadata", 30.0);
    let metadata: Vec<(&str, String)> = METADATA_FIELDS
        .iter()
        .filter_map(|&field| doc.mdata(field).map(|item| (field, item.value.clone())))
        .collect();

    progress.report("extracting content", 50.0);
    let chapter_count = doc.get_num_chapters();
    let mut text = String::new();

    for index in 0..chapter_count {
        if !doc.set_current_chapter(index) {
            break;
        }
        if let Some((content, _mime)) = doc.get_current_str() {
            let chapter = strip_html_tags(&content);
            if !chapter.is_empty() {
                text.push_str(&chapter);
                text.push('\n');
            }
        }
        progress.report(
            "extracting content",
            step_progress(50.0, 40.0, index + 1, chapter_count),
        );
    }

    debug!(chapters = chapter_count, "EPUB extracted");

    let mut result = ExtractionResult::new(text).with_metadata("chapterCount", chapter_count);
    for (field, value) in metadata {
        result = result.with_metadata(field, value);
    }
    Ok(result)
}
