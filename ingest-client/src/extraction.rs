//! Format-dispatched text and metadata extraction.
//!
//! Every supported content type maps to exactly one [`FileFormat`] variant;
//! there is no fallback for unknown types. Variants report their own
//! sub-progress (0–100), which the [`BandReporter`] scales into the
//! extraction band of the overall progress range.

mod csv;
mod docx;
mod epub;
mod format;
mod html;
mod json;
mod markdown;
mod pdf;
mod xlsx;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::{ExtractionError, IngestError, IngestResult};
use crate::progress::{BandReporter, ProgressUpdate};
use crate::source::SourceFile;

pub use format::FileFormat;

/// Normalized text plus flat, variant-specific metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractionResult {
    pub text: String,
    pub metadata: Map<String, Value>,
}

impl ExtractionResult {
    pub fn new(text: String) -> Self {
        Self {
            text,
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

impl FileFormat {
    /// Run this variant's extraction over an in-memory file
    pub fn extract(
        self,
        data: &[u8],
        progress: &BandReporter,
    ) -> Result<ExtractionResult, ExtractionError> {
        match self {
            FileFormat::PlainText => Ok(markdown::extract_text(data, progress)),
            FileFormat::Markdown => Ok(markdown::extract_markdown(data, progress)),
            FileFormat::Json => json::extract_json(data, progress),
            FileFormat::Csv => csv::extract_csv(data, progress),
            FileFormat::Html => Ok(html::extract_html(data, progress)),
            FileFormat::Docx => docx::extract_docx(data, progress),
            FileFormat::Xlsx => xlsx::extract_xlsx(data, progress),
            FileFormat::Pdf => pdf::extract_pdf(data, progress),
            FileFormat::Epub => epub::extract_epub(data, progress),
        }
    }

    /// Archive and document formats whose parsing is too heavy for the async scheduler
    fn parses_off_thread(self) -> bool {
        matches!(
            self,
            FileFormat::Docx | FileFormat::Xlsx | FileFormat::Pdf | FileFormat::Epub
        )
    }
}

/// Resolve a declared content type to its extraction variant
pub fn resolve_format(content_type: &str) -> IngestResult<FileFormat> {
    FileFormat::from_content_type(content_type).ok_or_else(|| IngestError::UnsupportedFileType {
        content_type: content_type.to_string(),
    })
}

/// Extract text and metadata from `source` according to its declared type.
///
/// Unknown types fail before the file is read. On success the band is
/// driven to its upper bound.
pub async fn extract_file(
    source: &SourceFile,
    progress: &BandReporter,
) -> IngestResult<ExtractionResult> {
    let format = resolve_format(source.content_type())?;
    extract_with_format(source, format, progress).await
}

/// Extract with an already-resolved format
pub async fn extract_with_format(
    source: &SourceFile,
    format: FileFormat,
    progress: &BandReporter,
) -> IngestResult<ExtractionResult> {
    progress.update(
        ProgressUpdate::new()
            .status("initializing")
            .progress(0.0)
            .with("file_type", format.content_type()),
    );
    info!(file = %source.name(), format = %format, "Extracting text");

    let data = source.read_all().await.map_err(ExtractionError::Read)?;

    let result = if format.parses_off_thread() {
        let band = progress.clone();
        tokio::task::spawn_blocking(move || format.extract(&data, &band))
            .await
            .map_err(ExtractionError::Join)??
    } else {
        format.extract(&data, progress)?
    };

    progress.report("extracted", 100.0);
    debug!(
        format = %format,
        chars = result.text.len(),
        metadata_keys = result.metadata.len(),
        "Extraction finished"
    );

    Ok(result)
}

/// Scale step `done` of `total` into `[start, start + span]`
pub(crate) fn step_progress(start: f64, span: f64, done: usize, total: usize) -> f64 {
    if total == 0 {
        return start + span;
    }
    start + span * done as f64 / total as f64
}
