//! PDF text extraction through PDFium.

use pdfium_render::prelude::*;
use tracing::{info, warn};

use crate::error::ExtractionError;
use crate::progress::BandReporter;

use super::{ExtractionResult, step_progress};

/// Bind PDFium at runtime, trying the working directory, then
/// `vendor/pdfium/lib/`, then the system library path.
fn create_pdfium() -> Result<Pdfium, ExtractionError> {
    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                "./vendor/pdfium/lib/",
            ))
        })
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| ExtractionError::Pdf {
            page: 0,
            message: format!("Failed to load PDFium library: {:?}", e),
        })?;

    Ok(Pdfium::new(bindings))
}

/// Extract page text in page order plus document info metadata
pub fn extract_pdf(
    data: &[u8],
    progress: &BandReporter,
) -> Result<ExtractionResult, ExtractionError> {
    progress.report("loading PDF", 10.0);
    let pdfium = create_pdfium()?;
    let document = pdfium
        .load_pdf_from_byte_slice(data, None)
        .map_err(|e| ExtractionError::Pdf {
            page: 0,
            message: format!("Failed to load PDF: {:?}", e),
        })?;

    let page_count = document.pages().len() as usize;
    info!(pages = page_count, "Processing PDF pages");

    progress.report("extracting text", 20.0);
    let mut text = String::new();
    for (page_index, page) in document.pages().iter().enumerate() {
        let page_num = page_index as u32 + 1;
        let page_text = page.text().map_err(|e| {
            warn!(page = page_num, error = ?e, "Failed to get text object for page");
            ExtractionError::Pdf {
                page: page_num,
                message: format!("{:?}", e),
            }
        })?;

        text.push_str(&page_text.all());
        text.push('\n');
        progress.report(
            "extracting text",
            step_progress(20.0, 70.0, page_index + 1, page_count),
        );
    }

    progress.report("fetching metadata", 90.0);
    let mut result = ExtractionResult::new(text).with_metadata("pageCount", page_count);
    let info = document.metadata();
    for (key, tag) in [
        ("title", PdfDocumentMetadataTagType::Title),
        ("author", PdfDocumentMetadataTagType::Author),
        ("subject", PdfDocumentMetadataTagType::Subject),
        ("keywords", PdfDocumentMetadataTagType::Keywords),
    ] {
        if let Some(value) = info.get(tag) {
            result = result.with_metadata(key, value.value());
        }
    }

    Ok(result)
}
