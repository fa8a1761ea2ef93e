//! DOCX extraction: raw paragraph text from `word/document.xml`.

use std::io::{Cursor, Read};

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::ExtractionError;
use crate::progress::BandReporter;

use super::ExtractionResult;

const DOCUMENT_PART: &str = "word/document.xml";

pub fn extract_docx(
    data: &[u8],
    progress: &BandReporter,
) -> Result<ExtractionResult, ExtractionError> {
    progress.report("loading DOCX", 20.0);
    let mut archive = zip::ZipArchive::new(Cursor::new(data)).map_err(|e| {
        ExtractionError::Archive {
            format: "docx",
            source: e,
        }
    })?;

    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| ExtractionError::Archive {
            format: "docx",
            source: e,
        })?
        .read_to_string(&mut xml)
        .map_err(ExtractionError::Read)?;

    progress.report("extracting content", 50.0);
    let paragraphs = document_paragraphs(&xml)?;

    Ok(ExtractionResult::new(paragraphs.join("\n\n"))
        .with_metadata("paragraphCount", paragraphs.len()))
}

/// Non-empty paragraph texts from a WordprocessingML body, in document order
fn document_paragraphs(xml: &str) -> Result<Vec<String>, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:t" => in_text_run = true,
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => {
                    let text = std::mem::take(&mut current);
                    if !text.trim().is_empty() {
                        paragraphs.push(text);
                    }
                }
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:tab" => current.push('\t'),
                b"w:br" | b"w:cr" => current.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text_run => {
                let text = t.unescape().map_err(|e| ExtractionError::Parse {
                    format: "docx",
                    message: e.to_string(),
                })?;
                current.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ExtractionError::Parse {
                    format: "docx",
                    message: format!(
                        "XML error at position {}: {}",
                        reader.buffer_position(),
                        e
                    ),
                });
            }
            _ => {}
        }
    }

    Ok(paragraphs)
}
