//! Supported content types.

use strum::{Display, EnumIter};

/// One variant per content type that has an extraction strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum FileFormat {
    #[strum(serialize = "text")]
    PlainText,
    Markdown,
    Json,
    Csv,
    Html,
    Docx,
    Xlsx,
    Pdf,
    Epub,
}

impl FileFormat {
    /// Map a declared content type to its variant.
    ///
    /// Parameters (`; charset=…`) and case are ignored. Unknown types yield `None`.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "text/plain" => Some(FileFormat::PlainText),
            "text/markdown" => Some(FileFormat::Markdown),
            "application/json" => Some(FileFormat::Json),
            "text/csv" => Some(FileFormat::Csv),
            "text/html" => Some(FileFormat::Html),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(FileFormat::Docx)
            }
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => {
                Some(FileFormat::Xlsx)
            }
            "application/pdf" => Some(FileFormat::Pdf),
            "application/epub+zip" => Some(FileFormat::Epub),
            _ => None,
        }
    }

    /// Guess a variant from a file extension (without the dot)
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "txt" | "text" => Some(FileFormat::PlainText),
            "md" | "markdown" => Some(FileFormat::Markdown),
            "json" => Some(FileFormat::Json),
            "csv" => Some(FileFormat::Csv),
            "html" | "htm" => Some(FileFormat::Html),
            "docx" => Some(FileFormat::Docx),
            "xlsx" => Some(FileFormat::Xlsx),
            "pdf" => Some(FileFormat::Pdf),
            "epub" => Some(FileFormat::Epub),
            _ => None,
        }
    }

    /// Canonical content type sent to the remote endpoints
    pub fn content_type(self) -> &'static str {
        match self {
            FileFormat::PlainText => "text/plain",
            FileFormat::Markdown => "text/markdown",
            FileFormat::Json => "application/json",
            FileFormat::Csv => "text/csv",
            FileFormat::Html => "text/html",
            FileFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            FileFormat::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            FileFormat::Pdf => "application/pdf",
            FileFormat::Epub => "application/epub+zip",
        }
    }
}
