use thiserror::Error;

use crate::upload::UploadStage;

/// Main ingestion error type
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Unsupported file type: {content_type}")]
    UnsupportedFileType { content_type: String },

    #[error("Part {part_number} failed after {attempts} attempts")]
    PartUpload {
        part_number: u32,
        attempts: u32,
        #[source]
        source: ApiError,
    },

    #[error("{stage} stage failed")]
    Stage {
        stage: UploadStage,
        #[source]
        source: ApiError,
    },

    #[error("Text extraction failed")]
    Extraction(#[from] ExtractionError),

    #[error("Ingestion cancelled")]
    Cancelled,

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Remote API errors
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request to {url} failed")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {url} returned status {status}: {body}")]
    Status { url: String, status: u16, body: String },

    #[error("Invalid response from {url}")]
    InvalidResponse {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Part {part_number} upload response carried no ETag header")]
    MissingETag { part_number: u32 },
}

/// Content extraction errors
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Failed to read source file")]
    Read(#[source] std::io::Error),

    #[error("Failed to parse {format}: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },

    #[error("Failed to open {format} archive")]
    Archive {
        format: &'static str,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Failed to extract PDF text from page {page}: {message}")]
    Pdf { page: u32, message: String },

    #[error("Failed to read EPUB: {0}")]
    Epub(String),

    #[error("Extraction task aborted")]
    Join(#[source] tokio::task::JoinError),
}

impl IngestError {
    /// Stable machine-readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            IngestError::UnsupportedFileType { .. } => "unsupported_file_type",
            IngestError::PartUpload { .. } => "part_upload_failed",
            IngestError::Stage { stage, .. } => match stage {
                UploadStage::Initiated => "initiate_failed",
                UploadStage::UploadingParts => "presign_failed",
                UploadStage::Completing => "complete_failed",
                UploadStage::Finalizing => "finalize_failed",
                _ => "stage_failed",
            },
            IngestError::Extraction(ExtractionError::Read(_)) => "extraction_read_error",
            IngestError::Extraction(ExtractionError::Parse { .. }) => "extraction_parse_error",
            IngestError::Extraction(ExtractionError::Archive { .. }) => "extraction_archive_error",
            IngestError::Extraction(ExtractionError::Pdf { .. }) => "pdf_extraction_error",
            IngestError::Extraction(ExtractionError::Epub(_)) => "epub_extraction_error",
            IngestError::Extraction(ExtractionError::Join(_)) => "extraction_aborted",
            IngestError::Cancelled => "cancelled",
            IngestError::Config { .. } => "config_error",
            IngestError::Io(_) => "io_error",
            IngestError::Internal { .. } => "internal_error",
        }
    }

    /// True when the failure happened before any remote state could have changed
    pub fn is_side_effect_free(&self) -> bool {
        matches!(
            self,
            IngestError::UnsupportedFileType { .. }
                | IngestError::Config { .. }
                | IngestError::Stage {
                    stage: UploadStage::Initiated,
                    ..
                }
        )
    }
}

/// Result type alias for ingestion operations
pub type IngestResult<T> = Result<T, IngestError>;
