//! Handle on the local file being ingested.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::error::{IngestError, IngestResult};
use crate::extraction::FileFormat;

/// A file on disk plus its declared content type
#[derive(Debug, Clone)]
pub struct SourceFile {
    path: PathBuf,
    name: String,
    content_type: String,
    size: u64,
}

impl SourceFile {
    /// Open `path` with an explicit declared content type
    pub async fn open(path: impl AsRef<Path>, content_type: impl Into<String>) -> IngestResult<Self> {
        let path = path.as_ref().to_path_buf();
        let size = tokio::fs::metadata(&path).await?.len();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| IngestError::Internal {
                message: format!("Path has no usable file name: {}", path.display()),
            })?;

        Ok(Self {
            path,
            name,
            content_type: content_type.into(),
            size,
        })
    }

    /// Open `path`, inferring the content type from its extension
    pub async fn open_inferred(path: impl AsRef<Path>) -> IngestResult<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        let content_type = FileFormat::from_extension(extension)
            .map(|format| format.content_type().to_string())
            .ok_or_else(|| IngestError::UnsupportedFileType {
                content_type: format!(".{}", extension),
            })?;
        Self::open(path, content_type).await
    }

    /// Override the file name reported to the remote endpoints
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Read the half-open byte range `[start, end)`
    pub async fn read_range(&self, start: u64, end: u64) -> IngestResult<Bytes> {
        if end < start || end > self.size {
            return Err(IngestError::Internal {
                message: format!(
                    "Byte range {}..{} outside file of {} bytes",
                    start, end, self.size
                ),
            });
        }

        let mut file = tokio::fs::File::open(&self.path).await?;
        file.seek(SeekFrom::Start(start)).await?;
        let mut buffer = vec![0u8; (end - start) as usize];
        file.read_exact(&mut buffer).await?;
        Ok(Bytes::from(buffer))
    }

    /// Read the whole file
    pub async fn read_all(&self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }
}
