//! Ingestion client configuration.
//!
//! Values come from an optional `ingest` config file overlaid by
//! `INGEST__`-prefixed environment variables. See [`loader`].

pub mod loader;

use serde::Deserialize;
use std::time::Duration;

use crate::error::{IngestError, IngestResult};

/// Minimum part size accepted by the remote multipart protocol (5 MiB)
pub const MIN_CHUNK_SIZE: u64 = 5 * 1024 * 1024;

/// Top-level configuration
#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "default_api")]
    pub api: ApiConfig,

    #[serde(default = "default_upload")]
    pub upload: UploadConfig,
}

/// Remote API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer credential supplied by the session layer. Refresh is out of band.
    #[serde(default)]
    pub bearer_token: Option<String>,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Multipart transfer tuning
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_chunk_size_bytes")]
    pub chunk_size_bytes: u64,

    /// Maximum number of part uploads in flight
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Total attempts per part PUT, including the first
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    #[serde(default = "default_part_timeout_secs")]
    pub part_timeout_secs: u64,
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl UploadConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn part_timeout(&self) -> Duration {
        Duration::from_secs(self.part_timeout_secs)
    }
}

impl IngestConfig {
    /// Reject values the remote protocol or the worker pool cannot honour
    pub fn validate(&self) -> IngestResult<()> {
        if self.upload.chunk_size_bytes < MIN_CHUNK_SIZE {
            return Err(IngestError::Config {
                message: format!(
                    "upload.chunk_size_bytes must be at least {} (got {})",
                    MIN_CHUNK_SIZE, self.upload.chunk_size_bytes
                ),
            });
        }
        if self.upload.concurrency == 0 {
            return Err(IngestError::Config {
                message: "upload.concurrency must be at least 1".to_string(),
            });
        }
        if self.upload.max_retries == 0 {
            return Err(IngestError::Config {
                message: "upload.max_retries must be at least 1".to_string(),
            });
        }
        if self.api.base_url.trim().is_empty() {
            return Err(IngestError::Config {
                message: "api.base_url must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            api: default_api(),
            upload: default_upload(),
        }
    }
}

// ==================== Default Value Functions ====================

pub(crate) fn default_api() -> ApiConfig {
    ApiConfig {
        base_url: default_base_url(),
        bearer_token: None,
        request_timeout_secs: default_request_timeout_secs(),
    }
}

pub(crate) fn default_upload() -> UploadConfig {
    UploadConfig {
        chunk_size_bytes: default_chunk_size_bytes(),
        concurrency: default_concurrency(),
        max_retries: default_max_retries(),
        retry_delay_ms: default_retry_delay_ms(),
        part_timeout_secs: default_part_timeout_secs(),
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_chunk_size_bytes() -> u64 {
    MIN_CHUNK_SIZE
}

fn default_concurrency() -> usize {
    4
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_part_timeout_secs() -> u64 {
    30
}
