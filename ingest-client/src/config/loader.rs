//! Configuration loading from files and environment variables.

use config::{Config, Environment, File};

use crate::error::{IngestError, IngestResult};

use super::IngestConfig;

/// Load configuration from `ingest.{toml,yaml,json}` (optional) and `INGEST__*` env vars
pub fn load_config() -> IngestResult<IngestConfig> {
    load_config_from("ingest")
}

/// Load configuration from a named file (extension optional) plus env vars
pub fn load_config_from(file_name: &str) -> IngestResult<IngestConfig> {
    let config: IngestConfig = Config::builder()
        .add_source(File::with_name(file_name).required(false))
        .add_source(
            Environment::with_prefix("INGEST")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| IngestError::Config {
            message: format!("Failed to build config: {}", e),
        })?
        .try_deserialize()
        .map_err(|e| IngestError::Config {
            message: format!("Failed to deserialize config: {}", e),
        })?;

    config.validate()?;
    Ok(config)
}
