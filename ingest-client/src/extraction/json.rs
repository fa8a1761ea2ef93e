//! JSON extraction.

use serde_json::Value;

use crate::error::ExtractionError;
use crate::progress::BandReporter;

use super::ExtractionResult;

pub fn extract_json(
    data: &[u8],
    progress: &BandReporter,
) -> Result<ExtractionResult, ExtractionError> {
    progress.report("reading JSON", 20.0);
    let parsed: Value = serde_json::from_slice(data).map_err(|e| ExtractionError::Parse {
        format: "json",
        message: e.to_string(),
    })?;

    progress.report("parsing JSON", 60.0);
    let text = serde_json::to_string_pretty(&parsed).map_err(|e| ExtractionError::Parse {
        format: "json",
        message: e.to_string(),
    })?;

    Ok(ExtractionResult::new(text).with_metadata("topLevelKeys", top_level_keys(&parsed)))
}

/// Object keys in document order; array indices for arrays; nothing for scalars
fn top_level_keys(value: &Value) -> Vec<Value> {
    match value {
        Value::Object(map) => map.keys().cloned().map(Value::String).collect(),
        Value::Array(items) => (0..items.len()).map(|i| Value::String(i.to_string())).collect(),
        _ => Vec::new(),
    }
}
