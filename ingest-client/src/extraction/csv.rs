//! CSV extraction. The first row is the header; each following row becomes
//! an object keyed by header field.

use serde_json::{Map, Value};

use crate::error::ExtractionError;
use crate::progress::BandReporter;

use super::ExtractionResult;

pub fn extract_csv(
    data: &[u8],
    progress: &BandReporter,
) -> Result<ExtractionResult, ExtractionError> {
    progress.report("reading CSV", 20.0);
    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data);

    progress.report("parsing CSV", 60.0);
    let fields: Vec<String> = reader
        .headers()
        .map_err(parse_error)?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(parse_error)?;
        let row: Map<String, Value> = fields
            .iter()
            .zip(record.iter())
            .map(|(field, value)| (field.clone(), Value::String(value.to_string())))
            .collect();
        rows.push(Value::Object(row));
    }

    let row_count = rows.len();
    let text = serde_json::to_string_pretty(&rows).map_err(|e| ExtractionError::Parse {
        format: "csv",
        message: e.to_string(),
    })?;

    Ok(ExtractionResult::new(text)
        .with_metadata("fields", fields)
        .with_metadata("rowCount", row_count))
}

fn parse_error(e: ::csv::Error) -> ExtractionError {
    ExtractionError::Parse {
        format: "csv",
        message: e.to_string(),
    }
}
