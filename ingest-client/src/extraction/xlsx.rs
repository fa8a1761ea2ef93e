//! XLSX extraction. Each sheet is rendered as JSON rows keyed by its header row.

use std::io::Cursor;

use calamine::{Data, Reader, Xlsx, open_workbook_from_rs};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::ExtractionError;
use crate::progress::BandReporter;

use super::{ExtractionResult, step_progress};

pub fn extract_xlsx(
    data: &[u8],
    progress: &BandReporter,
) -> Result<ExtractionResult, ExtractionError> {
    progress.report("loading XLSX", 20.0);
    let mut workbook: Xlsx<_> =
        open_workbook_from_rs(Cursor::new(data)).map_err(|e: calamine::XlsxError| {
            ExtractionError::Parse {
                format: "xlsx",
                message: e.to_string(),
            }
        })?;

    progress.report("parsing XLSX", 50.0);
    let sheet_names = workbook.sheet_names();
    let mut text = String::new();

    for (index, sheet_name) in sheet_names.iter().enumerate() {
        let range = workbook
            .worksheet_range(sheet_name)
            .map_err(|e| ExtractionError::Parse {
                format: "xlsx",
                message: format!("sheet {}: {}", sheet_name, e),
            })?;

        let records = rows_to_records(range.rows().map(|row| row.iter().map(cell_value).collect()));
        debug!(sheet = %sheet_name, rows = records.len(), "Sheet extracted");

        let rendered = serde_json::to_string_pretty(&records).map_err(|e| ExtractionError::Parse {
            format: "xlsx",
            message: e.to_string(),
        })?;
        text.push_str(&format!("Sheet: {}\n{}\n\n", sheet_name, rendered));

        progress.report(
            "extracting sheets",
            step_progress(50.0, 40.0, index + 1, sheet_names.len()),
        );
    }

    Ok(ExtractionResult::new(text)
        .with_metadata("sheetCount", sheet_names.len())
        .with_metadata("sheetNames", sheet_names))
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::Int(i) => Value::from(*i),
        Data::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Data::Bool(b) => Value::Bool(*b),
        Data::String(s) => Value::String(s.clone()),
        other => Value::String(other.to_string()),
    }
}

/// Turn a header row plus data rows into objects.
///
/// Empty cells are omitted, rows with no values are skipped, and blank
/// header cells are named `__EMPTY`, `__EMPTY_1`, … by position.
fn rows_to_records(mut rows: impl Iterator<Item = Vec<Value>>) -> Vec<Value> {
    let Some(header_row) = rows.next() else {
        return Vec::new();
    };

    let mut blank_headers = 0;
    let headers: Vec<String> = header_row
        .into_iter()
        .map(|cell| match cell {
            Value::Null => {
                let name = match blank_headers {
                    0 => "__EMPTY".to_string(),
                    n => format!("__EMPTY_{}", n),
                };
                blank_headers += 1;
                name
            }
            Value::String(s) if !s.trim().is_empty() => s,
            Value::String(_) => "__EMPTY".to_string(),
            other => other.to_string(),
        })
        .collect();

    rows.filter_map(|row| {
        let record: Map<String, Value> = headers
            .iter()
            .zip(row)
            .filter(|(_, value)| !value.is_null())
            .map(|(header, value)| (header.clone(), value))
            .collect();
        (!record.is_empty()).then_some(Value::Object(record))
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rows_to_records() {
        let rows = vec![
            vec![json!("name"), json!("qty"), Value::Null],
            vec![json!("apple"), json!(3), json!("x")],
            vec![Value::Null, Value::Null, Value::Null],
            vec![json!("pear"), Value::Null, Value::Null],
        ];

        let records = rows_to_records(rows.into_iter());
        assert_eq!(
            records,
            vec![
                json!({"name": "apple", "qty": 3, "__EMPTY": "x"}),
                json!({"name": "pear"}),
            ]
        );
    }

    #[test]
    fn test_empty_sheet() {
        assert!(rows_to_records(std::iter::empty()).is_empty());
    }

    #[test]
    fn test_cell_values() {
        assert_eq!(cell_value(&Data::Int(4)), json!(4));
        assert_eq!(cell_value(&Data::Float(1.5)), json!(1.5));
        assert_eq!(cell_value(&Data::Empty), Value::Null);
        assert_eq!(cell_value(&Data::String("s".into())), json!("s"));
    }
}
