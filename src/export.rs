//! CSV export of the result set.
//!
//! Records are flattened into ordered rows and the header is the union of
//! every key seen, in first-seen order. A row without some column renders an
//! empty cell, so replies with extra or missing keys never break the export.

use crate::error::Card2CsvError;
use crate::record::{value_to_text, ContactRecord};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Suggested download name for the exported table.
pub const EXPORT_FILE_NAME: &str = "business_cards_extracted.csv";

/// MIME type of the exported table.
pub const EXPORT_MIME_TYPE: &str = "text/csv";

/// One flattened table row, keys in insertion order.
pub type Row = Map<String, Value>;

/// Union of all row keys, ordered by first appearance.
pub fn union_columns(rows: &[Row]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut columns = Vec::new();
    for key in rows.iter().flat_map(|r| r.keys()) {
        if seen.insert(key.as_str()) {
            columns.push(key.clone());
        }
    }
    columns
}

/// Serialise rows as UTF-8 CSV with a header row.
///
/// Returns `Ok(None)` when there are no rows: an empty result set has no
/// table to export.
pub fn rows_to_csv(rows: &[Row]) -> Result<Option<String>, Card2CsvError> {
    if rows.is_empty() {
        return Ok(None);
    }

    let columns = union_columns(rows);
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(&columns)?;
    for row in rows {
        writer.write_record(
            columns
                .iter()
                .map(|c| row.get(c).map(value_to_text).unwrap_or_default()),
        )?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| Card2CsvError::Internal(format!("CSV flush failed: {}", e.error())))?;
    let text = String::from_utf8(bytes)
        .map_err(|e| Card2CsvError::Internal(format!("CSV is not UTF-8: {e}")))?;

    debug!("Exported {} rows × {} columns", rows.len(), columns.len());
    Ok(Some(text))
}

/// Serialise contact records as CSV. `Ok(None)` for an empty slice.
pub fn records_to_csv(records: &[ContactRecord]) -> Result<Option<String>, Card2CsvError> {
    let rows: Vec<Row> = records.iter().map(ContactRecord::to_row).collect();
    rows_to_csv(&rows)
}

/// Write `contents` to `path` atomically (temp file in the same directory, then rename).
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), Card2CsvError> {
    let write_err = |source: std::io::Error| Card2CsvError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(contents.as_bytes()).map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}
