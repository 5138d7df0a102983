//! Comma-separated price sheets.

use crate::error::PricingError;

use super::tabular::Table;
use super::SourceFormat;

/// Reads CSV text into a [`Table`], first record as header.
///
/// Quoted fields, doubled-quote escapes and CR/LF/CRLF line endings are handled
/// by the `csv` reader. Ragged rows are accepted and blank rows skipped.
///
/// # Errors
///
/// Returns [`PricingError::MalformedPayload`] if a record cannot be decoded.
pub(crate) fn decode(text: &str) -> Result<Table, PricingError> {
    let text = text.trim_start_matches('\u{FEFF}');

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|e| PricingError::MalformedPayload {
            format: SourceFormat::Csv,
            reason: format!("record {}: {e}", line + 1),
        })?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }

    Ok(Table::with_header_row(rows))
}
