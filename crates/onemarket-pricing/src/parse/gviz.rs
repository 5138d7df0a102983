//! Google Visualization (`gviz`) responses, as served by published sheets:
//! `google.visualization.Query.setResponse({...});`

use regex::Regex;
use serde_json::Value;

use crate::error::PricingError;

use super::tabular::Table;
use super::SourceFormat;

pub(crate) const GVIZ_MARKER: &str = "google.visualization.Query.setResponse(";

fn malformed(reason: impl Into<String>) -> PricingError {
    PricingError::MalformedPayload {
        format: SourceFormat::Gviz,
        reason: reason.into(),
    }
}

/// Unwraps the callback and converts `table.cols` / `table.rows` into a [`Table`].
///
/// # Errors
///
/// Returns [`PricingError::MalformedPayload`] if the wrapper or the embedded
/// JSON cannot be decoded, or the response reports an error status.
pub(crate) fn decode(text: &str) -> Result<Table, PricingError> {
    let wrapper = Regex::new(r"(?s)google\.visualization\.Query\.setResponse\((.*)\)\s*;?\s*$")
        .expect("valid regex");
    let json_text = wrapper
        .captures(text.trim())
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| malformed("setResponse wrapper not closed"))?;

    let value: Value =
        serde_json::from_str(json_text).map_err(|e| malformed(format!("embedded JSON: {e}")))?;

    if value.get("status").and_then(Value::as_str) == Some("error") {
        let detail = value
            .pointer("/errors/0/detailed_message")
            .or_else(|| value.pointer("/errors/0/message"))
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(malformed(format!("query error: {detail}")));
    }

    let table = value
        .get("table")
        .ok_or_else(|| malformed("missing table"))?;

    let header = table
        .get("cols")
        .and_then(Value::as_array)
        .map(|cols| {
            cols.iter()
                .map(|col| {
                    col.get("label")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string()
                })
                .collect()
        })
        .unwrap_or_default();

    let rows = table
        .get("rows")
        .and_then(Value::as_array)
        .map(|rows| {
            rows.iter()
                .map(|row| {
                    row.get("c")
                        .and_then(Value::as_array)
                        .map(|cells| cells.iter().map(cell_text).collect())
                        .unwrap_or_default()
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(Table { header, rows })
}

/// Raw cell value as text. Prefers `v`, falls back to the formatted `f`.
fn cell_text(cell: &Value) -> String {
    let raw = cell.get("v").filter(|v| !v.is_null());
    match raw {
        Some(Value::String(s)) => s.clone(),
        // `f64` Display never switches to exponent notation.
        Some(Value::Number(n)) => n.as_f64().map(|v| v.to_string()).unwrap_or_default(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => cell
            .get("f")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    }
}
