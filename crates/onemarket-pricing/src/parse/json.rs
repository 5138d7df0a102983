//! JSON price payloads.
//!
//! Accepted shapes, after unwrapping the backend envelope
//! (`{"success": true, "source": "...", "products": ...}`):
//! - flat object: `{"tomato": 12, "potato": "8.5"}`
//! - object of objects: `{"tomato": {"unitPrice": 12}}`
//! - array of rows: `[{"id": "tomato", "price": 12}]`
//! - array of arrays, first row as header: `[["product", "price"], ["tomato", 12]]`

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::PricingError;
use crate::normalize::ProductKeyNormalizer;

use super::number::parse_price;
use super::tabular::{self, Table};
use super::SourceFormat;

const ID_FIELDS: &[&str] = &["id", "productId", "product", "key", "name", "item", "code"];
const PRICE_FIELDS: &[&str] = &["unitPrice", "price", "value", "amount"];
const ENVELOPE_KEYS: &[&str] = &["products", "prices", "data", "items"];

/// Result of decoding a JSON payload before it is wrapped into
/// [`super::ParsedPrices`].
#[derive(Debug)]
pub(crate) struct JsonPrices {
    pub source: Option<String>,
    pub prices: BTreeMap<String, f64>,
}

fn malformed(reason: impl Into<String>) -> PricingError {
    PricingError::MalformedPayload {
        format: SourceFormat::Json,
        reason: reason.into(),
    }
}

/// # Errors
///
/// Returns [`PricingError::MalformedPayload`] for invalid JSON, an envelope
/// with `success: false`, or a top-level value that is neither object nor array.
pub(crate) fn decode(
    text: &str,
    normalizer: &ProductKeyNormalizer,
) -> Result<JsonPrices, PricingError> {
    let value: Value = serde_json::from_str(text.trim_start_matches('\u{FEFF}'))
        .map_err(|e| malformed(e.to_string()))?;

    let (source, body) = unwrap_envelope(value)?;

    let prices = match body {
        Value::Object(map) => from_object(&map, normalizer),
        Value::Array(rows) => from_array(rows, normalizer)?,
        other => {
            return Err(malformed(format!(
                "expected object or array, got {}",
                type_name(&other)
            )))
        }
    };

    Ok(JsonPrices { source, prices })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Splits the backend envelope into `(source, body)`. Payloads without an
/// envelope are returned unchanged.
fn unwrap_envelope(value: Value) -> Result<(Option<String>, Value), PricingError> {
    let mut map = match value {
        Value::Object(map) => map,
        other => return Ok((None, other)),
    };

    let success = map.get("success").and_then(Value::as_bool);
    if success == Some(false) {
        let message = map
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("price source reported failure");
        return Err(malformed(message.to_string()));
    }

    let body_key = ENVELOPE_KEYS
        .iter()
        .find(|key| matches!(map.get(**key), Some(Value::Object(_) | Value::Array(_))));

    match body_key {
        Some(key) => {
            let source = map
                .get("source")
                .and_then(Value::as_str)
                .map(str::to_string);
            let body = map.remove(*key).unwrap_or(Value::Null);
            Ok((source, body))
        }
        None if success.is_some() => Err(malformed("envelope has no products")),
        None => Ok((None, Value::Object(map))),
    }
}

fn field<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .find_map(|name| obj.get(*name).filter(|v| !v.is_null()))
}

fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn from_object(
    map: &Map<String, Value>,
    normalizer: &ProductKeyNormalizer,
) -> BTreeMap<String, f64> {
    let mut prices = BTreeMap::new();

    for (key, value) in map {
        let (product_id, price) = match value {
            Value::Object(inner) => {
                let product_id = normalizer.normalize(key).or_else(|| {
                    field(inner, ID_FIELDS)
                        .and_then(id_text)
                        .and_then(|raw| normalizer.normalize(&raw))
                });
                (product_id, field(inner, PRICE_FIELDS).and_then(parse_price))
            }
            other => (normalizer.normalize(key), parse_price(other)),
        };

        match (product_id, price) {
            (Some(id), Some(price)) => {
                prices.insert(id, price);
            }
            (None, _) => tracing::debug!(key = %key, "dropping unknown product key"),
            (Some(id), None) => tracing::debug!(product_id = %id, "dropping entry without price"),
        }
    }

    prices
}

fn from_array(
    rows: Vec<Value>,
    normalizer: &ProductKeyNormalizer,
) -> Result<BTreeMap<String, f64>, PricingError> {
    if rows.iter().any(Value::is_array) {
        let table_rows = rows
            .into_iter()
            .filter_map(|row| match row {
                Value::Array(cells) => Some(cells.iter().map(cell_text).collect()),
                _ => None,
            })
            .collect();
        return tabular::extract_prices(&Table::with_header_row(table_rows), normalizer);
    }

    let mut prices = BTreeMap::new();
    for (index, row) in rows.iter().enumerate() {
        let Value::Object(obj) = row else {
            tracing::debug!(index, "skipping non-object price row");
            continue;
        };
        let product_id = field(obj, ID_FIELDS)
            .and_then(id_text)
            .and_then(|raw| normalizer.normalize(&raw));
        let price = field(obj, PRICE_FIELDS).and_then(parse_price);

        match (product_id, price) {
            (Some(id), Some(price)) => {
                prices.insert(id, price);
            }
            _ => tracing::debug!(index, "skipping price row without resolvable id or price"),
        }
    }

    Ok(prices)
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
