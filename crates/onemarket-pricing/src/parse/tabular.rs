//! Column detection and row extraction shared by the CSV and Gviz decoders.

use std::collections::BTreeMap;

use crate::error::PricingError;
use crate::normalize::{fold_key, ProductKeyNormalizer};

use super::number::parse_price_str;

/// Header tokens naming the product identity column.
const ID_TOKENS: &[&str] = &[
    "product",
    "productid",
    "item",
    "code",
    "sku",
    "id",
    "key",
    "name",
    "منتج",
    "المنتج",
    "صنف",
    "الصنف",
    "اسم",
    "الاسم",
    "كود",
];

/// Header tokens naming the price column.
const PRICE_TOKENS: &[&str] = &[
    "price",
    "unitprice",
    "cost",
    "value",
    "amount",
    "سعر",
    "السعر",
    "ثمن",
    "الثمن",
    "قيمه",
    "القيمه",
];

/// A decoded table: optional header labels plus data rows.
#[derive(Debug, Default, Clone)]
pub(crate) struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Splits the first row off as the header.
    pub(crate) fn with_header_row(mut rows: Vec<Vec<String>>) -> Self {
        if rows.is_empty() {
            return Self::default();
        }
        let header = rows.remove(0);
        Self { header, rows }
    }

    fn width(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.header.len()))
            .max()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Columns {
    pub id: usize,
    pub price: usize,
    /// `false` when no header cell matched a known token, in which case the
    /// header row is really data.
    pub header_recognized: bool,
}

fn header_key(cell: &str) -> String {
    fold_key(cell).replace('_', "")
}

/// Finds the first header cell equal to a token. Failing that, the first
/// cell with a whole word equal to a token (`Price (EGP)`, `سعر الكيلو`).
fn find_column(header: &[String], tokens: &[&str], skip: Option<usize>) -> Option<usize> {
    let folded: Vec<String> = header.iter().map(|h| fold_key(h)).collect();
    let folded_tokens: Vec<String> = tokens.iter().map(|t| header_key(t)).collect();

    let candidates = || {
        folded
            .iter()
            .enumerate()
            .filter(move |(i, _)| Some(*i) != skip)
    };

    candidates()
        .find(|(_, key)| {
            let joined = key.replace('_', "");
            folded_tokens.iter().any(|t| *t == joined)
        })
        .or_else(|| {
            candidates().find(|(_, key)| {
                key.split('_')
                    .any(|word| folded_tokens.iter().any(|t| t == word))
            })
        })
        .map(|(i, _)| i)
}

/// Picks the id and price columns from the header.
///
/// # Errors
///
/// Returns [`PricingError::NoUsableColumns`] when the table has fewer than two
/// columns.
pub(crate) fn detect_columns(table: &Table) -> Result<Columns, PricingError> {
    let width = table.width();
    if width < 2 {
        return Err(PricingError::NoUsableColumns);
    }

    let price = find_column(&table.header, PRICE_TOKENS, None);
    let id = find_column(&table.header, ID_TOKENS, price);
    let header_recognized = price.is_some() || id.is_some();

    let first_other = |taken: usize| (0..width).find(|i| *i != taken).unwrap_or(0);

    let (id, price) = match (id, price) {
        (Some(id), Some(price)) => (id, price),
        (Some(id), None) => (id, first_other(id)),
        (None, Some(price)) => (first_other(price), price),
        (None, None) => (0, 1),
    };

    Ok(Columns {
        id,
        price,
        header_recognized,
    })
}

/// Extracts `{canonical id: price}` pairs from a table.
///
/// Rows whose id does not resolve or whose price does not parse are skipped.
///
/// # Errors
///
/// Returns [`PricingError::NoUsableColumns`] when columns cannot be chosen.
pub(crate) fn extract_prices(
    table: &Table,
    normalizer: &ProductKeyNormalizer,
) -> Result<BTreeMap<String, f64>, PricingError> {
    let columns = detect_columns(table)?;
    tracing::debug!(
        id_column = columns.id,
        price_column = columns.price,
        header_recognized = columns.header_recognized,
        "detected price table columns"
    );

    let header_as_row = (!columns.header_recognized).then_some(&table.header);
    let mut prices = BTreeMap::new();

    for row in header_as_row.into_iter().chain(table.rows.iter()) {
        let Some(raw_id) = row.get(columns.id) else {
            continue;
        };
        let Some(product_id) = normalizer.normalize(raw_id) else {
            if !raw_id.trim().is_empty() {
                tracing::debug!(raw_id = %raw_id, "dropping unknown product key");
            }
            continue;
        };
        let Some(price) = row.get(columns.price).and_then(|cell| parse_price_str(cell)) else {
            continue;
        };
        prices.insert(product_id, price);
    }

    Ok(prices)
}
