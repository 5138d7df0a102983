//! Price payload decoding.
//!
//! A raw response is first classified into a [`SourceFormat`] by cheap content
//! sniffing, then handed to the matching decoder. Every decoder converges on
//! [`ParsedPrices`].

mod delimited;
mod gviz;
mod json;
pub mod number;
mod tabular;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::PricingError;
use crate::normalize::ProductKeyNormalizer;

pub use number::{parse_price, parse_price_str};

/// Wire format of a price payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Gviz,
    Json,
    Csv,
    Unsupported,
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceFormat::Gviz => write!(f, "gviz"),
            SourceFormat::Json => write!(f, "json"),
            SourceFormat::Csv => write!(f, "csv"),
            SourceFormat::Unsupported => write!(f, "unsupported"),
        }
    }
}

/// Decoded price payload keyed by canonical product id.
///
/// Values are finite but may be zero or negative: such entries never become
/// product prices, but they mark the product as mentioned for template pruning.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedPrices {
    pub source: String,
    pub prices: BTreeMap<String, f64>,
}

impl ParsedPrices {
    /// Number of entries carrying a usable (finite, positive) price.
    #[must_use]
    pub fn usable_count(&self) -> usize {
        self.prices
            .values()
            .filter(|p| p.is_finite() && **p > 0.0)
            .count()
    }
}

/// Classifies a response body. Content sniffing takes priority over the
/// content type for the gviz wrapper.
#[must_use]
pub fn classify(text: &str, content_type: Option<&str>) -> SourceFormat {
    let content_type = content_type.unwrap_or_default().to_ascii_lowercase();
    let trimmed = text.trim_start_matches('\u{FEFF}').trim_start();

    if text.contains(gviz::GVIZ_MARKER) {
        SourceFormat::Gviz
    } else if content_type.contains("json") || trimmed.starts_with('{') || trimmed.starts_with('[')
    {
        SourceFormat::Json
    } else if content_type.contains("csv") || text.contains(',') {
        SourceFormat::Csv
    } else {
        SourceFormat::Unsupported
    }
}

/// Decodes a price payload into canonical `{product id: price}` pairs.
///
/// `source` is the envelope's `source` field when present, otherwise the
/// format tag.
///
/// # Errors
///
/// - [`PricingError::MalformedPayload`] when the detected format cannot be decoded.
/// - [`PricingError::NoUsableColumns`] when a table has no id/price column pair.
/// - [`PricingError::UnsupportedFormat`] when the body matches no known format.
pub fn parse_payload(
    text: &str,
    content_type: Option<&str>,
    normalizer: &ProductKeyNormalizer,
) -> Result<ParsedPrices, PricingError> {
    let format = classify(text, content_type);
    tracing::debug!(%format, bytes = text.len(), "decoding price payload");

    let (source, prices) = match format {
        SourceFormat::Gviz => {
            let table = gviz::decode(text)?;
            (None, tabular::extract_prices(&table, normalizer)?)
        }
        SourceFormat::Json => {
            let decoded = json::decode(text, normalizer)?;
            (decoded.source, decoded.prices)
        }
        SourceFormat::Csv => {
            let table = delimited::decode(text)?;
            (None, tabular::extract_prices(&table, normalizer)?)
        }
        SourceFormat::Unsupported => return Err(PricingError::UnsupportedFormat),
    };

    Ok(ParsedPrices {
        source: source.unwrap_or_else(|| format.to_string()),
        prices,
    })
}
