use thiserror::Error;

use crate::parse::SourceFormat;

#[derive(Debug, Error)]
pub enum PricingError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("access denied ({status}) by price source {url}")]
    AccessDenied { status: u16, url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("price source {url} timed out")]
    Timeout { url: String },

    #[error("malformed {format} price payload: {reason}")]
    MalformedPayload {
        format: SourceFormat,
        reason: String,
    },

    #[error("unsupported price payload format")]
    UnsupportedFormat,

    #[error("no usable product/price columns in tabular payload")]
    NoUsableColumns,

    #[error("price source {url} returned no usable prices")]
    EmptyPriceMap { url: String },

    #[error("all {attempts} price sources failed")]
    AllCandidatesFailed { attempts: usize },

    #[error("no price source candidates configured")]
    NoCandidates,

    #[error("no usable price for product {product_id}")]
    MissingPrice { product_id: String },

    #[error("unknown package template: {0}")]
    UnknownTemplate(String),

    #[error("no priceable items left in selection")]
    NoPriceableItems,
}

impl PricingError {
    /// Short machine-readable reason used in structured logs.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            PricingError::AccessDenied { .. } => "access_denied",
            PricingError::UnexpectedStatus { .. } => "http_status",
            PricingError::Timeout { .. } => "timeout",
            PricingError::Http(_) => "network",
            PricingError::MalformedPayload { .. }
            | PricingError::UnsupportedFormat
            | PricingError::NoUsableColumns => "parse",
            PricingError::EmptyPriceMap { .. } => "empty",
            PricingError::AllCandidatesFailed { .. } | PricingError::NoCandidates => "exhausted",
            PricingError::MissingPrice { .. }
            | PricingError::UnknownTemplate(_)
            | PricingError::NoPriceableItems => "pricing",
        }
    }
}
