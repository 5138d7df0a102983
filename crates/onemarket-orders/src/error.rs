use thiserror::Error;

use onemarket_core::StorageError;
use onemarket_pricing::PricingError;

/// Errors returned by cart, checkout and order submission.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("name must be 3-100 characters")]
    InvalidName,

    #[error("phone number must have 11 or 12 digits")]
    InvalidPhone,

    #[error("address must be 10-500 characters")]
    InvalidAddress,

    #[error("invalid quantity {quantity} for {product_id}")]
    InvalidQuantity { product_id: String, quantity: f64 },

    #[error("invalid package weight {0}")]
    InvalidWeight(f64),

    #[error("invalid order price {0}")]
    InvalidPrice(f64),

    #[error("Vodafone Cash payments need the sender number")]
    MissingVodafoneSender,

    #[error("Vodafone Cash payments need the transfer reference")]
    MissingPaymentRef,

    #[error("the cart is empty")]
    EmptyCart,

    #[error("an identical order was submitted in the last few minutes")]
    Duplicate,

    /// The order endpoint answered with a non-2xx status. `message` is the
    /// server's own message when it sent one.
    #[error("order rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("invalid order API base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl OrderError {
    /// `true` for failures the customer can fix by retrying later without
    /// changing their input.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            OrderError::Http(_) => true,
            OrderError::Rejected { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
