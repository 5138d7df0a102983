pub mod cart;
pub mod checkout;
pub mod client;
pub mod dedup;
pub mod error;
pub mod history;
pub mod types;
pub mod validate;
pub mod whatsapp;

#[cfg(test)]
mod fixtures;

pub use cart::{on_prices_updated, CartPackage, PricedCart, CUSTOM_PACKAGE_ID};
pub use checkout::{
    build_payload, checkout, summary_lines, CheckoutReceipt, CheckoutRequest, OrderSettings,
};
pub use client::OrderClient;
pub use error::OrderError;
pub use history::{OrderHistory, OrderHistoryEntry, SubmissionStatus, HISTORY_CAPACITY};
pub use types::{CustomerDetails, OrderAck, OrderPayload, PaymentMethod};
pub use whatsapp::{order_confirmation, order_notification, whatsapp_url};
