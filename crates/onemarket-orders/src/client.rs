//! HTTP client for the storefront backend's order endpoint.
//!
//! Wraps `reqwest` with order-specific error handling: non-2xx replies
//! surface the server's own `message` as [`OrderError::Rejected`].

use std::time::Duration;

use reqwest::{Client, Url};

use crate::error::OrderError;
use crate::types::{OrderAck, OrderPayload, OrderResponse};

const ORDERS_PATH: &str = "api/orders";

/// Client for `POST <api-base>/api/orders`.
pub struct OrderClient {
    client: Client,
    base_url: Url,
}

impl OrderClient {
    /// Creates a client pointed at `api_base`.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`OrderError::InvalidBaseUrl`] if
    /// `api_base` is not a valid URL.
    pub fn new(api_base: &str, timeout_secs: u64, user_agent: &str) -> Result<Self, OrderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        // Exactly one trailing slash so `join` appends instead of replacing
        // the last path segment.
        let normalised = format!("{}/", api_base.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| OrderError::InvalidBaseUrl {
            url: api_base.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self { client, base_url })
    }

    #[must_use]
    pub fn orders_url(&self) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(&format!("{}{ORDERS_PATH}", self.base_url.path()));
        url
    }

    /// Posts one order.
    ///
    /// # Errors
    ///
    /// - [`OrderError::Rejected`] on a non-2xx status, carrying the server's
    ///   `message` (or `error`) when present.
    /// - [`OrderError::Http`] on network failure.
    pub async fn submit(&self, payload: &OrderPayload) -> Result<OrderAck, OrderError> {
        let url = self.orders_url();
        let response = self.client.post(url.clone()).json(payload).send().await?;
        let status = response.status();
        let body = response.text().await?;
        let parsed: OrderResponse = serde_json::from_str(&body).unwrap_or_default();

        if !status.is_success() {
            let message = parsed
                .message
                .or(parsed.error)
                .unwrap_or_else(|| format!("server error ({})", status.as_u16()));
            tracing::warn!(url = %url, status = status.as_u16(), message = %message, "order rejected");
            return Err(OrderError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let ack = OrderAck {
            order_id: parsed.order_id(),
            message: parsed.message,
        };
        tracing::info!(url = %url, order_id = ?ack.order_id, "order submitted");
        Ok(ack)
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
