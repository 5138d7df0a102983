//! Submitted-order log used to reject accidental double submissions.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use onemarket_core::{keys, KeyValueStore};

use crate::error::OrderError;
use crate::types::CustomerDetails;

/// Entries kept in the log.
pub const DEDUP_LOG_CAPACITY: usize = 50;
/// Window in which an identical order counts as a duplicate.
pub const DEDUP_WINDOW_MINUTES: i64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedOrder {
    pub hash: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
struct Fingerprint<'a> {
    name: &'a str,
    phone: &'a str,
    address: &'a str,
    price: f64,
}

/// Hex SHA-256 of `{name, phone, address, price}`.
#[must_use]
pub fn order_hash(customer: &CustomerDetails, price: f64) -> String {
    let fingerprint = Fingerprint {
        name: &customer.name,
        phone: &customer.phone,
        address: &customer.address,
        price,
    };
    // Serializing a struct of strings and a float cannot fail.
    let json = serde_json::to_vec(&fingerprint).unwrap_or_default();
    let digest = Sha256::digest(&json);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn load<S: KeyValueStore + ?Sized>(store: &S) -> Result<Vec<SubmittedOrder>, OrderError> {
    let Some(raw) = store.get(keys::ORDERS_SUBMITTED)? else {
        return Ok(Vec::new());
    };
    Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "discarding unreadable submitted-order log");
        Vec::new()
    }))
}

/// `true` if `hash` was recorded less than five minutes before `now`.
///
/// # Errors
///
/// Returns [`OrderError::Storage`] if the store fails.
pub fn is_duplicate<S: KeyValueStore + ?Sized>(
    store: &S,
    hash: &str,
    now: DateTime<Utc>,
) -> Result<bool, OrderError> {
    let window = Duration::minutes(DEDUP_WINDOW_MINUTES);
    Ok(load(store)?
        .iter()
        .any(|order| order.hash == hash && now - order.timestamp < window))
}

/// Appends `hash` and trims the log to the last [`DEDUP_LOG_CAPACITY`]
/// entries.
///
/// # Errors
///
/// Returns [`OrderError::Storage`] if the store fails.
pub fn record<S: KeyValueStore + ?Sized>(
    store: &mut S,
    hash: &str,
    now: DateTime<Utc>,
) -> Result<(), OrderError> {
    let mut orders = load(store)?;
    orders.push(SubmittedOrder {
        hash: hash.to_string(),
        timestamp: now,
    });
    if orders.len() > DEDUP_LOG_CAPACITY {
        orders.drain(..orders.len() - DEDUP_LOG_CAPACITY);
    }
    let json = serde_json::to_string(&orders).map_err(|e| OrderError::Deserialize {
        context: "submitted-order log".to_string(),
        source: e,
    })?;
    store.set(keys::ORDERS_SUBMITTED, &json)?;
    Ok(())
}
