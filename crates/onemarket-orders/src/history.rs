//! Rolling order history kept in the durable store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use onemarket_core::{keys, KeyValueStore};

use crate::cart::CartPackage;
use crate::error::OrderError;
use crate::types::CustomerDetails;

pub const HISTORY_CAPACITY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Submitted,
    Failed,
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmissionStatus::Submitted => write!(f, "submitted"),
            SubmissionStatus::Failed => write!(f, "failed"),
        }
    }
}

/// The only mutable part of a history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub status: SubmissionStatus,
    pub attempts: u32,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub last_error: Option<String>,
}

/// Snapshot of one checkout attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderHistoryEntry {
    pub id: Uuid,
    /// Dedup fingerprint, used to find a failed entry when the same order is
    /// retried.
    pub order_hash: String,
    pub created_at: DateTime<Utc>,
    pub customer: CustomerDetails,
    pub package: CartPackage,
    pub subtotal: f64,
    pub delivery_fee: f64,
    pub total: f64,
    pub payment_method: String,
    pub payment_ref: String,
    pub vodafone_sender: String,
    pub expected_ready_at: DateTime<Utc>,
    pub submission: Submission,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderHistory {
    entries: Vec<OrderHistoryEntry>,
}

impl OrderHistory {
    /// # Errors
    ///
    /// Returns [`OrderError::Storage`] if the store fails. Unreadable JSON is
    /// logged and treated as an empty history.
    pub fn load<S: KeyValueStore + ?Sized>(store: &S) -> Result<Self, OrderError> {
        let Some(raw) = store.get(keys::ORDER_HISTORY)? else {
            return Ok(Self::default());
        };
        let entries = serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "discarding unreadable order history");
            Vec::new()
        });
        Ok(Self { entries })
    }

    /// # Errors
    ///
    /// Returns [`OrderError::Storage`] if the store fails.
    pub fn save<S: KeyValueStore + ?Sized>(&self, store: &mut S) -> Result<(), OrderError> {
        let json = serde_json::to_string(&self.entries).map_err(|e| OrderError::Deserialize {
            context: "order history".to_string(),
            source: e,
        })?;
        store.set(keys::ORDER_HISTORY, &json)?;
        Ok(())
    }

    /// Oldest first.
    #[must_use]
    pub fn entries(&self) -> &[OrderHistoryEntry] {
        &self.entries
    }

    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<&OrderHistoryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Most recent failed entry with this fingerprint.
    #[must_use]
    pub fn latest_failed(&self, order_hash: &str) -> Option<&OrderHistoryEntry> {
        self.entries.iter().rev().find(|e| {
            e.order_hash == order_hash && e.submission.status == SubmissionStatus::Failed
        })
    }

    /// Appends an entry, evicting the oldest beyond [`HISTORY_CAPACITY`].
    pub fn push(&mut self, entry: OrderHistoryEntry) {
        self.entries.push(entry);
        if self.entries.len() > HISTORY_CAPACITY {
            let excess = self.entries.len() - HISTORY_CAPACITY;
            self.entries.drain(..excess);
        }
    }

    /// Updates the submission status of entry `id` after a retry. Returns
    /// `false` if no such entry is kept.
    pub fn mark_status(
        &mut self,
        id: Uuid,
        status: SubmissionStatus,
        order_id: Option<String>,
        error: Option<String>,
        now: DateTime<Utc>,
    ) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|e| e.id == id) else {
            return false;
        };
        let submission = &mut entry.submission;
        submission.status = status;
        submission.attempts += 1;
        submission.updated_at = now;
        if order_id.is_some() {
            submission.order_id = order_id;
        }
        submission.last_error = error;
        tracing::debug!(%id, %status, attempts = submission.attempts, "order history status updated");
        true
    }
}

#[cfg(test)]
mod tests {
    use onemarket_core::MemoryStore;

    use super::*;
    use crate::cart::PricedCart;
    use crate::fixtures::catalog;

    fn entry(hash: &str, status: SubmissionStatus) -> OrderHistoryEntry {
        let catalog = catalog(&[("tomato", 10.0), ("potato", 8.0)]);
        let mut cart = PricedCart::empty();
        let package = cart.select_package(&catalog, "half", None).unwrap().clone();
        let now = Utc::now();
        OrderHistoryEntry {
            id: Uuid::new_v4(),
            order_hash: hash.to_string(),
            created_at: now,
            customer: CustomerDetails {
                name: "محمد أحمد".to_string(),
                phone: "01012345678".to_string(),
                address: "القاهرة - مدينة نصر".to_string(),
            },
            subtotal: package.price,
            delivery_fee: 0.0,
            total: package.price,
            package,
            payment_method: "الدفع عند الاستلام".to_string(),
            payment_ref: String::new(),
            vodafone_sender: String::new(),
            expected_ready_at: now,
            submission: Submission {
                status,
                attempts: 1,
                updated_at: now,
                order_id: None,
                last_error: None,
            },
        }
    }

    #[test]
    fn push_evicts_oldest_beyond_capacity() {
        let mut history = OrderHistory::default();
        for i in 0..HISTORY_CAPACITY + 3 {
            history.push(entry(&format!("h{i}"), SubmissionStatus::Submitted));
        }
        assert_eq!(history.entries().len(), HISTORY_CAPACITY);
        assert_eq!(history.entries()[0].order_hash, "h3");
    }

    #[test]
    fn mark_status_only_touches_submission() {
        let mut history = OrderHistory::default();
        let failed = entry("h1", SubmissionStatus::Failed);
        let id = failed.id;
        history.push(failed.clone());

        assert_eq!(history.latest_failed("h1").map(|e| e.id), Some(id));
        assert!(history.mark_status(
            id,
            SubmissionStatus::Submitted,
            Some("42".to_string()),
            None,
            Utc::now()
        ));

        let updated = history.get(id).unwrap();
        assert_eq!(updated.submission.status, SubmissionStatus::Submitted);
        assert_eq!(updated.submission.attempts, 2);
        assert_eq!(updated.submission.order_id.as_deref(), Some("42"));
        assert_eq!(updated.package, failed.package);
        assert!(history.latest_failed("h1").is_none());

        assert!(!history.mark_status(
            Uuid::new_v4(),
            SubmissionStatus::Failed,
            None,
            None,
            Utc::now()
        ));
    }

    #[test]
    fn history_round_trips_through_the_store() {
        let mut store = MemoryStore::new();
        let mut history = OrderHistory::default();
        history.push(entry("h1", SubmissionStatus::Failed));
        history.save(&mut store).unwrap();

        let raw = store.get(keys::ORDER_HISTORY).unwrap().unwrap();
        assert!(raw.contains("\"status\":\"failed\""));
        assert_eq!(OrderHistory::load(&store).unwrap(), history);
    }
}
