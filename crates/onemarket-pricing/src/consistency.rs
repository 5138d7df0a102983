//! Keeps user-facing item sets priceable.

use crate::engine::Items;
use crate::store::CatalogStore;

/// Keeps only entries with a positive quantity whose product has a finite,
/// strictly positive price.
#[must_use]
pub fn filter_priceable(catalog: &CatalogStore, items: &Items) -> Items {
    items
        .iter()
        .filter(|(id, qty)| qty.is_finite() && **qty > 0.0 && catalog.price_of(id).is_some())
        .map(|(id, qty)| (id.clone(), *qty))
        .collect()
}
