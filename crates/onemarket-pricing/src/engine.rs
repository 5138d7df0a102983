//! Package pricing: item-set totals, weights and proportional scaling.

use std::collections::BTreeMap;

use crate::error::PricingError;
use crate::store::CatalogStore;

/// `{product id: quantity}`.
pub type Items = BTreeMap<String, f64>;

/// An item set together with its computed price.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedItems {
    pub items: Items,
    pub price: f64,
}

/// Rounds half away from zero to `decimals` places.
#[must_use]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

/// Prices an item set: `round(Σ unit_price × qty)` to the whole currency unit.
///
/// # Errors
///
/// Returns [`PricingError::MissingPrice`] for the first product (in id order)
/// without a usable unit price. Callers are expected to filter with
/// [`crate::consistency::filter_priceable`] first.
pub fn price_items(catalog: &CatalogStore, items: &Items) -> Result<f64, PricingError> {
    let mut total = 0.0;
    for (product_id, qty) in items {
        let price = catalog
            .price_of(product_id)
            .ok_or_else(|| PricingError::MissingPrice {
                product_id: product_id.clone(),
            })?;
        total += price * qty;
    }
    Ok(total.round())
}

/// Sums quantities of by-weight products, rounded to two decimals.
/// Unknown products and discrete units are ignored.
#[must_use]
pub fn total_weight(catalog: &CatalogStore, items: &Items) -> f64 {
    let sum: f64 = items
        .iter()
        .filter(|(id, _)| catalog.product(id).is_some_and(|p| p.unit.is_by_weight()))
        .map(|(_, qty)| qty)
        .sum();
    round_to(sum, 2)
}

/// Scales a template-derived item set to `target_weight` kilograms.
///
/// A single factor `target_weight / total_weight(base)` is applied to every
/// item (a zero base weight counts as 1). Quantities are rounded to two
/// decimals and items that round to zero or below are dropped, then the
/// result is priced.
///
/// # Errors
///
/// Propagates [`PricingError::MissingPrice`] from [`price_items`].
pub fn scale_to_weight(
    catalog: &CatalogStore,
    base: &Items,
    target_weight: f64,
) -> Result<PricedItems, PricingError> {
    let base_weight = total_weight(catalog, base);
    let base_weight = if base_weight.abs() < f64::EPSILON {
        1.0
    } else {
        base_weight
    };
    let factor = target_weight / base_weight;

    let items: Items = base
        .iter()
        .map(|(id, qty)| (id.clone(), round_to(qty * factor, 2)))
        .filter(|(_, qty)| *qty > 0.0)
        .collect();

    let price = price_items(catalog, &items)?;
    Ok(PricedItems { items, price })
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;
