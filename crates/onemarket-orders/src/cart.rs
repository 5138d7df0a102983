//! The priced cart package: the customer's single active selection.
//!
//! Every flow that changes the item set recomputes `price` from the current
//! catalog before returning, so a [`CartPackage`] read from [`PricedCart`] is
//! never priced against stale data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use onemarket_core::{keys, KeyValueStore};
use onemarket_pricing::{
    filter_priceable, price_items, scale_to_weight, CatalogStore, Items, PricingError,
};

use crate::error::OrderError;
use crate::types::ONE_OFF_LABEL;
use crate::validate::{validate_quantity, MAX_QUANTITY};

pub const CUSTOM_PACKAGE_ID: &str = "custom";
const CUSTOM_PACKAGE_NAME: &str = "مخصصة";
const CUSTOM_PACKAGE_EMOJI: &str = "⚙️";
const CUSTOM_DELIVERY_DAYS: u32 = 1;

/// Persisted cart contents. Stored as camelCase JSON under
/// [`keys::CURRENT_PACKAGE`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartPackage {
    /// Template id, or [`CUSTOM_PACKAGE_ID`].
    pub id: String,
    pub name: String,
    pub emoji: String,
    pub frequency: String,
    pub delivery_days: u32,
    pub items: Items,
    /// Rounded total for `items` at current prices.
    pub price: f64,
    pub is_recurring: bool,
    pub created_at: DateTime<Utc>,
}

impl CartPackage {
    /// `"<emoji> <name> <qty> <unit>"` per item, skipping products the
    /// catalog no longer knows.
    #[must_use]
    pub fn detail_lines(&self, catalog: &CatalogStore) -> Vec<String> {
        self.items
            .iter()
            .filter_map(|(id, qty)| catalog.product(id).map(|p| p.display_line(*qty)))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PricedCart {
    package: Option<CartPackage>,
}

impl PricedCart {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Reads the stored cart. Unreadable JSON is logged and treated as an
    /// empty cart.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Storage`] if the store itself fails.
    pub fn load<S: KeyValueStore + ?Sized>(store: &S) -> Result<Self, OrderError> {
        let Some(raw) = store.get(keys::CURRENT_PACKAGE)? else {
            return Ok(Self::empty());
        };
        match serde_json::from_str::<CartPackage>(&raw) {
            Ok(package) => Ok(Self {
                package: Some(package),
            }),
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable stored cart");
                Ok(Self::empty())
            }
        }
    }

    /// Writes the cart to its single slot, removing the key when empty.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Storage`] if the store fails.
    pub fn save<S: KeyValueStore + ?Sized>(&self, store: &mut S) -> Result<(), OrderError> {
        match &self.package {
            Some(package) => {
                let json =
                    serde_json::to_string(package).map_err(|e| OrderError::Deserialize {
                        context: "cart package".to_string(),
                        source: e,
                    })?;
                store.set(keys::CURRENT_PACKAGE, &json)?;
            }
            None => store.remove(keys::CURRENT_PACKAGE)?,
        }
        Ok(())
    }

    #[must_use]
    pub fn package(&self) -> Option<&CartPackage> {
        self.package.as_ref()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.package.is_none()
    }

    pub fn clear(&mut self) {
        self.package = None;
    }

    /// Puts a template in the cart, using `overrides` instead of the
    /// template's own quantities when given. Items that cannot be priced are
    /// dropped first.
    ///
    /// # Errors
    ///
    /// - [`PricingError::UnknownTemplate`] for an unknown `template_id`.
    /// - [`OrderError::InvalidQuantity`] for an override outside `(0, 1000]`.
    /// - [`PricingError::NoPriceableItems`] if nothing is left to price.
    pub fn select_package(
        &mut self,
        catalog: &CatalogStore,
        template_id: &str,
        overrides: Option<&Items>,
    ) -> Result<&CartPackage, OrderError> {
        let template = catalog
            .template(template_id)
            .ok_or_else(|| PricingError::UnknownTemplate(template_id.to_string()))?;

        if let Some(overrides) = overrides {
            check_quantities(overrides.iter().filter(|(_, qty)| **qty != 0.0))?;
        }
        let items = filter_priceable(catalog, overrides.unwrap_or(&template.items));
        if items.is_empty() {
            return Err(PricingError::NoPriceableItems.into());
        }
        let price = price_items(catalog, &items)?;

        tracing::debug!(template = template_id, items = items.len(), price, "selected package");
        Ok(&*self.package.insert(CartPackage {
            id: template.id.clone(),
            name: template.name.clone(),
            emoji: template.emoji.clone(),
            frequency: template.frequency.clone(),
            delivery_days: template.delivery_days,
            items,
            price,
            is_recurring: false,
            created_at: Utc::now(),
        }))
    }

    /// Scales a template's priceable items to `target_weight` kilograms.
    ///
    /// # Errors
    ///
    /// - [`OrderError::InvalidWeight`] unless `0 < target_weight <= 1000`.
    /// - [`PricingError::UnknownTemplate`] for an unknown `template_id`.
    /// - [`PricingError::NoPriceableItems`] if nothing is left to price.
    pub fn customize_package(
        &mut self,
        catalog: &CatalogStore,
        template_id: &str,
        target_weight: f64,
        is_recurring: bool,
    ) -> Result<&CartPackage, OrderError> {
        if !validate_quantity(target_weight) {
            return Err(OrderError::InvalidWeight(target_weight));
        }
        let template = catalog
            .template(template_id)
            .ok_or_else(|| PricingError::UnknownTemplate(template_id.to_string()))?;

        let base = filter_priceable(catalog, &template.items);
        if base.is_empty() {
            return Err(PricingError::NoPriceableItems.into());
        }
        let scaled = scale_to_weight(catalog, &base, target_weight)?;
        if scaled.items.is_empty() {
            return Err(PricingError::NoPriceableItems.into());
        }

        tracing::debug!(
            template = template_id,
            target_weight,
            price = scaled.price,
            "customized package"
        );
        Ok(&*self.package.insert(CartPackage {
            id: template.id.clone(),
            name: template.name.clone(),
            emoji: template.emoji.clone(),
            frequency: template.frequency.clone(),
            delivery_days: template.delivery_days,
            items: scaled.items,
            price: scaled.price,
            is_recurring,
            created_at: Utc::now(),
        }))
    }

    /// Builds a free-form package. Zero quantities are skipped.
    ///
    /// # Errors
    ///
    /// - [`OrderError::InvalidQuantity`] for a negative, non-finite or
    ///   too-large quantity.
    /// - [`OrderError::EmptyCart`] if no quantity is positive.
    /// - [`PricingError::MissingPrice`] if a chosen product has no price.
    pub fn custom_package(
        &mut self,
        catalog: &CatalogStore,
        items: &Items,
    ) -> Result<&CartPackage, OrderError> {
        check_quantities(items.iter().filter(|(_, qty)| **qty != 0.0))?;
        let items: Items = items
            .iter()
            .filter(|(_, qty)| **qty > 0.0)
            .map(|(id, qty)| (id.clone(), *qty))
            .collect();
        if items.is_empty() {
            return Err(OrderError::EmptyCart);
        }
        let price = price_items(catalog, &items)?;

        Ok(&*self.package.insert(CartPackage {
            id: CUSTOM_PACKAGE_ID.to_string(),
            name: CUSTOM_PACKAGE_NAME.to_string(),
            emoji: CUSTOM_PACKAGE_EMOJI.to_string(),
            frequency: ONE_OFF_LABEL.to_string(),
            delivery_days: CUSTOM_DELIVERY_DAYS,
            items,
            price,
            is_recurring: false,
            created_at: Utc::now(),
        }))
    }

    /// Adopts another template's delivery interval and frequency label while
    /// keeping the cart's own items.
    ///
    /// # Errors
    ///
    /// - [`OrderError::EmptyCart`] if the cart is empty.
    /// - [`PricingError::UnknownTemplate`] for an unknown `template_id`.
    /// - [`PricingError::NoPriceableItems`] if no item has a price any more;
    ///   the cart is cleared.
    pub fn change_frequency(
        &mut self,
        catalog: &CatalogStore,
        template_id: &str,
    ) -> Result<&CartPackage, OrderError> {
        let template = catalog
            .template(template_id)
            .ok_or_else(|| PricingError::UnknownTemplate(template_id.to_string()))?;
        let current = self.package.as_ref().ok_or(OrderError::EmptyCart)?;

        let items = filter_priceable(catalog, &current.items);
        if items.is_empty() {
            tracing::warn!(template = template_id, "no cart item has a price; clearing cart");
            self.package = None;
            return Err(PricingError::NoPriceableItems.into());
        }
        let package = self.package.as_mut().ok_or(OrderError::EmptyCart)?;
        package.price = price_items(catalog, &items)?;
        package.items = items;
        package.delivery_days = template.delivery_days;
        package.frequency.clone_from(&template.frequency);
        Ok(&*package)
    }

    /// Removes one item and reprices the rest. Remaining items that lost
    /// their price are dropped too; the cart is cleared when nothing is left.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Pricing`] if pricing the remaining items fails.
    pub fn remove_item(
        &mut self,
        catalog: &CatalogStore,
        product_id: &str,
    ) -> Result<Option<&CartPackage>, OrderError> {
        let Some(package) = self.package.as_mut() else {
            return Ok(None);
        };
        if package.items.remove(product_id).is_none() {
            return Ok(self.package.as_ref());
        }
        let items = filter_priceable(catalog, &package.items);
        if items.is_empty() {
            tracing::debug!(product_id, "removed last priced item; clearing cart");
            self.package = None;
            return Ok(None);
        }
        package.price = price_items(catalog, &items)?;
        package.items = items;
        Ok(self.package.as_ref())
    }

    /// Recomputes the price after a price refresh. Items whose product lost
    /// its price are dropped; the cart is cleared if none remain.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Pricing`] if pricing the remaining items fails.
    pub fn reprice(&mut self, catalog: &CatalogStore) -> Result<Option<&CartPackage>, OrderError> {
        let Some(package) = self.package.as_mut() else {
            return Ok(None);
        };
        let items = filter_priceable(catalog, &package.items);
        let dropped = package.items.len() - items.len();
        if dropped > 0 {
            tracing::warn!(dropped, "cart items lost their price");
        }
        if items.is_empty() {
            self.package = None;
            return Ok(None);
        }
        package.price = price_items(catalog, &items)?;
        package.items = items;
        Ok(self.package.as_ref())
    }
}

/// Reprices the stored cart against the refreshed catalog and writes it
/// back. Subscribers to the resolver's "prices updated" event call this.
///
/// # Errors
///
/// Returns [`OrderError::Storage`] or [`OrderError::Pricing`] on failure.
pub fn on_prices_updated<S: KeyValueStore + ?Sized>(
    store: &mut S,
    catalog: &CatalogStore,
) -> Result<Option<CartPackage>, OrderError> {
    let mut cart = PricedCart::load(store)?;
    if cart.is_empty() {
        return Ok(None);
    }
    let package = cart.reprice(catalog)?.cloned();
    cart.save(store)?;
    Ok(package)
}

fn check_quantities<'a>(
    items: impl Iterator<Item = (&'a String, &'a f64)>,
) -> Result<(), OrderError> {
    for (id, qty) in items {
        if !validate_quantity(*qty) {
            tracing::debug!(product_id = %id, quantity = qty, max = MAX_QUANTITY, "rejected quantity");
            return Err(OrderError::InvalidQuantity {
                product_id: id.clone(),
                quantity: *qty,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "cart_test.rs"]
mod tests;
