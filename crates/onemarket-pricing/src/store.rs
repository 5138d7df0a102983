//! Owned, explicitly mutated product catalog and package templates.

use std::collections::BTreeMap;

use onemarket_core::{CatalogFile, PackageTemplate, Product};

/// The live product catalog plus package templates.
///
/// Prices change only through [`CatalogStore::reset_prices`] and
/// [`CatalogStore::apply_prices`]; template items only shrink through
/// [`CatalogStore::prune_templates`] until [`CatalogStore::reset_templates`]
/// restores the configured definitions.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    products: BTreeMap<String, Product>,
    templates: BTreeMap<String, PackageTemplate>,
    original_templates: BTreeMap<String, PackageTemplate>,
}

impl CatalogStore {
    #[must_use]
    pub fn new(
        products: BTreeMap<String, Product>,
        templates: BTreeMap<String, PackageTemplate>,
    ) -> Self {
        Self {
            products,
            original_templates: templates.clone(),
            templates,
        }
    }

    #[must_use]
    pub fn from_catalog(catalog: &CatalogFile) -> Self {
        Self::new(catalog.products(), catalog.templates())
    }

    #[must_use]
    pub fn products(&self) -> &BTreeMap<String, Product> {
        &self.products
    }

    #[must_use]
    pub fn product(&self, id: &str) -> Option<&Product> {
        self.products.get(id)
    }

    #[must_use]
    pub fn templates(&self) -> &BTreeMap<String, PackageTemplate> {
        &self.templates
    }

    #[must_use]
    pub fn template(&self, id: &str) -> Option<&PackageTemplate> {
        self.templates.get(id)
    }

    /// Current usable price for `id`.
    #[must_use]
    pub fn price_of(&self, id: &str) -> Option<f64> {
        self.products.get(id).and_then(Product::usable_price)
    }

    /// Snapshot of every usable price.
    #[must_use]
    pub fn current_prices(&self) -> BTreeMap<String, f64> {
        self.products
            .values()
            .filter_map(|p| p.usable_price().map(|price| (p.id.clone(), price)))
            .collect()
    }

    /// Marks every product price as unknown.
    pub fn reset_prices(&mut self) {
        for product in self.products.values_mut() {
            product.unit_price = None;
        }
    }

    /// Applies finite, strictly positive prices to known products and returns
    /// the entries actually applied. Everything else is ignored.
    pub fn apply_prices(&mut self, prices: &BTreeMap<String, f64>) -> BTreeMap<String, f64> {
        let mut applied = BTreeMap::new();
        for (id, price) in prices {
            if !price.is_finite() || *price <= 0.0 {
                continue;
            }
            if let Some(product) = self.products.get_mut(id) {
                product.unit_price = Some(*price);
                applied.insert(id.clone(), *price);
            }
        }
        applied
    }

    /// Drops template items that cannot be priced.
    ///
    /// With `only_ids_in_payload`, only items whose id appears in `price_map`
    /// are considered, and they are dropped when the payload price is not
    /// usable or the product still has no usable price. Without it, every
    /// item whose product lacks a usable price is dropped.
    ///
    /// Pruning is cumulative: a dropped item only comes back through
    /// [`CatalogStore::reset_templates`].
    ///
    /// Returns the number of items removed.
    pub fn prune_templates(
        &mut self,
        price_map: &BTreeMap<String, f64>,
        only_ids_in_payload: bool,
    ) -> usize {
        let products = &self.products;
        let usable = |id: &str| products.get(id).and_then(Product::usable_price).is_some();

        let mut removed = 0;
        for template in self.templates.values_mut() {
            let before = template.items.len();
            template.items.retain(|id, _| {
                if only_ids_in_payload {
                    match price_map.get(id) {
                        Some(price) => price.is_finite() && *price > 0.0 && usable(id),
                        None => true,
                    }
                } else {
                    usable(id)
                }
            });
            let dropped = before - template.items.len();
            if dropped > 0 {
                tracing::debug!(template = %template.id, dropped, "pruned unpriced template items");
            }
            removed += dropped;
        }
        removed
    }

    /// Restores every template to its configured item set.
    pub fn reset_templates(&mut self) {
        self.templates.clone_from(&self.original_templates);
    }
}
