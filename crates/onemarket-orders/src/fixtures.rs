//! Catalog shared by unit tests.

use std::collections::BTreeMap;

use onemarket_core::parse_catalog;
use onemarket_pricing::{CatalogStore, Items};

const CATALOG_YAML: &str = r#"
products:
  - { id: tomato, name: "طماطم", emoji: "🍅", unit: kg }
  - { id: potato, name: "بطاطس", emoji: "🥔", unit: kg }
  - { id: cucumber, name: "خيار", emoji: "🥒", unit: kg }
  - { id: parsley, name: "بقدونس", emoji: "🌿", unit: bundle }
packages:
  - id: week
    name: "أسبوعية"
    emoji: "📦"
    frequency: "أسبوعي"
    delivery_days: 7
    items: { tomato: 5, potato: 5, parsley: 1, cucumber: 0 }
  - id: half
    name: "نصف أسبوعية"
    emoji: "🧺"
    frequency: "كل 3 أيام"
    delivery_days: 3
    items: { tomato: 2.5, potato: 2.5 }
"#;

pub(crate) fn catalog(prices: &[(&str, f64)]) -> CatalogStore {
    let mut store = CatalogStore::from_catalog(&parse_catalog(CATALOG_YAML).unwrap());
    store.apply_prices(&items(prices));
    store
}

pub(crate) fn items(entries: &[(&str, f64)]) -> Items {
    entries
        .iter()
        .map(|(id, qty)| ((*id).to_string(), *qty))
        .collect::<BTreeMap<_, _>>()
}
