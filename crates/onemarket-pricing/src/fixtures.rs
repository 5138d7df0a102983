//! Small catalog shared by unit tests.

use std::collections::BTreeMap;

use onemarket_core::{parse_catalog, CatalogFile, Product};

use crate::store::CatalogStore;

pub(crate) const CATALOG_YAML: &str = r#"
products:
  - { id: tomato, name: "طماطم", emoji: "🍅", unit: kg, aliases: [tomatoes] }
  - { id: white_onion, name: "بصل أبيض", emoji: "🧅", unit: kg }
  - { id: red_onion, name: "بصل أحمر", emoji: "🧅", unit: kg }
  - { id: potato, name: "بطاطس", emoji: "🥔", unit: kg }
  - { id: cucumber, name: "خيار", emoji: "🥒", unit: kg }
  - { id: parsley, name: "بقدونس", emoji: "🌿", unit: bundle }
  - { id: chili, name: "شطة", emoji: "🌶️", unit: unit }
packages:
  - id: week
    name: "أسبوعية"
    emoji: "📦"
    frequency: "أسبوعي"
    delivery_days: 7
    items: { tomato: 5, potato: 5, parsley: 1, chili: 2, cucumber: 0 }
  - id: half
    name: "نصف أسبوعية"
    emoji: "🧺"
    frequency: "كل 3 أيام"
    delivery_days: 3
    items: { tomato: 2.5, potato: 2.5, white_onion: 0.75 }
"#;

pub(crate) fn catalog() -> CatalogFile {
    parse_catalog(CATALOG_YAML).unwrap()
}

pub(crate) fn products() -> BTreeMap<String, Product> {
    catalog().products()
}

/// Store with the given prices applied on top of the fixture catalog.
pub(crate) fn priced_store(prices: &[(&str, f64)]) -> CatalogStore {
    let mut store = CatalogStore::from_catalog(&catalog());
    let map: BTreeMap<String, f64> = prices
        .iter()
        .map(|(id, price)| ((*id).to_string(), *price))
        .collect();
    store.apply_prices(&map);
    store
}
