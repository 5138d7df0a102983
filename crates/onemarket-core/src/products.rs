use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Unit of measure a product is sold in.
///
/// The catalog YAML accepts both the ASCII tag and the Arabic storefront
/// label (e.g. `kg` or `كجم`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[serde(alias = "كجم", alias = "kilogram")]
    Kg,
    #[serde(alias = "حزمة")]
    Bundle,
    #[serde(alias = "حبة")]
    Piece,
    #[serde(alias = "وحدة")]
    Unit,
}

impl Unit {
    /// Returns `true` for units that count toward a package's total weight.
    #[must_use]
    pub fn is_by_weight(self) -> bool {
        matches!(self, Unit::Kg)
    }

    /// Storefront label shown next to quantities.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Unit::Kg => "كجم",
            Unit::Bundle => "حزمة",
            Unit::Piece => "حبة",
            Unit::Unit => "وحدة",
        }
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Unit::Kg => write!(f, "kg"),
            Unit::Bundle => write!(f, "bundle"),
            Unit::Piece => write!(f, "piece"),
            Unit::Unit => write!(f, "unit"),
        }
    }
}

/// A catalog entry. `unit_price` is `None` until a price source supplies a
/// usable value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Canonical product key, e.g. `"white_onion"`.
    pub id: String,
    /// Display name, e.g. `"بصل أبيض"`.
    pub name: String,
    /// Name with emoji prefix, e.g. `"🧅 بصل أبيض"`.
    pub label: String,
    pub emoji: String,
    pub unit: Unit,
    pub unit_price: Option<f64>,
    /// Extra spellings that resolve to this product.
    pub aliases: Vec<String>,
}

impl Product {
    /// The unit price, if it is finite and strictly positive.
    #[must_use]
    pub fn usable_price(&self) -> Option<f64> {
        self.unit_price.filter(|p| p.is_finite() && *p > 0.0)
    }

    /// `"<emoji> <name> <qty> <unit>"`, the line format used in carts and
    /// order details.
    #[must_use]
    pub fn display_line(&self, quantity: f64) -> String {
        format!(
            "{} {} {} {}",
            self.emoji,
            self.name,
            format_quantity(quantity),
            self.unit.label()
        )
    }
}

/// A named bundle definition with baseline per-product quantities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageTemplate {
    pub id: String,
    pub name: String,
    pub emoji: String,
    /// Human label for the recurrence, e.g. `"أسبوعي"`.
    pub frequency: String,
    pub delivery_days: u32,
    /// Product id -> base quantity. Zero means "not included by default".
    pub items: BTreeMap<String, f64>,
}

/// Formats a quantity without a trailing `.0` for whole numbers.
#[must_use]
pub fn format_quantity(quantity: f64) -> String {
    if quantity.fract() == 0.0 && quantity.abs() < 1e15 {
        format!("{quantity:.0}")
    } else {
        let s = format!("{quantity:.2}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}
