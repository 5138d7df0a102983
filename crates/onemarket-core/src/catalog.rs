use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::products::{PackageTemplate, Product, Unit};
use crate::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductConfig {
    pub id: String,
    pub name: String,
    /// Defaults to `"<emoji> <name>"` when omitted.
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub emoji: String,
    pub unit: Unit,
    /// Seed price. Normally absent; prices arrive from the price source.
    #[serde(default)]
    pub unit_price: Option<f64>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl ProductConfig {
    fn to_product(&self) -> Product {
        let label = self.label.clone().unwrap_or_else(|| {
            if self.emoji.is_empty() {
                self.name.clone()
            } else {
                format!("{} {}", self.emoji, self.name)
            }
        });
        Product {
            id: self.id.clone(),
            name: self.name.clone(),
            label,
            emoji: self.emoji.clone(),
            unit: self.unit,
            unit_price: self.unit_price,
            aliases: self.aliases.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub emoji: String,
    pub frequency: String,
    pub delivery_days: u32,
    pub items: BTreeMap<String, f64>,
}

/// Static storefront configuration: the product catalog and the package
/// templates built on it.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogFile {
    pub products: Vec<ProductConfig>,
    #[serde(default)]
    pub packages: Vec<PackageConfig>,
}

impl CatalogFile {
    /// Builds the product catalog keyed by canonical id.
    #[must_use]
    pub fn products(&self) -> BTreeMap<String, Product> {
        self.products
            .iter()
            .map(|p| (p.id.clone(), p.to_product()))
            .collect()
    }

    /// Builds package templates, dropping items that reference products not
    /// present in the catalog.
    #[must_use]
    pub fn templates(&self) -> BTreeMap<String, PackageTemplate> {
        let known: HashSet<&str> = self.products.iter().map(|p| p.id.as_str()).collect();

        self.packages
            .iter()
            .map(|pkg| {
                let items = pkg
                    .items
                    .iter()
                    .filter(|(product_id, _)| {
                        let keep = known.contains(product_id.as_str());
                        if !keep {
                            tracing::warn!(
                                package = %pkg.id,
                                product_id = %product_id,
                                "package references unknown product; dropping item"
                            );
                        }
                        keep
                    })
                    .map(|(k, v)| (k.clone(), *v))
                    .collect();

                let template = PackageTemplate {
                    id: pkg.id.clone(),
                    name: pkg.name.clone(),
                    emoji: pkg.emoji.clone(),
                    frequency: pkg.frequency.clone(),
                    delivery_days: pkg.delivery_days,
                    items,
                };
                (pkg.id.clone(), template)
            })
            .collect()
    }
}

/// Load and validate the catalog from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_catalog(path: &Path) -> Result<CatalogFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CatalogFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_catalog(&content)
}

/// Parse and validate catalog YAML already in memory.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_catalog(content: &str) -> Result<CatalogFile, ConfigError> {
    let catalog: CatalogFile =
        serde_yaml::from_str(content).map_err(ConfigError::CatalogFileParse)?;

    validate_catalog(&catalog)?;

    Ok(catalog)
}

fn validate_catalog(catalog: &CatalogFile) -> Result<(), ConfigError> {
    let mut seen_products = HashSet::new();
    for product in &catalog.products {
        if product.id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "product id must be non-empty".to_string(),
            ));
        }
        if !seen_products.insert(product.id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate product id: '{}'",
                product.id
            )));
        }
        if let Some(price) = product.unit_price {
            if !price.is_finite() || price < 0.0 {
                return Err(ConfigError::Validation(format!(
                    "product '{}' has invalid seed price {price}",
                    product.id
                )));
            }
        }
    }

    let mut seen_packages = HashSet::new();
    for package in &catalog.packages {
        if package.id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "package id must be non-empty".to_string(),
            ));
        }
        if !seen_packages.insert(package.id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate package id: '{}'",
                package.id
            )));
        }
        for (product_id, qty) in &package.items {
            if !qty.is_finite() || *qty < 0.0 {
                return Err(ConfigError::Validation(format!(
                    "package '{}' has invalid quantity {qty} for '{product_id}'",
                    package.id
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;
