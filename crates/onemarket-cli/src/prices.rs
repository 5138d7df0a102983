//! Price command handlers and the shared command context.

use std::sync::Arc;

use anyhow::Context as _;
use onemarket_core::{keys, load_catalog, AppConfig, CatalogFile, JsonFileStore, KeyValueStore};
use onemarket_orders::on_prices_updated;
use onemarket_pricing::{
    build_candidates, filter_priceable, price_items, total_weight, CatalogStore, PriceResolver,
    PriceSourceConfig, RefreshOutcome,
};

/// Durable store plus a resolver over the configured catalog.
pub(crate) struct Context {
    pub(crate) store: JsonFileStore,
    pub(crate) resolver: PriceResolver,
    catalog_file: CatalogFile,
}

impl Context {
    pub(crate) fn open(config: &AppConfig) -> anyhow::Result<Self> {
        let store = JsonFileStore::open(&config.state_path)
            .with_context(|| format!("opening state file {}", config.state_path.display()))?;
        let catalog_file = load_catalog(&config.catalog_path)?;
        let resolver = build_resolver(config, &store, &catalog_file)?;
        Ok(Self {
            store,
            resolver,
            catalog_file,
        })
    }

    fn rebuild_resolver(&mut self, config: &AppConfig) -> anyhow::Result<()> {
        self.resolver = build_resolver(config, &self.store, &self.catalog_file)?;
        Ok(())
    }

    /// Refreshes prices and reprices the stored cart for every "prices
    /// updated" notification.
    pub(crate) async fn refresh(&mut self, force: bool) -> anyhow::Result<Arc<RefreshOutcome>> {
        let mut events = self.resolver.subscribe();
        let outcome = self
            .resolver
            .refresh(force)
            .await
            .context("prices are temporarily unavailable")?;

        while let Ok(event) = events.try_recv() {
            tracing::debug!(source = %event.source, applied = event.price_map.len(), "prices updated");
            let catalog = self.resolver.catalog();
            let catalog = catalog.read().await;
            if let Some(package) = on_prices_updated(&mut self.store, &catalog)? {
                tracing::info!(price = package.price, "cart repriced");
            }
        }
        Ok(outcome)
    }
}

fn build_resolver(
    config: &AppConfig,
    store: &JsonFileStore,
    catalog_file: &CatalogFile,
) -> anyhow::Result<PriceResolver> {
    let stored_override = store.get(keys::PRICE_API_URL)?;
    let source = PriceSourceConfig::from_app_config(config, stored_override);
    let candidates = build_candidates(&source);
    tracing::debug!(?candidates, "price source candidates");

    Ok(PriceResolver::new(
        CatalogStore::from_catalog(catalog_file),
        candidates,
        config.price_timeout_secs,
        &config.user_agent,
    )?)
}

fn fmt_price(price: Option<f64>) -> String {
    price.map_or_else(|| "\u{2014}".to_string(), |p| format!("{p} جنيه"))
}

pub(crate) async fn run_prices(
    ctx: &mut Context,
    config: &AppConfig,
    force: bool,
    set_source: Option<String>,
    clear_source: bool,
) -> anyhow::Result<()> {
    if let Some(url) = set_source {
        ctx.store.set(keys::PRICE_API_URL, url.trim())?;
        ctx.rebuild_resolver(config)?;
        println!("price source override saved: {}", url.trim());
    } else if clear_source {
        ctx.store.remove(keys::PRICE_API_URL)?;
        ctx.rebuild_resolver(config)?;
        println!("price source override cleared");
    }

    let outcome = ctx.refresh(force).await?;
    println!(
        "source: {}  url: {}  applied: {}",
        outcome.source, outcome.url, outcome.applied_count
    );
    for failure in &outcome.failures {
        println!("  skipped {} ({}): {}", failure.url, failure.reason, failure.message);
    }

    let catalog = ctx.resolver.catalog();
    let catalog = catalog.read().await;
    for product in catalog.products().values() {
        println!(
            "{:<24} {:>12} / {}",
            product.label,
            fmt_price(product.usable_price()),
            product.unit.label()
        );
    }
    Ok(())
}

pub(crate) async fn run_packages(ctx: &mut Context) -> anyhow::Result<()> {
    ctx.refresh(false).await?;

    let catalog = ctx.resolver.catalog();
    let catalog = catalog.read().await;
    for template in catalog.templates().values() {
        let items = filter_priceable(&catalog, &template.items);
        if items.is_empty() {
            println!("{} {}: unavailable (no priced items)", template.emoji, template.name);
            continue;
        }
        let price = price_items(&catalog, &items)?;
        println!(
            "{} {} [{}] {}: {} جنيه, {} كجم, {} items",
            template.emoji,
            template.name,
            template.id,
            template.frequency,
            price,
            total_weight(&catalog, &items),
            items.len()
        );
    }
    Ok(())
}
