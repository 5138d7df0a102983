//! Cart command handlers.

use anyhow::bail;
use clap::Subcommand;
use onemarket_orders::{CartPackage, PricedCart};
use onemarket_pricing::{CatalogStore, Items, ProductKeyNormalizer};

use crate::prices::Context;

/// Sub-commands available under `cart`.
#[derive(Debug, Subcommand)]
pub enum CartCommands {
    /// Show the cart
    Show,
    /// Put a package in the cart
    Select {
        /// Package id (e.g., week)
        package: String,
    },
    /// Put a package scaled to a total weight in the cart
    Customize {
        package: String,
        /// Target weight in kilograms
        #[arg(long)]
        weight: f64,
        #[arg(long)]
        recurring: bool,
    },
    /// Build a package from `product=quantity` pairs
    Custom {
        #[arg(required = true, value_parser = parse_item)]
        items: Vec<(String, f64)>,
    },
    /// Use another package's delivery frequency
    Frequency { package: String },
    /// Remove one product from the cart
    Remove { product: String },
    /// Empty the cart
    Clear,
}

/// Parses `product=quantity`. The product may be any known spelling.
pub(crate) fn parse_item(raw: &str) -> Result<(String, f64), String> {
    let (key, qty) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected product=quantity, got '{raw}'"))?;
    let qty: f64 = qty
        .trim()
        .parse()
        .map_err(|e| format!("invalid quantity in '{raw}': {e}"))?;
    Ok((key.trim().to_string(), qty))
}

fn resolve_items(
    normalizer: &ProductKeyNormalizer,
    raw: Vec<(String, f64)>,
) -> anyhow::Result<Items> {
    let mut items = Items::new();
    for (key, qty) in raw {
        let Some(id) = normalizer.normalize(&key) else {
            bail!("unknown product '{key}'");
        };
        *items.entry(id).or_insert(0.0) += qty;
    }
    Ok(items)
}

fn print_package(package: Option<&CartPackage>, catalog: &CatalogStore) {
    let Some(package) = package else {
        println!("cart is empty");
        return;
    };
    println!("{} {} [{}]", package.emoji, package.name, package.id);
    for line in package.detail_lines(catalog) {
        println!("  {line}");
    }
    println!(
        "frequency: {} (every {} days), recurring: {}",
        package.frequency,
        package.delivery_days,
        if package.is_recurring { "yes" } else { "no" }
    );
    println!("price: {} جنيه", package.price);
}

pub(crate) async fn run_cart(ctx: &mut Context, command: CartCommands) -> anyhow::Result<()> {
    // Prices must be loaded before anything in the cart can be priced.
    ctx.refresh(false).await?;

    let catalog = ctx.resolver.catalog();
    let catalog = catalog.read().await;
    let mut cart = PricedCart::load(&ctx.store)?;

    match command {
        CartCommands::Show => {}
        CartCommands::Select { package } => {
            cart.select_package(&catalog, &package, None)?;
        }
        CartCommands::Customize {
            package,
            weight,
            recurring,
        } => {
            cart.customize_package(&catalog, &package, weight, recurring)?;
        }
        CartCommands::Custom { items } => {
            let items = resolve_items(ctx.resolver.normalizer(), items)?;
            cart.custom_package(&catalog, &items)?;
        }
        CartCommands::Frequency { package } => {
            cart.change_frequency(&catalog, &package)?;
        }
        CartCommands::Remove { product } => {
            let id = ctx
                .resolver
                .normalizer()
                .normalize(&product)
                .unwrap_or(product);
            cart.remove_item(&catalog, &id)?;
        }
        CartCommands::Clear => cart.clear(),
    }

    cart.save(&mut ctx.store)?;
    print_package(cart.package(), &catalog);
    Ok(())
}
