mod cart;
mod orders;
mod prices;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::cart::CartCommands;

#[derive(Debug, Parser)]
#[command(name = "onemarket")]
#[command(about = "One Market storefront command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Refresh product prices from the price source
    Prices {
        /// Start a new fetch even if prices were already loaded
        #[arg(long)]
        force: bool,
        /// Persist a price source URL tried before the defaults
        #[arg(long, conflicts_with = "clear_source")]
        set_source: Option<String>,
        /// Forget the persisted price source URL
        #[arg(long)]
        clear_source: bool,
    },
    /// List packages with current prices and weights
    Packages,
    /// Inspect or change the cart
    Cart {
        #[command(subcommand)]
        command: CartCommands,
    },
    /// Submit the cart as an order
    Checkout {
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        address: String,
        /// Repeat the order on the package's delivery interval
        #[arg(long)]
        recurring: bool,
        /// Vodafone Cash sender number; selects Vodafone Cash payment
        #[arg(long, requires = "payment_ref")]
        vodafone_sender: Option<String>,
        /// Vodafone Cash transfer reference
        #[arg(long, requires = "vodafone_sender")]
        payment_ref: Option<String>,
    },
    /// Show recent orders
    History {
        /// Maximum number of orders to show
        #[arg(long, default_value = "10")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = onemarket_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("onemarket ready ({} environment); see --help", config.env);
        return Ok(());
    };

    let mut ctx = prices::Context::open(&config)?;
    match command {
        Commands::Prices {
            force,
            set_source,
            clear_source,
        } => prices::run_prices(&mut ctx, &config, force, set_source, clear_source).await,
        Commands::Packages => prices::run_packages(&mut ctx).await,
        Commands::Cart { command } => cart::run_cart(&mut ctx, command).await,
        Commands::Checkout {
            name,
            phone,
            address,
            recurring,
            vodafone_sender,
            payment_ref,
        } => {
            let input = orders::CheckoutInput {
                name,
                phone,
                address,
                recurring,
                vodafone_sender,
                payment_ref,
            };
            orders::run_checkout(&mut ctx, &config, input).await
        }
        Commands::History { limit } => orders::run_history(&ctx, limit),
    }
}
