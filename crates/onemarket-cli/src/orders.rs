//! Checkout and history command handlers.

use anyhow::Context as _;
use chrono::Utc;
use onemarket_core::AppConfig;
use onemarket_orders::{
    checkout, summary_lines, CheckoutRequest, CustomerDetails, OrderClient, OrderHistory,
    OrderSettings, PaymentMethod, PricedCart,
};

use crate::prices::Context;

#[derive(Debug)]
pub(crate) struct CheckoutInput {
    pub name: String,
    pub phone: String,
    pub address: String,
    pub recurring: bool,
    pub vodafone_sender: Option<String>,
    pub payment_ref: Option<String>,
}

impl CheckoutInput {
    fn into_request(self) -> CheckoutRequest {
        let payment = match (self.vodafone_sender, self.payment_ref) {
            (Some(sender), reference) => PaymentMethod::VodafoneCash {
                sender,
                reference: reference.unwrap_or_default(),
            },
            (None, _) => PaymentMethod::CashOnDelivery,
        };
        CheckoutRequest {
            customer: CustomerDetails {
                name: self.name,
                phone: self.phone,
                address: self.address,
            },
            payment,
            is_recurring: self.recurring,
        }
    }
}

pub(crate) async fn run_checkout(
    ctx: &mut Context,
    config: &AppConfig,
    input: CheckoutInput,
) -> anyhow::Result<()> {
    ctx.refresh(false).await?;

    let client = OrderClient::new(&config.api_base, config.order_timeout_secs, &config.user_agent)?;
    let settings = OrderSettings::from_app_config(config);
    let frequency = PricedCart::load(&ctx.store)?
        .package()
        .map(|p| p.frequency.clone())
        .unwrap_or_default();

    let catalog = ctx.resolver.catalog();
    let catalog = catalog.read().await;
    let result = checkout(
        &client,
        &mut ctx.store,
        &catalog,
        &settings,
        input.into_request(),
        Utc::now(),
    )
    .await;

    match result {
        Ok(receipt) => {
            for line in summary_lines(&receipt.payload, &frequency) {
                println!("{line}");
            }
            println!();
            println!("{}", receipt.confirmation);
            if let Some(id) = &receipt.ack.order_id {
                println!("order id: {id}");
            }
            println!("notify the store: {}", receipt.whatsapp_url);
            Ok(())
        }
        Err(e) if e.is_retryable() => Err(e).context(
            "order submission failed; the cart was kept, retry the same checkout later",
        ),
        Err(e) => Err(e.into()),
    }
}

pub(crate) fn run_history(ctx: &Context, limit: usize) -> anyhow::Result<()> {
    let history = OrderHistory::load(&ctx.store)?;
    if history.entries().is_empty() {
        println!("no orders yet");
        return Ok(());
    }
    for entry in history.entries().iter().rev().take(limit) {
        println!(
            "{}  {}  {} {}  {} جنيه  [{}]{}",
            entry.created_at.format("%Y-%m-%d %H:%M"),
            entry.customer.name,
            entry.package.emoji,
            entry.package.name,
            entry.total,
            entry.submission.status,
            entry
                .submission
                .order_id
                .as_ref()
                .map(|id| format!(" #{id}"))
                .unwrap_or_default()
        );
    }
    Ok(())
}
