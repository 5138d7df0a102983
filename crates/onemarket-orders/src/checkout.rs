//! Checkout: validate, price, dedup, submit and record.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use onemarket_core::{AppConfig, KeyValueStore};
use onemarket_pricing::{CatalogStore, PricingError};

use crate::cart::{CartPackage, PricedCart};
use crate::client::OrderClient;
use crate::dedup;
use crate::error::OrderError;
use crate::history::{OrderHistory, OrderHistoryEntry, Submission, SubmissionStatus};
use crate::types::{CustomerDetails, OrderAck, OrderPayload, PaymentMethod, ONE_OFF_LABEL};
use crate::validate::validate_price;
use crate::whatsapp;

/// Store-side order settings.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSettings {
    pub delivery_fee: f64,
    pub ready_lead_hours: u32,
    pub whatsapp_phone: String,
    pub vodafone_target: String,
}

impl OrderSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            delivery_fee: config.delivery_fee,
            ready_lead_hours: config.ready_lead_hours,
            whatsapp_phone: config.whatsapp_phone.clone(),
            vodafone_target: config.vodafone_target.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub customer: CustomerDetails,
    pub payment: PaymentMethod,
    /// Ask for repeat deliveries. A cart customized as recurring repeats
    /// regardless.
    pub is_recurring: bool,
}

#[derive(Debug, Clone)]
pub struct CheckoutReceipt {
    pub history_id: Uuid,
    pub payload: OrderPayload,
    pub ack: OrderAck,
    /// Thank-you text for the customer.
    pub confirmation: String,
    /// Click-to-chat link notifying the store about the order.
    pub whatsapp_url: String,
}

/// Builds the request body for a cart that is already priced.
#[must_use]
pub fn build_payload(
    package: &CartPackage,
    catalog: &CatalogStore,
    customer: &CustomerDetails,
    payment: &PaymentMethod,
    is_recurring: bool,
    settings: &OrderSettings,
    now: DateTime<Utc>,
) -> OrderPayload {
    let (payment_ref, vodafone_sender) = match payment {
        PaymentMethod::CashOnDelivery => (String::new(), String::new()),
        PaymentMethod::VodafoneCash { sender, reference } => (reference.clone(), sender.clone()),
    };
    let next_date = if is_recurring {
        (now + Duration::days(i64::from(package.delivery_days)))
            .format("%Y-%m-%d")
            .to_string()
    } else {
        String::new()
    };

    OrderPayload {
        customer_name: customer.name.clone(),
        phone: customer.phone.clone(),
        address: customer.address.clone(),
        details: package.detail_lines(catalog).join("\n"),
        subtotal: package.price,
        delivery_fee: settings.delivery_fee,
        total_price: package.price + settings.delivery_fee,
        expected_ready_at: (now + Duration::hours(i64::from(settings.ready_lead_hours)))
            .to_rfc3339(),
        payment_method: payment.label().to_string(),
        payment_ref,
        vodafone_sender,
        vodafone_target: settings.vodafone_target.clone(),
        is_recurring,
        repeat_every_days: if is_recurring { package.delivery_days } else { 0 },
        next_date,
    }
}

/// Human-readable confirmation lines shown before submitting.
#[must_use]
pub fn summary_lines(payload: &OrderPayload, frequency: &str) -> Vec<String> {
    let mut lines = vec![
        format!("👤 الاسم: {}", payload.customer_name),
        format!("📞 الهاتف: {}", payload.phone),
        format!("📍 العنوان: {}", payload.address),
        "📦 المحتويات:".to_string(),
    ];
    lines.extend(payload.details.lines().map(|l| format!("• {l}")));
    if payload.is_recurring {
        lines.push(format!("⏰ التكرار: {frequency}"));
        lines.push(format!("🔁 كل: {} يوم", payload.repeat_every_days));
    } else {
        lines.push(format!("⏰ التكرار: {ONE_OFF_LABEL}"));
    }
    lines.push(format!("💳 طريقة الدفع: {}", payload.payment_method));
    if !payload.payment_ref.is_empty() {
        lines.push(format!("🔢 الرقم المرجعي: {}", payload.payment_ref));
    }
    if !payload.vodafone_sender.is_empty() {
        lines.push(format!("📲 رقم المرسل (فودافون): {}", payload.vodafone_sender));
    }
    lines.push(format!("💰 الإجمالي: {:.0} جنيه", payload.total_price));
    lines
}

/// Submits the stored cart.
///
/// The cart is repriced against `catalog` first; items that lost their price
/// are left out of the order. On success the dedup log and
/// history are updated and the cart is cleared. On failure the cart is kept
/// and a `failed` history entry is recorded; retrying the same order later
/// flips that entry instead of adding a new one.
///
/// # Errors
///
/// - [`OrderError::EmptyCart`] if there is no cart.
/// - Validation errors for the customer, payment or order price.
/// - [`PricingError::NoPriceableItems`] if no cart item has a price.
/// - [`OrderError::Duplicate`] if the same order went out in the last five
///   minutes.
/// - [`OrderError::Rejected`] or [`OrderError::Http`] if submission fails.
pub async fn checkout<S: KeyValueStore + ?Sized>(
    client: &OrderClient,
    store: &mut S,
    catalog: &CatalogStore,
    settings: &OrderSettings,
    request: CheckoutRequest,
    now: DateTime<Utc>,
) -> Result<CheckoutReceipt, OrderError> {
    let mut cart = PricedCart::load(store)?;
    if cart.is_empty() {
        return Err(OrderError::EmptyCart);
    }

    let customer = request.customer.validated()?;
    let payment = request.payment.validated()?;

    let package = cart
        .reprice(catalog)?
        .cloned()
        .ok_or(PricingError::NoPriceableItems)?;
    if !validate_price(package.price) {
        return Err(OrderError::InvalidPrice(package.price));
    }

    let is_recurring = request.is_recurring || package.is_recurring;
    let payload = build_payload(
        &package,
        catalog,
        &customer,
        &payment,
        is_recurring,
        settings,
        now,
    );

    let hash = dedup::order_hash(&customer, payload.total_price);
    if dedup::is_duplicate(store, &hash, now)? {
        tracing::warn!(phone = %customer.phone, "duplicate order blocked");
        return Err(OrderError::Duplicate);
    }

    let mut history = OrderHistory::load(store)?;
    let retry_of = history.latest_failed(&hash).map(|e| e.id);

    let result = client.submit(&payload).await;
    let (status, order_id, error) = match &result {
        Ok(ack) => (SubmissionStatus::Submitted, ack.order_id.clone(), None),
        Err(e) => (SubmissionStatus::Failed, None, Some(e.to_string())),
    };

    let history_id = if let Some(id) = retry_of {
        history.mark_status(id, status, order_id, error, now);
        id
    } else {
        let entry = OrderHistoryEntry {
            id: Uuid::new_v4(),
            order_hash: hash.clone(),
            created_at: now,
            customer: customer.clone(),
            subtotal: payload.subtotal,
            delivery_fee: payload.delivery_fee,
            total: payload.total_price,
            package: package.clone(),
            payment_method: payload.payment_method.clone(),
            payment_ref: payload.payment_ref.clone(),
            vodafone_sender: payload.vodafone_sender.clone(),
            expected_ready_at: now + Duration::hours(i64::from(settings.ready_lead_hours)),
            submission: Submission {
                status,
                attempts: 1,
                updated_at: now,
                order_id,
                last_error: error,
            },
        };
        let id = entry.id;
        history.push(entry);
        id
    };
    history.save(store)?;

    let ack = match result {
        Ok(ack) => ack,
        Err(e) => {
            tracing::error!(%history_id, error = %e, "order submission failed; cart kept");
            return Err(e);
        }
    };

    dedup::record(store, &hash, now)?;
    cart.clear();
    cart.save(store)?;

    tracing::info!(
        %history_id,
        total = payload.total_price,
        recurring = is_recurring,
        "checkout complete"
    );

    let confirmation =
        whatsapp::order_confirmation(&customer.name, &customer.phone, payload.total_price);
    let notification =
        whatsapp::order_notification(&customer.name, &customer.phone, &payload.details);
    Ok(CheckoutReceipt {
        history_id,
        whatsapp_url: whatsapp::whatsapp_url(&settings.whatsapp_phone, &notification),
        confirmation,
        payload,
        ack,
    })
}
