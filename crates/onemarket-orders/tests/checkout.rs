//! Integration tests for order submission and checkout using wiremock HTTP
//! mocks.

use std::collections::BTreeMap;

use chrono::{Duration, Utc};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use onemarket_core::{keys, parse_catalog, KeyValueStore, MemoryStore};
use onemarket_orders::{
    checkout, CheckoutRequest, CustomerDetails, OrderClient, OrderError, OrderHistory,
    OrderPayload, OrderSettings, PaymentMethod, PricedCart, SubmissionStatus,
};
use onemarket_pricing::{CatalogStore, PricingError};

const CATALOG: &str = r#"
products:
  - { id: tomato, name: "طماطم", emoji: "🍅", unit: kg }
  - { id: potato, name: "بطاطس", emoji: "🥔", unit: kg }
packages:
  - id: week
    name: "أسبوعية"
    frequency: "أسبوعي"
    delivery_days: 7
    items: { tomato: 5, potato: 5 }
"#;

fn test_client(base_url: &str) -> OrderClient {
    OrderClient::new(base_url, 5, "onemarket-test/0.1")
        .expect("client construction should not fail")
}

fn catalog() -> CatalogStore {
    catalog_with(&[("tomato", 10.0), ("potato", 8.0)])
}

fn catalog_with(prices: &[(&str, f64)]) -> CatalogStore {
    let mut store = CatalogStore::from_catalog(&parse_catalog(CATALOG).expect("valid catalog"));
    let prices: BTreeMap<String, f64> = prices
        .iter()
        .map(|(id, price)| ((*id).to_string(), *price))
        .collect();
    store.apply_prices(&prices);
    store
}

fn settings() -> OrderSettings {
    OrderSettings {
        delivery_fee: 10.0,
        ready_lead_hours: 24,
        whatsapp_phone: "201067465207".to_string(),
        vodafone_target: "01067465207".to_string(),
    }
}

fn request() -> CheckoutRequest {
    CheckoutRequest {
        customer: CustomerDetails {
            name: " محمد أحمد ".to_string(),
            phone: "01012345678".to_string(),
            address: "القاهرة - مدينة نصر".to_string(),
        },
        payment: PaymentMethod::CashOnDelivery,
        is_recurring: true,
    }
}

fn store_with_cart(catalog: &CatalogStore) -> MemoryStore {
    let mut store = MemoryStore::new();
    let mut cart = PricedCart::empty();
    cart.select_package(catalog, "week", None)
        .expect("week is priceable");
    cart.save(&mut store).expect("memory store never fails");
    store
}

fn sample_payload() -> OrderPayload {
    OrderPayload {
        customer_name: "محمد أحمد".to_string(),
        phone: "01012345678".to_string(),
        address: "القاهرة - مدينة نصر".to_string(),
        details: "🍅 طماطم 5 كجم".to_string(),
        subtotal: 50.0,
        delivery_fee: 0.0,
        total_price: 50.0,
        expected_ready_at: "2026-03-02T10:00:00+00:00".to_string(),
        payment_method: "الدفع عند الاستلام".to_string(),
        payment_ref: String::new(),
        vodafone_sender: String::new(),
        vodafone_target: "01067465207".to_string(),
        is_recurring: false,
        repeat_every_days: 0,
        next_date: String::new(),
    }
}

// ---------------------------------------------------------------------------
// OrderClient::submit
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submit_posts_json_and_reads_order_id() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/orders"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({
            "customer_name": "محمد أحمد",
            "total_price": 50.0,
            "payment_method": "الدفع عند الاستلام"
        })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"success": true, "order": {"id": 9}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let ack = test_client(&server.uri())
        .submit(&sample_payload())
        .await
        .expect("order accepted");
    assert_eq!(ack.order_id.as_deref(), Some("9"));
}

#[tokio::test]
async fn rejected_order_surfaces_server_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/orders"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({"success": false, "message": "العنوان غير مكتمل"})),
        )
        .mount(&server)
        .await;

    let err = test_client(&server.uri())
        .submit(&sample_payload())
        .await
        .unwrap_err();
    match &err {
        OrderError::Rejected { status, message } => {
            assert_eq!(*status, 422);
            assert_eq!(message, "العنوان غير مكتمل");
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn server_error_without_body_gets_generic_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/orders"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let err = test_client(&server.uri())
        .submit(&sample_payload())
        .await
        .unwrap_err();
    assert!(
        matches!(err, OrderError::Rejected { status: 503, ref message } if message == "server error (503)"),
        "unexpected error: {err:?}"
    );
    assert!(err.is_retryable());
}

// ---------------------------------------------------------------------------
// checkout
// ---------------------------------------------------------------------------

#[tokio::test]
async fn checkout_submits_records_and_clears_cart() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/orders"))
        .and(body_partial_json(json!({
            "customer_name": "محمد أحمد",
            "subtotal": 90.0,
            "delivery_fee": 10.0,
            "total_price": 100.0,
            "is_recurring": true,
            "repeat_every_days": 7
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "A-1"})))
        .expect(1)
        .mount(&server)
        .await;

    let catalog = catalog();
    let mut store = store_with_cart(&catalog);
    let client = test_client(&server.uri());
    let now = Utc::now();

    let receipt = checkout(&client, &mut store, &catalog, &settings(), request(), now)
        .await
        .expect("checkout succeeds");

    assert_eq!(receipt.ack.order_id.as_deref(), Some("A-1"));
    assert!(receipt.confirmation.contains("💰 الإجمالي: 100 جنيه"));
    assert!(receipt
        .whatsapp_url
        .starts_with("https://wa.me/201067465207?text="));
    assert_eq!(store.get(keys::CURRENT_PACKAGE).unwrap(), None);

    let history = OrderHistory::load(&store).unwrap();
    assert_eq!(history.entries().len(), 1);
    let entry = &history.entries()[0];
    assert_eq!(entry.id, receipt.history_id);
    assert_eq!(entry.submission.status, SubmissionStatus::Submitted);
    assert_eq!(entry.submission.order_id.as_deref(), Some("A-1"));

    // Same order again within five minutes is blocked before any request.
    let mut cart = PricedCart::empty();
    cart.select_package(&catalog, "week", None).unwrap();
    cart.save(&mut store).unwrap();
    let err = checkout(
        &client,
        &mut store,
        &catalog,
        &settings(),
        request(),
        now + Duration::minutes(2),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, OrderError::Duplicate));
}

#[tokio::test]
async fn failed_checkout_keeps_cart_and_retry_updates_history() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/orders"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "db offline"})))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/orders"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"order_id": 31})))
        .mount(&server)
        .await;

    let catalog = catalog();
    let mut store = store_with_cart(&catalog);
    let client = test_client(&server.uri());
    let now = Utc::now();

    let err = checkout(&client, &mut store, &catalog, &settings(), request(), now)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::Rejected { status: 500, .. }));
    assert!(!PricedCart::load(&store).unwrap().is_empty());

    let history = OrderHistory::load(&store).unwrap();
    assert_eq!(history.entries().len(), 1);
    assert_eq!(
        history.entries()[0].submission.status,
        SubmissionStatus::Failed
    );
    assert_eq!(
        history.entries()[0].submission.last_error.as_deref(),
        Some("order rejected (500): db offline")
    );

    let receipt = checkout(&client, &mut store, &catalog, &settings(), request(), now)
        .await
        .expect("retry succeeds");

    let history = OrderHistory::load(&store).unwrap();
    assert_eq!(history.entries().len(), 1);
    let entry = &history.entries()[0];
    assert_eq!(entry.id, receipt.history_id);
    assert_eq!(entry.submission.status, SubmissionStatus::Submitted);
    assert_eq!(entry.submission.attempts, 2);
    assert_eq!(entry.submission.order_id.as_deref(), Some("31"));
    assert!(entry.submission.last_error.is_none());
}

#[tokio::test]
async fn checkout_leaves_out_items_that_lost_their_price() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/orders"))
        .and(body_partial_json(json!({
            "details": "🥔 بطاطس 5 كجم",
            "subtotal": 40.0,
            "total_price": 50.0
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "B-7"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut store = store_with_cart(&catalog());
    let refreshed = catalog_with(&[("potato", 8.0)]);
    let client = test_client(&server.uri());

    let receipt = checkout(&client, &mut store, &refreshed, &settings(), request(), Utc::now())
        .await
        .expect("checkout succeeds with the priced items");
    assert_eq!(receipt.payload.details, "🥔 بطاطس 5 كجم");
    assert_eq!(receipt.ack.order_id.as_deref(), Some("B-7"));
}

#[tokio::test]
async fn checkout_with_no_priced_items_is_refused() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let mut store = store_with_cart(&catalog());
    let client = test_client(&server.uri());

    let err = checkout(&client, &mut store, &catalog_with(&[]), &settings(), request(), Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrderError::Pricing(PricingError::NoPriceableItems)
    ));
    assert!(!PricedCart::load(&store).unwrap().is_empty());
}

#[tokio::test]
async fn invalid_input_never_reaches_the_server() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let catalog = catalog();
    let client = test_client(&server.uri());

    let mut empty = MemoryStore::new();
    let err = checkout(&client, &mut empty, &catalog, &settings(), request(), Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::EmptyCart));

    let mut store = store_with_cart(&catalog);
    let mut bad_name = request();
    bad_name.customer.name = "م".to_string();
    let err = checkout(&client, &mut store, &catalog, &settings(), bad_name, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::InvalidName));

    let mut vodafone = request();
    vodafone.payment = PaymentMethod::VodafoneCash {
        sender: "01099999999".to_string(),
        reference: " ".to_string(),
    };
    let err = checkout(&client, &mut store, &catalog, &settings(), vodafone, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::MissingPaymentRef));
}
