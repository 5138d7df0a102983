//! Integration tests for `PriceResolver::refresh`.
//!
//! Each test stands up a `wiremock` server; the only non-mock candidate is a
//! loopback port with nothing listening, used to provoke network failures.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use onemarket_core::parse_catalog;
use onemarket_pricing::{CatalogStore, PriceResolver, PricingError};

const CATALOG: &str = r#"
products:
  - { id: tomato, name: "طماطم", emoji: "🍅", unit: kg }
  - { id: potato, name: "بطاطس", emoji: "🥔", unit: kg }
  - { id: parsley, name: "بقدونس", emoji: "🌿", unit: bundle }
packages:
  - id: week
    name: "أسبوعية"
    frequency: "أسبوعي"
    delivery_days: 7
    items: { tomato: 5, potato: 5, parsley: 1 }
"#;

const REFUSED: &str = "http://127.0.0.1:1/api/products";

fn store() -> CatalogStore {
    CatalogStore::from_catalog(&parse_catalog(CATALOG).expect("valid test catalog"))
}

fn resolver(candidates: Vec<String>) -> PriceResolver {
    resolver_with(store(), candidates, Duration::from_secs(5))
}

fn resolver_with(store: CatalogStore, candidates: Vec<String>, timeout: Duration) -> PriceResolver {
    PriceResolver::with_timeout(store, candidates, timeout, "onemarket-test/0.1")
        .expect("failed to build test PriceResolver")
}

fn prices(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
    entries
        .iter()
        .map(|(id, price)| ((*id).to_string(), *price))
        .collect()
}

fn envelope(products: &serde_json::Value) -> serde_json::Value {
    json!({"success": true, "source": "sheet", "products": products})
}

// ---------------------------------------------------------------------------
// Fallover
// ---------------------------------------------------------------------------

#[tokio::test]
async fn falls_over_network_error_and_empty_map_to_third_candidate() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/empty"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/good"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(envelope(&json!({"tomato": 10, "potato": 8}))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let good = format!("{}/good", server.uri());
    let resolver = resolver(vec![
        REFUSED.to_string(),
        format!("{}/empty", server.uri()),
        good.clone(),
    ]);

    let outcome = resolver.refresh(false).await.expect("refresh should succeed");

    assert_eq!(outcome.url, good);
    assert_eq!(outcome.source, "sheet");
    assert_eq!(outcome.applied_count, 2);
    let reasons: Vec<&str> = outcome.failures.iter().map(|f| f.reason).collect();
    assert_eq!(reasons, vec!["network", "empty"]);
    assert_eq!(outcome.failures[0].url, REFUSED);
}

#[tokio::test]
async fn access_denied_is_distinguished_and_falls_over() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/denied"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/good"))
        .respond_with(ResponseTemplate::new(200).set_body_string("product,price\ntomato,10\n"))
        .mount(&server)
        .await;

    let resolver = resolver(vec![
        format!("{}/denied", server.uri()),
        format!("{}/broken", server.uri()),
        format!("{}/good", server.uri()),
    ]);

    let outcome = resolver.refresh(false).await.expect("refresh should succeed");
    let reasons: Vec<&str> = outcome.failures.iter().map(|f| f.reason).collect();
    assert_eq!(reasons, vec!["access_denied", "http_status"]);
    assert_eq!(outcome.source, "csv");
}

#[tokio::test]
async fn slow_candidate_times_out_and_falls_over() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"tomato": 99}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/good"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tomato": 10})))
        .mount(&server)
        .await;

    let resolver = resolver_with(
        store(),
        vec![format!("{}/slow", server.uri()), format!("{}/good", server.uri())],
        Duration::from_millis(300),
    );

    let outcome = resolver.refresh(false).await.expect("refresh should succeed");
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].reason, "timeout");
    assert_eq!(outcome.prices, prices(&[("tomato", 10.0)]));
}

// ---------------------------------------------------------------------------
// Terminal failure
// ---------------------------------------------------------------------------

#[tokio::test]
async fn all_candidates_failing_keeps_previous_prices() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/bad"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let mut seeded = store();
    seeded.apply_prices(&prices(&[("tomato", 12.0), ("potato", 7.0)]));

    let resolver = resolver_with(
        seeded,
        vec![REFUSED.to_string(), format!("{}/bad", server.uri())],
        Duration::from_secs(5),
    );
    let mut events = resolver.subscribe();

    let err = resolver.refresh(false).await.unwrap_err();
    assert!(
        matches!(err, PricingError::AllCandidatesFailed { attempts: 2 }),
        "unexpected error: {err:?}"
    );

    let catalog = resolver.catalog();
    let catalog = catalog.read().await;
    assert_eq!(
        catalog.current_prices(),
        prices(&[("tomato", 12.0), ("potato", 7.0)])
    );
    assert_eq!(catalog.template("week").unwrap().items.len(), 3);
    assert!(events.try_recv().is_err(), "no event on failure");
}

#[tokio::test]
async fn no_candidates_is_an_error() {
    let resolver = resolver(Vec::new());
    let err = resolver.refresh(false).await.unwrap_err();
    assert!(matches!(err, PricingError::NoCandidates));
}

// ---------------------------------------------------------------------------
// Application
// ---------------------------------------------------------------------------

#[tokio::test]
async fn success_resets_applies_prunes_and_notifies() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/prices"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(envelope(&json!({"tomato": 10, "potato": 0}))),
        )
        .mount(&server)
        .await;

    let mut seeded = store();
    seeded.apply_prices(&prices(&[("parsley", 4.0)]));
    let resolver = resolver_with(
        seeded,
        vec![format!("{}/prices", server.uri())],
        Duration::from_secs(5),
    );
    let mut events = resolver.subscribe();

    let outcome = resolver.refresh(false).await.expect("refresh should succeed");
    assert_eq!(outcome.applied_count, 1);
    assert_eq!(outcome.prices, prices(&[("tomato", 10.0), ("potato", 0.0)]));

    let event = events.try_recv().expect("prices updated event");
    assert_eq!(event.source, "sheet");
    assert_eq!(event.price_map, prices(&[("tomato", 10.0)]));

    let catalog = resolver.catalog();
    let catalog = catalog.read().await;
    // Prices absent from the payload are reset.
    assert_eq!(catalog.price_of("parsley"), None);
    let week = &catalog.template("week").unwrap().items;
    assert!(week.contains_key("tomato"));
    assert!(!week.contains_key("potato"), "zero-priced item is pruned");
    assert!(week.contains_key("parsley"), "items absent from payload stay");
}

#[tokio::test]
async fn pruned_items_do_not_return_on_later_refresh() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/prices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tomato": 10, "potato": 0})))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/prices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tomato": 10, "potato": 8})))
        .mount(&server)
        .await;

    let resolver = resolver(vec![format!("{}/prices", server.uri())]);
    resolver.refresh(false).await.expect("first refresh");
    resolver.refresh(true).await.expect("second refresh");

    let catalog = resolver.catalog();
    let mut catalog = catalog.write().await;
    assert_eq!(catalog.price_of("potato"), Some(8.0));
    assert!(!catalog.template("week").unwrap().items.contains_key("potato"));

    catalog.reset_templates();
    assert_eq!(
        catalog.template("week").unwrap().items.get("potato"),
        Some(&5.0)
    );
}

// ---------------------------------------------------------------------------
// Single-flight
// ---------------------------------------------------------------------------

#[tokio::test]
async fn concurrent_refreshes_share_one_fetch() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/prices"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"tomato": 10}))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let resolver = resolver(vec![format!("{}/prices", server.uri())]);
    let (a, b) = tokio::join!(resolver.refresh(false), resolver.refresh(false));

    let a = a.expect("first caller");
    let b = b.expect("second caller");
    assert!(Arc::ptr_eq(&a, &b));
}

#[tokio::test]
async fn settled_refresh_is_memoized() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/prices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tomato": 10})))
        .expect(1)
        .mount(&server)
        .await;

    let resolver = resolver(vec![format!("{}/prices", server.uri())]);
    let first = resolver.refresh(false).await.expect("first");
    let second = resolver.refresh(false).await.expect("second");
    assert!(Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn forced_refreshes_each_fetch() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/prices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tomato": 10})))
        .expect(2)
        .mount(&server)
        .await;

    let resolver = resolver(vec![format!("{}/prices", server.uri())]);
    let first = resolver.refresh(true).await.expect("first");
    let second = resolver.refresh(true).await.expect("second");
    assert!(!Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn forced_refresh_supersedes_the_flight_in_progress() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/prices"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"tomato": 10}))
                .set_delay(Duration::from_millis(400)),
        )
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/prices"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"tomato": 12}))
                .set_delay(Duration::from_millis(600)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let resolver = resolver(vec![format!("{}/prices", server.uri())]);

    // A starts first; B forces a new flight while A is still waiting; C
    // arrives while B is in flight. A finishes before B.
    let (a, b, c) = tokio::join!(
        resolver.refresh(false),
        async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            resolver.refresh(true).await
        },
        async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            resolver.refresh(false).await
        },
    );

    let a = a.expect("superseded caller still gets its own outcome");
    let b = b.expect("forced caller");
    let c = c.expect("later caller");
    assert_eq!(a.prices, prices(&[("tomato", 10.0)]));
    assert_eq!(b.prices, prices(&[("tomato", 12.0)]));
    assert!(Arc::ptr_eq(&b, &c));
    assert!(!Arc::ptr_eq(&a, &b));

    // The older flight finishing first must not become the memo.
    let memo = resolver.refresh(false).await.expect("memo");
    assert!(Arc::ptr_eq(&memo, &b));
    assert_eq!(resolver.catalog().read().await.price_of("tomato"), Some(12.0));
}

#[tokio::test]
async fn failed_refresh_is_not_memoized() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/prices"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let resolver = resolver(vec![format!("{}/prices", server.uri())]);
    assert!(resolver.refresh(false).await.is_err());
    assert!(resolver.refresh(false).await.is_err());
}
