//! Price refresh: candidate fallover, atomic application and single-flight
//! memoization.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::Client;
use serde::Serialize;
use tokio::sync::{broadcast, Mutex, RwLock};

use crate::error::PricingError;
use crate::normalize::ProductKeyNormalizer;
use crate::parse::{parse_payload, ParsedPrices};
use crate::store::CatalogStore;

const ACCEPT: &str = "application/json, text/csv, text/plain, */*";
const EVENT_CAPACITY: usize = 16;

/// "prices updated" notification, sent after every successful application.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricesUpdated {
    pub source: String,
    /// Prices that were actually applied to the catalog.
    pub price_map: BTreeMap<String, f64>,
}

/// One failed candidate within a refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateFailure {
    pub url: String,
    /// `access_denied`, `http_status`, `timeout`, `network`, `parse` or `empty`.
    pub reason: &'static str,
    pub message: String,
}

/// Result of a successful refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefreshOutcome {
    pub source: String,
    /// Every entry decoded from the winning payload, including unusable ones.
    pub prices: BTreeMap<String, f64>,
    pub applied_count: usize,
    pub url: String,
    /// Candidates that failed before the winning one, in attempt order.
    pub failures: Vec<CandidateFailure>,
}

#[derive(Debug, Clone)]
enum FlightFailure {
    NoCandidates,
    Exhausted { attempts: usize },
}

impl From<FlightFailure> for PricingError {
    fn from(failure: FlightFailure) -> Self {
        match failure {
            FlightFailure::NoCandidates => PricingError::NoCandidates,
            FlightFailure::Exhausted { attempts } => PricingError::AllCandidatesFailed { attempts },
        }
    }
}

type Flight = Shared<BoxFuture<'static, Result<Arc<RefreshOutcome>, FlightFailure>>>;

enum FlightState {
    Idle,
    InFlight { generation: u64, flight: Flight },
    Settled(Arc<RefreshOutcome>),
}

struct FlightSlot {
    state: FlightState,
    next_generation: u64,
}

struct Inner {
    client: Client,
    catalog: Arc<RwLock<CatalogStore>>,
    normalizer: ProductKeyNormalizer,
    candidates: Vec<String>,
    timeout: Duration,
    events: broadcast::Sender<PricesUpdated>,
    slot: Mutex<FlightSlot>,
}

/// Fetches prices from the first working candidate and applies them to the
/// shared [`CatalogStore`]. The resolver is the only writer of prices and
/// template pruning.
///
/// Cheap to clone; clones share the catalog, the event channel and the
/// in-flight refresh.
#[derive(Clone)]
pub struct PriceResolver {
    inner: Arc<Inner>,
}

impl PriceResolver {
    /// Creates a resolver owning `store`.
    ///
    /// `timeout_secs` bounds each candidate request, body included.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        store: CatalogStore,
        candidates: Vec<String>,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, PricingError> {
        Self::with_timeout(
            store,
            candidates,
            Duration::from_secs(timeout_secs),
            user_agent,
        )
    }

    /// Like [`PriceResolver::new`] with a sub-second timeout.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn with_timeout(
        store: CatalogStore,
        candidates: Vec<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, PricingError> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        let normalizer = ProductKeyNormalizer::from_products(store.products());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            inner: Arc::new(Inner {
                client,
                catalog: Arc::new(RwLock::new(store)),
                normalizer,
                candidates,
                timeout,
                events,
                slot: Mutex::new(FlightSlot {
                    state: FlightState::Idle,
                    next_generation: 0,
                }),
            }),
        })
    }

    /// Shared handle to the catalog. Readers take the read lock; only the
    /// resolver writes prices.
    #[must_use]
    pub fn catalog(&self) -> Arc<RwLock<CatalogStore>> {
        Arc::clone(&self.inner.catalog)
    }

    #[must_use]
    pub fn candidates(&self) -> &[String] {
        &self.inner.candidates
    }

    #[must_use]
    pub fn normalizer(&self) -> &ProductKeyNormalizer {
        &self.inner.normalizer
    }

    /// Subscribes to "prices updated" notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PricesUpdated> {
        self.inner.events.subscribe()
    }

    /// Refreshes prices.
    ///
    /// Without `force`, callers join the refresh already in flight, or get
    /// the last successful outcome. With `force`, a new refresh starts and
    /// becomes the memo for later callers; callers already awaiting the
    /// previous one still receive its outcome. A failed refresh clears the
    /// memo so the next call starts over.
    ///
    /// # Errors
    ///
    /// - [`PricingError::NoCandidates`] if no candidate URL is configured.
    /// - [`PricingError::AllCandidatesFailed`] if every candidate failed; the
    ///   catalog keeps its previous prices.
    pub async fn refresh(&self, force: bool) -> Result<Arc<RefreshOutcome>, PricingError> {
        let (generation, flight) = {
            let mut slot = self.inner.slot.lock().await;
            match &slot.state {
                FlightState::Settled(outcome) if !force => {
                    tracing::debug!("price refresh memo hit");
                    return Ok(Arc::clone(outcome));
                }
                FlightState::InFlight { generation, flight } if !force => {
                    tracing::debug!(generation, "joining in-flight price refresh");
                    (*generation, flight.clone())
                }
                _ => {
                    let generation = slot.next_generation;
                    slot.next_generation += 1;
                    let inner = Arc::clone(&self.inner);
                    let flight: Flight = async move { inner.run().await }.boxed().shared();
                    slot.state = FlightState::InFlight {
                        generation,
                        flight: flight.clone(),
                    };
                    tracing::debug!(generation, force, "starting price refresh");
                    (generation, flight)
                }
            }
        };

        let result = flight.await;

        let mut slot = self.inner.slot.lock().await;
        if matches!(slot.state, FlightState::InFlight { generation: current, .. } if current == generation)
        {
            slot.state = match &result {
                Ok(outcome) => FlightState::Settled(Arc::clone(outcome)),
                Err(_) => FlightState::Idle,
            };
        }
        drop(slot);

        result.map_err(PricingError::from)
    }
}

impl Inner {
    async fn run(&self) -> Result<Arc<RefreshOutcome>, FlightFailure> {
        if self.candidates.is_empty() {
            tracing::error!("no price source candidates configured");
            return Err(FlightFailure::NoCandidates);
        }

        let mut failures = Vec::new();
        for url in &self.candidates {
            match self.fetch_candidate(url).await {
                Ok(parsed) => return Ok(Arc::new(self.apply(url, parsed, failures).await)),
                Err(err) => {
                    tracing::warn!(
                        url = %url,
                        reason = err.reason(),
                        error = %err,
                        "price source candidate failed"
                    );
                    failures.push(CandidateFailure {
                        url: url.clone(),
                        reason: err.reason(),
                        message: err.to_string(),
                    });
                }
            }
        }

        tracing::error!(
            attempts = failures.len(),
            "all price source candidates failed; keeping previous prices"
        );
        Err(FlightFailure::Exhausted {
            attempts: failures.len(),
        })
    }

    async fn fetch_candidate(&self, url: &str) -> Result<ParsedPrices, PricingError> {
        let request_url = cache_busted(url);
        let transport = |e: reqwest::Error| {
            if e.is_timeout() {
                PricingError::Timeout {
                    url: url.to_string(),
                }
            } else {
                PricingError::Http(e)
            }
        };

        let response = self
            .client
            .get(&request_url)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(PricingError::AccessDenied {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(PricingError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response.text().await.map_err(transport)?;

        let parsed = parse_payload(&body, content_type.as_deref(), &self.normalizer)?;
        if parsed.usable_count() == 0 {
            return Err(PricingError::EmptyPriceMap {
                url: url.to_string(),
            });
        }
        Ok(parsed)
    }

    /// Resets, applies and prunes under one write lock, then notifies.
    async fn apply(
        &self,
        url: &str,
        parsed: ParsedPrices,
        failures: Vec<CandidateFailure>,
    ) -> RefreshOutcome {
        let (applied, pruned) = {
            let mut catalog = self.catalog.write().await;
            catalog.reset_prices();
            let applied = catalog.apply_prices(&parsed.prices);
            let pruned = catalog.prune_templates(&parsed.prices, true);
            (applied, pruned)
        };

        tracing::info!(
            url,
            source = %parsed.source,
            applied = applied.len(),
            pruned,
            "applied product prices"
        );

        let applied_count = applied.len();
        if self
            .events
            .send(PricesUpdated {
                source: parsed.source.clone(),
                price_map: applied,
            })
            .is_err()
        {
            tracing::debug!("no subscribers for prices updated event");
        }

        RefreshOutcome {
            source: parsed.source,
            prices: parsed.prices,
            applied_count,
            url: url.to_string(),
            failures,
        }
    }
}

/// Appends a `_ts=<unix millis>` cache-busting parameter.
fn cache_busted(url: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();

    match reqwest::Url::parse(url) {
        Ok(mut parsed) => {
            parsed
                .query_pairs_mut()
                .append_pair("_ts", &millis.to_string());
            parsed.to_string()
        }
        Err(_) => {
            let sep = if url.contains('?') { '&' } else { '?' };
            format!("{url}{sep}_ts={millis}")
        }
    }
}
