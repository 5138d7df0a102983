//! Ordered price source candidate URLs.

/// Inputs for building the candidate list.
#[derive(Debug, Clone, Default)]
pub struct PriceSourceConfig {
    /// Runtime override, tried first.
    pub override_url: Option<String>,
    /// Override persisted in the durable store, tried second.
    pub stored_override_url: Option<String>,
    /// Hosted production endpoint.
    pub production_url: String,
    /// Local development endpoints.
    pub local_urls: Vec<String>,
    /// Origin the storefront runs on. Enables the same-origin candidate
    /// (`<origin>/api/products`) and decides local-first ordering.
    pub app_origin: Option<String>,
}

impl PriceSourceConfig {
    /// Builds the source settings from application config plus the persisted
    /// override, if any.
    #[must_use]
    pub fn from_app_config(
        config: &onemarket_core::AppConfig,
        stored_override_url: Option<String>,
    ) -> Self {
        Self {
            override_url: config.price_api_url.clone(),
            stored_override_url,
            production_url: config.production_price_url.clone(),
            local_urls: config.local_price_urls.clone(),
            app_origin: config.app_origin.clone(),
        }
    }
}

/// Returns `true` when `url` points at a loopback host.
#[must_use]
pub fn is_loopback(url: &str) -> bool {
    let Ok(parsed) = reqwest::Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.trim_start_matches('[').trim_end_matches(']');
    host.eq_ignore_ascii_case("localhost")
        || host
            .parse::<std::net::IpAddr>()
            .is_ok_and(|ip| ip.is_loopback())
}

fn usable_origin(origin: &str) -> Option<String> {
    let origin = origin.trim().trim_end_matches('/');
    if origin.is_empty() || origin == "null" || origin.starts_with("file:") {
        return None;
    }
    Some(origin.to_string())
}

/// Builds the ordered, de-duplicated candidate list.
///
/// Overrides come first. On a loopback origin the local endpoints come next,
/// then production, then same-origin; otherwise same-origin, production,
/// then the local endpoints. Trailing slashes are trimmed before comparing.
#[must_use]
pub fn build_candidates(config: &PriceSourceConfig) -> Vec<String> {
    let origin = config.app_origin.as_deref().and_then(usable_origin);
    let same_origin = origin.as_ref().map(|o| format!("{o}/api/products"));
    let local_first = origin.as_deref().is_some_and(is_loopback);

    let mut ordered: Vec<&str> = Vec::new();
    ordered.extend(config.override_url.as_deref());
    ordered.extend(config.stored_override_url.as_deref());

    let locals = config.local_urls.iter().map(String::as_str);
    if local_first {
        ordered.extend(locals);
        ordered.push(&config.production_url);
        ordered.extend(same_origin.as_deref());
    } else {
        ordered.extend(same_origin.as_deref());
        ordered.push(&config.production_url);
        ordered.extend(locals);
    }

    let mut candidates: Vec<String> = Vec::new();
    for url in ordered {
        let url = url.trim().trim_end_matches('/');
        if url.is_empty() || candidates.iter().any(|c| c == url) {
            continue;
        }
        candidates.push(url.to_string());
    }
    candidates
}
