use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

pub const DEFAULT_PRODUCTION_PRICE_URL: &str =
    "https://one-market-backend-production.up.railway.app/api/products";
pub const DEFAULT_LOCAL_PRICE_URLS: &str =
    "http://localhost:3000/api/products,http://127.0.0.1:3000/api/products";
pub const DEFAULT_API_BASE: &str = "https://one-market-backend-production.up.railway.app";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_fee = |var: &str, default: &str| -> Result<f64, ConfigError> {
        let value = or_default(var, default)
            .parse::<f64>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if !value.is_finite() || value < 0.0 {
            return Err(invalid(var, format!("must be a non-negative number, got {value}")));
        }
        Ok(value)
    };

    let env = parse_environment(&or_default("ONEMARKET_ENV", "development"))?;
    let log_level = or_default("ONEMARKET_LOG_LEVEL", "info");
    let catalog_path = PathBuf::from(or_default("ONEMARKET_CATALOG_PATH", "./config/catalog.yaml"));
    let state_path = PathBuf::from(or_default("ONEMARKET_STATE_PATH", "./.onemarket/state.json"));

    let app_origin = optional("ONEMARKET_APP_ORIGIN");
    let price_api_url = optional("ONEMARKET_PRICE_API_URL");
    let production_price_url = or_default(
        "ONEMARKET_PRODUCTION_PRICE_URL",
        DEFAULT_PRODUCTION_PRICE_URL,
    );
    let local_price_urls = or_default("ONEMARKET_LOCAL_PRICE_URLS", DEFAULT_LOCAL_PRICE_URLS)
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    let price_timeout_secs = parse_u64("ONEMARKET_PRICE_TIMEOUT_SECS", "10")?;
    if price_timeout_secs == 0 {
        return Err(invalid(
            "ONEMARKET_PRICE_TIMEOUT_SECS",
            "must be greater than zero".to_string(),
        ));
    }

    let api_base = or_default("ONEMARKET_API_BASE", DEFAULT_API_BASE)
        .trim_end_matches('/')
        .to_string();
    let order_timeout_secs = parse_u64("ONEMARKET_ORDER_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("ONEMARKET_USER_AGENT", "onemarket/0.1 (storefront)");
    let delivery_fee = parse_fee("ONEMARKET_DELIVERY_FEE", "0")?;
    let ready_lead_hours = parse_u32("ONEMARKET_READY_LEAD_HOURS", "24")?;
    let whatsapp_phone = or_default("ONEMARKET_WHATSAPP_PHONE", "201067465207");
    let vodafone_target = or_default("ONEMARKET_VODAFONE_TARGET", "01067465207");

    Ok(AppConfig {
        env,
        log_level,
        catalog_path,
        state_path,
        app_origin,
        price_api_url,
        production_price_url,
        local_price_urls,
        price_timeout_secs,
        api_base,
        order_timeout_secs,
        user_agent,
        delivery_fee,
        ready_lead_hours,
        whatsapp_phone,
        vodafone_target,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "ONEMARKET_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
