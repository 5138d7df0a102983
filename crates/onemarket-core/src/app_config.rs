use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub catalog_path: PathBuf,
    /// JSON file backing the durable key-value store (cart, history, overrides).
    pub state_path: PathBuf,
    /// Origin the storefront is served from; enables the same-origin price
    /// candidate and decides local-first ordering.
    pub app_origin: Option<String>,
    /// Explicit price source override, tried before every default.
    pub price_api_url: Option<String>,
    pub production_price_url: String,
    pub local_price_urls: Vec<String>,
    pub price_timeout_secs: u64,
    pub api_base: String,
    pub order_timeout_secs: u64,
    pub user_agent: String,
    pub delivery_fee: f64,
    pub ready_lead_hours: u32,
    pub whatsapp_phone: String,
    pub vodafone_target: String,
}
