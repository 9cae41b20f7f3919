use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub orders_api: OrdersApiConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub branding: BrandingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Upstream orders API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrdersApiConfig {
    /// Base URL of the orders backend (e.g., "https://orders.example.com")
    pub base_url: String,
    /// Path of the order list endpoint, appended to `base_url`
    #[serde(default = "default_orders_path")]
    pub orders_path: String,
    /// Request timeout in seconds (default: 15)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// Optional bearer token sent with every request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_orders_path() -> String {
    "/api/orders".to_string()
}

fn default_timeout() -> u32 {
    15
}

fn default_user_agent() -> String {
    format!("orderwatch/{}", env!("CARGO_PKG_VERSION"))
}

/// Polling and session configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackerConfig {
    /// How often live sessions re-fetch the order list (seconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Sessions not viewed for this long are dropped (seconds).
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,
    /// Offset from UTC used for "today" and displayed times (minutes).
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

fn default_poll_interval() -> u64 {
    30
}

fn default_session_ttl() -> u64 {
    2 * 60 * 60
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            session_ttl_secs: default_session_ttl(),
            utc_offset_minutes: 0,
        }
    }
}

/// Page branding shown on the status page
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrandingConfig {
    #[serde(default = "default_company_name")]
    pub company_name: String,
    #[serde(default = "default_contact_number")]
    pub contact_number: String,
    #[serde(default = "default_wait_message")]
    pub wait_message: String,
    #[serde(default = "default_estimate_message")]
    pub estimate_message: String,
    /// Directory served under `/assets` (logo, favicon). Optional.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets_dir: Option<PathBuf>,
    /// Logo path relative to `/assets`, shown above the company name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    /// Sound under `/assets` played when a new status is flagged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_sound: Option<String>,
}

fn default_company_name() -> String {
    "Caferia".to_string()
}

fn default_contact_number() -> String {
    "+91-9876543210".to_string()
}

fn default_wait_message() -> String {
    "Please wait patiently while your food is being prepared.".to_string()
}

fn default_estimate_message() -> String {
    "Estimated wait time: 15 to 30 minutes.".to_string()
}

impl Default for BrandingConfig {
    fn default() -> Self {
        Self {
            company_name: default_company_name(),
            contact_number: default_contact_number(),
            wait_message: default_wait_message(),
            estimate_message: default_estimate_message(),
            assets_dir: None,
            logo: None,
            notification_sound: None,
        }
    }
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub orders_api: SanitizedOrdersApiConfig,
    pub tracker: TrackerConfig,
    pub branding: BrandingConfig,
}

/// Sanitized orders API config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedOrdersApiConfig {
    pub base_url: String,
    pub orders_path: String,
    pub timeout_secs: u32,
    pub api_key_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            orders_api: SanitizedOrdersApiConfig {
                base_url: config.orders_api.base_url.clone(),
                orders_path: config.orders_api.orders_path.clone(),
                timeout_secs: config.orders_api.timeout_secs,
                api_key_configured: config
                    .orders_api
                    .api_key
                    .as_ref()
                    .is_some_and(|k| !k.is_empty()),
            },
            tracker: config.tracker.clone(),
            branding: config.branding.clone(),
        }
    }
}
