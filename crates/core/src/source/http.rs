//! HTTP client for the upstream orders API.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use super::{OrderSource, OrderSourceError};
use crate::config::OrdersApiConfig;
use crate::metrics::{
    UPSTREAM_FETCHES, UPSTREAM_FETCH_DURATION, UPSTREAM_ORDERS, UPSTREAM_RECORDS_SKIPPED,
};
use crate::order::Order;

/// Fetches the order list with a single `GET {base_url}{orders_path}`.
pub struct HttpOrderSource {
    client: Client,
    url: String,
    api_key: Option<String>,
}

impl HttpOrderSource {
    /// Create a new client from config.
    pub fn new(config: &OrdersApiConfig) -> Result<Self, OrderSourceError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()?;

        let url = format!(
            "{}{}",
            config.base_url.trim().trim_end_matches('/'),
            config.orders_path
        );

        Ok(Self {
            client,
            url,
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
        })
    }

    /// Full URL of the order list endpoint.
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> Result<Vec<Order>, OrderSourceError> {
        debug!("Fetching orders from {}", self.url);

        let mut request = self.client.get(&self.url);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OrderSourceError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let records: Vec<serde_json::Value> = response.json().await.map_err(|e| {
            OrderSourceError::ParseError(format!("Failed to parse order list: {}", e))
        })?;

        Ok(parse_records(records))
    }
}

/// Decode each record on its own; malformed records are skipped.
fn parse_records(records: Vec<serde_json::Value>) -> Vec<Order> {
    let total = records.len();
    let orders: Vec<Order> = records
        .into_iter()
        .enumerate()
        .filter_map(|(i, record)| match serde_json::from_value(record) {
            Ok(order) => Some(order),
            Err(e) => {
                warn!("Skipping order record {}: {}", i, e);
                None
            }
        })
        .collect();

    if orders.len() < total {
        UPSTREAM_RECORDS_SKIPPED.inc_by((total - orders.len()) as u64);
    }
    orders
}

#[async_trait]
impl OrderSource for HttpOrderSource {
    async fn fetch_orders(&self) -> Result<Vec<Order>, OrderSourceError> {
        let start = Instant::now();
        let result = self.fetch().await;
        let elapsed = start.elapsed().as_secs_f64();

        match &result {
            Ok(orders) => {
                UPSTREAM_FETCH_DURATION
                    .with_label_values(&["success"])
                    .observe(elapsed);
                UPSTREAM_FETCHES.with_label_values(&["success"]).inc();
                UPSTREAM_ORDERS.set(orders.len() as i64);
                debug!("Fetched {} orders in {:.3}s", orders.len(), elapsed);
            }
            Err(e) => {
                UPSTREAM_FETCH_DURATION
                    .with_label_values(&["error"])
                    .observe(elapsed);
                UPSTREAM_FETCHES.with_label_values(&[e.kind()]).inc();
                warn!("Order fetch from {} failed: {}", self.url, e);
            }
        }

        result
    }

    fn name(&self) -> &str {
        "http"
    }
}
