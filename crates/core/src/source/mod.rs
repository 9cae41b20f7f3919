//! Upstream order source.
//!
//! The tracker never talks to the orders backend directly; it goes through
//! [`OrderSource`] so tests can swap in a mock.

mod http;

pub use http::HttpOrderSource;

use async_trait::async_trait;
use thiserror::Error;

use crate::order::Order;

/// Errors that can occur when fetching the order list.
#[derive(Debug, Error)]
pub enum OrderSourceError {
    /// HTTP request failed (connection, timeout, TLS).
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Upstream returned a non-success status.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Response body was not an order list.
    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

impl OrderSourceError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            OrderSourceError::HttpError(_) => "http_error",
            OrderSourceError::ApiError { .. } => "api_error",
            OrderSourceError::ParseError(_) => "parse_error",
        }
    }
}

/// Something that can produce the current list of orders.
#[async_trait]
pub trait OrderSource: Send + Sync {
    /// Fetch the full order list.
    async fn fetch_orders(&self) -> Result<Vec<Order>, OrderSourceError>;

    /// Short name for logs.
    fn name(&self) -> &str;
}
