//! HTTP front end for orderwatch: customer pages, the JSON tracking API,
//! per-session WebSocket push and Prometheus metrics.

pub mod api;
pub mod metrics;
pub mod pages;
pub mod state;
