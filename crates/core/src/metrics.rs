//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Upstream orders API fetches
//! - The status poller (ticks, detected changes, live sessions)
//! - Lookups (result by outcome)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Upstream Orders API
// =============================================================================

/// Duration of upstream order list fetches.
pub static UPSTREAM_FETCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "orderwatch_upstream_fetch_duration_seconds",
            "Duration of order list fetches from the upstream API",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["result"], // "success", "error"
    )
    .unwrap()
});

/// Upstream order list fetches by result.
pub static UPSTREAM_FETCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "orderwatch_upstream_fetches_total",
            "Total order list fetches from the upstream API",
        ),
        &["result"], // "success", "http_error", "api_error", "parse_error"
    )
    .unwrap()
});

/// Orders returned by the most recent successful fetch.
pub static UPSTREAM_ORDERS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "orderwatch_upstream_orders",
        "Number of orders in the most recent upstream response",
    )
    .unwrap()
});

/// Upstream records dropped because they could not be decoded as orders.
pub static UPSTREAM_RECORDS_SKIPPED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "orderwatch_upstream_records_skipped_total",
        "Upstream order records skipped as malformed",
    )
    .unwrap()
});

// =============================================================================
// Poller
// =============================================================================

/// Poll ticks by result.
pub static POLL_TICKS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("orderwatch_poll_ticks_total", "Total poll ticks"),
        &["result"], // "ok", "fetch_failed", "idle"
    )
    .unwrap()
});

/// Status changes detected across sessions.
pub static STATUS_CHANGES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "orderwatch_status_changes_total",
        "Status changes detected for tracked orders",
    )
    .unwrap()
});

/// Sessions currently being tracked.
pub static SESSIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "orderwatch_sessions_active",
        "Number of live tracking sessions",
    )
    .unwrap()
});

/// Sessions evicted after sitting idle.
pub static SESSIONS_EXPIRED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "orderwatch_sessions_expired_total",
        "Tracking sessions dropped after the idle TTL",
    )
    .unwrap()
});

// =============================================================================
// Lookups
// =============================================================================

/// Lookups by outcome.
pub static LOOKUPS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("orderwatch_lookups_total", "Ticket lookups by outcome"),
        &["result"], // "matched", "no_match", "invalid", "load_failed"
    )
    .unwrap()
});

/// Get all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Upstream
        Box::new(UPSTREAM_FETCH_DURATION.clone()),
        Box::new(UPSTREAM_FETCHES.clone()),
        Box::new(UPSTREAM_ORDERS.clone()),
        Box::new(UPSTREAM_RECORDS_SKIPPED.clone()),
        // Poller
        Box::new(POLL_TICKS.clone()),
        Box::new(STATUS_CHANGES.clone()),
        Box::new(SESSIONS_ACTIVE.clone()),
        Box::new(SESSIONS_EXPIRED.clone()),
        // Lookups
        Box::new(LOOKUPS.clone()),
    ]
}
