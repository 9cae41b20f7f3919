//! Types for the status tracker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::matcher::MatchError;
use crate::source::OrderSourceError;

/// Errors surfaced to the visitor or API caller.
#[derive(Debug, Error)]
pub enum TrackError {
    /// The lookup form was filled in wrong.
    #[error(transparent)]
    Invalid(#[from] MatchError),

    /// The lookup ran but nothing matched.
    #[error("No matching records found. Please check your Ticket ID and Mobile Number.")]
    NoMatch,

    /// The order list could not be loaded.
    #[error("Failed to load orders. Please try again later.")]
    LoadFailed(#[source] OrderSourceError),

    /// Session ID is unknown or expired.
    #[error("tracking session not found: {0}")]
    SessionNotFound(String),
}

/// Summary of one poll tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSummary {
    /// Sessions checked this tick.
    pub sessions: usize,
    /// Sessions whose orders changed.
    pub changed: usize,
    /// Sessions that lost their match.
    pub no_match: usize,
    /// Sessions dropped for being idle.
    pub expired: usize,
}

/// Current status of the tracker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackerStatus {
    /// Whether the poll loop is running.
    pub running: bool,
    /// Live tracking sessions.
    pub sessions: usize,
    /// Poll cadence in seconds.
    pub poll_interval_secs: u64,
    /// When the last successful poll finished.
    pub last_poll_at: Option<DateTime<Utc>>,
}
