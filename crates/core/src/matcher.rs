//! Ticket lookup: builds the full ticket ID from today's date and the
//! visitor's suffix, and filters the order list by ticket ID and mobile.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Offset, Utc};
use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::order::Order;

static MOBILE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{10}$").unwrap());

/// Errors raised while validating a lookup.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MatchError {
    #[error("Enter a valid 10-digit mobile number.")]
    InvalidMobile,
}

/// What the visitor typed into the lookup form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TicketQuery {
    /// Ticket suffix (the part after `YYYYMMDD-`).
    pub suffix: String,
    /// Mobile number on the order.
    pub mobile: String,
}

impl TicketQuery {
    pub fn new(suffix: impl Into<String>, mobile: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
            mobile: mobile.into(),
        }
    }

    /// Check the mobile number is exactly ten digits (surrounding whitespace
    /// ignored).
    pub fn validate(&self) -> Result<(), MatchError> {
        if MOBILE_RE.is_match(self.mobile.trim()) {
            Ok(())
        } else {
            Err(MatchError::InvalidMobile)
        }
    }
}

/// `YYYYMMDD` prefix for tickets issued on `date`.
pub fn ticket_date_prefix(date: NaiveDate) -> String {
    format!("{:04}{:02}{:02}", date.year(), date.month(), date.day())
}

/// Calendar date of `now` at the given UTC offset.
pub fn local_date(now: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    now.with_timezone(&offset).date_naive()
}

/// Build a `FixedOffset` from minutes east of UTC, clamping to UTC on
/// out-of-range input.
pub fn offset_from_minutes(minutes: i32) -> FixedOffset {
    FixedOffset::east_opt(minutes.saturating_mul(60)).unwrap_or_else(|| Utc.fix())
}

/// Lowercased full ticket ID, or an empty string when no suffix was given.
pub fn full_ticket_id(prefix: &str, suffix: &str) -> String {
    let suffix = suffix.trim();
    if suffix.is_empty() {
        String::new()
    } else {
        format!("{}-{}", prefix, suffix).to_lowercase()
    }
}

/// Orders whose ticket ID and mobile both equal the query, ignoring case.
///
/// An empty suffix never matches. Upstream order is preserved.
pub fn filter_orders(orders: &[Order], query: &TicketQuery, prefix: &str) -> Vec<Order> {
    let ticket_id = full_ticket_id(prefix, &query.suffix);
    if ticket_id.is_empty() {
        return Vec::new();
    }
    let mobile = query.mobile.trim().to_lowercase();

    orders
        .iter()
        .filter(|order| {
            order.ticket_id.to_lowercase() == ticket_id
                && order.customer.mobile.to_lowercase() == mobile
        })
        .cloned()
        .collect()
}
