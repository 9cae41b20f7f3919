//! A visitor's live lookup.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::snapshot::{StatusChange, StatusSnapshot};
use crate::matcher::{filter_orders, TicketQuery};
use crate::order::Order;

/// Shown when a poll no longer finds the visitor's order.
pub const NO_MATCH_ON_UPDATE: &str = "No matching records found on update.";

/// Result of applying one poll to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Nothing in the session's orders changed.
    Unchanged,
    /// At least one stage changed; the session now shows the new orders.
    Changed(Vec<StatusChange>),
    /// The query no longer matches anything.
    NoMatch,
}

/// One visitor's lookup and what they are currently shown.
#[derive(Debug, Clone, Serialize)]
pub struct TrackingSession {
    pub id: String,
    pub query: TicketQuery,
    /// Date prefix captured when the lookup was submitted.
    pub ticket_prefix: String,
    /// Orders currently shown.
    pub orders: Vec<Order>,
    /// A poll found newer statuses the visitor has not acknowledged.
    pub new_status_available: bool,
    /// Message to show in place of the orders, if any.
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub last_polled_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    snapshot: StatusSnapshot,
}

impl TrackingSession {
    /// Start a session from a successful lookup.
    pub fn new(
        id: String,
        query: TicketQuery,
        ticket_prefix: String,
        matched: Vec<Order>,
        now: DateTime<Utc>,
    ) -> Self {
        let snapshot = StatusSnapshot::capture(&matched);
        Self {
            id,
            query,
            ticket_prefix,
            orders: matched,
            new_status_available: false,
            error: None,
            created_at: now,
            last_seen_at: now,
            last_polled_at: None,
            snapshot,
        }
    }

    /// Full ticket ID this session is looking for, as typed.
    pub fn ticket_id(&self) -> String {
        format!("{}-{}", self.ticket_prefix, self.query.suffix.trim())
    }

    /// Re-run the lookup against a fresh order list.
    ///
    /// The shown orders and the snapshot are only replaced when a stage
    /// changed, so unrelated field edits upstream do not trigger a banner.
    pub fn apply_poll(&mut self, all_orders: &[Order], now: DateTime<Utc>) -> PollOutcome {
        self.last_polled_at = Some(now);

        let matched = filter_orders(all_orders, &self.query, &self.ticket_prefix);
        if matched.is_empty() {
            self.orders.clear();
            self.error = Some(NO_MATCH_ON_UPDATE.to_string());
            self.new_status_available = false;
            self.snapshot = StatusSnapshot::default();
            return PollOutcome::NoMatch;
        }

        let changes = self.snapshot.changes(&matched);
        if changes.is_empty() {
            return PollOutcome::Unchanged;
        }

        self.snapshot = StatusSnapshot::capture(&matched);
        self.orders = matched;
        self.error = None;
        self.new_status_available = true;
        PollOutcome::Changed(changes)
    }

    /// Acknowledge the "new status" banner.
    pub fn dismiss(&mut self) {
        self.new_status_available = false;
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_seen_at = now;
    }

    pub fn is_idle(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        now - self.last_seen_at > ttl
    }

    pub fn snapshot(&self) -> &StatusSnapshot {
        &self.snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{Customer, OrderStatus, StatusTimestamps};
    use chrono::TimeZone;

    fn at(m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 10, m, 0).unwrap()
    }

    fn order(id: &str, suffix: &str, status: OrderStatus, ts: StatusTimestamps) -> Order {
        Order {
            id: id.to_string(),
            ticket_id: format!("20250601-{}", suffix),
            customer: Customer {
                name: "Asha".to_string(),
                mobile: "9876543210".to_string(),
            },
            status,
            status_timestamps: ts,
            created_at: None,
        }
    }

    fn onboard() -> StatusTimestamps {
        StatusTimestamps {
            on_board: Some(at(0)),
            ..Default::default()
        }
    }

    fn preparing() -> StatusTimestamps {
        StatusTimestamps {
            on_board: Some(at(0)),
            preparing: Some(at(5)),
            ..Default::default()
        }
    }

    fn session(orders: Vec<Order>) -> TrackingSession {
        TrackingSession::new(
            "s1".to_string(),
            TicketQuery::new("0042", "9876543210"),
            "20250601".to_string(),
            orders,
            at(0),
        )
    }

    #[test]
    fn test_new_session_has_fresh_snapshot() {
        let s = session(vec![order("1", "0042", OrderStatus::OnBoard, onboard())]);
        assert!(!s.new_status_available);
        assert!(s.error.is_none());
        assert_eq!(s.snapshot().len(), 1);
        assert_eq!(s.ticket_id(), "20250601-0042");
    }

    #[test]
    fn test_poll_unchanged() {
        let orders = vec![order("1", "0042", OrderStatus::OnBoard, onboard())];
        let mut s = session(orders.clone());

        assert_eq!(s.apply_poll(&orders, at(1)), PollOutcome::Unchanged);
        assert!(!s.new_status_available);
        assert_eq!(s.last_polled_at, Some(at(1)));
    }

    #[test]
    fn test_poll_detects_change_and_sets_banner() {
        let mut s = session(vec![order("1", "0042", OrderStatus::OnBoard, onboard())]);

        let upstream = vec![
            order("9", "0099", OrderStatus::Ready, onboard()),
            order("1", "0042", OrderStatus::Preparing, preparing()),
        ];
        let outcome = s.apply_poll(&upstream, at(1));

        match outcome {
            PollOutcome::Changed(changes) => {
                assert_eq!(changes.len(), 1);
                assert_eq!(changes[0].stages, vec![OrderStatus::Preparing]);
            }
            other => panic!("expected Changed, got {:?}", other),
        }
        assert!(s.new_status_available);
        assert_eq!(s.orders.len(), 1);
        assert_eq!(s.orders[0].status, OrderStatus::Preparing);

        // Same data again: no new change, banner stays until dismissed
        assert_eq!(s.apply_poll(&upstream, at(2)), PollOutcome::Unchanged);
        assert!(s.new_status_available);

        s.dismiss();
        assert!(!s.new_status_available);
    }

    #[test]
    fn test_poll_ignores_non_timestamp_edits() {
        let mut s = session(vec![order("1", "0042", OrderStatus::OnBoard, onboard())]);

        let mut edited = order("1", "0042", OrderStatus::OnBoard, onboard());
        edited.customer.name = "Asha K".to_string();

        assert_eq!(s.apply_poll(&[edited], at(1)), PollOutcome::Unchanged);
        assert_eq!(s.orders[0].customer.name, "Asha");
    }

    #[test]
    fn test_poll_no_match_clears_session() {
        let mut s = session(vec![order("1", "0042", OrderStatus::OnBoard, onboard())]);
        s.new_status_available = true;

        let outcome = s.apply_poll(&[order("2", "0043", OrderStatus::OnBoard, onboard())], at(1));
        assert_eq!(outcome, PollOutcome::NoMatch);
        assert!(s.orders.is_empty());
        assert!(!s.new_status_available);
        assert_eq!(s.error.as_deref(), Some(NO_MATCH_ON_UPDATE));
        assert!(s.snapshot().is_empty());
    }

    #[test]
    fn test_poll_recovers_after_no_match() {
        let mut s = session(vec![order("1", "0042", OrderStatus::OnBoard, onboard())]);
        s.apply_poll(&[], at(1));

        let outcome = s.apply_poll(&[order("1", "0042", OrderStatus::OnBoard, onboard())], at(2));
        assert!(matches!(outcome, PollOutcome::Changed(_)));
        assert!(s.error.is_none());
        assert_eq!(s.orders.len(), 1);
        assert!(s.new_status_available);
    }

    #[test]
    fn test_is_idle() {
        let mut s = session(vec![]);
        let ttl = chrono::Duration::minutes(30);
        assert!(!s.is_idle(at(29), ttl));
        assert!(s.is_idle(at(31), ttl));

        s.touch(at(30));
        assert!(!s.is_idle(at(31), ttl));
    }
}
