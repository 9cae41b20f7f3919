//! Testing utilities and mock implementations.
//!
//! This module provides a mock order source so the tracker and the HTTP
//! layer can be exercised without a real orders backend.
//!
//! # Example
//!
//! ```rust,ignore
//! use orderwatch_core::testing::{fixtures, MockOrderSource};
//!
//! let source = MockOrderSource::new();
//! source.set_orders(vec![fixtures::todays_order("1", "0042", "9876543210", 0)]).await;
//!
//! // Use in AppState...
//! ```

mod mock_order_source;

pub use mock_order_source::{FetchHold, MockOrderSource};

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::{Duration, Utc};

    use crate::matcher::{local_date, offset_from_minutes, ticket_date_prefix};
    use crate::order::{Customer, Order, OrderStatus, StatusTimestamps};

    /// Create a freshly onboarded order with the given full ticket ID.
    pub fn order_with_ticket(id: &str, ticket_id: &str, mobile: &str) -> Order {
        let now = Utc::now();
        Order {
            id: id.to_string(),
            ticket_id: ticket_id.to_string(),
            customer: Customer {
                name: format!("Customer {}", id),
                mobile: mobile.to_string(),
            },
            status: OrderStatus::OnBoard,
            status_timestamps: StatusTimestamps {
                on_board: Some(now),
                ..Default::default()
            },
            created_at: Some(now),
        }
    }

    /// Create an onboarded order issued today (at the given UTC offset).
    pub fn todays_order(id: &str, suffix: &str, mobile: &str, utc_offset_minutes: i32) -> Order {
        let prefix = ticket_date_prefix(local_date(
            Utc::now(),
            offset_from_minutes(utc_offset_minutes),
        ));
        order_with_ticket(id, &format!("{}-{}", prefix, suffix), mobile)
    }

    /// Move an order to `status`, stamping every stage up to it.
    ///
    /// Stamps are spaced a minute apart after the onboarding time so later
    /// stages always sort after earlier ones.
    pub fn advance(order: &mut Order, status: OrderStatus) {
        let base = order
            .status_timestamps
            .on_board
            .or(order.created_at)
            .unwrap_or_else(Utc::now);
        let ts = &mut order.status_timestamps;

        match status.flow_index() {
            Some(target) => {
                for (idx, stage) in OrderStatus::FLOW.iter().enumerate().take(target + 1) {
                    let at = base + Duration::minutes(idx as i64);
                    match stage {
                        OrderStatus::OnBoard => ts.on_board = ts.on_board.or(Some(at)),
                        OrderStatus::Preparing => ts.preparing = ts.preparing.or(Some(at)),
                        OrderStatus::Ready => ts.ready = ts.ready.or(Some(at)),
                        OrderStatus::Served => ts.served = ts.served.or(Some(at)),
                        _ => {}
                    }
                }
            }
            None if status == OrderStatus::Canceled => {
                ts.canceled = Some(base + Duration::minutes(1));
            }
            None => {}
        }

        order.status = status;
    }
}
