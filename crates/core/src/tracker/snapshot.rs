//! Status snapshots and change detection between polls.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::order::{Order, OrderStatus, StatusTimestamps};

/// A detected change for one order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusChange {
    pub order_id: String,
    pub ticket_id: String,
    /// Stages whose timestamp was added, removed, or moved.
    pub stages: Vec<OrderStatus>,
}

/// Status timestamps per order ID, as of the last accepted update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusSnapshot {
    statuses: HashMap<String, StatusTimestamps>,
}

impl StatusSnapshot {
    /// Capture the timestamps of `orders`.
    pub fn capture(orders: &[Order]) -> Self {
        Self {
            statuses: orders
                .iter()
                .map(|o| (o.id.clone(), o.status_timestamps.clone()))
                .collect(),
        }
    }

    /// Compare `current` against this snapshot, stage by stage.
    ///
    /// Only orders present in `current` are checked. An order missing from
    /// the snapshot is compared against an empty record, so it counts as a
    /// change as soon as it has any timestamp.
    pub fn changes(&self, current: &[Order]) -> Vec<StatusChange> {
        let empty = StatusTimestamps::default();

        current
            .iter()
            .filter_map(|order| {
                let previous = self.statuses.get(&order.id).unwrap_or(&empty);
                let stages = previous.changed_stages(&order.status_timestamps);
                if stages.is_empty() {
                    None
                } else {
                    Some(StatusChange {
                        order_id: order.id.clone(),
                        ticket_id: order.ticket_id.clone(),
                        stages,
                    })
                }
            })
            .collect()
    }

    /// Whether any order in `current` differs from the snapshot.
    pub fn differs_from(&self, current: &[Order]) -> bool {
        !self.changes(current).is_empty()
    }

    pub fn get(&self, order_id: &str) -> Option<&StatusTimestamps> {
        self.statuses.get(order_id)
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}
