//! Presentation model for an order's lifecycle timeline.
//!
//! Canceled orders show `onBoard → canceled`; everything else shows the full
//! `onBoard → preparing → ready → served` flow. Each step carries the colors
//! and icon the page needs, so rendering is a straight walk over the steps.

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;

use crate::order::{Order, OrderStatus};

/// Color for steps that have not been reached.
pub const INACTIVE_COLOR: &str = "#ccc";
const COMPLETED_LABEL_COLOR: &str = "#444";
const PENDING_LABEL_COLOR: &str = "#999";

/// Accent color for a stage.
pub fn status_color(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::OnBoard => "#1976d2",
        OrderStatus::Preparing => "#212121",
        OrderStatus::Ready => "#006994",
        OrderStatus::Served => "#2e7d32",
        OrderStatus::Canceled => "#d32f2f",
        OrderStatus::Unknown => INACTIVE_COLOR,
    }
}

/// Material icon name for a stage.
pub fn status_icon(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::OnBoard => "access_time",
        OrderStatus::Preparing => "restaurant",
        OrderStatus::Ready => "check_circle",
        OrderStatus::Served => "done_all",
        OrderStatus::Canceled => "cancel_presentation",
        OrderStatus::Unknown => "help_outline",
    }
}

/// One row in the timeline.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TimelineStep {
    pub status: OrderStatus,
    /// This is the order's current status.
    pub active: bool,
    /// The order has moved past this step.
    pub completed: bool,
    /// This is the terminal canceled step.
    pub canceled: bool,
    pub icon: &'static str,
    pub icon_color: &'static str,
    pub label_color: &'static str,
    /// Color of the connector leading to the next step, if there is one.
    pub connector_color: Option<&'static str>,
    /// Time the step was reached, `HH:MM` in the display offset, or `-`.
    pub time: String,
}

/// Ordered steps for an order.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Timeline {
    pub steps: Vec<TimelineStep>,
}

impl Timeline {
    /// Build the timeline for `order`, formatting times at `offset`.
    pub fn for_order(order: &Order, offset: FixedOffset) -> Self {
        let stages: Vec<OrderStatus> = if order.status == OrderStatus::Canceled {
            vec![OrderStatus::OnBoard, OrderStatus::Canceled]
        } else {
            OrderStatus::FLOW.to_vec()
        };

        let current_index = order.status.flow_index();

        let steps = stages
            .iter()
            .enumerate()
            .map(|(idx, &step)| {
                let active = step == order.status;
                let completed = is_before(step.flow_index(), current_index);
                let canceled = step == OrderStatus::Canceled;

                let icon_color = if active || completed || canceled {
                    status_color(step)
                } else {
                    INACTIVE_COLOR
                };

                let label_color = if active {
                    status_color(step)
                } else if completed || canceled {
                    COMPLETED_LABEL_COLOR
                } else {
                    PENDING_LABEL_COLOR
                };

                let connector_color = stages.get(idx + 1).map(|next| {
                    if is_at_or_before(next.flow_index(), current_index) {
                        status_color(order.status)
                    } else {
                        INACTIVE_COLOR
                    }
                });

                TimelineStep {
                    status: step,
                    active,
                    completed,
                    canceled,
                    icon: status_icon(step),
                    icon_color,
                    label_color,
                    connector_color,
                    time: format_clock(order.stage_time(step), offset),
                }
            })
            .collect();

        Self { steps }
    }
}

/// `a < b` where a missing index sorts before every present one and equal to
/// another missing one.
fn is_before(a: Option<usize>, b: Option<usize>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a < b,
        (None, Some(_)) => true,
        _ => false,
    }
}

/// `a <= b` under the same ordering as [`is_before`].
fn is_at_or_before(a: Option<usize>, b: Option<usize>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a <= b,
        (None, _) => true,
        (Some(_), None) => false,
    }
}

/// Format an instant as `HH:MM` at `offset`, or `-` when absent.
pub fn format_clock(ts: Option<DateTime<Utc>>, offset: FixedOffset) -> String {
    match ts {
        Some(ts) => ts.with_timezone(&offset).format("%H:%M").to_string(),
        None => "-".to_string(),
    }
}
