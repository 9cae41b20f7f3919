//! Order records as served by the upstream orders API.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

// ============================================================================
// Order Status
// ============================================================================

/// Lifecycle stage of an order.
///
/// Wire names follow the upstream API (`onBoard`, `preparing`, ...). Any
/// status string this service does not know about maps to `Unknown` instead
/// of failing the whole order list.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum OrderStatus {
    OnBoard,
    Preparing,
    Ready,
    Served,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl OrderStatus {
    /// The regular (non-canceled) lifecycle, in order.
    pub const FLOW: [OrderStatus; 4] = [
        OrderStatus::OnBoard,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Served,
    ];

    /// Position of this status in [`Self::FLOW`], or `None` for canceled
    /// and unknown statuses.
    pub fn flow_index(self) -> Option<usize> {
        Self::FLOW.iter().position(|s| *s == self)
    }

    /// Wire name of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::OnBoard => "onBoard",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Served => "served",
            OrderStatus::Canceled => "canceled",
            OrderStatus::Unknown => "unknown",
        }
    }

    /// Human-readable label for the status chip.
    pub fn label(self) -> &'static str {
        match self {
            OrderStatus::OnBoard => "OnBoard",
            OrderStatus::Preparing => "Preparing",
            OrderStatus::Ready => "Ready",
            OrderStatus::Served => "Served",
            OrderStatus::Canceled => "Canceled",
            OrderStatus::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Status Timestamps
// ============================================================================

/// Time each lifecycle stage was reached. A `None` field means the stage has
/// not happened yet, or the upstream value could not be read as a time.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusTimestamps {
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub on_board: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub preparing: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub ready: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub served: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub canceled: Option<DateTime<Utc>>,
}

impl StatusTimestamps {
    /// Timestamp recorded for a given stage.
    pub fn get(&self, status: OrderStatus) -> Option<DateTime<Utc>> {
        match status {
            OrderStatus::OnBoard => self.on_board,
            OrderStatus::Preparing => self.preparing,
            OrderStatus::Ready => self.ready,
            OrderStatus::Served => self.served,
            OrderStatus::Canceled => self.canceled,
            OrderStatus::Unknown => None,
        }
    }

    /// All stage entries, including empty ones.
    pub fn entries(&self) -> [(OrderStatus, Option<DateTime<Utc>>); 5] {
        [
            (OrderStatus::OnBoard, self.on_board),
            (OrderStatus::Preparing, self.preparing),
            (OrderStatus::Ready, self.ready),
            (OrderStatus::Served, self.served),
            (OrderStatus::Canceled, self.canceled),
        ]
    }

    /// Most advanced regular stage that has a timestamp, or `None` if the
    /// order is still waiting to be taken on board.
    pub fn current_stage(&self) -> Option<OrderStatus> {
        OrderStatus::FLOW
            .iter()
            .rev()
            .find(|s| self.get(**s).is_some())
            .copied()
    }

    /// Stages whose timestamp differs between `self` and `other`.
    pub fn changed_stages(&self, other: &StatusTimestamps) -> Vec<OrderStatus> {
        self.entries()
            .iter()
            .zip(other.entries().iter())
            .filter(|((_, a), (_, b))| a != b)
            .map(|((status, _), _)| *status)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().iter().all(|(_, ts)| ts.is_none())
    }
}

// ============================================================================
// Order
// ============================================================================

/// Customer attached to an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Customer {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mobile: String,
}

/// A single order from the upstream list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Upstream record ID.
    #[serde(rename = "_id")]
    pub id: String,
    /// Date-prefixed ticket identifier (`YYYYMMDD-suffix`).
    pub ticket_id: String,
    pub customer: Customer,
    pub status: OrderStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status_timestamps: StatusTimestamps,
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Stage shown on the status chip, derived from the timestamps.
    pub fn current_stage(&self) -> Option<OrderStatus> {
        self.status_timestamps.current_stage()
    }

    /// Chip text: the current stage label, or "Waiting" before onboarding.
    pub fn stage_label(&self) -> &'static str {
        self.current_stage()
            .map(OrderStatus::label)
            .unwrap_or("Waiting")
    }

    /// Time from onboarding to serving, formatted for display.
    pub fn total_time(&self) -> String {
        format_duration(
            self.status_timestamps.on_board,
            self.status_timestamps.served,
        )
    }

    /// Timestamp for a stage, falling back to `created_at` for onboarding.
    pub fn stage_time(&self, status: OrderStatus) -> Option<DateTime<Utc>> {
        match self.status_timestamps.get(status) {
            Some(ts) => Some(ts),
            None if status == OrderStatus::OnBoard => self.created_at,
            None => None,
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Read an upstream timestamp without failing the record.
///
/// Accepts RFC 3339, naive ISO 8601 (taken as UTC) and epoch milliseconds.
/// Anything else is logged and treated as absent.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Millis(i64),
        Other(serde::de::IgnoredAny),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        None => None,
        Some(Raw::Text(text)) if text.trim().is_empty() => None,
        Some(Raw::Text(text)) => {
            let parsed = parse_timestamp(&text);
            if parsed.is_none() {
                warn!("Ignoring unreadable order timestamp {:?}", text);
            }
            parsed
        }
        Some(Raw::Millis(ms)) => Utc.timestamp_millis_opt(ms).single(),
        Some(Raw::Other(_)) => {
            warn!("Ignoring order timestamp that is not a string or number");
            None
        }
    })
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Render the span between two instants as `"{m}m {s}s"`.
///
/// Returns `"-"` when either end is missing or the end precedes the start.
pub fn format_duration(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> String {
    match (start, end) {
        (Some(start), Some(end)) if end >= start => {
            let secs = (end - start).num_seconds();
            format!("{}m {}s", secs / 60, secs % 60)
        }
        _ => "-".to_string(),
    }
}
