//! Order data model: records, lifecycle stages, and status timestamps.

mod types;

pub use types::{format_duration, Customer, Order, OrderStatus, StatusTimestamps};
