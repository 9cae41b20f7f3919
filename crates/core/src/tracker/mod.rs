//! Order tracking: lookups, live sessions, and the status poller.
//!
//! A successful lookup opens a [`TrackingSession`]. The [`Tracker`] re-fetches
//! the order list on a fixed interval while sessions are live and raises a
//! "new status available" flag whenever a tracked order's stage timestamps
//! change.

mod runner;
mod session;
mod snapshot;
mod types;

pub use runner::{StatusUpdateCallback, Tracker};
pub use session::{PollOutcome, TrackingSession, NO_MATCH_ON_UPDATE};
pub use snapshot::{StatusChange, StatusSnapshot};
pub use types::{PollSummary, TrackError, TrackerStatus};
