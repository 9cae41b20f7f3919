pub mod config;
pub mod matcher;
pub mod metrics;
pub mod order;
pub mod source;
pub mod testing;
pub mod timeline;
pub mod tracker;

pub use config::{
    load_config, load_config_from_str, validate_config, BrandingConfig, Config, ConfigError,
    OrdersApiConfig, SanitizedConfig, ServerConfig, TrackerConfig,
};
pub use matcher::{filter_orders, ticket_date_prefix, MatchError, TicketQuery};
pub use order::{format_duration, Customer, Order, OrderStatus, StatusTimestamps};
pub use source::{HttpOrderSource, OrderSource, OrderSourceError};
pub use timeline::{Timeline, TimelineStep};
pub use tracker::{
    PollSummary, StatusChange, StatusUpdateCallback, TrackError, Tracker, TrackerStatus,
    TrackingSession,
};
