use super::{types::Config, ConfigError};

/// Largest UTC offset in use anywhere (UTC+14:00).
const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// Longest poll cadence accepted (one hour).
pub const MAX_POLL_INTERVAL_SECS: u64 = 60 * 60;

/// Longest idle session lifetime accepted (seven days).
pub const MAX_SESSION_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Orders API base URL is an http(s) URL and the path is absolute
/// - Poll interval and session TTL are non-zero and bounded
/// - UTC offset is within +/-14h
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    // Orders API validation
    let base_url = config.orders_api.base_url.trim();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(ConfigError::ValidationError(format!(
            "orders_api.base_url must be an http(s) URL, got '{}'",
            config.orders_api.base_url
        )));
    }

    if !config.orders_api.orders_path.starts_with('/') {
        return Err(ConfigError::ValidationError(
            "orders_api.orders_path must start with '/'".to_string(),
        ));
    }

    if config.orders_api.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "orders_api.timeout_secs cannot be 0".to_string(),
        ));
    }

    // Tracker validation
    if config.tracker.poll_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "tracker.poll_interval_secs cannot be 0".to_string(),
        ));
    }

    if config.tracker.poll_interval_secs > MAX_POLL_INTERVAL_SECS {
        return Err(ConfigError::ValidationError(format!(
            "tracker.poll_interval_secs must be at most {}, got {}",
            MAX_POLL_INTERVAL_SECS, config.tracker.poll_interval_secs
        )));
    }

    if config.tracker.session_ttl_secs == 0 {
        return Err(ConfigError::ValidationError(
            "tracker.session_ttl_secs cannot be 0".to_string(),
        ));
    }

    if config.tracker.session_ttl_secs > MAX_SESSION_TTL_SECS {
        return Err(ConfigError::ValidationError(format!(
            "tracker.session_ttl_secs must be at most {}, got {}",
            MAX_SESSION_TTL_SECS, config.tracker.session_ttl_secs
        )));
    }

    if config.tracker.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
        return Err(ConfigError::ValidationError(format!(
            "tracker.utc_offset_minutes must be within +/-{}, got {}",
            MAX_UTC_OFFSET_MINUTES, config.tracker.utc_offset_minutes
        )));
    }

    Ok(())
}
