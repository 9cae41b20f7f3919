//! Layered config loading: a TOML file, then `ORDERWATCH_*` environment
//! variables on top of it.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Prefix of environment overrides. Nested keys are joined with `__`, so
/// `ORDERWATCH_TRACKER__POLL_INTERVAL_SECS=15` sets `tracker.poll_interval_secs`.
pub const ENV_PREFIX: &str = "ORDERWATCH_";

fn layers(path: &Path) -> Figment {
    Figment::from(Toml::file(path)).merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Read `path` and apply environment overrides.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    layers(path)
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Parse a TOML document as-is, without environment overrides.
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}
