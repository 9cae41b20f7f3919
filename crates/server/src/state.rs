use std::sync::Arc;

use orderwatch_core::{BrandingConfig, Config, SanitizedConfig, Tracker};

use crate::api::WsBroadcaster;

/// Shared application state
pub struct AppState {
    config: Config,
    tracker: Arc<Tracker>,
    ws_broadcaster: WsBroadcaster,
}

impl AppState {
    pub fn new(config: Config, tracker: Arc<Tracker>, ws_broadcaster: WsBroadcaster) -> Self {
        Self {
            config,
            tracker,
            ws_broadcaster,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn branding(&self) -> &BrandingConfig {
        &self.config.branding
    }

    pub fn tracker(&self) -> &Tracker {
        self.tracker.as_ref()
    }

    pub fn ws_broadcaster(&self) -> &WsBroadcaster {
        &self.ws_broadcaster
    }
}
