// Application state module
// Shared by every connection task

use super::types::Config;
use crate::handler::AssetServer;

/// Application state
pub struct AppState {
    pub config: Config,
    pub assets: AssetServer,
}

impl AppState {
    pub const fn new(config: Config, assets: AssetServer) -> Self {
        Self { config, assets }
    }

    pub const fn access_log_enabled(&self) -> bool {
        self.config.logging.access_log
    }
}
