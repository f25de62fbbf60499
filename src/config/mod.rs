// Configuration module entry point
// Loads settings and holds the shared runtime state

mod state;
mod types;

use std::net::SocketAddr;

pub use state::AppState;
pub use types::{AssetsConfig, Config, LoggingConfig, PerformanceConfig, ServerConfig};

impl Config {
    /// Load configuration from specified file path (without extension)
    ///
    /// A missing file is not an error: defaults and `SERVER_*` environment
    /// variables still apply.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("SERVER").separator("__"))
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("assets.root", "public")?
            .set_default("assets.brotli", false)?
            .set_default("assets.encode_on_init", false)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive", true)?
            .set_default("performance.request_timeout", 30)?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}
