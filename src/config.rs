use std::env;
use std::time::Duration;

use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: String, reason: String },
    #[error("invalid server URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Client configuration, from environment variables with defaults. CLI flags
/// override these in the binary.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base HTTP URL of the backend, e.g. `http://localhost:8000/`.
    pub server_url: Url,
    /// Live-mode capture cadence. ~10 Hz by default.
    pub capture_interval: Duration,
    /// Re-open the channel with capped exponential backoff after an
    /// unexpected close. Off by default: the base protocol re-establishes a
    /// channel only on explicit mode re-selection.
    pub reconnect: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: Url::parse("http://localhost:8000/").expect("static URL"),
            capture_interval: Duration::from_millis(100),
            reconnect: false,
        }
    }
}

impl ClientConfig {
    /// Load from the environment, falling back to defaults. A `.env` file in
    /// the working directory is honored for development.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(value) = env::var("COUNTER_SERVER_URL") {
            config.server_url = Url::parse(&value)?;
        }
        if let Ok(value) = env::var("COUNTER_CAPTURE_INTERVAL_MS") {
            let millis: u64 = value.parse().map_err(|_| ConfigError::Invalid {
                var: "COUNTER_CAPTURE_INTERVAL_MS".to_string(),
                reason: format!("expected milliseconds, got '{}'", value),
            })?;
            if millis == 0 {
                return Err(ConfigError::Invalid {
                    var: "COUNTER_CAPTURE_INTERVAL_MS".to_string(),
                    reason: "interval must be positive".to_string(),
                });
            }
            config.capture_interval = Duration::from_millis(millis);
        }
        if let Ok(value) = env::var("COUNTER_RECONNECT") {
            config.reconnect = matches!(value.as_str(), "1" | "true" | "yes");
        }

        Ok(config)
    }

    /// Derive the WebSocket endpoint from the server URL: same host, `ws`
    /// path, `ws`/`wss` scheme.
    pub fn ws_url(&self) -> Result<Url, ConfigError> {
        let mut url = self.server_url.join("ws")?;
        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            _ => "ws",
        };
        url.set_scheme(scheme).map_err(|_| ConfigError::Invalid {
            var: "COUNTER_SERVER_URL".to_string(),
            reason: format!("cannot derive a WebSocket URL from {}", self.server_url),
        })?;
        Ok(url)
    }
}
