//! Client configuration.

use tilesync_session::SessionConfig;

/// Endpoint used when nothing else is configured.
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:8000/ws/game";

/// Environment variable that overrides the endpoint.
pub const ENDPOINT_ENV: &str = "TILESYNC_ENDPOINT";

/// Everything a [`GameClient`](crate::GameClient) needs to start.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket URL of the game server.
    pub endpoint: String,
    /// Reconnect and shutdown timing.
    pub session: SessionConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            session: SessionConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Default config with the endpoint taken from `TILESYNC_ENDPOINT`
    /// when it is set and non-empty.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let endpoint = lookup(ENDPOINT_ENV)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        Self {
            endpoint,
            ..Self::default()
        }
    }
}
