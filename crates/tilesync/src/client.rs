//! `GameClient` builder and handle.
//!
//! This is the entry point for playing against a tilesync server. It ties
//! the layers together: input → protocol → session → transport.

use std::time::Duration;

use tilesync_input::IntentMapper;
use tilesync_protocol::{GameState, Intent, JsonCodec};
use tilesync_session::{ConnectionState, SessionConfig, SessionHandle};
use tilesync_transport::WebSocketConnector;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::{ClientConfig, TilesyncError};

/// Builder for configuring and starting a [`GameClient`].
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use tilesync::prelude::*;
///
/// # async fn run() -> Result<(), TilesyncError> {
/// let mut client = GameClient::builder()
///     .endpoint("ws://localhost:8000/ws/game")
///     .reconnect_delay(Duration::from_secs(1))
///     .start()?;
/// client.press("ArrowUp")?;
/// client.stop().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct GameClientBuilder {
    config: ClientConfig,
}

impl GameClientBuilder {
    /// Creates a builder with [`ClientConfig::default`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the server's WebSocket URL.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    /// Sets the fixed delay between losing the channel and reconnecting.
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.config.session.reconnect_delay = delay;
        self
    }

    /// Sets the session configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.config.session = config;
        self
    }

    /// Starts the client. It begins connecting immediately and keeps
    /// reconnecting until stopped.
    ///
    /// # Errors
    /// Returns [`TilesyncError::InvalidEndpoint`] if the endpoint is not a
    /// `ws://` or `wss://` URL. Connection failures are not errors; they
    /// show up as [`ConnectionState`] changes.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime.
    pub fn start(self) -> Result<GameClient, TilesyncError> {
        let ClientConfig { endpoint, session } = self.config;
        if !(endpoint.starts_with("ws://") || endpoint.starts_with("wss://")) {
            return Err(TilesyncError::InvalidEndpoint(endpoint));
        }

        info!(%endpoint, "starting game client");
        let connector = WebSocketConnector::new(endpoint.clone());
        let session = SessionHandle::start(connector, JsonCodec, session);

        Ok(GameClient {
            session,
            mapper: IntentMapper::new(),
            endpoint,
        })
    }
}

/// A connected (or reconnecting) game client.
///
/// Observers read the server's [`GameState`] and the [`ConnectionState`]
/// through watch channels; input goes in through [`press`](Self::press).
pub struct GameClient {
    session: SessionHandle,
    mapper: IntentMapper,
    endpoint: String,
}

impl GameClient {
    /// Creates a new builder.
    pub fn builder() -> GameClientBuilder {
        GameClientBuilder::new()
    }

    /// Starts a client from a finished configuration.
    ///
    /// # Errors
    /// See [`GameClientBuilder::start`].
    pub fn connect(config: ClientConfig) -> Result<Self, TilesyncError> {
        GameClientBuilder::new().config(config).start()
    }

    /// Handles one key token.
    ///
    /// Unrecognized keys are ignored. Moves are suppressed while the
    /// current game is over. Returns the intent that was submitted, if
    /// any.
    ///
    /// # Errors
    /// Returns [`TilesyncError::Session`] once the client has been stopped.
    pub fn press(&self, key: &str) -> Result<Option<Intent>, TilesyncError> {
        let state = self.session.game_state();
        let Some(intent) = self.mapper.map(key, &state) else {
            debug!(key, "key ignored");
            return Ok(None);
        };
        self.session.send_intent(intent)?;
        Ok(Some(intent))
    }

    /// Submits an intent directly, without game-over gating.
    ///
    /// # Errors
    /// Returns [`TilesyncError::Session`] once the client has been stopped.
    pub fn send_intent(&self, intent: Intent) -> Result<(), TilesyncError> {
        self.session.send_intent(intent)?;
        Ok(())
    }

    pub fn game_state(&self) -> GameState {
        self.session.game_state()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.session.connection_state()
    }

    /// Subscribes to game-state replacements.
    pub fn subscribe_state(&self) -> watch::Receiver<GameState> {
        self.session.subscribe_state()
    }

    /// Subscribes to connection-state changes.
    pub fn subscribe_connection(&self) -> watch::Receiver<ConnectionState> {
        self.session.subscribe_connection()
    }

    /// The server URL this client talks to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Closes the channel and cancels any pending reconnect.
    pub async fn stop(&mut self) {
        info!(endpoint = %self.endpoint, "stopping game client");
        self.session.stop().await;
    }
}
