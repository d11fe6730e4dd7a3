//! The public face of a running session.

use tilesync_protocol::{Codec, GameState, Intent};
use tilesync_transport::Connector;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::driver::{Command, SessionDriver};
use crate::{ConnectionState, Reconciler, SessionConfig, SessionError};

/// A handle to a running session.
///
/// Starting a session spawns a driver task that connects, reconnects
/// after every loss, and keeps the reconciled [`GameState`] current.
/// The handle sends intents to it and exposes both the game state and
/// the connection state as [`watch`] channels.
///
/// Dropping the handle without calling [`stop`](Self::stop) still tears
/// the session down; the driver notices that no handle is left.
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<GameState>,
    connection: watch::Receiver<ConnectionState>,
    task: Option<JoinHandle<()>>,
}

impl SessionHandle {
    /// Starts a session and begins connecting immediately.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime.
    pub fn start<K, C>(connector: K, codec: C, config: SessionConfig) -> Self
    where
        K: Connector,
        C: Codec + Clone,
    {
        let (commands, commands_rx) = mpsc::unbounded_channel();
        let (connection_tx, connection) = watch::channel(ConnectionState::Connecting);
        let reconciler = Reconciler::new(codec.clone());
        let state = reconciler.subscribe();

        let driver = SessionDriver::new(
            connector,
            codec,
            &config,
            reconciler,
            connection_tx,
            commands_rx,
        );
        let task = tokio::spawn(driver.run());

        Self {
            commands,
            state,
            connection,
            task: Some(task),
        }
    }

    /// Queues an intent for the live channel.
    ///
    /// Intents issued while no channel is open are dropped by the session,
    /// not buffered. `Ok` only means the session accepted the request.
    ///
    /// # Errors
    /// Returns [`SessionError::Stopped`] once the session has shut down.
    pub fn send_intent(&self, intent: Intent) -> Result<(), SessionError> {
        self.commands
            .send(Command::Intent(intent))
            .map_err(|_| SessionError::Stopped)
    }

    /// Subscribes to game-state replacements.
    pub fn subscribe_state(&self) -> watch::Receiver<GameState> {
        self.state.clone()
    }

    /// Subscribes to connection-state changes.
    pub fn subscribe_connection(&self) -> watch::Receiver<ConnectionState> {
        self.connection.clone()
    }

    /// The most recently reconciled game state.
    pub fn game_state(&self) -> GameState {
        *self.state.borrow()
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.connection.borrow()
    }

    /// Whether the driver task is still running.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stops the session: cancels any pending reconnect, closes the live
    /// channel, and waits for the driver to exit.
    ///
    /// Safe to call more than once.
    pub async fn stop(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        debug!("stopping session");
        // The driver may have exited already; that is still a stop.
        let _ = self.commands.send(Command::Stop);
        if let Err(e) = task.await {
            warn!(error = %e, "session task ended abnormally");
        }
    }
}
