//! Session configuration and the connection lifecycle state.

use std::fmt;
use std::time::Duration;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for session behavior.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Fixed delay between a channel closing and the next connect
    /// attempt. There is no backoff and no attempt limit.
    ///
    /// Default: 1 second.
    pub reconnect_delay: Duration,

    /// How long [`stop`](crate::SessionHandle::stop) waits for the live
    /// channel to close cleanly before aborting its task.
    ///
    /// Default: 1 second.
    pub shutdown_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(1),
            shutdown_timeout: Duration::from_secs(1),
        }
    }
}

// ---------------------------------------------------------------------------
// ConnectionState
// ---------------------------------------------------------------------------

/// Lifecycle status of the transport channel.
///
/// ```text
///   Connecting ──(open)──→ Connected ──(close/error)──→ Disconnected
///       ↑                                                   │
///       └──────────────(reconnect delay elapsed)────────────┘
/// ```
///
/// Intents are only sent while `Connected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// A channel is being opened. This is also the state before the
    /// first attempt.
    #[default]
    Connecting,
    /// A channel is open and the initial snapshot has been requested.
    Connected,
    /// No channel is open. A reconnect is pending unless the session
    /// was stopped.
    Disconnected,
}

impl ConnectionState {
    /// Text for a status banner, or `None` when nothing needs showing.
    pub fn banner(&self) -> Option<&'static str> {
        match self {
            ConnectionState::Connecting => Some("Connecting to server..."),
            ConnectionState::Connected => None,
            ConnectionState::Disconnected => {
                Some("Connection lost. Trying to reconnect...")
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
            ConnectionState::Disconnected => "Disconnected",
        };
        f.write_str(name)
    }
}
