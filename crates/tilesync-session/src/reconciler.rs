//! The state reconciler: the single owner of the client's [`GameState`].
//!
//! Every payload the live channel delivers ends up in
//! [`Reconciler::apply`]. A snapshot replaces the state wholesale; anything
//! else leaves it exactly as it was. Observers hold a
//! [`watch::Receiver`] and always see a complete state, never a
//! half-written one.

use tilesync_protocol::{
    decode_server_message, Codec, GameState, ProtocolError, ServerMessage,
};
use tokio::sync::watch;
use tracing::{debug, trace, warn};

/// What [`Reconciler::apply`] did with a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciled {
    /// The payload was a snapshot and is now the current state.
    Replaced,
    /// The server refused a request; the state is unchanged.
    Rejected { reason: String },
}

/// Holds the current [`GameState`] and publishes every replacement.
pub struct Reconciler<C: Codec> {
    codec: C,
    state: watch::Sender<GameState>,
}

impl<C: Codec> Reconciler<C> {
    /// Creates a reconciler holding the empty initial board.
    pub fn new(codec: C) -> Self {
        let (state, _) = watch::channel(GameState::default());
        Self { codec, state }
    }

    /// Subscribes to state replacements.
    pub fn subscribe(&self) -> watch::Receiver<GameState> {
        self.state.subscribe()
    }

    /// A copy of the current state.
    pub fn current(&self) -> GameState {
        *self.state.borrow()
    }

    /// Decodes a raw server payload and, if it is a snapshot, makes it the
    /// current state.
    ///
    /// # Errors
    /// Returns the decode error for malformed payloads. The current state
    /// is untouched in that case, and the payload is not retried.
    pub fn apply(&self, data: &[u8]) -> Result<Reconciled, ProtocolError> {
        trace!(len = data.len(), "applying server payload");
        match decode_server_message(&self.codec, data) {
            Ok(ServerMessage::Snapshot(next)) => {
                debug!(
                    score = next.score,
                    over = next.over,
                    won = next.won,
                    "snapshot applied"
                );
                self.state.send_replace(next);
                Ok(Reconciled::Replaced)
            }
            Ok(ServerMessage::Rejected { reason }) => {
                warn!(%reason, "server rejected request");
                Ok(Reconciled::Rejected { reason })
            }
            Err(e) => {
                warn!(error = %e, "failed to decode server payload, keeping last state");
                Err(e)
            }
        }
    }
}
