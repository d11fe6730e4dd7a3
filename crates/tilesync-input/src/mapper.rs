//! Gates input actions on the current game state.

use tilesync_protocol::{GameState, Intent};
use tracing::debug;

use crate::{map_key, InputAction};

/// Decides which actions become intents.
///
/// Moves are suppressed while the game is over. The server is still the
/// only judge of legal moves; this only avoids sending ones it would
/// ignore anyway. Restart is never suppressed.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntentMapper;

impl IntentMapper {
    pub fn new() -> Self {
        Self
    }

    /// Returns the intent to send for `action`, or `None` if it is
    /// suppressed in `state`.
    pub fn gate(&self, action: InputAction, state: &GameState) -> Option<Intent> {
        match action {
            InputAction::Move(direction) if state.over => {
                debug!(%direction, "game over, move suppressed");
                None
            }
            action => Some(action.intent()),
        }
    }

    /// Maps a raw key token and gates it in one step.
    pub fn map(&self, key: &str, state: &GameState) -> Option<Intent> {
        map_key(key).and_then(|action| self.gate(action, state))
    }
}
