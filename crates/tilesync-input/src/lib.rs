//! Input handling for tilesync.
//!
//! Turns raw key tokens into the intents the server understands:
//!
//! ```text
//! "ArrowUp" ─→ map_key ─→ InputAction::Move(Up) ─→ IntentMapper ─→ Intent::Move { Up }
//! ```
//!
//! Unrecognized keys map to nothing. Moves are held back while the game
//! is over; restart always goes through.

mod keymap;
mod mapper;

pub use keymap::{map_key, should_quit, InputAction};
pub use mapper::IntentMapper;
