//! Connection lifecycle and state reconciliation for tilesync.
//!
//! This crate keeps one game session alive against the server:
//!
//! 1. **Connection management** ([`SessionMachine`]): open a channel,
//!    request a snapshot on every open, reconnect after a fixed delay,
//!    and stop cleanly.
//! 2. **Reconciliation** ([`Reconciler`]): every snapshot replaces the
//!    local [`GameState`](tilesync_protocol::GameState) wholesale.
//! 3. **Running it** ([`SessionHandle`]): a driver task that feeds the
//!    machine real channel events and timers.
//!
//! # How it fits in the stack
//!
//! ```text
//! Input Layer (above)  ← turns keys into intents, sends them here
//!     ↕
//! Session Layer (this crate)  ← owns the channel and the game state
//!     ↕
//! Protocol Layer  ← Intent / snapshot encoding
//! Transport Layer ← opens channels, moves bytes
//! ```

mod driver;
mod error;
mod handle;
mod machine;
mod reconciler;
mod state;

pub use error::SessionError;
pub use handle::SessionHandle;
pub use machine::{SessionAction, SessionEvent, SessionMachine, TimerId};
pub use reconciler::{Reconciled, Reconciler};
pub use state::{ConnectionState, SessionConfig};
