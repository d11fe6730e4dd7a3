//! Wire protocol for tilesync.
//!
//! This crate defines what the client and the game server say to each
//! other:
//!
//! - **Types** ([`Intent`], [`Direction`], [`GameState`], [`Tile`]):
//!   the client's model of requests and of the board.
//! - **Wire shapes** ([`SnapshotMessage`], [`ServerMessage`]): how the
//!   server nests that data, and the validated conversion into
//!   [`GameState`].
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how messages become
//!   bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! # Architecture
//!
//! The protocol layer is pure and synchronous. It knows nothing about
//! connections; the session layer hands it raw payloads.
//!
//! ```text
//! Transport (bytes) → Protocol (ServerMessage / Intent) → Session (state)
//! ```

mod codec;
mod error;
mod types;
mod wire;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{Direction, GameState, Grid, Intent, Position, Tile, GRID_SIZE};
pub use wire::{
    decode_server_message, decode_state, encode_intent, encode_state,
    RejectionMessage, ServerMessage, SnapshotMessage, WireGrid,
};
