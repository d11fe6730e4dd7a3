//! # tilesync
//!
//! Realtime client for a server-authoritative 2048 game.
//!
//! The server owns the board. The client sends intents (init, move,
//! restart), and every snapshot the server sends back replaces the local
//! [`GameState`](tilesync_protocol::GameState) wholesale. The channel is
//! reopened one second after every loss, and a fresh snapshot is
//! requested on every open.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tilesync::prelude::*;
//!
//! # async fn run() -> Result<(), TilesyncError> {
//! let mut client = GameClient::connect(ClientConfig::from_env())?;
//! let mut state = client.subscribe_state();
//!
//! client.press("ArrowLeft")?;
//! state.changed().await.ok();
//! println!("score: {}", state.borrow().score);
//!
//! client.stop().await;
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;

pub use client::{GameClient, GameClientBuilder};
pub use config::{ClientConfig, DEFAULT_ENDPOINT, ENDPOINT_ENV};
pub use error::TilesyncError;

pub use tilesync_input as input;
pub use tilesync_protocol as protocol;
pub use tilesync_session as session;
pub use tilesync_transport as transport;

pub mod prelude {
    pub use crate::{ClientConfig, GameClient, GameClientBuilder, TilesyncError};
    pub use tilesync_input::{map_key, should_quit, InputAction};
    pub use tilesync_protocol::{Direction, GameState, Intent, Tile};
    pub use tilesync_session::{ConnectionState, SessionConfig};
}
