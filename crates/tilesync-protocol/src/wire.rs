//! Server message shapes and the conversions between them and
//! [`GameState`].
//!
//! The server nests the board one level deeper than the client wants it:
//!
//! ```text
//! { "grid": { "size": 4, "cells": [[Tile|null; 4]; 4] },
//!   "score": 12, "over": false, "won": false, "keepPlaying": false }
//! ```
//!
//! Decoding hoists `grid.cells` to [`GameState::grid`] and validates the
//! whole payload before producing anything, so a bad message yields an
//! error and never a half-built state. Unknown fields (`keepPlaying`) are
//! ignored.

use serde::{Deserialize, Serialize};

use crate::{Codec, GameState, Grid, Intent, ProtocolError, Tile, GRID_SIZE};

/// The board as the server sends it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireGrid {
    /// Board side length. Optional because not every server sends it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
    pub cells: Vec<Vec<Option<Tile>>>,
}

/// A full game-state snapshot as the server sends it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMessage {
    pub grid: WireGrid,
    pub score: u64,
    pub over: bool,
    pub won: bool,
}

/// The server's reply to a request it could not handle,
/// e.g. `{"error": "Invalid move"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionMessage {
    pub error: String,
}

/// A decoded server → client message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// A complete, validated game state.
    Snapshot(GameState),
    /// The server refused the last request.
    Rejected { reason: String },
}

impl From<&GameState> for SnapshotMessage {
    fn from(state: &GameState) -> Self {
        Self {
            grid: WireGrid {
                size: Some(GRID_SIZE),
                cells: state.grid.iter().map(|row| row.to_vec()).collect(),
            },
            score: state.score,
            over: state.over,
            won: state.won,
        }
    }
}

impl TryFrom<SnapshotMessage> for GameState {
    type Error = ProtocolError;

    fn try_from(msg: SnapshotMessage) -> Result<Self, Self::Error> {
        if let Some(size) = msg.grid.size {
            if size != GRID_SIZE {
                return Err(ProtocolError::InvalidMessage(format!(
                    "grid size {size}, expected {GRID_SIZE}"
                )));
            }
        }
        if msg.grid.cells.len() != GRID_SIZE {
            return Err(ProtocolError::InvalidMessage(format!(
                "grid has {} rows, expected {GRID_SIZE}",
                msg.grid.cells.len()
            )));
        }

        let mut grid: Grid = Default::default();
        for (r, row) in msg.grid.cells.into_iter().enumerate() {
            if row.len() != GRID_SIZE {
                return Err(ProtocolError::InvalidMessage(format!(
                    "grid row {r} has {} cells, expected {GRID_SIZE}",
                    row.len()
                )));
            }
            for (c, cell) in row.into_iter().enumerate() {
                if let Some(tile) = cell {
                    validate_tile(&tile, r, c)?;
                }
                grid[r][c] = cell;
            }
        }

        Ok(GameState {
            grid,
            score: msg.score,
            over: msg.over,
            won: msg.won,
        })
    }
}

/// A tile must sit in the cell its position names and carry a
/// power-of-two value ≥ 2.
fn validate_tile(tile: &Tile, row: usize, col: usize) -> Result<(), ProtocolError> {
    if tile.position.row != row || tile.position.col != col {
        return Err(ProtocolError::InvalidMessage(format!(
            "tile at cell ({row}, {col}) reports position {}",
            tile.position
        )));
    }
    if !tile.has_valid_value() {
        return Err(ProtocolError::InvalidMessage(format!(
            "tile at ({row}, {col}) has value {}, expected a power of two >= 2",
            tile.value
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Encode / decode entry points
// ---------------------------------------------------------------------------

/// Encodes an intent as a client → server message.
pub fn encode_intent<C: Codec>(
    codec: &C,
    intent: &Intent,
) -> Result<Vec<u8>, ProtocolError> {
    codec.encode(intent)
}

/// Encodes a game state in the server's snapshot shape.
///
/// The client never sends this; it exists so test servers and tools can
/// produce payloads the client will accept.
pub fn encode_state<C: Codec>(
    codec: &C,
    state: &GameState,
) -> Result<Vec<u8>, ProtocolError> {
    codec.encode(&SnapshotMessage::from(state))
}

/// Decodes any server → client message.
///
/// A payload is tried as a snapshot first and as a rejection second. If
/// neither fits, the snapshot error is returned since that is the shape
/// the client expected.
pub fn decode_server_message<C: Codec>(
    codec: &C,
    data: &[u8],
) -> Result<ServerMessage, ProtocolError> {
    match codec.decode::<SnapshotMessage>(data) {
        Ok(snapshot) => Ok(ServerMessage::Snapshot(snapshot.try_into()?)),
        Err(snapshot_err) => match codec.decode::<RejectionMessage>(data) {
            Ok(rejection) => Ok(ServerMessage::Rejected {
                reason: rejection.error,
            }),
            Err(_) => Err(snapshot_err),
        },
    }
}

/// Decodes a payload that must be a snapshot.
pub fn decode_state<C: Codec>(
    codec: &C,
    data: &[u8],
) -> Result<GameState, ProtocolError> {
    match decode_server_message(codec, data)? {
        ServerMessage::Snapshot(state) => Ok(state),
        ServerMessage::Rejected { reason } => Err(ProtocolError::InvalidMessage(
            format!("expected a snapshot, server sent error: {reason}"),
        )),
    }
}
