//! Core types shared by the client and the wire format.
//!
//! [`Intent`] is what the client sends. [`GameState`] is the client's
//! view of the game, rebuilt wholesale from every server snapshot.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ProtocolError;

/// Side length of the board. The server always plays on a 4×4 grid.
pub const GRID_SIZE: usize = 4;

/// The board: `GRID_SIZE` rows of `GRID_SIZE` optional tiles.
pub type Grid = [[Option<Tile>; GRID_SIZE]; GRID_SIZE];

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// One of the four move directions.
///
/// On the wire a direction is a small integer: Up=0, Right=1, Down=2,
/// Left=3. The server depends on this order, so the discriminants are
/// fixed and serde goes through `u8` rather than the variant names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Direction {
    Up = 0,
    Right = 1,
    Down = 2,
    Left = 3,
}

impl Direction {
    /// All directions, in wire order.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    /// The wire code for this direction.
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl From<Direction> for u8 {
    fn from(direction: Direction) -> Self {
        direction.code()
    }
}

impl TryFrom<u8> for Direction {
    type Error = ProtocolError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Direction::ALL
            .get(usize::from(code))
            .copied()
            .ok_or(ProtocolError::InvalidDirection(code))
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Up => "up",
            Direction::Right => "right",
            Direction::Down => "down",
            Direction::Left => "left",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Intent: client → server
// ---------------------------------------------------------------------------

/// A request the client sends to the server.
///
/// `#[serde(tag = "type", rename_all = "lowercase")]` gives the exact wire
/// shape the server expects:
///
/// ```text
/// {"type":"init"}
/// {"type":"move","direction":2}
/// {"type":"restart"}
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Intent {
    /// Ask for the current snapshot. Sent once after every successful open.
    Init,
    /// Ask the server to slide the board.
    Move { direction: Direction },
    /// Ask for a new game.
    Restart,
}

impl Intent {
    /// Shorthand for `Intent::Move { direction }`.
    pub fn moving(direction: Direction) -> Self {
        Intent::Move { direction }
    }

    /// The wire `type` discriminator for this intent.
    pub fn kind(&self) -> &'static str {
        match self {
            Intent::Init => "init",
            Intent::Move { .. } => "move",
            Intent::Restart => "restart",
        }
    }
}

// ---------------------------------------------------------------------------
// Tile
// ---------------------------------------------------------------------------

/// A cell coordinate. Serialized as a `[row, col]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[usize; 2]", into = "[usize; 2]")]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl From<[usize; 2]> for Position {
    fn from([row, col]: [usize; 2]) -> Self {
        Self { row, col }
    }
}

impl From<Position> for [usize; 2] {
    fn from(p: Position) -> Self {
        [p.row, p.col]
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// A numbered tile on the board.
///
/// Tiles carry no identity beyond `(position, value)`: each snapshot
/// replaces the whole board, so the same tile in two snapshots is not
/// tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    pub position: Position,
    pub value: u32,
}

impl Tile {
    pub fn new(row: usize, col: usize, value: u32) -> Self {
        Self {
            position: Position::new(row, col),
            value,
        }
    }

    /// `true` if the value is a power of two no smaller than 2.
    pub fn has_valid_value(&self) -> bool {
        self.value >= 2 && self.value.is_power_of_two()
    }
}

// ---------------------------------------------------------------------------
// GameState
// ---------------------------------------------------------------------------

/// The client's view of the game: exactly the last snapshot received.
///
/// Before any snapshot arrives this is [`GameState::default`]: an empty
/// board with score 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GameState {
    pub grid: Grid,
    pub score: u64,
    pub over: bool,
    pub won: bool,
}

impl GameState {
    /// `true` once the game has ended either way.
    pub fn is_terminated(&self) -> bool {
        self.over || self.won
    }

    /// The tile at `position`, if any.
    pub fn tile_at(&self, position: Position) -> Option<&Tile> {
        self.grid
            .get(position.row)
            .and_then(|row| row.get(position.col))
            .and_then(Option::as_ref)
    }

    /// Iterates over every tile on the board, row by row.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.grid.iter().flatten().flatten()
    }

    /// The highest tile value on the board, or `None` when it is empty.
    pub fn max_tile(&self) -> Option<u32> {
        self.tiles().map(|t| t.value).max()
    }

    /// `true` if no tile is on the board.
    pub fn is_empty(&self) -> bool {
        self.tiles().next().is_none()
    }
}

// =========================================================================
// Tests
// =========================================================================
