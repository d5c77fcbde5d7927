//! Square grid coordinates and tile sides.
//!
//! This module provides the foundational coordinate types for the board:
//! - `Coord`: Identifies a cell of the (unbounded) square grid
//! - `Side`: One of the four edges of a tile, in clockwise order
//!
//! The grid uses mathematical orientation: `y` grows to the north and `x`
//! grows to the east.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the four sides of a tile, listed clockwise from North.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    North,
    East,
    South,
    West,
}

impl Side {
    /// All sides in clockwise order starting from North
    pub const ALL: [Side; 4] = [Side::North, Side::East, Side::South, Side::West];

    /// Index of this side in `Side::ALL` (N=0, E=1, S=2, W=3)
    pub const fn index(self) -> usize {
        match self {
            Side::North => 0,
            Side::East => 1,
            Side::South => 2,
            Side::West => 3,
        }
    }

    /// Side for an index, wrapping modulo 4
    pub const fn from_index(index: usize) -> Side {
        Side::ALL[index % 4]
    }

    /// The side facing this one on the neighboring tile
    pub const fn opposite(self) -> Side {
        Side::from_index(self.index() + 2)
    }

    /// This side after `quarter_turns` clockwise rotations
    pub const fn rotated(self, quarter_turns: u8) -> Side {
        Side::from_index(self.index() + quarter_turns as usize)
    }

    /// Grid offset of the neighbor across this side
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Side::North => (0, 1),
            Side::East => (1, 0),
            Side::South => (0, -1),
            Side::West => (-1, 0),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Side::North => "north",
            Side::East => "east",
            Side::South => "south",
            Side::West => "west",
        };
        f.write_str(name)
    }
}

/// A cell on the board.
///
/// Equality, hashing and ordering are structural, so a `Coord` can key both
/// hash maps and ordered maps.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct Coord {
    /// Column (increases going east)
    pub x: i32,
    /// Row (increases going north)
    pub y: i32,
}

impl Coord {
    /// Create a new coordinate
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The origin, where the start tile is placed
    pub const ORIGIN: Coord = Coord::new(0, 0);

    /// Get the neighbor across a specific side
    pub const fn neighbor(&self, side: Side) -> Coord {
        let (dx, dy) = side.offset();
        Coord::new(self.x + dx, self.y + dy)
    }

    /// The four orthogonal neighbors, paired with the side they lie across
    pub fn neighbors(&self) -> [(Side, Coord); 4] {
        Side::ALL.map(|side| (side, self.neighbor(side)))
    }

    /// All eight surrounding cells (orthogonal and diagonal)
    pub fn surrounding(&self) -> [Coord; 8] {
        [
            Coord::new(self.x - 1, self.y + 1),
            Coord::new(self.x, self.y + 1),
            Coord::new(self.x + 1, self.y + 1),
            Coord::new(self.x + 1, self.y),
            Coord::new(self.x + 1, self.y - 1),
            Coord::new(self.x, self.y - 1),
            Coord::new(self.x - 1, self.y - 1),
            Coord::new(self.x - 1, self.y),
        ]
    }

    /// Manhattan distance to another cell
    pub fn distance_to(&self, other: &Coord) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}
