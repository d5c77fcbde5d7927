//! Player actions and the events they produce.
//!
//! Actions are what a client sends; events describe what changed and are
//! what a host broadcasts back.

use crate::board::PlayerId;
use crate::coord::Coord;
use crate::region::{RegionId, TokenKind};
use crate::tile::AreaType;
use serde::{Deserialize, Serialize};

/// A token the player wants to put on the tile being placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenPlacement {
    /// Slot index on the placed tile
    pub slot: usize,
    #[serde(default)]
    pub kind: TokenKind,
}

/// Where and how to put a tile down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Placement {
    pub position: Coord,
    /// Absolute clockwise rotation in quarter turns (0..=3)
    pub rotation: u8,
    #[serde(default)]
    pub token: Option<TokenPlacement>,
}

impl Placement {
    pub fn new(position: Coord, rotation: u8) -> Self {
        Self {
            position,
            rotation,
            token: None,
        }
    }

    pub fn with_token(mut self, slot: usize, kind: TokenKind) -> Self {
        self.token = Some(TokenPlacement { slot, kind });
        self
    }
}

/// All possible actions a player can take
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameAction {
    /// Place the currently drawn tile
    PlaceTile(Placement),
}

/// Who scored what for one finished region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredRegion {
    pub region: RegionId,
    pub area: AreaType,
    /// Majority owners; all of them receive `points_each`
    pub owners: Vec<PlayerId>,
    pub points_each: u32,
}

/// Events that occur as a result of actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// A tile was put on the board
    TilePlaced {
        player: PlayerId,
        tile: String,
        position: Coord,
        rotation: u8,
    },

    /// A token was put on a slot of the placed tile
    TokenPlaced {
        player: PlayerId,
        position: Coord,
        slot: usize,
        kind: TokenKind,
        region: RegionId,
    },

    /// A region was completed (or scored at game end)
    RegionCompleted(ScoredRegion),

    /// Tokens came back to a player's pool
    TokensReturned { player: PlayerId, count: u32 },

    /// A drawn tile fit nowhere and was removed from the game
    TileDiscarded { tile: String },

    /// Turn ended
    TurnEnded {
        player: PlayerId,
        next_player: PlayerId,
    },

    /// The deck ran out and final scores are in
    GameFinished {
        winners: Vec<PlayerId>,
        scores: Vec<u32>,
    },
}
