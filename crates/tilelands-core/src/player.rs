//! Player state: token pools and score.
//!
//! The engine only reads, decrements and credits these; seats, names and
//! connections belong to whoever hosts the game.

use crate::board::PlayerId;
use crate::config::RuleSet;
use crate::game::TokenRejection;
use crate::region::TokenKind;
use serde::{Deserialize, Serialize};

/// A player's pool and score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    /// Ordinary tokens not on the board
    pub tokens_remaining: u8,
    /// Whether the big token is in the pool (false while it is on the board)
    pub big_token_available: bool,
    pub score: u32,
}

impl Player {
    /// Create a new player with a full pool
    pub fn new(id: PlayerId, name: String, rules: &RuleSet) -> Self {
        Self {
            id,
            name,
            tokens_remaining: rules.tokens_per_player,
            big_token_available: rules.big_token,
            score: 0,
        }
    }

    /// Check the pool allows putting down a token of this kind
    pub fn can_take(&self, kind: TokenKind, rules: &RuleSet) -> Result<(), TokenRejection> {
        match kind {
            TokenKind::Ordinary if self.tokens_remaining == 0 => Err(TokenRejection::PoolExhausted),
            TokenKind::Ordinary => Ok(()),
            TokenKind::Big if !rules.big_token => Err(TokenRejection::KindDisabled),
            TokenKind::Big if !self.big_token_available => Err(TokenRejection::BigTokenSpent),
            TokenKind::Big => Ok(()),
            TokenKind::Bishop if !rules.bishops => Err(TokenRejection::KindDisabled),
            // bishops never draw from the pool
            TokenKind::Bishop => Ok(()),
        }
    }

    /// Remove a token of this kind from the pool
    pub(crate) fn take(&mut self, kind: TokenKind) {
        match kind {
            TokenKind::Ordinary => self.tokens_remaining = self.tokens_remaining.saturating_sub(1),
            TokenKind::Big => self.big_token_available = false,
            TokenKind::Bishop => {}
        }
    }

    /// Put a returned token back into the pool
    pub(crate) fn give_back(&mut self, kind: TokenKind) {
        match kind {
            TokenKind::Ordinary => self.tokens_remaining += 1,
            TokenKind::Big => self.big_token_available = true,
            TokenKind::Bishop => {}
        }
    }

    pub(crate) fn add_points(&mut self, points: u32) {
        self.score += points;
    }
}
