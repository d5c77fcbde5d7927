//! AI Bot players for Tilelands.
//!
//! This module provides different difficulty levels of AI players:
//! - Easy: Random legal placement
//! - Medium: Best immediate score, judged by simulating every candidate
//! - Hard: Immediate score plus a positional estimate of the resulting board
//!
//! Every candidate is evaluated on a private copy of the game; the live state
//! is only touched when the chosen move is finally applied.

use crate::actions::{GameAction, GameEvent, Placement};
use crate::board::PlayerId;
use crate::game::{GameError, GameState};
use crate::region::{RegionKind, TokenKind};
use crate::scoring::majority_owners;
use crate::simulator::{candidate_moves, Simulation};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Bot difficulty level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BotDifficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl std::str::FromStr for BotDifficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(BotDifficulty::Easy),
            "medium" => Ok(BotDifficulty::Medium),
            "hard" => Ok(BotDifficulty::Hard),
            other => Err(format!("unknown bot difficulty '{other}'")),
        }
    }
}

/// A bot player that can decide on actions
pub struct Bot {
    pub player_id: PlayerId,
    pub difficulty: BotDifficulty,
    rng: StdRng,
}

impl Bot {
    pub fn new(player_id: PlayerId, difficulty: BotDifficulty) -> Self {
        Self {
            player_id,
            difficulty,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(player_id: PlayerId, difficulty: BotDifficulty, seed: u64) -> Self {
        Self {
            player_id,
            difficulty,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Choose an action for the drawn tile
    pub fn choose_action(&mut self, game: &GameState) -> Option<GameAction> {
        self.ranked_moves(game)
            .into_iter()
            .next()
            .map(GameAction::PlaceTile)
    }

    /// Candidate placements, best first
    pub fn ranked_moves(&mut self, game: &GameState) -> Vec<Placement> {
        if game.is_finished() || game.current_player != self.player_id {
            return Vec::new();
        }
        let Some(tile) = &game.current_tile else {
            return Vec::new();
        };

        let mut moves = candidate_moves(game, self.player_id, tile);
        // Shuffle first so equal scores are broken randomly; the sort is stable
        moves.shuffle(&mut self.rng);
        if self.difficulty == BotDifficulty::Easy {
            return moves;
        }

        let mut scored: Vec<(i64, Placement)> = moves
            .into_iter()
            .filter_map(|placement| {
                let simulation = Simulation::run(game, self.player_id, tile, placement).ok()?;
                let value = match self.difficulty {
                    BotDifficulty::Medium => self.immediate_value(game, &simulation, placement),
                    _ => {
                        self.immediate_value(game, &simulation, placement)
                            + self.positional_value(simulation.state())
                    }
                };
                Some((value, placement))
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().map(|(_, p)| p).collect()
    }

    /// Take the turn, falling back to the next candidate if one is rejected
    pub fn play_turn(&mut self, game: &mut GameState) -> Result<Vec<GameEvent>, GameError> {
        let mut last_error = GameError::NoTileDrawn;
        for placement in self.ranked_moves(game) {
            match game.apply_action(self.player_id, GameAction::PlaceTile(placement)) {
                Ok(events) => {
                    debug!(
                        player = self.player_id,
                        difficulty = ?self.difficulty,
                        position = %placement.position,
                        rotation = placement.rotation,
                        "bot placed tile"
                    );
                    return Ok(events);
                }
                Err(err) if err.is_rejection() => {
                    debug!(player = self.player_id, %err, "bot move rejected, trying next");
                    last_error = err;
                }
                Err(err) => {
                    warn!(player = self.player_id, %err, "bot move hit an invariant violation");
                    last_error = err;
                }
            }
        }
        Err(last_error)
    }

    /// Points gained now, minus what it hands to others and a small token cost
    fn immediate_value(&self, game: &GameState, simulation: &Simulation, placement: Placement) -> i64 {
        let outcome = simulation.summarize(game, placement);
        let mine = outcome.score_delta(self.player_id) as i64;
        let theirs = outcome.opponent_gain(self.player_id) as i64;

        let token_cost = match placement.token.map(|t| t.kind) {
            Some(TokenKind::Ordinary) => 1,
            Some(TokenKind::Big) => 2,
            Some(TokenKind::Bishop) | None => 0,
        };
        mine * 10 - theirs * 6 - token_cost
    }

    /// Estimate of the unfinished regions the bot leads, against those it trails
    fn positional_value(&self, after: &GameState) -> i64 {
        let rules = &after.config.rules;
        let tiles_left = after.tiles_remaining() as i64;
        let mut value = 0i64;

        for region in after.regions.iter() {
            if !region.has_tokens() {
                continue;
            }
            let potential = match &region.kind {
                RegionKind::Town {
                    open_edges,
                    point_base,
                } => {
                    let worth = (*point_base * region.multiplier) as i64 * 2;
                    worth * 4 / (*open_edges as i64 + 2)
                }
                RegionKind::Road { closed_ends } => {
                    region.length() as i64 * (*closed_ends as i64 + 1)
                }
                RegionKind::Cloister { position, .. } => {
                    1 + after.board.occupied_surrounding(position) as i64
                }
                RegionKind::Meadow { .. } => {
                    let towns = after.regions.adjacent_towns(region.id).len() as i64;
                    towns * rules.meadow_points_per_town as i64 / 2
                }
            };
            // Late in the game open regions are unlikely to close
            let potential = if tiles_left < 10 { potential / 2 } else { potential };

            let owners = majority_owners(&region.tokens, rules);
            let mine = region.tokens_of(self.player_id).count() as i64;
            if owners.contains(&self.player_id) {
                value += potential * 3;
            } else {
                value -= potential * 2;
                // tokens stuck in a region someone else controls
                value -= mine * 4;
            }
        }

        if let Some(me) = after.get_player(self.player_id) {
            let pool = me.tokens_remaining as i64;
            if pool <= 1 && tiles_left > 15 {
                value -= 12;
            }
            if me.big_token_available {
                value += 2;
            }
        }
        value
    }
}
