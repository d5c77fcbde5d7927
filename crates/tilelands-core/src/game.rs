//! Core game state machine.
//!
//! This module contains the main `GameState` struct, the error taxonomy and
//! the placement cycle: legality, region creation and merging, token
//! placement, completion and scoring. Every placement runs on a scratch copy
//! of the state and is committed only when it succeeds, so a rejected move
//! never leaves a trace.

use crate::actions::{GameAction, GameEvent, Placement, ScoredRegion, TokenPlacement};
use crate::board::{Board, PlayerId};
use crate::catalog::Catalog;
use crate::config::GameConfig;
use crate::coord::{Coord, Side};
use crate::placement::{bind_tile, merge_with_neighbors};
use crate::player::Player;
use crate::region::{RegionId, RegionSet, Token, TokenKind};
use crate::scoring::{self, CompletedRegion};
use crate::simulator::candidate_moves;
use crate::tile::{facing_pairs, AreaType, Tile};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::{debug, info};

/// Smallest supported table
pub const MIN_PLAYERS: usize = 2;

/// Largest supported table
pub const MAX_PLAYERS: usize = 5;

/// Why a tile may not go where it was put
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IllegalReason {
    #[error("cell is already occupied")]
    Occupied,

    #[error("cell has no occupied neighbor")]
    NotConnected,

    #[error("{side} edge does not match the neighboring tile")]
    EdgeMismatch { side: Side },

    #[error("rotation must be between 0 and 3")]
    InvalidRotation,
}

impl IllegalReason {
    pub fn code(&self) -> &'static str {
        match self {
            IllegalReason::Occupied => "occupied",
            IllegalReason::NotConnected => "not_connected",
            IllegalReason::EdgeMismatch { .. } => "edge_mismatch",
            IllegalReason::InvalidRotation => "invalid_rotation",
        }
    }
}

/// Why a token may not go on the chosen slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenRejection {
    #[error("slot does not exist on this tile")]
    SlotOutOfRange,

    #[error("region is already claimed")]
    RegionOccupied,

    #[error("no tokens left in the pool")]
    PoolExhausted,

    #[error("big token is already on the board")]
    BigTokenSpent,

    #[error("bishops may only stand on towns")]
    BishopNotOnTown,

    #[error("a bishop already watches this group of towns")]
    BishopConflict,

    #[error("this token kind is not enabled")]
    KindDisabled,
}

impl TokenRejection {
    pub fn code(&self) -> &'static str {
        match self {
            TokenRejection::SlotOutOfRange => "slot_out_of_range",
            TokenRejection::RegionOccupied => "region_occupied",
            TokenRejection::PoolExhausted => "pool_exhausted",
            TokenRejection::BigTokenSpent => "big_token_spent",
            TokenRejection::BishopNotOnTown => "bishop_not_on_town",
            TokenRejection::BishopConflict => "bishop_conflict",
            TokenRejection::KindDisabled => "kind_disabled",
        }
    }
}

/// Errors that can occur when applying actions
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("Illegal placement: {0}")]
    IllegalPlacement(#[from] IllegalReason),

    #[error("Token rejected: {0}")]
    TokenPlacementRejected(#[from] TokenRejection),

    /// Broken tile data or engine bookkeeping; never caused by a bad move
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Not your turn")]
    NotYourTurn,

    #[error("No tile has been drawn")]
    NoTileDrawn,

    #[error("Unknown player")]
    UnknownPlayer,

    #[error("Game is over")]
    GameOver,
}

impl GameError {
    pub fn invariant(message: impl Into<String>) -> Self {
        GameError::InvariantViolation(message.into())
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            GameError::IllegalPlacement(reason) => reason.code(),
            GameError::TokenPlacementRejected(reason) => reason.code(),
            GameError::InvariantViolation(_) => "invariant_violation",
            GameError::NotYourTurn => "not_your_turn",
            GameError::NoTileDrawn => "no_tile_drawn",
            GameError::UnknownPlayer => "unknown_player",
            GameError::GameOver => "game_over",
        }
    }

    /// Whether this is a rejected move rather than an engine defect
    pub fn is_rejection(&self) -> bool {
        !matches!(self, GameError::InvariantViolation(_))
    }
}

/// Game phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Tiles are being drawn and placed
    Playing,

    /// The deck is empty; highest score wins, ties share the win
    Finished { winners: Vec<PlayerId> },
}

/// What one committed placement did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementOutcome {
    /// Regions completed, scored and removed by this placement
    pub completed: Vec<CompletedRegion>,
    pub events: Vec<GameEvent>,
}

/// The complete game state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    /// Placed tiles
    pub board: Board,
    /// Every region still in play
    pub regions: RegionSet,
    /// All players, indexed by id
    pub players: Vec<Player>,
    /// Seat whose turn it is
    pub current_player: PlayerId,
    pub phase: GamePhase,
    pub config: GameConfig,
    /// Tile the current player must place
    pub current_tile: Option<Tile>,
    /// Turn number (starts at 1)
    pub turn_number: u32,
    /// Undrawn tiles; the next draw comes off the end
    deck: Vec<Tile>,
    /// Seed the deck was shuffled with (for deterministic replays)
    rng_seed: u64,
}

impl GameState {
    /// Create a game with the standard tile set
    pub fn new(config: GameConfig, player_names: Vec<String>) -> Result<Self, GameError> {
        Self::with_catalog(config, player_names, &Catalog::standard())
    }

    /// Create a game: start tile at the origin, shuffled deck, first tile drawn.
    ///
    /// Every shape in `catalog` is validated first; broken tile data fails
    /// with `InvariantViolation` before anything is placed.
    pub fn with_catalog(
        config: GameConfig,
        player_names: Vec<String>,
        catalog: &Catalog,
    ) -> Result<Self, GameError> {
        catalog.validate()?;

        let rng_seed = config.seed.unwrap_or_else(|| rand::thread_rng().gen());
        let mut rng = StdRng::seed_from_u64(rng_seed);
        let deck = catalog.deck(&mut rng);
        let first_player = rng.gen_range(0..player_names.len().max(1)) as PlayerId;

        let mut state = Self::blank(config, player_names);
        state.rng_seed = rng_seed;
        state.deck = deck;
        state.current_player = first_player;

        state.board.insert(Coord::ORIGIN, catalog.start_tile());
        bind_tile(&mut state.board, &mut state.regions, Coord::ORIGIN)?;

        state.turn_number = 1;
        // Discards while drawing the opening tile are not reported to anyone
        let _ = state.draw_tile();
        Ok(state)
    }

    /// An empty board with no deck, for driving placements directly
    pub fn blank(config: GameConfig, player_names: Vec<String>) -> Self {
        assert!(
            (MIN_PLAYERS..=MAX_PLAYERS).contains(&player_names.len()),
            "Must have 2-5 players"
        );

        let players: Vec<Player> = player_names
            .into_iter()
            .enumerate()
            .map(|(i, name)| Player::new(i as PlayerId, name, &config.rules))
            .collect();

        Self {
            board: Board::new(),
            regions: RegionSet::new(),
            players,
            current_player: 0,
            phase: GamePhase::Playing,
            config,
            current_tile: None,
            turn_number: 0,
            deck: Vec::new(),
            rng_seed: 0,
        }
    }

    /// Get the number of players
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Get a player by ID
    pub fn get_player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(id as usize)
    }

    /// Tiles left to draw (the current tile excluded)
    pub fn tiles_remaining(&self) -> usize {
        self.deck.len()
    }

    pub fn rng_seed(&self) -> u64 {
        self.rng_seed
    }

    /// Check if the game is finished
    pub fn is_finished(&self) -> bool {
        matches!(self.phase, GamePhase::Finished { .. })
    }

    /// Get the winners if the game is finished
    pub fn winners(&self) -> Option<&[PlayerId]> {
        match &self.phase {
            GamePhase::Finished { winners } => Some(winners),
            GamePhase::Playing => None,
        }
    }

    /// Every `(position, rotation)` at which `tile` may be placed
    pub fn legal_placements(&self, tile: &Tile) -> Vec<(Coord, u8)> {
        self.board.legal_placements(tile)
    }

    /// Tokens `player` could put on `tile` (already rotated) placed at `pos`.
    ///
    /// Occupancy is predicted from the regions each slot would join. Bishop
    /// options only look at towns already on the board, so a bishop offered
    /// here can still be rejected when a new meadow links two towns.
    pub fn token_options(&self, player: PlayerId, tile: &Tile, pos: Coord) -> Vec<TokenPlacement> {
        let Some(owner) = self.get_player(player) else {
            return Vec::new();
        };
        let rules = &self.config.rules;
        let kinds = [TokenKind::Ordinary, TokenKind::Big, TokenKind::Bishop];

        let mut options = Vec::new();
        for slot in 0..tile.slot_count() {
            let joined = self.regions_joined_by(tile, pos, slot);
            let occupied = joined
                .iter()
                .any(|&id| self.regions.get(id).is_some_and(|r| r.is_claimed()));

            for kind in kinds {
                if owner.can_take(kind, rules).is_err() {
                    continue;
                }
                let allowed = match kind {
                    TokenKind::Ordinary | TokenKind::Big => !occupied,
                    TokenKind::Bishop => {
                        tile.area(slot) == Some(AreaType::Town)
                            && !joined.iter().any(|&town| self.cluster_has_bishop(town))
                    }
                };
                if allowed {
                    options.push(TokenPlacement { slot, kind });
                }
            }
        }
        options
    }

    /// Existing regions a slot would merge with if the tile went to `pos`
    fn regions_joined_by(&self, tile: &Tile, pos: Coord, slot: usize) -> BTreeSet<RegionId> {
        let mut joined = BTreeSet::new();
        for (side, npos) in self.board.occupied_neighbors(&pos) {
            let Some(neighbor) = self.board.get(&npos) else {
                continue;
            };
            for (ours, theirs) in facing_pairs(tile.edge(side), neighbor.edge(side.opposite())) {
                if ours == slot {
                    if let Some(id) = neighbor.region(theirs) {
                        joined.insert(self.regions.resolve(id));
                    }
                }
            }
        }
        joined
    }

    fn cluster_has_bishop(&self, town: RegionId) -> bool {
        self.regions
            .town_cluster(town)
            .into_iter()
            .any(|id| self.regions.get(id).is_some_and(|r| r.has_bishop()))
    }

    /// Get all currently valid actions for a player
    pub fn valid_actions(&self, player: PlayerId) -> Vec<GameAction> {
        let mut actions = Vec::new();
        if self.is_finished() || player != self.current_player {
            return actions;
        }
        let Some(tile) = &self.current_tile else {
            return actions;
        };

        actions.extend(
            candidate_moves(self, player, tile)
                .into_iter()
                .map(GameAction::PlaceTile),
        );
        actions
    }

    /// Apply an action to the game state
    pub fn apply_action(
        &mut self,
        player: PlayerId,
        action: GameAction,
    ) -> Result<Vec<GameEvent>, GameError> {
        if self.is_finished() {
            return Err(GameError::GameOver);
        }
        if self.get_player(player).is_none() {
            return Err(GameError::UnknownPlayer);
        }
        if player != self.current_player {
            return Err(GameError::NotYourTurn);
        }

        match action {
            GameAction::PlaceTile(placement) => {
                let tile = self.current_tile.clone().ok_or(GameError::NoTileDrawn)?;
                let outcome = self.apply_placement(player, &tile, placement)?;
                self.current_tile = None;

                let mut events = outcome.events;
                events.extend(self.end_turn());
                Ok(events)
            }
        }
    }

    /// Place a tile for `player`, score what it completes and commit.
    ///
    /// This does not look at turn order or the drawn tile; `apply_action`
    /// does. On any error the state is exactly as it was.
    pub fn apply_placement(
        &mut self,
        player: PlayerId,
        tile: &Tile,
        placement: Placement,
    ) -> Result<PlacementOutcome, GameError> {
        if self.is_finished() {
            return Err(GameError::GameOver);
        }
        let mut scratch = self.clone();
        let outcome = scratch.place(player, tile, placement)?;
        *self = scratch;
        Ok(outcome)
    }

    /// The placement cycle proper. Leaves `self` half-updated on error, so
    /// it only ever runs on a scratch copy.
    pub(crate) fn place(
        &mut self,
        player: PlayerId,
        tile: &Tile,
        placement: Placement,
    ) -> Result<PlacementOutcome, GameError> {
        let rules = self.config.rules.clone();
        let owner = self.get_player(player).ok_or(GameError::UnknownPlayer)?;
        if placement.rotation > 3 {
            return Err(IllegalReason::InvalidRotation.into());
        }

        let pos = placement.position;
        let rotated = tile.rotated(placement.rotation);
        rotated.validate()?;
        self.board.check_placement(&rotated, pos)?;

        if let Some(token) = placement.token {
            if token.slot >= rotated.slot_count() {
                return Err(TokenRejection::SlotOutOfRange.into());
            }
            owner.can_take(token.kind, &rules)?;
        }

        let name = rotated.name.clone();
        self.board.insert(pos, rotated);
        bind_tile(&mut self.board, &mut self.regions, pos)?;
        let merges = merge_with_neighbors(&mut self.board, &mut self.regions, pos)?;
        debug!(%pos, tile = %name, rotation = placement.rotation, merges = merges.len(), "placed tile");

        let mut events = vec![GameEvent::TilePlaced {
            player,
            tile: name,
            position: pos,
            rotation: placement.rotation,
        }];

        if let Some(token) = placement.token {
            let region = self.put_token(player, pos, token)?;
            events.push(GameEvent::TokenPlaced {
                player,
                position: pos,
                slot: token.slot,
                kind: token.kind,
                region,
            });
        }

        let finished = scoring::mark_completed(&mut self.regions, &self.board);
        let completed = scoring::score_completed(
            &mut self.board,
            &mut self.regions,
            &mut self.players,
            &rules,
            &finished,
        );
        events.extend(completion_events(&completed));

        Ok(PlacementOutcome { completed, events })
    }

    /// Validate and stand a token on a slot of the tile just placed
    fn put_token(
        &mut self,
        player: PlayerId,
        pos: Coord,
        token: TokenPlacement,
    ) -> Result<RegionId, GameError> {
        let id = self
            .board
            .get(&pos)
            .and_then(|t| t.region(token.slot))
            .ok_or(TokenRejection::SlotOutOfRange)?;
        let region = self
            .regions
            .get(id)
            .ok_or_else(|| GameError::invariant(format!("slot {} at {pos} points at untracked region {id}", token.slot)))?;

        match token.kind {
            TokenKind::Ordinary | TokenKind::Big => {
                if region.is_claimed() {
                    return Err(TokenRejection::RegionOccupied.into());
                }
            }
            TokenKind::Bishop => {
                if region.area_type() != AreaType::Town {
                    return Err(TokenRejection::BishopNotOnTown.into());
                }
                if self.cluster_has_bishop(region.id) {
                    return Err(TokenRejection::BishopConflict.into());
                }
            }
        }

        let id = region.id;
        if let Some(region) = self.regions.get_mut(id) {
            region.tokens.push(Token {
                position: pos,
                slot: token.slot,
                owner: player,
                kind: token.kind,
            });
        }
        if let Some(owner) = self.players.get_mut(player as usize) {
            owner.take(token.kind);
        }
        Ok(id)
    }

    /// Pass the turn and draw the next tile, finishing the game when the deck runs dry
    fn end_turn(&mut self) -> Vec<GameEvent> {
        let player = self.current_player;
        let next_player = ((player as usize + 1) % self.players.len()) as PlayerId;
        self.current_player = next_player;
        self.turn_number += 1;

        let mut events = vec![GameEvent::TurnEnded {
            player,
            next_player,
        }];
        events.extend(self.draw_tile());
        if self.current_tile.is_none() {
            events.extend(self.finish());
        }
        events
    }

    /// Draw until a tile fits somewhere; unplayable tiles leave the game
    fn draw_tile(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        while let Some(tile) = self.deck.pop() {
            if self.board.has_legal_placement(&tile) {
                self.current_tile = Some(tile);
                break;
            }
            debug!(tile = %tile.name, "discarding unplayable tile");
            events.push(GameEvent::TileDiscarded { tile: tile.name });
        }
        events
    }

    /// Final scoring and winners
    fn finish(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        if self.config.rules.end_game_scoring {
            let rules = self.config.rules.clone();
            let scored = scoring::score_end_game(
                &mut self.board,
                &mut self.regions,
                &mut self.players,
                &rules,
            );
            events.extend(completion_events(&scored));
        }

        let best = self.players.iter().map(|p| p.score).max().unwrap_or(0);
        let winners: Vec<PlayerId> = self
            .players
            .iter()
            .filter(|p| p.score == best)
            .map(|p| p.id)
            .collect();
        let scores = self.players.iter().map(|p| p.score).collect();

        info!(winners = ?winners, best, turns = self.turn_number, "game finished");
        self.phase = GamePhase::Finished {
            winners: winners.clone(),
        };
        events.push(GameEvent::GameFinished { winners, scores });
        events
    }

    /// Verify the structural invariants of the board and region arena
    pub fn check_invariants(&self) -> Result<(), GameError> {
        if !self.board.is_connected() {
            return Err(GameError::invariant("board is not connected"));
        }

        for (pos, tile) in self.board.tiles() {
            if tile.regions().len() != tile.slot_count() {
                return Err(GameError::invariant(format!(
                    "tile at {pos} has {} region slots for {} areas",
                    tile.regions().len(),
                    tile.slot_count()
                )));
            }
            for (slot, id) in tile.regions().iter().enumerate() {
                let Some(id) = *id else { continue };
                if self.regions.resolve(id) != id {
                    return Err(GameError::invariant(format!(
                        "slot {slot} at {pos} still points at absorbed region {id}"
                    )));
                }
                let region = self.regions.get(id).ok_or_else(|| {
                    GameError::invariant(format!("slot {slot} at {pos} points at untracked region {id}"))
                })?;
                if Some(region.area_type()) != tile.area(slot) {
                    return Err(GameError::invariant(format!(
                        "slot {slot} at {pos} is {:?} but region {id} is {:?}",
                        tile.area(slot),
                        region.area_type()
                    )));
                }
                if !region.positions.contains(pos) {
                    return Err(GameError::invariant(format!(
                        "region {id} does not list {pos} among its tiles"
                    )));
                }
            }
        }

        let mut on_board: BTreeMap<PlayerId, u32> = BTreeMap::new();
        for region in self.regions.iter() {
            for token in &region.tokens {
                let slot_region = self
                    .board
                    .get(&token.position)
                    .and_then(|t| t.region(token.slot));
                if slot_region != Some(region.id) {
                    return Err(GameError::invariant(format!(
                        "token at {} slot {} is not on region {}",
                        token.position, token.slot, region.id
                    )));
                }
                if token.kind == TokenKind::Ordinary {
                    *on_board.entry(token.owner).or_insert(0) += 1;
                }
            }
        }

        for player in &self.players {
            let placed = on_board.get(&player.id).copied().unwrap_or(0);
            if player.tokens_remaining as u32 + placed != self.config.rules.tokens_per_player as u32 {
                return Err(GameError::invariant(format!(
                    "player {} has {} tokens in hand and {} on the board",
                    player.id, player.tokens_remaining, placed
                )));
            }
        }

        Ok(())
    }
}

/// Events describing a batch of scored regions
fn completion_events(completed: &[CompletedRegion]) -> Vec<GameEvent> {
    let mut events = Vec::new();
    let mut returned: BTreeMap<PlayerId, u32> = BTreeMap::new();
    for region in completed {
        events.push(GameEvent::RegionCompleted(ScoredRegion {
            region: region.region,
            area: region.area,
            owners: region.owners.clone(),
            points_each: region.points_each,
        }));
        // bishops never leave the supply
        for token in region.returned.iter().filter(|t| t.kind != TokenKind::Bishop) {
            *returned.entry(token.owner).or_insert(0) += 1;
        }
    }
    events.extend(
        returned
            .into_iter()
            .map(|(player, count)| GameEvent::TokensReturned { player, count }),
    );
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("P{}", i + 1)).collect()
    }

    fn tile(name: &str) -> Tile {
        Catalog::standard().instantiate(name).unwrap()
    }

    fn started() -> GameState {
        let mut game = GameState::blank(GameConfig::default(), names(2));
        game.apply_placement(0, &tile("start"), Placement::new(Coord::ORIGIN, 0))
            .unwrap();
        game
    }

    #[test]
    fn test_new_game_has_start_tile_and_drawn_tile() {
        let game = GameState::new(GameConfig::seeded(42), names(3)).unwrap();
        assert_eq!(game.board.len(), 1);
        assert_eq!(game.regions.len(), 4);
        assert!(game.current_tile.is_some());
        assert_eq!(game.phase, GamePhase::Playing);
        assert!(game.tiles_remaining() < 75);
        game.check_invariants().unwrap();
    }

    #[test]
    fn test_seeded_games_are_identical() {
        let a = GameState::new(GameConfig::seeded(9), names(2)).unwrap();
        let b = GameState::new(GameConfig::seeded(9), names(2)).unwrap();
        assert_eq!(a.current_tile, b.current_tile);
        assert_eq!(a.current_player, b.current_player);
        assert_eq!(a.rng_seed(), 9);
    }

    #[test]
    #[should_panic(expected = "Must have 2-5 players")]
    fn test_player_count_is_enforced() {
        let _ = GameState::new(GameConfig::default(), names(1));
    }

    #[test]
    fn test_wrong_player_rejected() {
        let mut game = GameState::new(GameConfig::seeded(1), names(2)).unwrap();
        let other = (game.current_player + 1) % 2;
        let action = game.valid_actions(game.current_player)[0].clone();
        assert_eq!(game.apply_action(other, action.clone()), Err(GameError::NotYourTurn));
        assert_eq!(game.apply_action(7, action), Err(GameError::UnknownPlayer));
    }

    #[test]
    fn test_apply_action_advances_turn() {
        let mut game = GameState::new(GameConfig::seeded(5), names(2)).unwrap();
        let player = game.current_player;
        let action = game.valid_actions(player)[0].clone();
        let events = game.apply_action(player, action).unwrap();

        assert!(matches!(events[0], GameEvent::TilePlaced { .. }));
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::TurnEnded { player: p, .. } if *p == player
        )));
        assert_ne!(game.current_player, player);
        assert_eq!(game.board.len(), 2);
        game.check_invariants().unwrap();
    }

    #[test]
    fn test_illegal_placement_leaves_state_untouched() {
        let mut game = started();
        let before = serde_json::to_string(&game).unwrap();

        let result = game.apply_placement(0, &tile("cloister"), Placement::new(Coord::new(0, 1), 0));
        assert_eq!(
            result,
            Err(GameError::IllegalPlacement(IllegalReason::EdgeMismatch {
                side: Side::South
            }))
        );
        let result = game.apply_placement(0, &tile("cloister"), Placement::new(Coord::new(1, 0), 4));
        assert_eq!(
            result.map(|_| ()),
            Err(GameError::IllegalPlacement(IllegalReason::InvalidRotation))
        );
        assert_eq!(serde_json::to_string(&game).unwrap(), before);
    }

    #[test]
    fn test_token_on_occupied_region_rejected_without_change() {
        let mut game = started();
        // claim the start tile's road by extending it
        game.apply_placement(
            0,
            &tile("road-straight"),
            Placement::new(Coord::new(0, -1), 0).with_token(1, TokenKind::Ordinary),
        )
        .unwrap();
        let before = serde_json::to_string(&game).unwrap();

        let result = game.apply_placement(
            1,
            &tile("road-straight"),
            Placement::new(Coord::new(0, -2), 0).with_token(1, TokenKind::Ordinary),
        );
        assert_eq!(
            result.map(|_| ()),
            Err(GameError::TokenPlacementRejected(TokenRejection::RegionOccupied))
        );
        assert_eq!(serde_json::to_string(&game).unwrap(), before);
        assert_eq!(game.players[1].tokens_remaining, 7);
    }

    #[test]
    fn test_bishop_may_join_claimed_town_once() {
        let mut game = started();
        game.apply_placement(
            0,
            &tile("town-tube"),
            Placement::new(Coord::new(0, 1), 0).with_token(0, TokenKind::Ordinary),
        )
        .unwrap();
        game.apply_placement(
            1,
            &tile("town-tube"),
            Placement::new(Coord::new(0, 2), 0).with_token(0, TokenKind::Bishop),
        )
        .unwrap();

        let result = game.apply_placement(
            0,
            &tile("town-tube"),
            Placement::new(Coord::new(0, 3), 0).with_token(0, TokenKind::Bishop),
        );
        assert_eq!(
            result.map(|_| ()),
            Err(GameError::TokenPlacementRejected(TokenRejection::BishopConflict))
        );
        // the bishop drew nothing from the pool
        assert_eq!(game.players[1].tokens_remaining, 7);
        game.check_invariants().unwrap();
    }

    #[test]
    fn test_bishop_does_not_claim_a_town() {
        let mut game = started();
        game.apply_placement(
            0,
            &tile("town-tube"),
            Placement::new(Coord::new(0, 1), 0).with_token(0, TokenKind::Bishop),
        )
        .unwrap();

        let next = tile("town-tube");
        assert!(game
            .token_options(1, &next, Coord::new(0, 2))
            .contains(&TokenPlacement {
                slot: 0,
                kind: TokenKind::Ordinary
            }));

        let outcome = game
            .apply_placement(
                1,
                &next,
                Placement::new(Coord::new(0, 2), 0).with_token(0, TokenKind::Ordinary),
            )
            .unwrap();
        assert!(outcome.events.iter().any(|e| matches!(
            e,
            GameEvent::TokenPlaced {
                player: 1,
                kind: TokenKind::Ordinary,
                ..
            }
        )));
        let town = game.board.get(&Coord::ORIGIN).unwrap().region(0).unwrap();
        assert_eq!(game.regions.get(town).unwrap().tokens.len(), 2);
        assert_eq!(game.players[1].tokens_remaining, 6);
        game.check_invariants().unwrap();
    }

    #[test]
    fn test_one_bishop_per_towns_sharing_a_meadow() {
        let mut game = started();
        // a second town whose meadow runs into the start tile's east meadow
        game.apply_placement(
            1,
            &tile("town-cap"),
            Placement::new(Coord::new(1, 0), 1).with_token(0, TokenKind::Bishop),
        )
        .unwrap();
        let start_town = game.board.get(&Coord::ORIGIN).unwrap().region(0).unwrap();
        let cap_town = game.board.get(&Coord::new(1, 0)).unwrap().region(0).unwrap();
        assert_ne!(start_town, cap_town);
        assert!(game.regions.town_cluster(start_town).contains(&cap_town));
        let before = serde_json::to_string(&game).unwrap();

        let result = game.apply_placement(
            0,
            &tile("town-tube"),
            Placement::new(Coord::new(0, 1), 0).with_token(0, TokenKind::Bishop),
        );
        assert_eq!(
            result.map(|_| ()),
            Err(GameError::TokenPlacementRejected(TokenRejection::BishopConflict))
        );
        assert_eq!(serde_json::to_string(&game).unwrap(), before);
    }

    #[test]
    fn test_returned_bishop_is_not_counted() {
        let mut game = started();
        let outcome = game
            .apply_placement(
                1,
                &tile("town-cap"),
                Placement::new(Coord::new(0, 1), 2).with_token(0, TokenKind::Bishop),
            )
            .unwrap();

        assert_eq!(outcome.completed.len(), 1);
        assert_eq!(outcome.completed[0].returned.len(), 1);
        assert!(!outcome
            .events
            .iter()
            .any(|e| matches!(e, GameEvent::TokensReturned { .. })));
        assert_eq!(game.players[1].tokens_remaining, 7);
        game.check_invariants().unwrap();
    }

    #[test]
    fn test_ring_town_counts_each_tile_once() {
        let mut game = GameState::blank(GameConfig::default(), names(2));
        // both caps of this tile end up in the same town
        game.apply_placement(
            0,
            &tile("town-caps-corner"),
            Placement::new(Coord::ORIGIN, 0).with_token(0, TokenKind::Ordinary),
        )
        .unwrap();
        game.apply_placement(1, &tile("town-corner"), Placement::new(Coord::new(0, 1), 3))
            .unwrap();
        game.apply_placement(0, &tile("town-corner"), Placement::new(Coord::new(-1, 1), 2))
            .unwrap();
        let outcome = game
            .apply_placement(1, &tile("town-corner"), Placement::new(Coord::new(-1, 0), 1))
            .unwrap();

        let town = outcome
            .completed
            .iter()
            .find(|c| c.area == AreaType::Town)
            .unwrap();
        assert_eq!(town.owners, vec![0]);
        assert_eq!(town.points_each, 8);
        assert_eq!(game.players[0].score, 8);
    }

    #[test]
    fn test_broken_tile_data_rolls_back() {
        let mut game = GameState::blank(GameConfig::default(), names(2));
        game.apply_placement(0, &tile("road-straight"), Placement::new(Coord::ORIGIN, 0))
            .unwrap();
        let before = serde_json::to_string(&game).unwrap();

        // the south edge matches by its middle slot but the outer slots disagree
        let odd = Tile::new(
            "odd",
            vec![AreaType::Town, AreaType::Road, AreaType::Meadow],
            [vec![0], vec![2], vec![2, 1, 0], vec![2]],
            vec![vec![1], vec![0, 2], vec![1]],
        );
        let result = game.apply_placement(1, &odd, Placement::new(Coord::new(0, 1), 0));
        assert!(matches!(result, Err(GameError::InvariantViolation(_))));
        assert_eq!(serde_json::to_string(&game).unwrap(), before);
        game.check_invariants().unwrap();
    }

    #[test]
    fn test_broken_catalog_is_refused() {
        let mut catalog = Catalog::standard();
        catalog.start.adjacency[1] = vec![9];
        let result = GameState::with_catalog(GameConfig::seeded(3), names(2), &catalog);
        assert!(matches!(result, Err(GameError::InvariantViolation(_))));
    }

    #[test]
    fn test_bishop_only_on_towns() {
        let mut game = started();
        let result = game.apply_placement(
            0,
            &tile("cloister"),
            Placement::new(Coord::new(1, 0), 0).with_token(0, TokenKind::Bishop),
        );
        assert_eq!(
            result.map(|_| ()),
            Err(GameError::TokenPlacementRejected(TokenRejection::BishopNotOnTown))
        );
    }

    #[test]
    fn test_slot_out_of_range() {
        let mut game = started();
        let result = game.apply_placement(
            0,
            &tile("cloister"),
            Placement::new(Coord::new(1, 0), 0).with_token(5, TokenKind::Ordinary),
        );
        assert_eq!(
            result.map(|_| ()),
            Err(GameError::TokenPlacementRejected(TokenRejection::SlotOutOfRange))
        );
    }

    #[test]
    fn test_closing_a_town_scores_and_returns_token() {
        let mut game = started();
        let outcome = game
            .apply_placement(
                1,
                &tile("town-cap"),
                Placement::new(Coord::new(0, 1), 2).with_token(0, TokenKind::Ordinary),
            )
            .unwrap();

        assert_eq!(outcome.completed.len(), 1);
        let town = &outcome.completed[0];
        assert_eq!(town.area, AreaType::Town);
        assert_eq!(town.owners, vec![1]);
        assert_eq!(town.points_each, 4);
        assert_eq!(game.players[1].score, 4);
        assert_eq!(game.players[1].tokens_remaining, 7);
        assert!(!game.regions.contains(town.region));
        assert_eq!(game.board.get(&Coord::ORIGIN).unwrap().region(0), None);
        assert!(outcome
            .events
            .contains(&GameEvent::TokensReturned { player: 1, count: 1 }));
        game.check_invariants().unwrap();
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(GameError::NotYourTurn.code(), "not_your_turn");
        assert_eq!(
            GameError::from(IllegalReason::EdgeMismatch { side: Side::West }).code(),
            "edge_mismatch"
        );
        assert_eq!(
            GameError::from(TokenRejection::PoolExhausted).code(),
            "pool_exhausted"
        );
        assert!(!GameError::invariant("x").is_rejection());
    }

    #[test]
    fn test_token_options_skip_occupied_regions() {
        let mut game = started();
        game.apply_placement(
            0,
            &tile("road-straight"),
            Placement::new(Coord::new(0, -1), 0).with_token(1, TokenKind::Ordinary),
        )
        .unwrap();

        let next = tile("road-straight");
        let options = game.token_options(1, &next, Coord::new(0, -2));
        assert!(!options.iter().any(|o| o.slot == 1 && o.kind != TokenKind::Bishop));
        assert!(options.contains(&TokenPlacement {
            slot: 0,
            kind: TokenKind::Ordinary
        }));
        // the road is not a town
        assert!(!options.iter().any(|o| o.kind == TokenKind::Bishop));
    }
}
