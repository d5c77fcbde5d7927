//! Copy, apply, inspect, discard.
//!
//! A simulation clones the whole `GameState` (board and region arena travel
//! together, so every slot id in the copy resolves inside the copy) and runs
//! the ordinary placement cycle on it. The live state is only ever borrowed.

use crate::actions::Placement;
use crate::board::PlayerId;
use crate::game::{GameError, GameState, PlacementOutcome};
use crate::scoring::CompletedRegion;
use crate::tile::Tile;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// A placement applied to a private copy of the game
#[derive(Debug, Clone)]
pub struct Simulation {
    state: GameState,
    outcome: PlacementOutcome,
}

impl Simulation {
    /// Clone `state` and apply the placement to the clone
    pub fn run(
        state: &GameState,
        player: PlayerId,
        tile: &Tile,
        placement: Placement,
    ) -> Result<Self, GameError> {
        if state.is_finished() {
            return Err(GameError::GameOver);
        }
        let mut copy = state.clone();
        // The copy is dropped on error, so the non-transactional path is fine here
        let outcome = copy.place(player, tile, placement)?;
        Ok(Self {
            state: copy,
            outcome,
        })
    }

    /// The game as it would be after the placement
    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn outcome(&self) -> &PlacementOutcome {
        &self.outcome
    }

    /// Compare against the state the simulation started from
    pub fn summarize(&self, before: &GameState, placement: Placement) -> SimulationOutcome {
        let score_deltas = before
            .players
            .iter()
            .zip(&self.state.players)
            .map(|(b, a)| a.score.saturating_sub(b.score))
            .collect();
        let token_deltas = before
            .players
            .iter()
            .zip(&self.state.players)
            .map(|(b, a)| a.tokens_remaining as i32 - b.tokens_remaining as i32)
            .collect();

        SimulationOutcome {
            placement,
            completed: self.outcome.completed.clone(),
            score_deltas,
            token_deltas,
        }
    }
}

/// What a placement would do, without the state it would produce
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationOutcome {
    pub placement: Placement,
    /// Regions that would complete, with their owners and points
    pub completed: Vec<CompletedRegion>,
    /// Points each player would gain, by player id
    pub score_deltas: Vec<u32>,
    /// Change of each player's ordinary token pool (negative when spent)
    pub token_deltas: Vec<i32>,
}

impl SimulationOutcome {
    pub fn score_delta(&self, player: PlayerId) -> u32 {
        self.score_deltas.get(player as usize).copied().unwrap_or(0)
    }

    /// Points the other players would gain
    pub fn opponent_gain(&self, player: PlayerId) -> u32 {
        self.score_deltas
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != player as usize)
            .map(|(_, d)| *d)
            .sum()
    }
}

/// Evaluate one candidate placement against a snapshot of `state`
pub fn simulate(
    state: &GameState,
    player: PlayerId,
    tile: &Tile,
    placement: Placement,
) -> Result<SimulationOutcome, GameError> {
    let simulation = Simulation::run(state, player, tile, placement)?;
    let outcome = simulation.summarize(state, placement);
    trace!(
        position = %placement.position,
        rotation = placement.rotation,
        completed = outcome.completed.len(),
        "simulated placement"
    );
    Ok(outcome)
}

/// Every legal placement of `tile`, bare and with each token the player could add
pub fn candidate_moves(state: &GameState, player: PlayerId, tile: &Tile) -> Vec<Placement> {
    let mut moves = Vec::new();
    for (position, rotation) in state.legal_placements(tile) {
        let bare = Placement::new(position, rotation);
        moves.push(bare);
        for token in state.token_options(player, &tile.rotated(rotation), position) {
            moves.push(Placement {
                token: Some(token),
                ..bare
            });
        }
    }
    moves
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::config::GameConfig;
    use crate::coord::Coord;
    use crate::region::TokenKind;
    use crate::tile::AreaType;
    use pretty_assertions::assert_eq;

    fn started() -> GameState {
        let mut game = GameState::blank(GameConfig::default(), vec!["A".into(), "B".into()]);
        let start = Catalog::standard().start_tile();
        game.apply_placement(0, &start, Placement::new(Coord::ORIGIN, 0))
            .unwrap();
        game
    }

    #[test]
    fn test_simulation_reports_without_committing() {
        let game = started();
        let before = serde_json::to_string(&game).unwrap();
        let cap = Catalog::standard().instantiate("town-cap").unwrap();
        let placement = Placement::new(Coord::new(0, 1), 2).with_token(0, TokenKind::Ordinary);

        let outcome = simulate(&game, 1, &cap, placement).unwrap();
        assert_eq!(outcome.completed.len(), 1);
        assert_eq!(outcome.completed[0].area, AreaType::Town);
        assert_eq!(outcome.score_deltas, vec![0, 4]);
        // token spent and returned in the same move
        assert_eq!(outcome.token_deltas, vec![0, 0]);
        assert_eq!(outcome.opponent_gain(1), 0);

        assert_eq!(serde_json::to_string(&game).unwrap(), before);
        game.check_invariants().unwrap();
    }

    #[test]
    fn test_simulated_copy_is_independent() {
        let game = started();
        let cap = Catalog::standard().instantiate("town-cap").unwrap();
        let simulation = Simulation::run(&game, 1, &cap, Placement::new(Coord::new(0, 1), 2)).unwrap();

        assert_eq!(simulation.state().board.len(), 2);
        assert_eq!(game.board.len(), 1);
        // the live town is still open and tracked
        let town = game.board.get(&Coord::ORIGIN).unwrap().region(0).unwrap();
        assert!(game.regions.contains(town));
        assert!(!simulation.state().regions.contains(town));
    }

    #[test]
    fn test_rejected_simulation_is_an_error() {
        let game = started();
        let cloister = Catalog::standard().instantiate("cloister").unwrap();
        let result = simulate(&game, 0, &cloister, Placement::new(Coord::new(0, 1), 0));
        assert!(matches!(result, Err(GameError::IllegalPlacement(_))));
    }

    #[test]
    fn test_candidate_moves_cover_bare_and_token_placements() {
        let game = started();
        let straight = Catalog::standard().instantiate("road-straight").unwrap();
        let moves = candidate_moves(&game, 0, &straight);

        let legal = game.legal_placements(&straight);
        assert!(moves.len() > legal.len());
        for (position, rotation) in legal {
            assert!(moves.contains(&Placement::new(position, rotation)));
        }
        assert!(moves.iter().all(|m| m.token.map_or(true, |t| t.slot < 3)));
    }
}
