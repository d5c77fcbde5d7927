//! Completion detection and scoring.
//!
//! After every placement the tracked regions are scanned for completion.
//! A completed region is scored to the owners holding the token majority,
//! its tokens go back to their pools, and it leaves tracking: the arena
//! forgets it and every tile slot that referenced it is cleared.
//!
//! When the deck runs out, whatever is still tracked is scored once with the
//! end-game values.

use crate::board::{Board, PlayerId};
use crate::config::{RuleSet, CLOISTER_POINTS};
use crate::player::Player;
use crate::region::{Region, RegionId, RegionKind, RegionSet, Token, TokenKind};
use crate::tile::AreaType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// A region that was scored and removed from tracking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedRegion {
    pub region: RegionId,
    pub area: AreaType,
    /// Majority owners, in seat order; empty when nobody had a token on it
    pub owners: Vec<PlayerId>,
    /// Points credited to each owner
    pub points_each: u32,
    /// Tokens handed back to their owners
    pub returned: Vec<Token>,
}

/// Whether a region's completion condition holds
pub fn is_complete(region: &Region, board: &Board) -> bool {
    match &region.kind {
        RegionKind::Town { open_edges, .. } => *open_edges == 0,
        RegionKind::Road { closed_ends } => *closed_ends >= 2,
        RegionKind::Cloister { position, .. } => board.occupied_surrounding(position) == 8,
        RegionKind::Meadow { .. } => false,
    }
}

/// How much a token counts toward majority
pub fn token_weight(kind: TokenKind, rules: &RuleSet) -> u32 {
    match kind {
        TokenKind::Big => rules.big_token_weight,
        TokenKind::Ordinary | TokenKind::Bishop => 1,
    }
}

/// Owners with the highest weighted token count. Ties all win.
pub fn majority_owners(tokens: &[Token], rules: &RuleSet) -> Vec<PlayerId> {
    let mut counts: BTreeMap<PlayerId, u32> = BTreeMap::new();
    for token in tokens {
        *counts.entry(token.owner).or_insert(0) += token_weight(token.kind, rules);
    }
    let Some(&best) = counts.values().max() else {
        return Vec::new();
    };
    counts
        .into_iter()
        .filter(|&(_, count)| count == best)
        .map(|(owner, _)| owner)
        .collect()
}

/// Value of a completed region
pub fn completed_points(region: &Region) -> u32 {
    match &region.kind {
        RegionKind::Cloister { point_base, .. } => *point_base,
        RegionKind::Road { .. } => region.length() * region.multiplier,
        RegionKind::Town { point_base, .. } => point_base * region.multiplier,
        RegionKind::Meadow { .. } => 0,
    }
}

/// Value of an unfinished region when the game ends
pub fn end_game_points(region: &Region, regions: &RegionSet, board: &Board, rules: &RuleSet) -> u32 {
    match &region.kind {
        RegionKind::Road { .. } => region.length() * region.multiplier,
        RegionKind::Town { point_base, .. } => point_base * region.multiplier,
        RegionKind::Cloister { position, .. } => 1 + board.occupied_surrounding(position) as u32,
        RegionKind::Meadow { .. } => {
            let finished = regions
                .adjacent_towns(region.id)
                .into_iter()
                .filter(|&town| regions.is_town_finished(town))
                .count() as u32;
            finished * rules.meadow_points_per_town
        }
    }
}

/// Flag every newly completed region and apply its completion bonus.
///
/// Towns double their point base once; cloisters jump to their full value.
pub(crate) fn mark_completed(regions: &mut RegionSet, board: &Board) -> Vec<RegionId> {
    let newly: Vec<RegionId> = regions
        .iter()
        .filter(|r| !r.finished && is_complete(r, board))
        .map(|r| r.id)
        .collect();

    for &id in &newly {
        if let Some(region) = regions.get_mut(id) {
            region.finished = true;
            match &mut region.kind {
                RegionKind::Town { point_base, .. } => *point_base *= 2,
                RegionKind::Cloister { point_base, .. } => *point_base = CLOISTER_POINTS,
                RegionKind::Road { .. } | RegionKind::Meadow { .. } => {}
            }
        }
    }
    newly
}

/// Score and retire the given finished regions
pub(crate) fn score_completed(
    board: &mut Board,
    regions: &mut RegionSet,
    players: &mut [Player],
    rules: &RuleSet,
    ids: &[RegionId],
) -> Vec<CompletedRegion> {
    let mut completed = Vec::with_capacity(ids.len());
    for &id in ids {
        let Some(region) = regions.get(id) else {
            continue;
        };
        let points = completed_points(region);
        if let Some(scored) = settle(board, regions, players, rules, id, points) {
            completed.push(scored);
        }
    }
    completed
}

/// Score every region still tracked at the end of the game
pub(crate) fn score_end_game(
    board: &mut Board,
    regions: &mut RegionSet,
    players: &mut [Player],
    rules: &RuleSet,
) -> Vec<CompletedRegion> {
    // Values are fixed up front: retiring a town must not change a meadow's count
    let values: Vec<(RegionId, u32)> = regions
        .iter()
        .filter(|r| r.has_tokens())
        .map(|r| (r.id, end_game_points(r, regions, board, rules)))
        .collect();

    values
        .into_iter()
        .filter_map(|(id, points)| settle(board, regions, players, rules, id, points))
        .collect()
}

/// Credit the majority, return the tokens and drop the region from tracking
fn settle(
    board: &mut Board,
    regions: &mut RegionSet,
    players: &mut [Player],
    rules: &RuleSet,
    id: RegionId,
    points: u32,
) -> Option<CompletedRegion> {
    let mut region = regions.retire(id)?;
    region.points_awarded = true;

    let owners = majority_owners(&region.tokens, rules);
    for &owner in &owners {
        if let Some(player) = players.get_mut(owner as usize) {
            player.add_points(points);
        }
    }
    for token in &region.tokens {
        if let Some(player) = players.get_mut(token.owner as usize) {
            player.give_back(token.kind);
        }
    }

    let cleared = board.repoint(&region.distinct_positions(), region.id, None);
    debug!(
        region = %region.id,
        area = region.area_type().name(),
        points,
        owners = ?owners,
        cleared,
        "scored region"
    );

    Some(CompletedRegion {
        region: region.id,
        area: region.area_type(),
        owners,
        points_each: points,
        returned: std::mem::take(&mut region.tokens),
    })
}
