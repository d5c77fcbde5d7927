//! Cross-tile regions and the arena that owns them.
//!
//! A region is one logical meadow, road, town or cloister that may span
//! many tiles. Tiles never hold regions directly: each slot stores a
//! `RegionId`, and every id resolves through the `RegionSet`. When two
//! regions merge, the absorbed id is redirected to the survivor so stale
//! ids held elsewhere (meadow adjacency lists) still resolve in one lookup.
//!
//! Merge direction is fixed: the older region (lower id) survives. Ids are
//! allocated monotonically, so a region created for the tile being placed
//! is always absorbed into the region that was already on the board.

use crate::board::PlayerId;
use crate::coord::Coord;
use crate::game::GameError;
use crate::tile::AreaType;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

/// Stable identifier of a region in the arena
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct RegionId(pub u32);

impl std::fmt::Display for RegionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What kind of token a player puts down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    #[default]
    Ordinary,
    /// Counts double toward majority; one per player
    Big,
    /// Town-only marker, one per contested town cluster
    Bishop,
}

/// A token standing on a slot of a placed tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub position: Coord,
    pub slot: usize,
    pub owner: PlayerId,
    pub kind: TokenKind,
}

/// Type-specific state of a region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RegionKind {
    Meadow {
        /// Towns touching this meadow (possibly stale ids, resolve before use)
        adjacent_towns: Vec<RegionId>,
        adjacent_cloisters: Vec<RegionId>,
    },
    Road {
        /// Ends capped by a junction, cloister, town or a closed loop
        closed_ends: u32,
    },
    Town {
        /// Town edge halves not yet matched by a neighboring tile
        open_edges: u32,
        /// One per contributing tile, two for a tile whose bonus slot is in
        /// the town; doubled on completion
        point_base: u32,
    },
    Cloister {
        position: Coord,
        point_base: u32,
    },
}

impl RegionKind {
    pub fn area_type(&self) -> AreaType {
        match self {
            RegionKind::Meadow { .. } => AreaType::Meadow,
            RegionKind::Road { .. } => AreaType::Road,
            RegionKind::Town { .. } => AreaType::Town,
            RegionKind::Cloister { .. } => AreaType::Cloister,
        }
    }
}

/// One logical area spanning one or more tiles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    pub kind: RegionKind,
    pub tokens: Vec<Token>,
    /// One entry per contributing tile slot; duplicates are kept so every
    /// tile referencing this region can be found again
    pub positions: Vec<Coord>,
    pub multiplier: u32,
    pub finished: bool,
    pub points_awarded: bool,
}

impl Region {
    fn new(id: RegionId, kind: RegionKind, position: Coord, multiplier: u32) -> Self {
        Self {
            id,
            kind,
            tokens: Vec::new(),
            positions: vec![position],
            multiplier: multiplier.max(1),
            finished: false,
            points_awarded: false,
        }
    }

    pub fn area_type(&self) -> AreaType {
        self.kind.area_type()
    }

    /// Number of distinct tiles contributing to this region
    pub fn length(&self) -> u32 {
        self.distinct_positions().len() as u32
    }

    pub fn distinct_positions(&self) -> BTreeSet<Coord> {
        self.positions.iter().copied().collect()
    }

    pub fn has_tokens(&self) -> bool {
        !self.tokens.is_empty()
    }

    /// Whether an ordinary or big token already stands here
    pub fn is_claimed(&self) -> bool {
        self.tokens.iter().any(|t| t.kind != TokenKind::Bishop)
    }

    pub fn has_bishop(&self) -> bool {
        self.tokens.iter().any(|t| t.kind == TokenKind::Bishop)
    }

    /// Tokens owned by a player
    pub fn tokens_of(&self, player: PlayerId) -> impl Iterator<Item = &Token> {
        self.tokens.iter().filter(move |t| t.owner == player)
    }

    /// Fold `other` into this region.
    ///
    /// Tokens and positions are concatenated, the larger multiplier wins and
    /// the type-specific counters combine across the one shared edge that
    /// triggered the merge. A tile already counted by this town adds no
    /// base points a second time.
    fn absorb(&mut self, other: Region) -> Result<(), GameError> {
        let shared_tiles = self
            .distinct_positions()
            .intersection(&other.distinct_positions())
            .count() as u32;
        match (&mut self.kind, other.kind) {
            (
                RegionKind::Town {
                    open_edges,
                    point_base,
                },
                RegionKind::Town {
                    open_edges: other_open,
                    point_base: other_base,
                },
            ) => {
                *open_edges = (*open_edges + other_open).saturating_sub(2);
                *point_base = (*point_base + other_base).saturating_sub(shared_tiles);
            }
            (
                RegionKind::Road { closed_ends },
                RegionKind::Road {
                    closed_ends: other_closed,
                },
            ) => {
                *closed_ends += other_closed;
            }
            (
                RegionKind::Meadow {
                    adjacent_towns,
                    adjacent_cloisters,
                },
                RegionKind::Meadow {
                    adjacent_towns: other_towns,
                    adjacent_cloisters: other_cloisters,
                },
            ) => {
                for town in other_towns {
                    if !adjacent_towns.contains(&town) {
                        adjacent_towns.push(town);
                    }
                }
                for cloister in other_cloisters {
                    if !adjacent_cloisters.contains(&cloister) {
                        adjacent_cloisters.push(cloister);
                    }
                }
            }
            (kind, other_kind) => {
                return Err(GameError::invariant(format!(
                    "cannot merge {} region {} into {} region {}",
                    other_kind.area_type().name(),
                    other.id,
                    kind.area_type().name(),
                    self.id
                )));
            }
        }

        self.tokens.extend(other.tokens);
        self.positions.extend(other.positions);
        self.multiplier = self.multiplier.max(other.multiplier);
        Ok(())
    }

    /// The region met itself across a shared edge.
    fn close_loop(&mut self) {
        match &mut self.kind {
            RegionKind::Town { open_edges, .. } => *open_edges = open_edges.saturating_sub(2),
            RegionKind::Road { closed_ends } => *closed_ends = (*closed_ends).max(2),
            RegionKind::Meadow { .. } | RegionKind::Cloister { .. } => {}
        }
    }
}

/// Result of folding one region into another
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub survivor: RegionId,
    pub absorbed: RegionId,
    /// Tiles that referenced the absorbed region and must be repointed
    pub absorbed_positions: BTreeSet<Coord>,
}

/// Arena of every tracked region
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionSet {
    regions: BTreeMap<RegionId, Region>,
    /// Absorbed id -> surviving id, always one hop
    redirects: BTreeMap<RegionId, RegionId>,
    /// Towns that completed and left tracking
    finished_towns: BTreeSet<RegionId>,
    next_id: u32,
}

impl RegionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new single-tile region
    pub fn create(&mut self, kind: RegionKind, position: Coord, multiplier: u32) -> RegionId {
        let id = RegionId(self.next_id);
        self.next_id += 1;
        self.regions.insert(id, Region::new(id, kind, position, multiplier));
        id
    }

    /// Follow a merge redirect, if any
    pub fn resolve(&self, id: RegionId) -> RegionId {
        self.redirects.get(&id).copied().unwrap_or(id)
    }

    pub fn get(&self, id: RegionId) -> Option<&Region> {
        self.regions.get(&self.resolve(id))
    }

    pub fn get_mut(&mut self, id: RegionId) -> Option<&mut Region> {
        let id = self.resolve(id);
        self.regions.get_mut(&id)
    }

    pub fn contains(&self, id: RegionId) -> bool {
        self.regions.contains_key(&self.resolve(id))
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.values()
    }

    pub fn ids(&self) -> Vec<RegionId> {
        self.regions.keys().copied().collect()
    }

    /// Regions of one area type
    pub fn of_type(&self, area: AreaType) -> impl Iterator<Item = &Region> {
        self.regions.values().filter(move |r| r.area_type() == area)
    }

    /// Merge two distinct live regions. The older id survives.
    pub fn merge(&mut self, a: RegionId, b: RegionId) -> Result<MergeOutcome, GameError> {
        let (a, b) = (self.resolve(a), self.resolve(b));
        if a == b {
            return Err(GameError::invariant(format!("region {a} merged with itself")));
        }
        let (survivor, absorbed) = if a < b { (a, b) } else { (b, a) };

        if !self.regions.contains_key(&survivor) {
            return Err(GameError::invariant(format!("merge survivor {survivor} is not tracked")));
        }
        let other = self
            .regions
            .remove(&absorbed)
            .ok_or_else(|| GameError::invariant(format!("merged region {absorbed} is not tracked")))?;
        let absorbed_positions: BTreeSet<Coord> = other.positions.iter().copied().collect();

        let target = self
            .regions
            .get_mut(&survivor)
            .ok_or_else(|| GameError::invariant(format!("merge survivor {survivor} vanished")))?;
        target.absorb(other)?;

        for redirect in self.redirects.values_mut() {
            if *redirect == absorbed {
                *redirect = survivor;
            }
        }
        self.redirects.insert(absorbed, survivor);

        trace!(%survivor, %absorbed, "merged regions");
        Ok(MergeOutcome {
            survivor,
            absorbed,
            absorbed_positions,
        })
    }

    /// Adjust counters when a region meets itself across an edge
    pub fn close_loop(&mut self, id: RegionId) -> Result<(), GameError> {
        let region = self
            .get_mut(id)
            .ok_or_else(|| GameError::invariant(format!("loop on untracked region {id}")))?;
        region.close_loop();
        Ok(())
    }

    /// Stop tracking a region. Completed towns are archived for meadow scoring.
    pub fn retire(&mut self, id: RegionId) -> Option<Region> {
        let id = self.resolve(id);
        let region = self.regions.remove(&id)?;
        if region.finished && region.area_type() == AreaType::Town {
            self.finished_towns.insert(id);
        }
        Some(region)
    }

    /// Whether a town (possibly by stale id) has been completed
    pub fn is_town_finished(&self, id: RegionId) -> bool {
        let id = self.resolve(id);
        self.finished_towns.contains(&id) || self.regions.get(&id).is_some_and(|r| r.finished)
    }

    /// Resolved, de-duplicated towns adjacent to a meadow
    pub fn adjacent_towns(&self, meadow: RegionId) -> Vec<RegionId> {
        match self.get(meadow).map(|r| &r.kind) {
            Some(RegionKind::Meadow { adjacent_towns, .. }) => {
                let resolved: BTreeSet<RegionId> =
                    adjacent_towns.iter().map(|&t| self.resolve(t)).collect();
                resolved.into_iter().collect()
            }
            _ => Vec::new(),
        }
    }

    /// Resolved, de-duplicated cloisters adjacent to a meadow
    pub fn adjacent_cloisters(&self, meadow: RegionId) -> Vec<RegionId> {
        match self.get(meadow).map(|r| &r.kind) {
            Some(RegionKind::Meadow {
                adjacent_cloisters, ..
            }) => {
                let resolved: BTreeSet<RegionId> =
                    adjacent_cloisters.iter().map(|&c| self.resolve(c)).collect();
                resolved.into_iter().collect()
            }
            _ => Vec::new(),
        }
    }

    /// Tracked meadows that touch a town
    pub fn meadows_touching(&self, town: RegionId) -> Vec<RegionId> {
        let town = self.resolve(town);
        self.of_type(AreaType::Meadow)
            .filter(|m| self.adjacent_towns(m.id).contains(&town))
            .map(|m| m.id)
            .collect()
    }

    /// The town plus every town reachable through a meadow touching it
    pub fn town_cluster(&self, town: RegionId) -> BTreeSet<RegionId> {
        let town = self.resolve(town);
        let mut cluster = BTreeSet::from([town]);
        for meadow in self.meadows_touching(town) {
            cluster.extend(self.adjacent_towns(meadow));
        }
        cluster
    }

    /// Total number of tokens on tracked regions
    pub fn token_count(&self) -> usize {
        self.regions.values().map(|r| r.tokens.len()).sum()
    }
}
