//! Sparse tile grid and placement legality.
//!
//! This module contains:
//! - The board: placed tiles keyed by coordinate
//! - Neighbor and frontier queries
//! - The edge-matching rule deciding where a tile may go
//! - Connectivity checks used to verify board invariants

use crate::coord::{Coord, Side};
use crate::game::IllegalReason;
use crate::region::RegionId;
use crate::tile::Tile;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

/// Player identifier (seat index in turn order)
pub type PlayerId = u8;

/// The board of placed tiles
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    /// Placed tiles indexed by position
    #[serde(with = "cell_list")]
    cells: BTreeMap<Coord, Tile>,
}

impl Board {
    /// Create an empty board
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Number of placed tiles
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn get(&self, pos: &Coord) -> Option<&Tile> {
        self.cells.get(pos)
    }

    pub(crate) fn get_mut(&mut self, pos: &Coord) -> Option<&mut Tile> {
        self.cells.get_mut(pos)
    }

    pub fn is_occupied(&self, pos: &Coord) -> bool {
        self.cells.contains_key(pos)
    }

    /// All placed tiles in coordinate order
    pub fn tiles(&self) -> impl Iterator<Item = (&Coord, &Tile)> {
        self.cells.iter()
    }

    pub fn positions(&self) -> impl Iterator<Item = &Coord> {
        self.cells.keys()
    }

    /// Occupied orthogonal neighbors of a cell
    pub fn occupied_neighbors(&self, pos: &Coord) -> Vec<(Side, Coord)> {
        pos.neighbors()
            .into_iter()
            .filter(|(_, n)| self.is_occupied(n))
            .collect()
    }

    /// Number of occupied cells among the eight surrounding `pos`
    pub fn occupied_surrounding(&self, pos: &Coord) -> usize {
        pos.surrounding()
            .iter()
            .filter(|c| self.is_occupied(c))
            .count()
    }

    /// Empty cells orthogonally adjacent to at least one placed tile
    pub fn frontier(&self) -> BTreeSet<Coord> {
        let mut frontier = BTreeSet::new();
        for pos in self.cells.keys() {
            for (_, n) in pos.neighbors() {
                if !self.is_occupied(&n) {
                    frontier.insert(n);
                }
            }
        }
        frontier
    }

    /// Check whether `tile` (already rotated) may be placed at `pos`
    pub fn check_placement(&self, tile: &Tile, pos: Coord) -> Result<(), IllegalReason> {
        if self.is_occupied(&pos) {
            return Err(IllegalReason::Occupied);
        }
        if self.is_empty() {
            return Ok(());
        }

        let neighbors = self.occupied_neighbors(&pos);
        if neighbors.is_empty() {
            return Err(IllegalReason::NotConnected);
        }

        for (side, npos) in neighbors {
            let Some(neighbor) = self.get(&npos) else {
                continue;
            };
            let ours = tile.side_type(side);
            let theirs = neighbor.side_type(side.opposite());
            if ours.is_none() || ours != theirs {
                return Err(IllegalReason::EdgeMismatch { side });
            }
        }

        Ok(())
    }

    /// Whether `tile` (already rotated) may be placed at `pos`
    pub fn can_place(&self, tile: &Tile, pos: Coord) -> bool {
        self.check_placement(tile, pos).is_ok()
    }

    /// Every `(position, rotation)` at which an unplaced tile fits
    pub fn legal_placements(&self, tile: &Tile) -> Vec<(Coord, u8)> {
        let candidates: Vec<Coord> = if self.is_empty() {
            vec![Coord::ORIGIN]
        } else {
            self.frontier().into_iter().collect()
        };

        let rotations: Vec<Tile> = (0..4).map(|r| tile.rotated(r)).collect();
        let mut legal = Vec::new();
        for pos in candidates {
            for (rotation, rotated) in rotations.iter().enumerate() {
                if self.can_place(rotated, pos) {
                    legal.push((pos, rotation as u8));
                }
            }
        }
        legal
    }

    /// Whether a tile fits anywhere on the board
    pub fn has_legal_placement(&self, tile: &Tile) -> bool {
        if self.is_empty() {
            return true;
        }
        let rotations: Vec<Tile> = (0..4).map(|r| tile.rotated(r)).collect();
        self.frontier()
            .into_iter()
            .any(|pos| rotations.iter().any(|t| self.can_place(t, pos)))
    }

    /// Put a tile on the board without checks
    pub(crate) fn insert(&mut self, pos: Coord, tile: Tile) {
        self.cells.insert(pos, tile);
    }

    /// Repoint slot references from one region to another on the given tiles
    pub(crate) fn repoint<'a>(
        &mut self,
        positions: impl IntoIterator<Item = &'a Coord>,
        from: RegionId,
        to: Option<RegionId>,
    ) -> usize {
        let mut moved = 0;
        for pos in positions {
            if let Some(tile) = self.cells.get_mut(pos) {
                moved += tile.repoint(from, to);
            }
        }
        moved
    }

    /// Whether all placed tiles form one orthogonally connected component
    pub fn is_connected(&self) -> bool {
        let Some(&start) = self.cells.keys().next() else {
            return true;
        };

        let mut seen = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some(pos) = queue.pop_front() {
            for (_, n) in pos.neighbors() {
                if self.is_occupied(&n) && seen.insert(n) {
                    queue.push_back(n);
                }
            }
        }
        seen.len() == self.cells.len()
    }

    /// Bounding box of placed tiles as (min, max) corners
    pub fn bounds(&self) -> Option<(Coord, Coord)> {
        let mut positions = self.cells.keys();
        let first = *positions.next()?;
        let (min, max) = positions.fold((first, first), |(min, max), p| {
            (
                Coord::new(min.x.min(p.x), min.y.min(p.y)),
                Coord::new(max.x.max(p.x), max.y.max(p.y)),
            )
        });
        Some((min, max))
    }
}

/// Serialize the cell map as a list so it survives JSON (object keys must be strings)
mod cell_list {
    use crate::coord::Coord;
    use crate::tile::Tile;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    struct CellRef<'a> {
        position: &'a Coord,
        tile: &'a Tile,
    }

    #[derive(Deserialize)]
    struct Cell {
        position: Coord,
        tile: Tile,
    }

    pub fn serialize<S: Serializer>(
        cells: &BTreeMap<Coord, Tile>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(
            cells
                .iter()
                .map(|(position, tile)| CellRef { position, tile }),
        )
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<Coord, Tile>, D::Error> {
        let cells: Vec<Cell> = Vec::deserialize(deserializer)?;
        Ok(cells.into_iter().map(|c| (c.position, c.tile)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use pretty_assertions::assert_eq;

    fn board_with_start() -> Board {
        let mut board = Board::new();
        board.insert(Coord::ORIGIN, Catalog::standard().start_tile());
        board
    }

    fn tile(name: &str) -> Tile {
        Catalog::standard()
            .instantiate(name)
            .unwrap_or_else(|| panic!("missing catalog tile {name}"))
    }

    #[test]
    fn test_empty_board_accepts_first_tile_anywhere() {
        let board = Board::new();
        assert!(board.can_place(&tile("cloister"), Coord::new(5, 5)));
        assert_eq!(board.legal_placements(&tile("cloister")).len(), 4);
    }

    #[test]
    fn test_occupied_cell_rejected() {
        let board = board_with_start();
        assert_eq!(
            board.check_placement(&tile("cloister"), Coord::ORIGIN),
            Err(IllegalReason::Occupied)
        );
    }

    #[test]
    fn test_disconnected_cell_rejected() {
        let board = board_with_start();
        assert_eq!(
            board.check_placement(&tile("cloister"), Coord::new(2, 0)),
            Err(IllegalReason::NotConnected)
        );
    }

    #[test]
    fn test_edge_mismatch_rejected() {
        let board = board_with_start();
        // All-meadow tile cannot sit against the start tile's town (north)
        assert_eq!(
            board.check_placement(&tile("cloister"), Coord::new(0, 1)),
            Err(IllegalReason::EdgeMismatch { side: Side::South })
        );
        // but fits against its meadow (east)
        assert!(board.can_place(&tile("cloister"), Coord::new(1, 0)));
    }

    #[test]
    fn test_road_must_meet_road() {
        let board = board_with_start();
        let straight = tile("road-straight");
        // road-straight runs north-south, so unrotated it continues the start road
        assert!(board.can_place(&straight, Coord::new(0, -1)));
        assert!(!board.can_place(&straight.rotated(1), Coord::new(0, -1)));
    }

    #[test]
    fn test_frontier_of_single_tile() {
        let board = board_with_start();
        let frontier = board.frontier();
        assert_eq!(frontier.len(), 4);
        assert!(frontier.contains(&Coord::new(0, 1)));
        assert!(frontier.contains(&Coord::new(-1, 0)));
    }

    #[test]
    fn test_connectivity() {
        let mut board = board_with_start();
        assert!(board.is_connected());
        board.insert(Coord::new(1, 0), tile("cloister"));
        assert!(board.is_connected());
        board.insert(Coord::new(3, 0), tile("cloister"));
        assert!(!board.is_connected());
    }

    #[test]
    fn test_board_json_round_trip() {
        let board = board_with_start();
        let json = serde_json::to_string(&board).unwrap();
        let back: Board = serde_json::from_str(&json).unwrap();
        assert_eq!(back, board);
    }

    #[test]
    fn test_bounds() {
        let mut board = board_with_start();
        board.insert(Coord::new(1, 0), tile("cloister"));
        board.insert(Coord::new(1, -1), tile("cloister"));
        assert_eq!(board.bounds(), Some((Coord::new(0, -1), Coord::new(1, 0))));
    }
}
