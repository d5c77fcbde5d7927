//! Placeable tiles and their rotation.
//!
//! A tile is a list of typed area slots plus a map from each of the four
//! sides to the slots that touch that side. Slots listed for one side are
//! written clockwise around the tile, so when two tiles meet, entry `i` of a
//! three-entry side faces entry `2 - i` of the neighbor's side.
//!
//! Rotation only permutes the side map. Slot indices, the adjacency list and
//! the scoring modifiers are indexed by slot and never move.

use crate::coord::Side;
use crate::game::GameError;
use crate::region::RegionId;
use serde::{Deserialize, Serialize};

/// The kind of landscape an area slot represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AreaType {
    Meadow,
    Road,
    Town,
    Cloister,
}

impl AreaType {
    pub fn name(&self) -> &'static str {
        match self {
            AreaType::Meadow => "meadow",
            AreaType::Road => "road",
            AreaType::Town => "town",
            AreaType::Cloister => "cloister",
        }
    }
}

/// One tile instance.
///
/// Instances are created from a catalog entry and owned by the board once
/// placed. `regions` is empty until placement, then maps every slot to the
/// live region currently representing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    /// Catalog name this tile was copied from
    pub name: String,
    /// Area type of each slot
    pub areas: Vec<AreaType>,
    /// Slots touching each side, indexed by `Side::index()`
    edges: [Vec<usize>; 4],
    /// Slots on this tile that touch each slot
    pub adjacency: Vec<Vec<usize>>,
    /// Slot carrying a scoring bonus (e.g. a town shield)
    pub bonus: Option<usize>,
    /// Per-tile scoring multiplier
    pub multiplier: Option<u32>,
    /// Current clockwise rotation in quarter turns (0..=3)
    rotation: u8,
    /// Live region of each slot; `None` before placement and after scoring
    #[serde(default)]
    regions: Vec<Option<RegionId>>,
}

impl Tile {
    /// Create an unrotated, unplaced tile
    pub fn new(
        name: impl Into<String>,
        areas: Vec<AreaType>,
        edges: [Vec<usize>; 4],
        adjacency: Vec<Vec<usize>>,
    ) -> Self {
        Self {
            name: name.into(),
            areas,
            edges,
            adjacency,
            bonus: None,
            multiplier: None,
            rotation: 0,
            regions: Vec::new(),
        }
    }

    pub fn with_bonus(mut self, slot: usize) -> Self {
        self.bonus = Some(slot);
        self
    }

    pub fn with_multiplier(mut self, multiplier: u32) -> Self {
        self.multiplier = Some(multiplier);
        self
    }

    /// Number of area slots
    pub fn slot_count(&self) -> usize {
        self.areas.len()
    }

    /// Area type of a slot
    pub fn area(&self, slot: usize) -> Option<AreaType> {
        self.areas.get(slot).copied()
    }

    /// Slots touching a side in the current orientation
    pub fn edge(&self, side: Side) -> &[usize] {
        &self.edges[side.index()]
    }

    /// All four side lists in the current orientation
    pub fn edges(&self) -> &[Vec<usize>; 4] {
        &self.edges
    }

    /// Area type used when matching this side against a neighbor.
    ///
    /// A three-entry side is represented by its middle entry; the outer two
    /// belong to the areas split by it.
    pub fn side_type(&self, side: Side) -> Option<AreaType> {
        let slots = self.edge(side);
        let representative = match slots.len() {
            3 => slots[1],
            _ => *slots.first()?,
        };
        self.area(representative)
    }

    /// Number of distinct sides a slot is exposed on
    pub fn sides_of(&self, slot: usize) -> u32 {
        self.edges.iter().filter(|slots| slots.contains(&slot)).count() as u32
    }

    /// Slots of a given type on this tile
    pub fn slots_of_type(&self, area: AreaType) -> impl Iterator<Item = usize> + '_ {
        self.areas
            .iter()
            .enumerate()
            .filter(move |(_, a)| **a == area)
            .map(|(i, _)| i)
    }

    /// Slots on this tile touching `slot`
    pub fn adjacent_slots(&self, slot: usize) -> &[usize] {
        self.adjacency.get(slot).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Current rotation in clockwise quarter turns
    pub fn rotation(&self) -> u8 {
        self.rotation
    }

    /// Rotate clockwise by `quarter_turns` relative to the current orientation.
    ///
    /// Whatever faced North afterwards faces East after one turn.
    pub fn rotate(&mut self, quarter_turns: u8) {
        let shift = (quarter_turns % 4) as usize;
        if shift == 0 {
            return;
        }
        self.edges.rotate_right(shift);
        self.rotation = (self.rotation + shift as u8) % 4;
    }

    /// Turn to an absolute rotation through the minimal relative shift
    pub fn rotate_to(&mut self, rotation: u8) {
        let target = rotation % 4;
        let shift = (target + 4 - self.rotation) % 4;
        self.rotate(shift);
    }

    /// Return a rotated copy
    pub fn rotated(&self, rotation: u8) -> Tile {
        let mut tile = self.clone();
        tile.rotate_to(rotation);
        tile
    }

    /// Region of a slot, once placed
    pub fn region(&self, slot: usize) -> Option<RegionId> {
        self.regions.get(slot).copied().flatten()
    }

    /// Live region ids of all slots
    pub fn regions(&self) -> &[Option<RegionId>] {
        &self.regions
    }

    pub(crate) fn set_region(&mut self, slot: usize, region: Option<RegionId>) {
        if self.regions.len() < self.areas.len() {
            self.regions.resize(self.areas.len(), None);
        }
        if let Some(entry) = self.regions.get_mut(slot) {
            *entry = region;
        }
    }

    /// Replace every reference to `from` with `to`, returning how many slots moved
    pub(crate) fn repoint(&mut self, from: RegionId, to: Option<RegionId>) -> usize {
        let mut moved = 0;
        for entry in self.regions.iter_mut() {
            if *entry == Some(from) {
                *entry = to;
                moved += 1;
            }
        }
        moved
    }

    /// Whether the tile has been placed and bound to regions
    pub fn is_bound(&self) -> bool {
        !self.regions.is_empty()
    }

    /// Check the structural invariants of the slot encoding
    pub fn validate(&self) -> Result<(), GameError> {
        let slots = self.areas.len();
        if slots == 0 {
            return Err(GameError::invariant(format!("tile '{}' has no areas", self.name)));
        }

        for side in Side::ALL {
            let entries = self.edge(side);
            if entries.len() != 1 && entries.len() != 3 {
                return Err(GameError::invariant(format!(
                    "tile '{}' lists {} slots on its {} side",
                    self.name,
                    entries.len(),
                    side
                )));
            }
            if let Some(bad) = entries.iter().find(|&&s| s >= slots) {
                return Err(GameError::invariant(format!(
                    "tile '{}' references slot {} on its {} side",
                    self.name, bad, side
                )));
            }
        }

        if self.adjacency.len() != slots {
            return Err(GameError::invariant(format!(
                "tile '{}' has {} adjacency entries for {} slots",
                self.name,
                self.adjacency.len(),
                slots
            )));
        }
        for (slot, neighbors) in self.adjacency.iter().enumerate() {
            if let Some(bad) = neighbors.iter().find(|&&s| s >= slots || s == slot) {
                return Err(GameError::invariant(format!(
                    "tile '{}' slot {} lists invalid adjacent slot {}",
                    self.name, slot, bad
                )));
            }
        }

        if let Some(bonus) = self.bonus {
            if bonus >= slots {
                return Err(GameError::invariant(format!(
                    "tile '{}' bonus slot {} out of range",
                    self.name, bonus
                )));
            }
        }

        for (slot, area) in self.areas.iter().enumerate() {
            let exposed = self.sides_of(slot);
            match area {
                AreaType::Cloister if exposed > 0 => {
                    return Err(GameError::invariant(format!(
                        "tile '{}' cloister slot {} touches an edge",
                        self.name, slot
                    )));
                }
                AreaType::Road if exposed == 0 || exposed > 2 => {
                    return Err(GameError::invariant(format!(
                        "tile '{}' road slot {} touches {} sides",
                        self.name, slot, exposed
                    )));
                }
                AreaType::Town | AreaType::Meadow if exposed == 0 => {
                    return Err(GameError::invariant(format!(
                        "tile '{}' {} slot {} touches no side",
                        self.name,
                        area.name(),
                        slot
                    )));
                }
                _ => {}
            }
        }

        Ok(())
    }
}

/// Slot pairs facing each other across a shared edge.
///
/// `ours` is the side list of one tile, `theirs` the opposite side of the
/// neighbor. Both lists run clockwise around their own tile, so three-entry
/// sides pair up in reverse order.
pub fn facing_pairs(ours: &[usize], theirs: &[usize]) -> Vec<(usize, usize)> {
    match (ours.len(), theirs.len()) {
        (3, 3) => (0..3).map(|i| (ours[i], theirs[2 - i])).collect(),
        (1, _) => theirs.iter().map(|&t| (ours[0], t)).collect(),
        (_, 1) => ours.iter().map(|&o| (o, theirs[0])).collect(),
        _ => ours.iter().zip(theirs.iter().rev()).map(|(&o, &t)| (o, t)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Town north, meadows west and east, road running south into the town
    fn start_tile() -> Tile {
        use AreaType::*;
        Tile::new(
            "start",
            vec![Town, Meadow, Meadow, Road],
            [vec![0], vec![2], vec![2, 3, 1], vec![1]],
            vec![vec![1, 2, 3], vec![0, 3], vec![0, 3], vec![0, 1, 2]],
        )
    }

    #[test]
    fn test_start_tile_is_valid() {
        assert!(start_tile().validate().is_ok());
    }

    #[test]
    fn test_side_type_uses_middle_entry() {
        let tile = start_tile();
        assert_eq!(tile.side_type(Side::North), Some(AreaType::Town));
        assert_eq!(tile.side_type(Side::East), Some(AreaType::Meadow));
        assert_eq!(tile.side_type(Side::South), Some(AreaType::Road));
        assert_eq!(tile.side_type(Side::West), Some(AreaType::Meadow));
    }

    #[test]
    fn test_rotate_moves_edges_clockwise() {
        let mut tile = start_tile();
        tile.rotate(1);
        assert_eq!(tile.rotation(), 1);
        assert_eq!(tile.side_type(Side::East), Some(AreaType::Town));
        assert_eq!(tile.side_type(Side::West), Some(AreaType::Road));
        // slot data never moves
        assert_eq!(tile.areas[0], AreaType::Town);
    }

    #[test]
    fn test_rotate_to_is_relative_to_current_rotation() {
        let mut tile = start_tile();
        tile.rotate_to(3);
        tile.rotate_to(1);
        assert_eq!(tile.rotation(), 1);
        assert_eq!(tile.edges(), start_tile().rotated(1).edges());
        tile.rotate_to(0);
        assert_eq!(tile, start_tile());
    }

    #[test]
    fn test_rotation_group_law() {
        let tile = start_tile();
        let mut turned = tile.clone();
        turned.rotate(1);
        turned.rotate(3);
        assert_eq!(turned.edges(), tile.edges());
        assert_eq!(turned.rotation(), 0);
    }

    #[test]
    fn test_sides_of() {
        let tile = start_tile();
        assert_eq!(tile.sides_of(0), 1);
        assert_eq!(tile.sides_of(1), 2);
        assert_eq!(tile.sides_of(3), 1);
    }

    #[test]
    fn test_validate_rejects_bad_slot_reference() {
        let mut tile = start_tile();
        tile.edges[0] = vec![9];
        assert!(matches!(tile.validate(), Err(GameError::InvariantViolation(_))));
    }

    #[test]
    fn test_validate_rejects_two_entry_side() {
        let mut tile = start_tile();
        tile.edges[1] = vec![2, 2];
        assert!(tile.validate().is_err());
    }

    #[test]
    fn test_facing_pairs_reverse_three_entry_sides() {
        assert_eq!(facing_pairs(&[1, 2, 3], &[4, 5, 6]), vec![(1, 6), (2, 5), (3, 4)]);
        assert_eq!(facing_pairs(&[7], &[8]), vec![(7, 8)]);
        assert_eq!(facing_pairs(&[7], &[1, 2, 3]), vec![(7, 1), (7, 2), (7, 3)]);
    }

    #[test]
    fn test_repoint() {
        let mut tile = start_tile();
        for slot in 0..4 {
            tile.set_region(slot, Some(RegionId(slot as u32)));
        }
        tile.set_region(2, Some(RegionId(1)));
        assert_eq!(tile.repoint(RegionId(1), Some(RegionId(9))), 2);
        assert_eq!(tile.region(1), Some(RegionId(9)));
        assert_eq!(tile.region(2), Some(RegionId(9)));
    }
}
