//! The tile catalog: static descriptions of every tile shipped with the game.
//!
//! The catalog is read-only input. Each draw copies a `TileSpec` into a fresh
//! `Tile` instance, which is what gets rotated and placed.
//!
//! Side lists run clockwise around the tile: the north side west to east,
//! east side north to south, south side east to west, west side south to
//! north.

use crate::game::GameError;
use crate::tile::{AreaType, Tile};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Description of one tile shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileSpec {
    pub name: String,
    pub areas: Vec<AreaType>,
    /// Slot lists for North, East, South, West
    pub edges: [Vec<usize>; 4],
    pub adjacency: Vec<Vec<usize>>,
    #[serde(default)]
    pub bonus: Option<usize>,
    #[serde(default)]
    pub multiplier: Option<u32>,
}

impl TileSpec {
    /// Copy this description into a placeable tile instance
    pub fn instantiate(&self) -> Tile {
        let mut tile = Tile::new(
            self.name.clone(),
            self.areas.clone(),
            self.edges.clone(),
            self.adjacency.clone(),
        );
        tile.bonus = self.bonus;
        tile.multiplier = self.multiplier;
        tile
    }
}

/// A tile shape and how many copies are in the game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(flatten)]
    pub spec: TileSpec,
    pub count: u32,
}

/// Every tile shape in a game, plus the fixed start tile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub start: TileSpec,
    pub tiles: Vec<CatalogEntry>,
}

fn spec(name: &str, areas: &[AreaType], edges: [&[usize]; 4], adjacency: &[&[usize]]) -> TileSpec {
    TileSpec {
        name: name.to_string(),
        areas: areas.to_vec(),
        edges: edges.map(|side| side.to_vec()),
        adjacency: adjacency.iter().map(|a| a.to_vec()).collect(),
        bonus: None,
        multiplier: None,
    }
}

fn entry(spec: TileSpec, count: u32) -> CatalogEntry {
    CatalogEntry { spec, count }
}

fn with_bonus(mut spec: TileSpec, slot: usize, name: &str) -> TileSpec {
    spec.bonus = Some(slot);
    spec.name = name.to_string();
    spec
}

impl Catalog {
    /// The base game: start tile plus 75 tiles in 25 shapes
    pub fn standard() -> Self {
        use AreaType::{Cloister, Meadow, Road, Town};

        // Town north, meadows west and east, road from the south ending at the town
        let start = spec(
            "start",
            &[Town, Meadow, Meadow, Road],
            [&[0], &[2], &[2, 3, 1], &[1]],
            &[&[1, 2, 3], &[0, 3], &[0, 3], &[0, 1, 2]],
        );

        let town_corner = spec(
            "town-corner",
            &[Town, Meadow],
            [&[0], &[1], &[1], &[0]],
            &[&[1], &[0]],
        );
        let town_corner_road = spec(
            "town-corner-road",
            &[Town, Meadow, Road, Meadow],
            [&[0], &[1, 2, 3], &[3, 2, 1], &[0]],
            &[&[1], &[0, 2], &[1, 3], &[2]],
        );
        let town_three = spec(
            "town-three",
            &[Town, Meadow],
            [&[0], &[0], &[1], &[0]],
            &[&[1], &[0]],
        );
        let town_three_road = spec(
            "town-three-road",
            &[Town, Meadow, Road, Meadow],
            [&[0], &[0], &[1, 2, 3], &[0]],
            &[&[1, 2, 3], &[0, 2], &[0, 1, 3], &[0, 2]],
        );

        let tiles = vec![
            entry(
                TileSpec {
                    name: "town-road-end".to_string(),
                    ..start.clone()
                },
                3,
            ),
            entry(
                spec(
                    "cloister",
                    &[Cloister, Meadow],
                    [&[1], &[1], &[1], &[1]],
                    &[&[1], &[0]],
                ),
                4,
            ),
            entry(
                spec(
                    "cloister-road",
                    &[Cloister, Meadow, Road],
                    [&[1], &[1], &[1, 2, 1], &[1]],
                    &[&[1, 2], &[0, 2], &[0, 1]],
                ),
                2,
            ),
            entry(
                TileSpec {
                    bonus: Some(0),
                    ..spec("town-full", &[Town], [&[0], &[0], &[0], &[0]], &[&[]])
                },
                1,
            ),
            entry(
                spec(
                    "town-cap",
                    &[Town, Meadow],
                    [&[0], &[1], &[1], &[1]],
                    &[&[1], &[0]],
                ),
                5,
            ),
            entry(
                TileSpec {
                    bonus: Some(0),
                    ..spec(
                        "town-tube-bonus",
                        &[Town, Meadow, Meadow],
                        [&[1], &[0], &[2], &[0]],
                        &[&[1, 2], &[0], &[0]],
                    )
                },
                2,
            ),
            entry(
                spec(
                    "town-tube",
                    &[Town, Meadow, Meadow],
                    [&[0], &[1], &[0], &[2]],
                    &[&[1, 2], &[0], &[0]],
                ),
                1,
            ),
            entry(
                spec(
                    "town-caps-opposite",
                    &[Town, Town, Meadow],
                    [&[0], &[2], &[1], &[2]],
                    &[&[2], &[2], &[0, 1]],
                ),
                3,
            ),
            entry(
                spec(
                    "town-caps-corner",
                    &[Town, Town, Meadow],
                    [&[0], &[2], &[2], &[1]],
                    &[&[2], &[2], &[0, 1]],
                ),
                2,
            ),
            entry(
                spec(
                    "town-curve-right",
                    &[Town, Meadow, Road, Meadow],
                    [&[0], &[1, 2, 3], &[3, 2, 1], &[1]],
                    &[&[1], &[0, 2], &[1, 3], &[2]],
                ),
                3,
            ),
            entry(
                spec(
                    "town-curve-left",
                    &[Town, Meadow, Road, Meadow],
                    [&[0], &[1], &[1, 2, 3], &[3, 2, 1]],
                    &[&[1], &[0, 2], &[1, 3], &[2]],
                ),
                3,
            ),
            entry(
                spec(
                    "town-road-straight",
                    &[Town, Meadow, Road, Meadow],
                    [&[0], &[1, 2, 3], &[3], &[3, 2, 1]],
                    &[&[1], &[0, 2], &[1, 3], &[2]],
                ),
                4,
            ),
            entry(
                spec(
                    "town-junction",
                    &[Town, Meadow, Road, Road, Road, Meadow, Meadow],
                    [&[0], &[1, 2, 5], &[5, 3, 6], &[6, 4, 1]],
                    &[&[1], &[0, 2, 4], &[1, 5], &[5, 6], &[6, 1], &[2, 3], &[3, 4]],
                ),
                3,
            ),
            entry(town_corner.clone(), 3),
            entry(with_bonus(town_corner, 0, "town-corner-bonus"), 2),
            entry(town_corner_road.clone(), 3),
            entry(with_bonus(town_corner_road, 0, "town-corner-road-bonus"), 2),
            entry(town_three.clone(), 3),
            entry(with_bonus(town_three, 0, "town-three-bonus"), 1),
            entry(town_three_road.clone(), 1),
            entry(with_bonus(town_three_road, 0, "town-three-road-bonus"), 2),
            entry(
                spec(
                    "road-straight",
                    &[Meadow, Road, Meadow],
                    [&[2, 1, 0], &[0], &[0, 1, 2], &[2]],
                    &[&[1], &[0, 2], &[1]],
                ),
                8,
            ),
            entry(
                spec(
                    "road-curve",
                    &[Meadow, Road, Meadow],
                    [&[0], &[0], &[0, 1, 2], &[2, 1, 0]],
                    &[&[1], &[0, 2], &[1]],
                ),
                9,
            ),
            entry(
                spec(
                    "road-junction-three",
                    &[Meadow, Road, Road, Road, Meadow, Meadow],
                    [&[0], &[0, 1, 4], &[4, 2, 5], &[5, 3, 0]],
                    &[&[1, 3], &[0, 4], &[4, 5], &[5, 0], &[1, 2], &[2, 3]],
                ),
                4,
            ),
            entry(
                spec(
                    "road-junction-four",
                    &[Road, Road, Road, Road, Meadow, Meadow, Meadow, Meadow],
                    [&[7, 0, 4], &[4, 1, 5], &[5, 2, 6], &[6, 3, 7]],
                    &[
                        &[7, 4],
                        &[4, 5],
                        &[5, 6],
                        &[6, 7],
                        &[0, 1],
                        &[1, 2],
                        &[2, 3],
                        &[3, 0],
                    ],
                ),
                1,
            ),
        ];

        Self { start, tiles }
    }

    /// Load a catalog from JSON and validate every shape
    pub fn from_json(json: &str) -> Result<Self, GameError> {
        let catalog: Catalog = serde_json::from_str(json)
            .map_err(|e| GameError::invariant(format!("invalid catalog: {e}")))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Check every shape against the tile encoding invariants
    pub fn validate(&self) -> Result<(), GameError> {
        self.start.instantiate().validate()?;
        for entry in &self.tiles {
            entry.spec.instantiate().validate()?;
        }
        Ok(())
    }

    /// A fresh copy of the start tile
    pub fn start_tile(&self) -> Tile {
        self.start.instantiate()
    }

    /// Look a shape up by name
    pub fn spec(&self, name: &str) -> Option<&TileSpec> {
        if self.start.name == name {
            return Some(&self.start);
        }
        self.tiles.iter().map(|e| &e.spec).find(|s| s.name == name)
    }

    /// A fresh tile instance of the named shape
    pub fn instantiate(&self, name: &str) -> Option<Tile> {
        self.spec(name).map(TileSpec::instantiate)
    }

    /// Number of tiles in the draw pile (start tile excluded)
    pub fn tile_count(&self) -> usize {
        self.tiles.iter().map(|e| e.count as usize).sum()
    }

    /// Expand counts into a shuffled draw pile
    pub fn deck<R: Rng>(&self, rng: &mut R) -> Vec<Tile> {
        let mut deck: Vec<Tile> = self
            .tiles
            .iter()
            .flat_map(|e| std::iter::repeat(&e.spec).take(e.count as usize))
            .map(TileSpec::instantiate)
            .collect();
        deck.shuffle(rng);
        deck
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::Side;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_standard_catalog_is_valid() {
        Catalog::standard().validate().unwrap();
    }

    #[test]
    fn test_standard_catalog_size() {
        assert_eq!(Catalog::standard().tile_count(), 75);
    }

    #[test]
    fn test_names_are_unique() {
        let catalog = Catalog::standard();
        let names: HashSet<&str> = catalog.tiles.iter().map(|e| e.spec.name.as_str()).collect();
        assert_eq!(names.len(), catalog.tiles.len());
        assert!(!names.contains("start"));
    }

    #[test]
    fn test_start_tile_faces() {
        let start = Catalog::standard().start_tile();
        assert_eq!(start.side_type(Side::North), Some(AreaType::Town));
        assert_eq!(start.side_type(Side::East), Some(AreaType::Meadow));
        assert_eq!(start.side_type(Side::South), Some(AreaType::Road));
        assert_eq!(start.side_type(Side::West), Some(AreaType::Meadow));
    }

    #[test]
    fn test_deck_is_seeded_and_complete() {
        let catalog = Catalog::standard();
        let a = catalog.deck(&mut StdRng::seed_from_u64(7));
        let b = catalog.deck(&mut StdRng::seed_from_u64(7));
        assert_eq!(a.len(), 75);
        assert_eq!(
            a.iter().map(|t| &t.name).collect::<Vec<_>>(),
            b.iter().map(|t| &t.name).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_instances_are_independent_copies() {
        let catalog = Catalog::standard();
        let mut tile = catalog.instantiate("road-curve").unwrap();
        tile.rotate(2);
        assert_eq!(catalog.instantiate("road-curve").unwrap().rotation(), 0);
    }

    #[test]
    fn test_from_json_round_trip_and_validation() {
        let catalog = Catalog::standard();
        let json = serde_json::to_string(&catalog).unwrap();
        assert_eq!(Catalog::from_json(&json).unwrap(), catalog);

        let mut broken = catalog.clone();
        broken.tiles[0].spec.edges[0] = vec![42];
        let json = serde_json::to_string(&broken).unwrap();
        assert!(matches!(
            Catalog::from_json(&json),
            Err(GameError::InvariantViolation(_))
        ));
    }
}
