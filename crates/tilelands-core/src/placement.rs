//! Region creation and merging for a freshly placed tile.
//!
//! Placing a tile happens in two steps once legality has been checked:
//! 1. `bind_tile` creates one single-tile region per slot
//! 2. `merge_with_neighbors` folds those regions into the regions already on
//!    the board across every occupied side
//!
//! Both steps assume the tile is already in the board's cell map. Errors are
//! invariant violations in the tile data; callers run these on a scratch copy
//! of the state so a failure leaves the live game untouched.

use crate::board::Board;
use crate::coord::{Coord, Side};
use crate::game::GameError;
use crate::region::{RegionId, RegionKind, RegionSet};
use crate::tile::{facing_pairs, AreaType};
use tracing::{debug, warn};

/// One merge performed while connecting a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStep {
    /// `absorbed` was folded into `survivor`
    Merged {
        survivor: RegionId,
        absorbed: RegionId,
    },
    /// A region met itself across `side`
    Closed { region: RegionId, side: Side },
}

/// Create a region for every slot of the tile at `pos`.
///
/// Meadows are wired to the towns and cloisters they touch on this tile.
pub(crate) fn bind_tile(
    board: &mut Board,
    regions: &mut RegionSet,
    pos: Coord,
) -> Result<Vec<RegionId>, GameError> {
    let tile = board
        .get(&pos)
        .ok_or_else(|| GameError::invariant(format!("no tile to bind at {pos}")))?
        .clone();
    tile.validate()?;
    let multiplier = tile.multiplier.unwrap_or(1);

    let mut ids = Vec::with_capacity(tile.slot_count());
    for (slot, area) in tile.areas.iter().enumerate() {
        let kind = match area {
            AreaType::Cloister => RegionKind::Cloister {
                position: pos,
                point_base: 1,
            },
            AreaType::Meadow => RegionKind::Meadow {
                adjacent_towns: Vec::new(),
                adjacent_cloisters: Vec::new(),
            },
            AreaType::Road => RegionKind::Road {
                closed_ends: 2u32.saturating_sub(tile.sides_of(slot)),
            },
            AreaType::Town => RegionKind::Town {
                open_edges: tile.sides_of(slot),
                point_base: if tile.bonus == Some(slot) { 2 } else { 1 },
            },
        };
        ids.push(regions.create(kind, pos, multiplier));
    }

    for (slot, area) in tile.areas.iter().enumerate() {
        if *area != AreaType::Meadow {
            continue;
        }
        let towns: Vec<RegionId> = tile
            .adjacent_slots(slot)
            .iter()
            .filter(|&&s| tile.area(s) == Some(AreaType::Town))
            .map(|&s| ids[s])
            .collect();
        let cloisters: Vec<RegionId> = tile
            .adjacent_slots(slot)
            .iter()
            .filter(|&&s| tile.area(s) == Some(AreaType::Cloister))
            .map(|&s| ids[s])
            .collect();
        if let Some(region) = regions.get_mut(ids[slot]) {
            region.kind = RegionKind::Meadow {
                adjacent_towns: towns,
                adjacent_cloisters: cloisters,
            };
        }
    }

    let placed = board
        .get_mut(&pos)
        .ok_or_else(|| GameError::invariant(format!("tile at {pos} vanished while binding")))?;
    for (slot, id) in ids.iter().enumerate() {
        placed.set_region(slot, Some(*id));
    }

    debug!(%pos, tile = %tile.name, regions = ids.len(), "bound tile");
    Ok(ids)
}

/// Merge the regions of the tile at `pos` with every occupied neighbor
pub(crate) fn merge_with_neighbors(
    board: &mut Board,
    regions: &mut RegionSet,
    pos: Coord,
) -> Result<Vec<MergeStep>, GameError> {
    let mut steps = Vec::new();
    for (side, npos) in board.occupied_neighbors(&pos) {
        steps.extend(merge_across(board, regions, pos, side, npos)?);
    }
    Ok(steps)
}

/// Merge the slot pairs facing each other across one shared edge
fn merge_across(
    board: &mut Board,
    regions: &mut RegionSet,
    pos: Coord,
    side: Side,
    npos: Coord,
) -> Result<Vec<MergeStep>, GameError> {
    let (tile, neighbor) = match (board.get(&pos), board.get(&npos)) {
        (Some(t), Some(n)) => (t, n),
        _ => return Err(GameError::invariant(format!("missing tile across {pos} {side}"))),
    };
    let pairs = facing_pairs(tile.edge(side), neighbor.edge(side.opposite()));

    // Resolve everything up front; repointing below mutates the board
    let mut links = Vec::with_capacity(pairs.len());
    for (ours, theirs) in pairs {
        let our_area = tile.area(ours);
        let their_area = neighbor.area(theirs);
        if our_area != their_area {
            return Err(GameError::invariant(format!(
                "slot {ours} at {pos} ({:?}) faces slot {theirs} at {npos} ({:?})",
                our_area, their_area
            )));
        }
        if our_area == Some(AreaType::Cloister) {
            return Err(GameError::invariant(format!(
                "cloister slot {ours} at {pos} lies on an edge"
            )));
        }

        match (tile.region(ours), neighbor.region(theirs)) {
            (Some(a), Some(b)) => links.push((a, b)),
            (_, None) => {
                // the neighbor's region was already scored; nothing left to join
                warn!(%pos, %npos, slot = theirs, "edge faces a retired region");
            }
            (None, Some(_)) => {
                return Err(GameError::invariant(format!(
                    "slot {ours} at {pos} is not bound to a region"
                )));
            }
        }
    }

    let mut steps = Vec::with_capacity(links.len());
    for (a, b) in links {
        let (a, b) = (regions.resolve(a), regions.resolve(b));
        if a == b {
            regions.close_loop(a)?;
            steps.push(MergeStep::Closed { region: a, side });
            continue;
        }

        let outcome = regions.merge(a, b)?;
        board.repoint(
            &outcome.absorbed_positions,
            outcome.absorbed,
            Some(outcome.survivor),
        );
        steps.push(MergeStep::Merged {
            survivor: outcome.survivor,
            absorbed: outcome.absorbed,
        });
    }

    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::tile::Tile;
    use pretty_assertions::assert_eq;

    fn place(board: &mut Board, regions: &mut RegionSet, pos: Coord, tile: Tile) -> Vec<MergeStep> {
        board.insert(pos, tile);
        bind_tile(board, regions, pos).unwrap();
        merge_with_neighbors(board, regions, pos).unwrap()
    }

    fn tile(name: &str, rotation: u8) -> Tile {
        Catalog::standard().instantiate(name).unwrap().rotated(rotation)
    }

    #[test]
    fn test_start_tile_creates_four_regions() {
        let mut board = Board::new();
        let mut regions = RegionSet::new();
        let steps = place(&mut board, &mut regions, Coord::ORIGIN, tile("start", 0));
        assert!(steps.is_empty());
        assert_eq!(regions.len(), 4);
        assert_eq!(regions.of_type(AreaType::Town).count(), 1);
        assert_eq!(regions.of_type(AreaType::Meadow).count(), 2);
        assert_eq!(regions.of_type(AreaType::Road).count(), 1);

        let town = board.get(&Coord::ORIGIN).unwrap().region(0).unwrap();
        for meadow in regions.of_type(AreaType::Meadow) {
            assert_eq!(regions.adjacent_towns(meadow.id), vec![town]);
        }
    }

    #[test]
    fn test_counters_at_creation() {
        let mut board = Board::new();
        let mut regions = RegionSet::new();
        place(&mut board, &mut regions, Coord::ORIGIN, tile("town-tube-bonus", 0));
        let town = regions.of_type(AreaType::Town).next().unwrap();
        assert_eq!(
            town.kind,
            RegionKind::Town {
                open_edges: 2,
                point_base: 2
            }
        );

        let mut board = Board::new();
        let mut regions = RegionSet::new();
        place(&mut board, &mut regions, Coord::ORIGIN, tile("road-junction-three", 0));
        for road in regions.of_type(AreaType::Road) {
            assert_eq!(road.kind, RegionKind::Road { closed_ends: 1 });
        }
    }

    #[test]
    fn test_new_regions_are_absorbed_into_existing_ones() {
        let mut board = Board::new();
        let mut regions = RegionSet::new();
        place(&mut board, &mut regions, Coord::ORIGIN, tile("start", 0));
        let road = board.get(&Coord::ORIGIN).unwrap().region(3).unwrap();

        place(&mut board, &mut regions, Coord::new(0, -1), tile("road-straight", 0));
        let below = board.get(&Coord::new(0, -1)).unwrap();
        assert_eq!(below.region(1), Some(road));
        assert_eq!(regions.get(road).unwrap().length(), 2);
        // start meadows continue along both sides of the road
        let start = board.get(&Coord::ORIGIN).unwrap();
        assert_eq!(below.region(0), start.region(2));
        assert_eq!(below.region(2), start.region(1));
        assert_eq!(regions.len(), 4);
    }

    #[test]
    fn test_town_closes_across_shared_edge() {
        let mut board = Board::new();
        let mut regions = RegionSet::new();
        place(&mut board, &mut regions, Coord::ORIGIN, tile("start", 0));
        // a town cap turned to face south closes the start town
        place(&mut board, &mut regions, Coord::new(0, 1), tile("town-cap", 2));
        let town = board.get(&Coord::ORIGIN).unwrap().region(0).unwrap();
        assert_eq!(
            regions.get(town).unwrap().kind,
            RegionKind::Town {
                open_edges: 0,
                point_base: 2
            }
        );
        assert_eq!(board.get(&Coord::new(0, 1)).unwrap().region(0), Some(town));
    }

    #[test]
    fn test_road_loop_is_force_closed() {
        let mut board = Board::new();
        let mut regions = RegionSet::new();
        // four curves forming a ring around the point between them
        place(&mut board, &mut regions, Coord::new(0, 0), tile("road-curve", 1)); // west-north
        place(&mut board, &mut regions, Coord::new(-1, 0), tile("road-curve", 2)); // north-east
        place(&mut board, &mut regions, Coord::new(-1, 1), tile("road-curve", 3)); // east-south
        let steps = place(&mut board, &mut regions, Coord::new(0, 1), tile("road-curve", 0)); // south-west

        let road = board.get(&Coord::new(0, 0)).unwrap().region(1).unwrap();
        let region = regions.get(road).unwrap();
        assert_eq!(region.kind, RegionKind::Road { closed_ends: 2 });
        assert_eq!(region.length(), 4);
        assert!(steps.iter().any(|s| matches!(s, MergeStep::Closed { .. })));
    }

    #[test]
    fn test_meadow_surrounded_on_four_sides_merges_all() {
        let mut board = Board::new();
        let mut regions = RegionSet::new();
        let around = [
            Coord::new(0, 1),
            Coord::new(1, 0),
            Coord::new(0, -1),
            Coord::new(-1, 0),
        ];
        // Place the ring first through a scratch layout: each meadow tile is
        // its own region because none touch each other orthogonally.
        for pos in around {
            board.insert(pos, tile("cloister", 0));
            bind_tile(&mut board, &mut regions, pos).unwrap();
        }
        let before = regions.of_type(AreaType::Meadow).count();
        assert_eq!(before, 4);

        place(&mut board, &mut regions, Coord::ORIGIN, tile("cloister", 0));
        assert_eq!(regions.of_type(AreaType::Meadow).count(), 1);
        let meadow = regions.of_type(AreaType::Meadow).next().unwrap();
        assert_eq!(meadow.length(), 5);
        assert_eq!(regions.adjacent_cloisters(meadow.id).len(), 5);
    }

    #[test]
    fn test_bind_rejects_out_of_range_adjacency() {
        let mut board = Board::new();
        let mut regions = RegionSet::new();
        let mut broken = tile("town-cap", 0);
        broken.adjacency[1] = vec![7];
        board.insert(Coord::ORIGIN, broken);

        assert!(matches!(
            bind_tile(&mut board, &mut regions, Coord::ORIGIN),
            Err(GameError::InvariantViolation(_))
        ));
        assert!(regions.is_empty());
    }

    #[test]
    fn test_mismatched_catalog_data_is_invariant_violation() {
        let mut board = Board::new();
        let mut regions = RegionSet::new();
        place(&mut board, &mut regions, Coord::ORIGIN, tile("road-straight", 0));

        // same middle (road) but the outer slots disagree in type
        let odd = Tile::new(
            "odd",
            vec![AreaType::Town, AreaType::Road, AreaType::Meadow],
            [vec![0], vec![2], vec![2, 1, 0], vec![2]],
            vec![vec![1], vec![0, 2], vec![1]],
        );
        board.insert(Coord::new(0, 1), odd);
        bind_tile(&mut board, &mut regions, Coord::new(0, 1)).unwrap();
        assert!(matches!(
            merge_with_neighbors(&mut board, &mut regions, Coord::new(0, 1)),
            Err(GameError::InvariantViolation(_))
        ));
    }
}
