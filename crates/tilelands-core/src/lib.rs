//! Tilelands - a tile-laying game engine of towns, roads, meadows and cloisters
//!
//! This crate provides the core rule engine for Tilelands, including:
//! - Square grid coordinates and rotatable tiles
//! - The board and placement legality
//! - The region arena: cross-tile regions merged as tiles are placed
//! - Completion detection, majority scoring and token return
//! - A move simulator and bot players built on it
//!
//! # Architecture
//!
//! The game engine is designed to be platform-agnostic. It can be compiled to:
//! - Native Rust for server-side game hosting
//! - WebAssembly for client-side single-player or local multiplayer
//!
//! # Modules
//!
//! - [`coord`]: Grid coordinates and tile sides
//! - [`tile`]: Tile slots, edges and rotation
//! - [`catalog`]: The shipped tile set
//! - [`board`]: Placed tiles and legality checks
//! - [`region`]: Regions and the arena that merges them
//! - [`scoring`]: Completion and scoring
//! - [`game`]: Game state machine
//! - [`simulator`]: Copy-apply-inspect evaluation of candidate moves

pub mod actions;
pub mod board;
pub mod bot;
pub mod catalog;
pub mod config;
pub mod coord;
pub mod game;
mod placement;
pub mod player;
pub mod region;
pub mod scoring;
pub mod simulator;
pub mod tile;
#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use actions::{GameAction, GameEvent, Placement, ScoredRegion, TokenPlacement};
pub use board::{Board, PlayerId};
pub use bot::{Bot, BotDifficulty};
pub use catalog::{Catalog, CatalogEntry, TileSpec};
pub use config::{GameConfig, RuleSet};
pub use coord::{Coord, Side};
pub use game::{GameError, GamePhase, GameState, IllegalReason, PlacementOutcome, TokenRejection};
pub use player::Player;
pub use region::{Region, RegionId, RegionKind, RegionSet, Token, TokenKind};
pub use scoring::CompletedRegion;
pub use simulator::{candidate_moves, simulate, Simulation, SimulationOutcome};
pub use tile::{AreaType, Tile};
