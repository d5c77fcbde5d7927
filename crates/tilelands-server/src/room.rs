//! Game room management.
//!
//! A room owns one `GameState`. The server keeps rooms in a `DashMap`, so a
//! room is only ever mutated while its entry lock is held; placements,
//! simulations and bot turns for one game never interleave.

use std::collections::HashMap;
use thiserror::Error;
use tilelands_core::{
    candidate_moves, simulate, Bot, BotDifficulty, GameAction, GameConfig, GameError, GameEvent,
    GameState, Placement, PlayerId, RuleSet, SimulationOutcome, Tile,
};
use tilelands_core::game::{MAX_PLAYERS, MIN_PLAYERS};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::protocol::{RoomInfo, RoomStatus, SeatInfo};

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("Room is full")]
    RoomFull,

    #[error("Player not in room")]
    PlayerNotInRoom,

    #[error("Not the host")]
    NotHost,

    #[error("Game already started")]
    GameAlreadyStarted,

    #[error("Not enough players")]
    NotEnoughPlayers,

    #[error("Game not started")]
    GameNotStarted,

    #[error(transparent)]
    Game(#[from] GameError),
}

impl RoomError {
    /// Stable reason code sent to clients
    pub fn code(&self) -> &'static str {
        match self {
            RoomError::RoomFull => "room_full",
            RoomError::PlayerNotInRoom => "player_not_in_room",
            RoomError::NotHost => "not_host",
            RoomError::GameAlreadyStarted => "game_already_started",
            RoomError::NotEnoughPlayers => "not_enough_players",
            RoomError::GameNotStarted => "game_not_started",
            RoomError::Game(err) => err.code(),
        }
    }
}

/// Who sits in a seat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupant {
    Human(Uuid),
    Bot(BotDifficulty),
}

/// A seat at the table. Seat order is player order in the game.
#[derive(Debug, Clone)]
pub struct Seat {
    pub occupant: Occupant,
    pub name: String,
    pub connected: bool,
}

impl Seat {
    fn human(id: Uuid, name: String) -> Self {
        Self {
            occupant: Occupant::Human(id),
            name,
            connected: true,
        }
    }

    fn is_human(&self, id: Uuid) -> bool {
        self.occupant == Occupant::Human(id)
    }

    fn to_info(&self, index: usize) -> SeatInfo {
        SeatInfo {
            index: index as PlayerId,
            name: self.name.clone(),
            bot: match self.occupant {
                Occupant::Bot(difficulty) => Some(difficulty),
                Occupant::Human(_) => None,
            },
            connected: self.connected,
        }
    }
}

/// Events of one turn, tagged with the player who took it
pub type TurnEvents = (PlayerId, Vec<GameEvent>);

/// A game room that can hold humans and bots.
pub struct GameRoom {
    pub id: Uuid,
    pub name: String,
    pub max_players: u8,
    pub host_id: Uuid,
    pub status: RoomStatus,
    pub seats: Vec<Seat>,
    pub config: GameConfig,
    /// The game state (once started)
    pub game: Option<GameState>,
    bots: HashMap<PlayerId, Bot>,
}

impl GameRoom {
    pub fn new(id: Uuid, host_id: Uuid, host_name: String, max_players: u8) -> Self {
        Self {
            id,
            name: format!("{}'s Game", host_name),
            max_players: max_players.clamp(MIN_PLAYERS as u8, MAX_PLAYERS as u8),
            host_id,
            status: RoomStatus::Waiting,
            seats: vec![Seat::human(host_id, host_name)],
            config: GameConfig::default(),
            game: None,
            bots: HashMap::new(),
        }
    }

    pub fn with_rules(mut self, rules: Option<RuleSet>, seed: Option<u64>) -> Self {
        if let Some(rules) = rules {
            self.config.rules = rules;
        }
        self.config.seed = seed;
        self
    }

    pub fn player_count(&self) -> usize {
        self.seats.len()
    }

    pub fn is_full(&self) -> bool {
        self.seats.len() >= self.max_players as usize
    }

    /// Human connections seated here
    pub fn humans(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.seats.iter().filter_map(|s| match s.occupant {
            Occupant::Human(id) => Some(id),
            Occupant::Bot(_) => None,
        })
    }

    fn seat_of(&self, player_id: Uuid) -> Result<PlayerId, RoomError> {
        self.seats
            .iter()
            .position(|s| s.is_human(player_id))
            .map(|i| i as PlayerId)
            .ok_or(RoomError::PlayerNotInRoom)
    }

    fn take_seat(&mut self, seat: Seat) -> Result<(), RoomError> {
        if self.status != RoomStatus::Waiting {
            return Err(RoomError::GameAlreadyStarted);
        }
        if self.is_full() {
            return Err(RoomError::RoomFull);
        }
        self.seats.push(seat);
        Ok(())
    }

    pub fn add_player(&mut self, player_id: Uuid, name: String) -> Result<(), RoomError> {
        self.take_seat(Seat::human(player_id, name))
    }

    pub fn add_bot(&mut self, requester_id: Uuid, difficulty: BotDifficulty) -> Result<(), RoomError> {
        if requester_id != self.host_id {
            return Err(RoomError::NotHost);
        }
        let name = format!("Bot {} ({:?})", self.seats.len() + 1, difficulty);
        self.take_seat(Seat {
            occupant: Occupant::Bot(difficulty),
            name,
            connected: true,
        })
    }

    /// Remove a human seat before the game starts; returns true when no humans remain
    pub fn remove_player(&mut self, player_id: Uuid) -> Result<bool, RoomError> {
        let index = self.seat_of(player_id)? as usize;
        if self.status != RoomStatus::Waiting {
            return Err(RoomError::GameAlreadyStarted);
        }
        self.seats.remove(index);

        // If host left, hand the room to the next human
        let next_host = self.humans().next();
        if player_id == self.host_id {
            if let Some(next) = next_host {
                self.host_id = next;
            }
        }

        Ok(self.humans().next().is_none())
    }

    pub fn set_player_connected(&mut self, player_id: Uuid, connected: bool) {
        if let Some(seat) = self.seats.iter_mut().find(|s| s.is_human(player_id)) {
            seat.connected = connected;
        }
    }

    /// Deal the game; bots seated first take their turns straight away
    pub fn start_game(&mut self, requester_id: Uuid) -> Result<Vec<TurnEvents>, RoomError> {
        if requester_id != self.host_id {
            return Err(RoomError::NotHost);
        }
        if self.status != RoomStatus::Waiting {
            return Err(RoomError::GameAlreadyStarted);
        }
        if self.seats.len() < MIN_PLAYERS {
            return Err(RoomError::NotEnoughPlayers);
        }

        let names: Vec<String> = self.seats.iter().map(|s| s.name.clone()).collect();
        let game = GameState::new(self.config.clone(), names)?;
        self.bots = self
            .seats
            .iter()
            .enumerate()
            .filter_map(|(index, seat)| match seat.occupant {
                Occupant::Bot(difficulty) => {
                    let id = index as PlayerId;
                    let bot = match self.config.seed {
                        Some(seed) => Bot::with_seed(id, difficulty, seed.wrapping_add(index as u64)),
                        None => Bot::new(id, difficulty),
                    };
                    Some((id, bot))
                }
                Occupant::Human(_) => None,
            })
            .collect();

        self.game = Some(game);
        self.status = RoomStatus::InGame;

        Ok(self.run_bots())
    }

    /// Place the drawn tile for a human, then let any bots that follow move
    pub fn place(&mut self, player_id: Uuid, placement: Placement) -> Result<Vec<TurnEvents>, RoomError> {
        let index = self.seat_of(player_id)?;
        let game = self.game.as_mut().ok_or(RoomError::GameNotStarted)?;

        let events = game.apply_action(index, GameAction::PlaceTile(placement))?;
        let mut turns = vec![(index, events)];
        turns.extend(self.run_bots());
        Ok(turns)
    }

    /// Candidate moves for the caller's drawn tile
    pub fn legal_placements(&self, player_id: Uuid) -> Result<Vec<Placement>, RoomError> {
        let index = self.seat_of(player_id)?;
        let game = self.game.as_ref().ok_or(RoomError::GameNotStarted)?;
        if game.current_player != index {
            return Err(GameError::NotYourTurn.into());
        }
        let tile = game.current_tile.as_ref().ok_or(GameError::NoTileDrawn)?;
        Ok(candidate_moves(game, index, tile))
    }

    /// What a placement of the drawn tile would do
    pub fn simulate(&self, player_id: Uuid, placement: Placement) -> Result<SimulationOutcome, RoomError> {
        let index = self.seat_of(player_id)?;
        let game = self.game.as_ref().ok_or(RoomError::GameNotStarted)?;
        let tile = game.current_tile.as_ref().ok_or(GameError::NoTileDrawn)?;
        Ok(simulate(game, index, tile, placement)?)
    }

    /// Play bot seats until a human is up or the game ends
    fn run_bots(&mut self) -> Vec<TurnEvents> {
        let mut turns = Vec::new();
        let Some(game) = self.game.as_mut() else {
            return turns;
        };

        while !game.is_finished() {
            let current = game.current_player;
            let Some(bot) = self.bots.get_mut(&current) else {
                break;
            };
            match bot.play_turn(game) {
                Ok(events) => {
                    debug!(room = %self.id, player = current, "bot turn");
                    turns.push((current, events));
                }
                Err(err) => {
                    warn!(room = %self.id, player = current, %err, "bot could not move");
                    break;
                }
            }
        }

        if game.is_finished() {
            self.status = RoomStatus::Finished;
        }
        turns
    }

    pub fn get_game_state(&self) -> Option<serde_json::Value> {
        self.game
            .as_ref()
            .and_then(|g| serde_json::to_value(g).ok())
    }

    pub fn current_turn(&self) -> Option<(PlayerId, Option<Tile>)> {
        self.game
            .as_ref()
            .map(|g| (g.current_player, g.current_tile.clone()))
    }

    /// Winner ids, names and every score once the game is over
    pub fn results(&self) -> Option<(Vec<PlayerId>, Vec<String>, Vec<u32>)> {
        let game = self.game.as_ref()?;
        let winners = game.winners()?.to_vec();
        let names = winners
            .iter()
            .filter_map(|&w| self.seats.get(w as usize).map(|s| s.name.clone()))
            .collect();
        let scores = game.players.iter().map(|p| p.score).collect();
        Some((winners, names, scores))
    }

    pub fn to_info(&self) -> RoomInfo {
        RoomInfo {
            id: self.id,
            name: self.name.clone(),
            seats: self
                .seats
                .iter()
                .enumerate()
                .map(|(i, s)| s.to_info(i))
                .collect(),
            max_players: self.max_players,
            host_id: self.host_id,
            status: self.status,
        }
    }
}
