//! Line-delimited JSON protocol for Tilelands multiplayer.
//!
//! Every line is one message, tagged by its `type` field.

use serde::{Deserialize, Serialize};
use tilelands_core::{
    BotDifficulty, GameEvent, Placement, PlayerId, RuleSet, SimulationOutcome, Tile,
};
use uuid::Uuid;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Create a new game room
    CreateRoom {
        player_name: String,
        max_players: u8,
        #[serde(default)]
        rules: Option<RuleSet>,
        #[serde(default)]
        seed: Option<u64>,
    },

    /// Join an existing room
    JoinRoom { room_id: Uuid, player_name: String },

    /// Leave current room
    LeaveRoom,

    /// Fill an empty seat with a bot (host only)
    AddBot {
        #[serde(default)]
        difficulty: Option<BotDifficulty>,
    },

    /// Start the game (host only)
    StartGame,

    /// Place the drawn tile
    Place { placement: Placement },

    /// Ask for every move available with the drawn tile
    LegalPlacements,

    /// Ask what a placement would do without making it
    Simulate { placement: Placement },

    /// Request room list
    ListRooms,

    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Welcome message with assigned connection ID
    Welcome { player_id: Uuid },

    /// Room created successfully
    RoomCreated { room_id: Uuid },

    /// Joined room successfully
    JoinedRoom { room: RoomInfo },

    /// Left room successfully
    LeftRoom,

    /// Room state updated (seat taken or freed)
    RoomUpdated { room: RoomInfo },

    /// Game started
    GameStarted { state: serde_json::Value },

    /// Game state updated
    GameState { state: serde_json::Value },

    /// Events produced by one turn
    Events {
        player: PlayerId,
        events: Vec<GameEvent>,
    },

    /// Whose turn it is and the tile they hold
    TurnChanged {
        player: PlayerId,
        tile: Option<Tile>,
    },

    /// Candidate moves for the drawn tile
    LegalPlacements { placements: Vec<Placement> },

    /// Result of a simulated placement
    Simulated { outcome: SimulationOutcome },

    /// List of rooms still waiting for players
    RoomList { rooms: Vec<RoomInfo> },

    /// A request the rules or the room refused
    Rejected { code: String, message: String },

    /// Error occurred
    Error { message: String },

    /// Pong response
    Pong,

    /// Game finished
    GameOver {
        winners: Vec<PlayerId>,
        winner_names: Vec<String>,
        scores: Vec<u32>,
    },
}

/// Room information for clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomInfo {
    pub id: Uuid,
    pub name: String,
    pub seats: Vec<SeatInfo>,
    pub max_players: u8,
    pub host_id: Uuid,
    pub status: RoomStatus,
}

/// One seat at the table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatInfo {
    /// Player id in the game, by seat order
    pub index: PlayerId,
    pub name: String,
    /// Set for bot seats
    pub bot: Option<BotDifficulty>,
    pub connected: bool,
}

/// Room status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Waiting,
    InGame,
    Finished,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilelands_core::Coord;

    #[test]
    fn test_parse_place_message() {
        let line = r#"{"type":"place","placement":{"position":{"x":0,"y":1},"rotation":2,"token":{"slot":0,"kind":"bishop"}}}"#;
        let msg: ClientMessage = serde_json::from_str(line).unwrap();
        match msg {
            ClientMessage::Place { placement } => {
                assert_eq!(placement.position, Coord::new(0, 1));
                assert_eq!(placement.rotation, 2);
                assert_eq!(placement.token.map(|t| t.slot), Some(0));
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn test_optional_fields_default() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"create_room","player_name":"Ana","max_players":3}"#)
                .unwrap();
        assert!(matches!(
            msg,
            ClientMessage::CreateRoom {
                rules: None,
                seed: None,
                ..
            }
        ));

        let msg: ClientMessage = serde_json::from_str(r#"{"type":"add_bot"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::AddBot { difficulty: None }));
    }

    #[test]
    fn test_rejection_shape() {
        let msg = ServerMessage::Rejected {
            code: "region_occupied".into(),
            message: "region already holds a token".into(),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "rejected");
        assert_eq!(value["code"], "region_occupied");
    }
}
