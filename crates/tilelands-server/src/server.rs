//! TCP server and connection handling.
//!
//! Each connection speaks line-delimited JSON: one `ClientMessage` per line
//! in, one `ServerMessage` per line out.

use crate::config::ServerConfig;
use crate::protocol::{ClientMessage, RoomInfo, RoomStatus, ServerMessage};
use crate::room::{GameRoom, RoomError, TurnEvents};
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Server state shared across all connections.
pub struct ServerState {
    pub config: ServerConfig,
    /// All active rooms
    pub rooms: DashMap<Uuid, GameRoom>,
    /// Mapping from player ID to their room ID
    pub player_rooms: DashMap<Uuid, Uuid>,
    /// Mapping from player ID to their message sender
    pub player_senders: DashMap<Uuid, mpsc::UnboundedSender<ServerMessage>>,
}

impl ServerState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            rooms: DashMap::new(),
            player_rooms: DashMap::new(),
            player_senders: DashMap::new(),
        }
    }

    /// Send a message to a specific player.
    pub fn send_to_player(&self, player_id: Uuid, msg: ServerMessage) {
        if let Some(sender) = self.player_senders.get(&player_id) {
            let _ = sender.send(msg);
        }
    }

    /// Broadcast a message to every human in a room.
    ///
    /// Takes the room's read lock; never call while holding its write lock.
    pub fn broadcast_to_room(&self, room_id: Uuid, msg: ServerMessage) {
        let humans: Vec<Uuid> = match self.rooms.get(&room_id) {
            Some(room) => room.humans().collect(),
            None => return,
        };
        for player_id in humans {
            self.send_to_player(player_id, msg.clone());
        }
    }

    /// Broadcast a message to all players in a room except one.
    pub fn broadcast_to_room_except(&self, room_id: Uuid, except: Uuid, msg: ServerMessage) {
        let humans: Vec<Uuid> = match self.rooms.get(&room_id) {
            Some(room) => room.humans().filter(|id| *id != except).collect(),
            None => return,
        };
        for player_id in humans {
            self.send_to_player(player_id, msg.clone());
        }
    }

    fn reject(&self, player_id: Uuid, err: &RoomError) {
        debug!(%player_id, code = err.code(), "request rejected");
        self.send_to_player(
            player_id,
            ServerMessage::Rejected {
                code: err.code().to_string(),
                message: err.to_string(),
            },
        );
    }

    fn room_of(&self, player_id: Uuid) -> Option<Uuid> {
        self.player_rooms.get(&player_id).map(|r| *r)
    }

    /// Get list of waiting rooms.
    pub fn get_waiting_rooms(&self) -> Vec<RoomInfo> {
        self.rooms
            .iter()
            .filter(|r| r.status == RoomStatus::Waiting)
            .map(|r| r.to_info())
            .collect()
    }
}

/// Run the TCP server.
pub async fn run_server(state: Arc<ServerState>) -> anyhow::Result<()> {
    let addr = state.config.addr;
    let listener = TcpListener::bind(addr).await?;
    info!("Tilelands server listening on {}", addr);

    while let Ok((stream, peer_addr)) = listener.accept().await {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }

    Ok(())
}

/// Handle a single connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<ServerState>,
) -> anyhow::Result<()> {
    info!("New connection from {}", addr);
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    // Assign a player ID
    let player_id = Uuid::new_v4();

    // Create channel for outgoing messages
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    state.player_senders.insert(player_id, tx);
    state.send_to_player(player_id, ServerMessage::Welcome { player_id });

    // Spawn task to forward messages from channel to the socket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let Ok(mut line) = serde_json::to_string(&msg) else {
                continue;
            };
            line.push('\n');
            if writer.write_all(line.as_bytes()).await.is_err() {
                break;
            }
        }
    });

    // Handle incoming lines
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<ClientMessage>(&line) {
                    Ok(client_msg) => handle_message(player_id, client_msg, &state),
                    Err(e) => {
                        warn!("Invalid message from {}: {}", player_id, e);
                        state.send_to_player(
                            player_id,
                            ServerMessage::Error {
                                message: format!("invalid message: {e}"),
                            },
                        );
                    }
                }
            }
            Ok(None) => {
                info!("Client {} closed the connection", player_id);
                break;
            }
            Err(e) => {
                error!("Read error from {}: {}", player_id, e);
                break;
            }
        }
    }

    // Clean up on disconnect
    leave_room(player_id, &state);
    state.player_senders.remove(&player_id);
    send_task.abort();

    info!("Connection closed for {}", player_id);
    Ok(())
}

/// Handle a client message.
fn handle_message(player_id: Uuid, msg: ClientMessage, state: &Arc<ServerState>) {
    match msg {
        ClientMessage::CreateRoom {
            player_name,
            max_players,
            rules,
            seed,
        } => {
            if state.player_rooms.contains_key(&player_id) {
                state.reject(player_id, &RoomError::GameAlreadyStarted);
                return;
            }
            let room_id = Uuid::new_v4();
            let room = GameRoom::new(room_id, player_id, player_name, max_players)
                .with_rules(rules, seed);
            let room_info = room.to_info();

            state.rooms.insert(room_id, room);
            state.player_rooms.insert(player_id, room_id);
            info!(%room_id, host = %player_id, "room created");

            state.send_to_player(player_id, ServerMessage::RoomCreated { room_id });
            state.send_to_player(player_id, ServerMessage::JoinedRoom { room: room_info });
        }

        ClientMessage::JoinRoom {
            room_id,
            player_name,
        } => {
            let Some(mut room) = state.rooms.get_mut(&room_id) else {
                state.send_to_player(
                    player_id,
                    ServerMessage::Error {
                        message: "Room not found".to_string(),
                    },
                );
                return;
            };
            match room.add_player(player_id, player_name) {
                Ok(()) => {
                    let room_info = room.to_info();
                    drop(room); // Release lock before broadcasting
                    state.player_rooms.insert(player_id, room_id);

                    state.send_to_player(
                        player_id,
                        ServerMessage::JoinedRoom {
                            room: room_info.clone(),
                        },
                    );
                    state.broadcast_to_room_except(
                        room_id,
                        player_id,
                        ServerMessage::RoomUpdated { room: room_info },
                    );
                }
                Err(e) => {
                    drop(room);
                    state.reject(player_id, &e);
                }
            }
        }

        ClientMessage::LeaveRoom => {
            if leave_room(player_id, state) {
                state.send_to_player(player_id, ServerMessage::LeftRoom);
            }
        }

        ClientMessage::AddBot { difficulty } => {
            let Some(room_id) = state.room_of(player_id) else {
                state.reject(player_id, &RoomError::PlayerNotInRoom);
                return;
            };
            let difficulty = difficulty.unwrap_or(state.config.bot_difficulty);
            let result = state
                .rooms
                .get_mut(&room_id)
                .map(|mut room| room.add_bot(player_id, difficulty).map(|()| room.to_info()));
            match result {
                Some(Ok(room_info)) => {
                    state.broadcast_to_room(room_id, ServerMessage::RoomUpdated { room: room_info })
                }
                Some(Err(e)) => state.reject(player_id, &e),
                None => state.reject(player_id, &RoomError::PlayerNotInRoom),
            }
        }

        ClientMessage::StartGame => {
            let Some(room_id) = state.room_of(player_id) else {
                state.reject(player_id, &RoomError::PlayerNotInRoom);
                return;
            };
            let result = state.rooms.get_mut(&room_id).map(|mut room| {
                room.start_game(player_id)
                    .map(|turns| (turns, room.get_game_state()))
            });
            match result {
                Some(Ok((turns, Some(game_state)))) => {
                    info!(%room_id, "game started");
                    state.broadcast_to_room(room_id, ServerMessage::GameStarted { state: game_state });
                    broadcast_turns(room_id, turns, state);
                }
                Some(Ok((_, None))) => error!(%room_id, "started game could not be serialized"),
                Some(Err(e)) => state.reject(player_id, &e),
                None => state.reject(player_id, &RoomError::PlayerNotInRoom),
            }
        }

        ClientMessage::Place { placement } => {
            let Some(room_id) = state.room_of(player_id) else {
                state.reject(player_id, &RoomError::PlayerNotInRoom);
                return;
            };
            // The entry lock covers the human move and every bot reply
            let result = state
                .rooms
                .get_mut(&room_id)
                .map(|mut room| room.place(player_id, placement));
            match result {
                Some(Ok(turns)) => broadcast_turns(room_id, turns, state),
                Some(Err(e)) => state.reject(player_id, &e),
                None => state.reject(player_id, &RoomError::PlayerNotInRoom),
            }
        }

        ClientMessage::LegalPlacements => {
            let Some(room_id) = state.room_of(player_id) else {
                state.reject(player_id, &RoomError::PlayerNotInRoom);
                return;
            };
            let result = state
                .rooms
                .get(&room_id)
                .map(|room| room.legal_placements(player_id));
            match result {
                Some(Ok(placements)) => state.send_to_player(
                    player_id,
                    ServerMessage::LegalPlacements { placements },
                ),
                Some(Err(e)) => state.reject(player_id, &e),
                None => state.reject(player_id, &RoomError::PlayerNotInRoom),
            }
        }

        ClientMessage::Simulate { placement } => {
            let Some(room_id) = state.room_of(player_id) else {
                state.reject(player_id, &RoomError::PlayerNotInRoom);
                return;
            };
            // A write lock, so no placement can land mid-simulation
            let result = state
                .rooms
                .get_mut(&room_id)
                .map(|room| room.simulate(player_id, placement));
            match result {
                Some(Ok(outcome)) => {
                    state.send_to_player(player_id, ServerMessage::Simulated { outcome })
                }
                Some(Err(e)) => state.reject(player_id, &e),
                None => state.reject(player_id, &RoomError::PlayerNotInRoom),
            }
        }

        ClientMessage::ListRooms => {
            let rooms = state.get_waiting_rooms();
            state.send_to_player(player_id, ServerMessage::RoomList { rooms });
        }

        ClientMessage::Ping => {
            state.send_to_player(player_id, ServerMessage::Pong);
        }
    }
}

/// Send each turn's events, the new state and whose turn it is; announce the end
fn broadcast_turns(room_id: Uuid, turns: Vec<TurnEvents>, state: &Arc<ServerState>) {
    for (player, events) in turns {
        state.broadcast_to_room(room_id, ServerMessage::Events { player, events });
    }

    let snapshot = state.rooms.get(&room_id).map(|room| {
        (
            room.get_game_state(),
            room.current_turn(),
            room.results(),
        )
    });
    let Some((game_state, turn, results)) = snapshot else {
        return;
    };

    if let Some(game_state) = game_state {
        state.broadcast_to_room(room_id, ServerMessage::GameState { state: game_state });
    }
    match results {
        Some((winners, winner_names, scores)) => {
            info!(%room_id, ?winners, "game over");
            state.broadcast_to_room(
                room_id,
                ServerMessage::GameOver {
                    winners,
                    winner_names,
                    scores,
                },
            );
        }
        None => {
            if let Some((player, tile)) = turn {
                state.broadcast_to_room(room_id, ServerMessage::TurnChanged { player, tile });
            }
        }
    }
}

/// Drop the player from their room. Seats in a running game are kept and
/// marked disconnected. Returns false when the player was in no room.
fn leave_room(player_id: Uuid, state: &Arc<ServerState>) -> bool {
    let Some((_, room_id)) = state.player_rooms.remove(&player_id) else {
        return false;
    };
    let Some(mut room) = state.rooms.get_mut(&room_id) else {
        return true;
    };

    if room.status == RoomStatus::Waiting {
        let is_empty = room.remove_player(player_id).unwrap_or(false);
        if is_empty {
            drop(room);
            state.rooms.remove(&room_id);
            info!(%room_id, "room closed");
            return true;
        }
    } else {
        room.set_player_connected(player_id, false);
    }

    let room_info = room.to_info();
    drop(room);
    state.broadcast_to_room(room_id, ServerMessage::RoomUpdated { room: room_info });
    true
}
