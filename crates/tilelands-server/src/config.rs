//! Server settings read from the environment.

use anyhow::Context;
use std::net::SocketAddr;
use tilelands_core::BotDifficulty;

const DEFAULT_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// Used when `add_bot` names no difficulty
    pub bot_difficulty: BotDifficulty,
}

impl ServerConfig {
    /// Read `SERVER_ADDR` and `BOT_DIFFICULTY`, falling back to defaults when unset
    pub fn from_env() -> anyhow::Result<Self> {
        let addr = std::env::var("SERVER_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.into());
        let addr = addr
            .parse::<SocketAddr>()
            .with_context(|| format!("invalid SERVER_ADDR '{addr}'"))?;

        let bot_difficulty = match std::env::var("BOT_DIFFICULTY") {
            Ok(value) => value
                .parse::<BotDifficulty>()
                .map_err(|e| anyhow::anyhow!("invalid BOT_DIFFICULTY: {e}"))?,
            Err(_) => BotDifficulty::default(),
        };

        Ok(Self {
            addr,
            bot_difficulty,
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            bot_difficulty: BotDifficulty::default(),
        }
    }
}
