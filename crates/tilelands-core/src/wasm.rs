//! WebAssembly bindings for the Tilelands engine.
//!
//! This module exposes the game engine to JavaScript through wasm-bindgen.
//! Everything crosses the boundary as JSON strings.

use crate::actions::{GameAction, Placement};
use crate::bot::{Bot, BotDifficulty};
use crate::config::GameConfig;
use crate::game::{GameState, MAX_PLAYERS, MIN_PLAYERS};
use crate::simulator::simulate;
use wasm_bindgen::prelude::*;

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// WASM-exposed game wrapper
#[wasm_bindgen]
pub struct WasmGame {
    state: GameState,
}

#[wasm_bindgen]
impl WasmGame {
    /// Create a new game. `config_json` may be empty for the standard rules.
    #[wasm_bindgen(constructor)]
    pub fn new(player_names_json: &str, config_json: &str) -> Result<WasmGame, JsValue> {
        let player_names: Vec<String> = serde_json::from_str(player_names_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid player names: {}", e)))?;
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&player_names.len()) {
            return Err(JsValue::from_str("Need between 2 and 5 players"));
        }

        let config: GameConfig = if config_json.trim().is_empty() {
            GameConfig::default()
        } else {
            serde_json::from_str(config_json)
                .map_err(|e| JsValue::from_str(&format!("Invalid config: {}", e)))?
        };

        let state = GameState::new(config, player_names)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(WasmGame { state })
    }

    /// Get the current game state as JSON
    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> String {
        serde_json::to_string(&self.state).unwrap_or_else(|_| "{}".to_string())
    }

    /// Get the current player ID
    #[wasm_bindgen(js_name = getCurrentPlayer)]
    pub fn get_current_player(&self) -> u8 {
        self.state.current_player
    }

    /// The tile waiting to be placed, as JSON (or `null`)
    #[wasm_bindgen(js_name = getCurrentTile)]
    pub fn get_current_tile(&self) -> String {
        serde_json::to_string(&self.state.current_tile).unwrap_or_else(|_| "null".to_string())
    }

    /// `[[position, rotation], ...]` for the drawn tile
    #[wasm_bindgen(js_name = getLegalPlacements)]
    pub fn get_legal_placements(&self) -> String {
        let legal = match &self.state.current_tile {
            Some(tile) => self.state.legal_placements(tile),
            None => Vec::new(),
        };
        serde_json::to_string(&legal).unwrap_or_else(|_| "[]".to_string())
    }

    /// Get valid actions for the current player as JSON array
    #[wasm_bindgen(js_name = getValidActions)]
    pub fn get_valid_actions(&self) -> String {
        let actions = self.state.valid_actions(self.state.current_player);
        serde_json::to_string(&actions).unwrap_or_else(|_| "[]".to_string())
    }

    /// Apply an action from JSON, returns events JSON or error
    #[wasm_bindgen(js_name = applyAction)]
    pub fn apply_action(&mut self, player: u8, action_json: &str) -> Result<String, JsValue> {
        let action: GameAction = serde_json::from_str(action_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid action JSON: {}", e)))?;

        match self.state.apply_action(player, action) {
            Ok(events) => Ok(serde_json::to_string(&events).unwrap_or_else(|_| "[]".to_string())),
            Err(e) => Err(JsValue::from_str(e.code())),
        }
    }

    /// What placing the drawn tile would do, without doing it
    #[wasm_bindgen(js_name = simulate)]
    pub fn simulate(&self, player: u8, placement_json: &str) -> Result<String, JsValue> {
        let placement: Placement = serde_json::from_str(placement_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid placement JSON: {}", e)))?;
        let tile = self
            .state
            .current_tile
            .as_ref()
            .ok_or_else(|| JsValue::from_str("no_tile_drawn"))?;

        let outcome = simulate(&self.state, player, tile, placement)
            .map_err(|e| JsValue::from_str(e.code()))?;
        Ok(serde_json::to_string(&outcome).unwrap_or_else(|_| "null".to_string()))
    }

    /// Check if the game is finished
    #[wasm_bindgen(js_name = isFinished)]
    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    /// Winner ids as JSON (`null` while playing)
    #[wasm_bindgen(js_name = getWinners)]
    pub fn get_winners(&self) -> String {
        serde_json::to_string(&self.state.winners()).unwrap_or_else(|_| "null".to_string())
    }

    /// Get a specific player's state as JSON
    #[wasm_bindgen(js_name = getPlayer)]
    pub fn get_player(&self, player: u8) -> String {
        if let Some(p) = self.state.get_player(player) {
            serde_json::to_string(p).unwrap_or_else(|_| "{}".to_string())
        } else {
            "null".to_string()
        }
    }

    /// Get a bot's suggested action for a player
    /// difficulty: "easy", "medium", or "hard"
    #[wasm_bindgen(js_name = getBotAction)]
    pub fn get_bot_action(&self, player: u8, difficulty: &str) -> String {
        let diff = difficulty.parse().unwrap_or(BotDifficulty::Medium);
        let mut bot = Bot::new(player, diff);
        match bot.choose_action(&self.state) {
            Some(action) => serde_json::to_string(&action).unwrap_or_else(|_| "null".to_string()),
            None => "null".to_string(),
        }
    }
}
