//! Rule options and game setup.

use serde::{Deserialize, Serialize};

/// Ordinary tokens each player starts with
pub const DEFAULT_TOKENS_PER_PLAYER: u8 = 7;

/// Points a meadow scores per adjacent completed town
pub const DEFAULT_MEADOW_POINTS_PER_TOWN: u32 = 3;

/// Points for a completed cloister (the cloister tile and its eight neighbors)
pub const CLOISTER_POINTS: u32 = 9;

/// Rule switches; every field falls back to the standard game when omitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSet {
    /// Ordinary tokens in each player's pool
    pub tokens_per_player: u8,
    /// Whether each player owns one big token
    pub big_token: bool,
    /// How much a big token counts toward majority
    pub big_token_weight: u32,
    /// Whether bishop tokens may be placed on towns
    pub bishops: bool,
    /// Whether unfinished regions and meadows score when the deck runs out
    pub end_game_scoring: bool,
    pub meadow_points_per_town: u32,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            tokens_per_player: DEFAULT_TOKENS_PER_PLAYER,
            big_token: true,
            big_token_weight: 2,
            bishops: true,
            end_game_scoring: true,
            meadow_points_per_town: DEFAULT_MEADOW_POINTS_PER_TOWN,
        }
    }
}

impl RuleSet {
    /// Base game only: no big tokens, no bishops
    pub fn basic() -> Self {
        Self {
            big_token: false,
            bishops: false,
            ..Self::default()
        }
    }
}

/// Everything needed to set up a game
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub rules: RuleSet,
    /// Deck shuffle seed; `None` draws one from the thread RNG
    pub seed: Option<u64>,
}

impl GameConfig {
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config: GameConfig =
            serde_json::from_str(r#"{"rules": {"bishops": false}, "seed": 3}"#).unwrap();
        assert_eq!(config.seed, Some(3));
        assert!(!config.rules.bishops);
        assert_eq!(config.rules.tokens_per_player, DEFAULT_TOKENS_PER_PLAYER);
        assert!(config.rules.big_token);
    }

    #[test]
    fn test_basic_rules() {
        let rules = RuleSet::basic();
        assert!(!rules.big_token);
        assert!(!rules.bishops);
        assert!(rules.end_game_scoring);
    }
}
