//! Engine configuration

use serde::{Deserialize, Serialize};
use trust_logic::trust_bonus_percent;

/// Tunable knobs consumed by matchmaking, settlement and profile updates.
///
/// Values are read at the moment an operation runs; games snapshot nothing
/// from here except what lands on created rows (e.g. a round's bonus
/// percentage), so edits apply to subsequent operations only.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameConfig {
    /// Wall-clock budget per round, enforced by the session layer.
    pub round_duration_secs: i64,
    pub min_investment: u64,
    pub max_investment: u64,
    /// Investment used when a choice times out and defaults to invest.
    pub default_investment: u64,
    /// Pot bonus per round when both invest, indexed by round number - 1.
    pub trust_bonus: [u8; 3],
    pub trust_score_increase: u8,
    pub trust_score_decrease: u8,
    pub starting_balance: i64,
    pub bot_default_balance: i64,
}

impl GameConfig {
    pub fn trust_bonus_for(&self, round_number: u8) -> u8 {
        self.trust_bonus[(round_number.clamp(1, 3) - 1) as usize]
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            round_duration_secs: 30,
            min_investment: 100,
            max_investment: 1_000,
            default_investment: 100,
            trust_bonus: [
                trust_bonus_percent(1),
                trust_bonus_percent(2),
                trust_bonus_percent(3),
            ],
            trust_score_increase: 5,
            trust_score_decrease: 10,
            starting_balance: 10_000,
            bot_default_balance: 100_000,
        }
    }
}
