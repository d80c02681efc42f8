//! Data model: games, players, rounds, result rows, telemetry, profiles.
//!
//! Every row carries plain integer ids allocated by the store. Personality
//! vectors are snapshotted onto players at game creation and never refreshed,
//! so a profile edit mid-game cannot change a running session.

use serde::{Deserialize, Serialize};
use trust_logic::{Choice, Personality};

pub type GameId = u32;
pub type PlayerId = u32;
pub type RoundId = u32;
pub type UserId = u32;
pub type BotId = u32;

/// Game session state machine.
///
/// Transitions only Waiting -> Active -> Completed (or -> Cancelled). Once
/// Completed, the game and its players are immutable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum GameStatus {
    #[default]
    Waiting,
    Active,
    Completed,
    Cancelled,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub status: GameStatus,
    /// Settled rounds so far, never above 3.
    pub completed_rounds: u8,
    pub has_bot: bool,
    /// Player ids indexed by seat (player number - 1).
    pub players: [PlayerId; 2],
    pub started_at: i64,
    pub ended_at: Option<i64>,
}

/// One of the two participants in a game.
///
/// `user` is None exactly when the seat is a bot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub game: GameId,
    pub user: Option<UserId>,
    pub bot: Option<BotId>,
    /// 1 or 2, unique within the game.
    pub number: u8,
    /// Frozen at game creation.
    pub personality: Personality,
    pub total_invested: u64,
    pub final_earnings: u64,
    /// Always recomputed as final_earnings - total_invested.
    pub net_result: i64,
    pub was_betrayed: bool,
}

impl Player {
    pub fn is_bot(&self) -> bool {
        self.user.is_none()
    }

    pub fn seat(&self) -> usize {
        (self.number - 1) as usize
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Round {
    pub id: RoundId,
    pub game: GameId,
    /// 1-3, unique within the game.
    pub number: u8,
    /// Table value for this round; applied only when both invest.
    pub trust_bonus_percent: u8,
    pub pot_before_bonus: u64,
    pub pot_after_bonus: u64,
    /// Indexed by seat.
    pub choices: [Option<Choice>; 2],
    pub investments: [u64; 2],
    pub both_invested: bool,
    pub someone_cashed_out: bool,
    pub started_at: i64,
    pub ended_at: Option<i64>,
    pub duration_secs: i64,
}

impl Round {
    pub fn is_settled(&self) -> bool {
        self.ended_at.is_some()
    }

    pub fn choices_complete(&self) -> bool {
        self.choices.iter().all(|c| c.is_some())
    }
}

/// Settled outcome for one player in one round. Unique per (round, player).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct RoundResult {
    pub round: RoundId,
    pub player: PlayerId,
    pub invested: u64,
    pub payout: u64,
    pub net: i64,
    pub cooperated: bool,
    pub defected: bool,
    pub was_betrayed: bool,
    pub contribution_bps: u16,
}

/// Behavioral telemetry for one player in one round. Observational only;
/// never enters settlement math.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct RoundStat {
    pub round: RoundId,
    pub player: PlayerId,
    pub initial_choice: Option<Choice>,
    pub final_choice: Option<Choice>,
    pub changed_choice: bool,
    pub decision_time_ms: u32,
    pub time_on_invest_ms: u32,
    pub time_on_cash_out_ms: u32,
    pub toggle_count: u8,
    pub hesitation_score: u8,
    pub made_decision: bool,
    pub defaulted_to_invest: bool,
}

/// Client-reported decision telemetry accompanying a choice submission.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ChoiceTelemetry {
    pub decision_time_ms: u32,
    pub time_on_invest_ms: u32,
    pub time_on_cash_out_ms: u32,
    pub toggle_count: u8,
    pub initial_choice: Option<Choice>,
}

/// A registered house bot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Bot {
    pub id: BotId,
    pub name: String,
    pub personality: Personality,
    pub active: bool,
    pub balance: i64,
}

/// Long-run behavioral profile, updated once per completed game.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct TrustProfile {
    pub matches_played: u32,
    pub rounds_cooperated: u32,
    pub rounds_defected: u32,
    pub times_betrayed: u32,
    /// Running mean of per-game net results.
    pub average_earnings: f64,
    /// 0-100.
    pub trust_score: u8,
}

impl Default for TrustProfile {
    fn default() -> Self {
        Self {
            matches_played: 0,
            rounds_cooperated: 0,
            rounds_defected: 0,
            times_betrayed: 0,
            average_earnings: 0.0,
            trust_score: 50,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,
    pub name: String,
    /// Signed: sufficiency is checked only at matchmaking, so a balance can
    /// go negative across the rounds of one session.
    pub balance: i64,
    pub personality: Personality,
    pub profile: TrustProfile,
}

// ── Read models exposed to presentation/analytics collaborators ──────────

/// Live view of a round for the client.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct RoundSnapshot {
    pub game: GameId,
    pub round: RoundId,
    pub round_number: u8,
    pub pot_before_bonus: u64,
    pub trust_bonus_percent: u8,
    pub pot_after_bonus: u64,
    pub remaining_secs: i64,
}

/// Settled view of a round.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct RoundOutcome {
    pub game: GameId,
    pub round: RoundId,
    pub round_number: u8,
    pub choices: [Choice; 2],
    pub investments: [u64; 2],
    pub payouts: [u64; 2],
    pub pot_before_bonus: u64,
    pub trust_bonus_percent: u8,
    pub pot_after_bonus: u64,
    pub both_invested: bool,
    pub someone_cashed_out: bool,
    pub next_round: Option<RoundId>,
    pub next_round_number: Option<u8>,
    pub game_status: GameStatus,
}

/// Result of matchmaking (or simulator game creation).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct JoinedGame {
    pub game: GameId,
    pub round: RoundId,
    /// The joining side's player id (the human for `join_queue`, seat 1 for
    /// simulator-created games).
    pub player: PlayerId,
    pub opponent: PlayerId,
}

/// Result of a choice submission: either the round is still waiting on the
/// opponent, or it settled within the call.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub enum SubmitOutcome {
    Pending(RoundSnapshot),
    Settled(RoundOutcome),
}

/// Aggregate statistics over all games in a store (live or simulated).
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ArenaStats {
    pub total_games: u32,
    pub completed_games: u32,
    pub total_rounds: u32,
    /// Percent of settled rounds where both players invested.
    pub cooperation_rate: f64,
    /// Percent of settled rounds where someone cashed out.
    pub betrayal_rate: f64,
    /// Mean net result across players of completed games.
    pub average_net: f64,
}
