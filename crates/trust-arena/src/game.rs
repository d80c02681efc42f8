//! Game session orchestration
//!
//! `GameService` owns the store and configuration and exposes every
//! operation the session layer calls. Each public method is one atomic unit
//! of work: all validation happens before the first mutation.

use tracing::info;
use trust_logic::{DecisionContext, SeededRng};

use crate::config::GameConfig;
use crate::error::{EngineError, Result};
use crate::profile;
use crate::state::{
    ArenaStats, Game, GameId, GameStatus, Round, RoundId, RoundOutcome, RoundSnapshot,
};
use crate::store::Store;

pub struct GameService {
    pub(crate) store: Store,
    pub(crate) config: GameConfig,
    pub(crate) seed: [u8; 32],
}

impl GameService {
    /// Create an engine over an empty store. `seed` drives every random
    /// draw the engine ever makes; the same seed replays identically.
    pub fn new(config: GameConfig, seed: [u8; 32]) -> Self {
        Self {
            store: Store::new(),
            config,
            seed,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// RNG stream for one game.
    pub(crate) fn game_rng(&self, game: GameId) -> SeededRng {
        SeededRng::new(&self.seed, game)
    }

    /// RNG stream for one decision slot, so the two seats' draws within a
    /// round never perturb each other.
    pub(crate) fn decision_rng(&self, game: GameId, round_number: u8, seat: usize) -> SeededRng {
        self.game_rng(game).for_slot(round_number * 2 + seat as u8)
    }

    pub(crate) fn decision_context(&self, round_number: u8) -> DecisionContext {
        DecisionContext {
            round_number,
            min_investment: self.config.min_investment,
            max_investment: self.config.max_investment,
        }
    }

    /// Create the next round row with zeroed pots and the table bonus.
    pub(crate) fn create_round(&mut self, game: GameId, number: u8, now: i64) -> RoundId {
        let id = self.store.alloc_round_id();
        self.store.insert_round(Round {
            id,
            game,
            number,
            trust_bonus_percent: self.config.trust_bonus_for(number),
            pot_before_bonus: 0,
            pot_after_bonus: 0,
            choices: [None, None],
            investments: [0, 0],
            both_invested: false,
            someone_cashed_out: false,
            started_at: now,
            ended_at: None,
            duration_secs: 0,
        });
        id
    }

    /// Mark a game completed and fold each human player's session into their
    /// long-run profile.
    pub(crate) fn finalize_game(&mut self, game_id: GameId, now: i64) {
        let Some(game) = self.store.game(game_id) else {
            return;
        };
        let players = game.players;
        let rounds: Vec<RoundId> = self
            .store
            .rounds_of(game_id)
            .iter()
            .filter(|r| r.is_settled())
            .map(|r| r.id)
            .collect();

        if let Some(game) = self.store.game_mut(game_id) {
            game.status = GameStatus::Completed;
            game.ended_at = Some(now);
        }

        for player_id in players {
            let Some(player) = self.store.player(player_id) else {
                continue;
            };
            let Some(user_id) = player.user else {
                continue;
            };
            let mut tally = profile::GameTally {
                rounds_cooperated: 0,
                rounds_defected: 0,
                was_betrayed: player.was_betrayed,
                net_result: player.net_result,
            };
            for round_id in &rounds {
                if let Some(row) = self.store.result(*round_id, player_id) {
                    if row.cooperated {
                        tally.rounds_cooperated += 1;
                    } else {
                        tally.rounds_defected += 1;
                    }
                }
            }

            let config = self.config.clone();
            if let Some(user) = self.store.user_mut(user_id) {
                profile::accumulate(user, &tally, &config);
            }
        }

        info!(game = game_id, "game completed");
    }

    /// Remaining seconds on a round's timer.
    pub fn start_round_timer(&self, round_id: RoundId, now: i64) -> Result<i64> {
        Ok(self.round_snapshot(round_id, now)?.remaining_secs)
    }

    /// Live round view for the client.
    pub fn round_snapshot(&self, round_id: RoundId, now: i64) -> Result<RoundSnapshot> {
        let round = self
            .store
            .round(round_id)
            .ok_or(EngineError::RoundNotFound(round_id))?;
        let remaining = if round.is_settled() {
            0
        } else {
            (round.started_at + self.config.round_duration_secs - now).max(0)
        };
        Ok(RoundSnapshot {
            game: round.game,
            round: round.id,
            round_number: round.number,
            pot_before_bonus: round.pot_before_bonus,
            trust_bonus_percent: round.trust_bonus_percent,
            pot_after_bonus: round.pot_after_bonus,
            remaining_secs: remaining,
        })
    }

    /// Settled view of a round, rebuilt from stored rows.
    pub fn round_outcome(&self, round_id: RoundId) -> Result<RoundOutcome> {
        let round = self
            .store
            .round(round_id)
            .ok_or(EngineError::RoundNotFound(round_id))?;
        if !round.is_settled() {
            return Err(EngineError::RoundNotSettled(round_id));
        }
        let game = self
            .store
            .game(round.game)
            .ok_or(EngineError::GameNotFound(round.game))?;

        let mut choices = [trust_logic::Choice::Invest; 2];
        let mut payouts = [0u64; 2];
        for seat in 0..2 {
            choices[seat] = round.choices[seat].ok_or(EngineError::RoundNotSettled(round_id))?;
            payouts[seat] = self
                .store
                .result(round_id, game.players[seat])
                .map(|r| r.payout)
                .unwrap_or(0);
        }

        let next = self.store.round_of_number(round.game, round.number + 1);
        Ok(RoundOutcome {
            game: round.game,
            round: round.id,
            round_number: round.number,
            choices,
            investments: round.investments,
            payouts,
            pot_before_bonus: round.pot_before_bonus,
            trust_bonus_percent: round.trust_bonus_percent,
            pot_after_bonus: round.pot_after_bonus,
            both_invested: round.both_invested,
            someone_cashed_out: round.someone_cashed_out,
            next_round: next.map(|r| r.id),
            next_round_number: next.map(|r| r.number),
            game_status: game.status,
        })
    }

    /// Aggregate statistics over everything the engine has executed.
    pub fn aggregate_stats(&self) -> ArenaStats {
        let mut stats = ArenaStats::default();
        let mut both = 0u32;
        let mut cashed = 0u32;

        for round in self.store.all_rounds() {
            if round.is_settled() {
                stats.total_rounds += 1;
                if round.both_invested {
                    both += 1;
                }
                if round.someone_cashed_out {
                    cashed += 1;
                }
            }
        }

        let mut net_total = 0i64;
        let mut net_count = 0u32;
        for game in self.store.games() {
            stats.total_games += 1;
            if game.status == GameStatus::Completed {
                stats.completed_games += 1;
                for player_id in game.players {
                    if let Some(player) = self.store.player(player_id) {
                        net_total += player.net_result;
                        net_count += 1;
                    }
                }
            }
        }

        if stats.total_rounds > 0 {
            stats.cooperation_rate = both as f64 * 100.0 / stats.total_rounds as f64;
            stats.betrayal_rate = cashed as f64 * 100.0 / stats.total_rounds as f64;
        }
        if net_count > 0 {
            stats.average_net = net_total as f64 / net_count as f64;
        }
        stats
    }

    /// Fetch a game row.
    pub fn game(&self, game_id: GameId) -> Result<&Game> {
        self.store
            .game(game_id)
            .ok_or(EngineError::GameNotFound(game_id))
    }
}
