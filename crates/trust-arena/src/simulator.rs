//! Simulation harness
//!
//! Batch bot-vs-bot and bot-vs-synthetic-user games for behavioral dataset
//! generation. Every simulated game goes through the real matchmaking,
//! submission and settlement paths; nothing here reimplements game rules.
//!
//! Simulator randomness runs on its own stream space (indexed down from
//! u32::MAX) so it never collides with per-game streams.

use serde::{Deserialize, Serialize};
use tracing::info;

use trust_logic::{decide, Choice, Decision, DecisionWeights, Personality, SeededRng};

use crate::error::{EngineError, Result};
use crate::game::GameService;
use crate::state::{ArenaStats, BotId, ChoiceTelemetry, JoinedGame, SubmitOutcome};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimulationMode {
    BotVsBot,
    BotVsUser,
}

/// Register a spread of house bots covering the personality space.
pub fn demo_roster(service: &mut GameService) -> Vec<BotId> {
    let roster: [(&str, Personality); 5] = [
        (
            "goodwill",
            Personality {
                cooperation_tendency: 85,
                ..Personality::from_ocean(60, 70, 55, 90, 15)
            },
        ),
        (
            "shark",
            Personality {
                cooperation_tendency: 20,
                risk_tolerance: 90,
                ..Personality::from_ocean(70, 40, 60, 15, 30)
            },
        ),
        (
            "grinder",
            Personality {
                cooperation_tendency: 60,
                risk_tolerance: 30,
                ..Personality::from_ocean(35, 90, 40, 60, 20)
            },
        ),
        (
            "flincher",
            Personality {
                cooperation_tendency: 55,
                ..Personality::from_ocean(45, 50, 35, 65, 90)
            },
        ),
        ("wildcard", Personality::from_ocean(90, 35, 70, 50, 50)),
    ];

    roster
        .into_iter()
        .map(|(name, personality)| service.register_bot(name, personality))
        .collect()
}

/// Run a batch of simulated games and report aggregate statistics over the
/// service's whole store.
pub fn run_batch(
    service: &mut GameService,
    mode: SimulationMode,
    games: u32,
    start_time: i64,
) -> Result<ArenaStats> {
    let bots = service.store().active_bot_ids();
    let required = match mode {
        SimulationMode::BotVsBot => 2,
        SimulationMode::BotVsUser => 1,
    };
    if bots.len() < required {
        return Err(EngineError::NoActiveBot);
    }

    for i in 0..games {
        let mut rng = SeededRng::new(&service.seed, u32::MAX - i);
        let now = start_time + i as i64 * 120;

        let joined = match mode {
            SimulationMode::BotVsBot => {
                let idx_a = rng.next_range(bots.len() as u32) as usize;
                let mut idx_b = rng.next_range(bots.len() as u32) as usize;
                if idx_b == idx_a {
                    idx_b = (idx_a + 1) % bots.len();
                }
                service.create_bot_game(bots[idx_a], bots[idx_b], now)?
            }
            SimulationMode::BotVsUser => {
                let personality = Personality::random(&mut rng);
                let user = service.register_user(format!("sim-user-{i}"), personality);
                service.join_queue(user, now)?
            }
        };

        drive_game(service, &joined, mode, now)?;
    }

    let stats = service.aggregate_stats();
    info!(
        games,
        mode = ?mode,
        cooperation_rate = stats.cooperation_rate,
        betrayal_rate = stats.betrayal_rate,
        "simulation batch complete"
    );
    Ok(stats)
}

/// Drive one game to completion by deciding for the joining seat each round;
/// the engine answers for the opposing bot.
fn drive_game(
    service: &mut GameService,
    joined: &JoinedGame,
    mode: SimulationMode,
    mut now: i64,
) -> Result<()> {
    let weights = match mode {
        SimulationMode::BotVsBot => DecisionWeights::bot(),
        SimulationMode::BotVsUser => DecisionWeights::synthetic_user(),
    };
    let (seat, personality) = {
        let player = service
            .store()
            .player(joined.player)
            .ok_or(EngineError::PlayerNotFound(joined.player))?;
        (player.seat(), player.personality)
    };

    let mut round_id = Some(joined.round);
    while let Some(id) = round_id {
        let round_number = service
            .store()
            .round(id)
            .ok_or(EngineError::RoundNotFound(id))?
            .number;

        let mut rng = service.decision_rng(joined.game, round_number, seat);
        let ctx = service.decision_context(round_number);
        let decision = decide(&personality, &weights, &ctx, &mut rng);

        now += 1 + decision.decision_time_ms as i64 / 1000;
        let submitted = service.submit_choice(
            joined.game,
            id,
            joined.player,
            decision.choice,
            decision.investment,
            telemetry_from(&decision),
            now,
        )?;

        round_id = match submitted {
            SubmitOutcome::Settled(outcome) => outcome.next_round,
            // Only reachable if the opponent were human; expire the timer.
            SubmitOutcome::Pending(_) => service.settle_expired(id, now)?.next_round,
        };
    }
    Ok(())
}

/// What a client would have reported for this decision.
fn telemetry_from(decision: &Decision) -> ChoiceTelemetry {
    let total = decision.decision_time_ms;
    let (on_final, on_other) = if decision.hesitation.toggle_count > 0 {
        (total * 3 / 5, total * 2 / 5)
    } else {
        (total, 0)
    };
    let (time_on_invest_ms, time_on_cash_out_ms) = match decision.choice {
        Choice::Invest => (on_final, on_other),
        Choice::CashOut => (on_other, on_final),
    };
    ChoiceTelemetry {
        decision_time_ms: decision.decision_time_ms,
        time_on_invest_ms,
        time_on_cash_out_ms,
        toggle_count: decision.hesitation.toggle_count,
        initial_choice: Some(decision.hesitation.initial_choice),
    }
}
