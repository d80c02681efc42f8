//! Personality-driven decision model
//!
//! Maps an OCEAN trait vector to a stochastic round decision: whether to
//! invest or cash out, how much to commit, how long the decision takes, and
//! how much visible hesitation it produces. Bots and synthetic users share
//! one algorithm parameterized by a per-actor weight table.

use crate::random::SeededRng;
use crate::LAST_ROUND;
use serde::{Deserialize, Serialize};

/// A choice in the trust game
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Choice {
    Invest,
    CashOut,
}

impl Choice {
    pub fn opposite(self) -> Choice {
        match self {
            Choice::Invest => Choice::CashOut,
            Choice::CashOut => Choice::Invest,
        }
    }
}

/// OCEAN trait vector plus the two derived tendencies, all on a 0-100 scale.
///
/// Snapshotted onto a player at game creation; later profile edits never
/// affect a running game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Personality {
    pub openness: u8,
    pub conscientiousness: u8,
    pub extraversion: u8,
    pub agreeableness: u8,
    pub neuroticism: u8,
    pub cooperation_tendency: u8,
    pub risk_tolerance: u8,
}

impl Personality {
    /// Build a vector from the five OCEAN traits, deriving the two tendencies
    /// the way synthetic-user profiles do.
    pub fn from_ocean(
        openness: u8,
        conscientiousness: u8,
        extraversion: u8,
        agreeableness: u8,
        neuroticism: u8,
    ) -> Self {
        let cooperation_tendency =
            ((agreeableness as u16 * 6 + conscientiousness as u16 * 4) / 10) as u8;
        let risk_tolerance = ((openness as u16 + (100 - neuroticism.min(100)) as u16) / 2) as u8;
        Self {
            openness,
            conscientiousness,
            extraversion,
            agreeableness,
            neuroticism,
            cooperation_tendency,
            risk_tolerance,
        }
    }

    /// Draw a random trait vector (for synthetic-user generation).
    pub fn random(rng: &mut SeededRng) -> Self {
        Self::from_ocean(
            rng.next_range(101) as u8,
            rng.next_range(101) as u8,
            rng.next_range(101) as u8,
            rng.next_range(101) as u8,
            rng.next_range(101) as u8,
        )
    }
}

/// Per-actor weight table for the decision algorithm.
///
/// One table for bots, one for synthetic users; the probability pipeline is
/// identical, only the numbers differ. Trait-correction weights are percent
/// weights applied to `(trait - 50)`, so 50 is neutral.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionWeights {
    /// Weight of agreeableness in the base probability (percent).
    /// Zero on both base weights means cooperation_tendency is used directly.
    pub base_agreeableness_pct: u8,
    /// Weight of conscientiousness in the base probability (percent).
    pub base_conscientiousness_pct: u8,

    /// Round 1: additive pot-building boost, drawn from [min, max].
    pub opening_boost: (u8, u8),
    /// Round 2: small additive boost, drawn from [min, max].
    pub mid_boost: (u8, u8),
    /// Round 2: penalty magnitude applied with `selfish_chance` when the
    /// base tendency sits below `low_tendency_threshold`.
    pub selfish_penalty: (u8, u8),
    pub selfish_chance: u8,
    pub low_tendency_threshold: u8,
    /// Round 3: endgame penalty magnitude, always applied.
    pub endgame_penalty: (u8, u8),
    /// Round 3: extra penalty magnitude for low-tendency actors.
    pub endgame_extra_penalty: (u8, u8),

    pub agreeableness_weight_pct: u8,
    pub neuroticism_weight_pct: u8,
    pub openness_weight_pct: u8,

    /// Per-round investment fraction ranges (percent of the risk-scaled span),
    /// indexed by round number - 1. Widens with round number.
    pub invest_fraction: [(u8, u8); 3],
    /// Investment amounts are rounded to the nearest multiple of this step.
    pub rounding_step: u64,

    /// Decision latency: base plus per-trait-point contributions, in ms.
    pub base_latency_ms: u32,
    pub conscientiousness_latency_ms: u32,
    pub neuroticism_latency_ms: u32,
    /// Extraversion shaves latency off (per trait point, user table only).
    pub extraversion_relief_ms: u32,

    /// Hesitation additions, drawn from [min, max].
    pub defect_hesitation: (u8, u8),
    pub final_round_hesitation: (u8, u8),
    /// Extra hesitation when conscientiousness < 30 (user table only).
    pub scattered_bonus: u8,
    /// Hesitation at or below this score produces zero toggles.
    pub calm_threshold: u8,
}

impl DecisionWeights {
    /// Weight table for house bots.
    pub fn bot() -> Self {
        Self {
            base_agreeableness_pct: 0,
            base_conscientiousness_pct: 0,
            opening_boost: (25, 30),
            mid_boost: (5, 10),
            selfish_penalty: (40, 50),
            selfish_chance: 30,
            low_tendency_threshold: 40,
            endgame_penalty: (10, 15),
            endgame_extra_penalty: (20, 25),
            agreeableness_weight_pct: 30,
            neuroticism_weight_pct: 20,
            openness_weight_pct: 0,
            invest_fraction: [(30, 60), (40, 80), (50, 100)],
            rounding_step: 10,
            base_latency_ms: 1500,
            conscientiousness_latency_ms: 15,
            neuroticism_latency_ms: 12,
            extraversion_relief_ms: 0,
            defect_hesitation: (15, 20),
            final_round_hesitation: (10, 15),
            scattered_bonus: 0,
            calm_threshold: 30,
        }
    }

    /// Weight table for synthetic users (dataset generation).
    pub fn synthetic_user() -> Self {
        Self {
            base_agreeableness_pct: 60,
            base_conscientiousness_pct: 40,
            opening_boost: (25, 30),
            mid_boost: (5, 10),
            selfish_penalty: (40, 50),
            selfish_chance: 30,
            low_tendency_threshold: 40,
            endgame_penalty: (10, 15),
            endgame_extra_penalty: (20, 25),
            agreeableness_weight_pct: 30,
            neuroticism_weight_pct: 30,
            openness_weight_pct: 10,
            invest_fraction: [(30, 60), (40, 80), (50, 100)],
            rounding_step: 100,
            base_latency_ms: 2000,
            conscientiousness_latency_ms: 20,
            neuroticism_latency_ms: 15,
            extraversion_relief_ms: 10,
            defect_hesitation: (15, 20),
            final_round_hesitation: (10, 15),
            scattered_bonus: 12,
            calm_threshold: 40,
        }
    }
}

/// Bounds the decision must respect, supplied by the engine configuration.
#[derive(Clone, Copy, Debug)]
pub struct DecisionContext {
    pub round_number: u8,
    pub min_investment: u64,
    pub max_investment: u64,
}

/// Observable hesitation attached to a decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hesitation {
    /// 0-100 composite score.
    pub score: u8,
    pub toggle_count: u8,
    pub initial_choice: Choice,
    pub changed_choice: bool,
}

/// One round decision produced by the model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub choice: Choice,
    /// Zero when cashing out.
    pub investment: u64,
    pub decision_time_ms: u32,
    pub hesitation: Hesitation,
}

fn pick(rng: &mut SeededRng, range: (u8, u8)) -> i32 {
    rng.next_between(range.0 as u32, range.1 as u32) as i32
}

fn trait_correction(trait_value: u8, weight_pct: u8) -> i32 {
    (trait_value as i32 - 50) * weight_pct as i32 / 100
}

/// Cooperation probability before clamping, in percentage points.
///
/// Consumes draws from `rng` for the round-dependent adjustments, so callers
/// that also draw the cooperate/defect roll must use the same generator in
/// sequence (as `decide` does).
pub fn cooperation_probability(
    personality: &Personality,
    weights: &DecisionWeights,
    round_number: u8,
    rng: &mut SeededRng,
) -> i32 {
    let base = if weights.base_agreeableness_pct == 0 && weights.base_conscientiousness_pct == 0 {
        personality.cooperation_tendency as i32
    } else {
        (personality.agreeableness as i32 * weights.base_agreeableness_pct as i32
            + personality.conscientiousness as i32 * weights.base_conscientiousness_pct as i32)
            / 100
    };

    let mut probability = base;
    match round_number {
        1 => {
            probability += pick(rng, weights.opening_boost);
        }
        2 => {
            probability += pick(rng, weights.mid_boost);
            if base < weights.low_tendency_threshold as i32
                && rng.next_percent() < weights.selfish_chance
            {
                probability -= pick(rng, weights.selfish_penalty);
            }
        }
        _ => {
            probability -= pick(rng, weights.endgame_penalty);
            if base < weights.low_tendency_threshold as i32 {
                probability -= pick(rng, weights.endgame_extra_penalty);
            }
        }
    }

    probability += trait_correction(personality.agreeableness, weights.agreeableness_weight_pct);
    probability -= trait_correction(personality.neuroticism, weights.neuroticism_weight_pct);
    probability += trait_correction(personality.openness, weights.openness_weight_pct);

    probability
}

fn investment_amount(
    personality: &Personality,
    weights: &DecisionWeights,
    ctx: &DecisionContext,
    rng: &mut SeededRng,
) -> u64 {
    let span = ctx.max_investment.saturating_sub(ctx.min_investment);
    let risk_scaled = span * personality.risk_tolerance as u64 / 100;

    let idx = (ctx.round_number.clamp(1, LAST_ROUND) - 1) as usize;
    let (lo, hi) = weights.invest_fraction[idx];
    let fraction = rng.next_between(lo as u32, hi as u32) as u64;

    let raw = ctx.min_investment + risk_scaled * fraction / 100;
    let step = weights.rounding_step.max(1);
    let rounded = (raw + step / 2) / step * step;
    rounded.clamp(ctx.min_investment, ctx.max_investment)
}

fn decision_latency_ms(
    personality: &Personality,
    weights: &DecisionWeights,
    rng: &mut SeededRng,
) -> u32 {
    let base = weights.base_latency_ms as i64
        + personality.conscientiousness as i64 * weights.conscientiousness_latency_ms as i64
        + personality.neuroticism as i64 * weights.neuroticism_latency_ms as i64
        - personality.extraversion as i64 * weights.extraversion_relief_ms as i64;
    let base = base.max(250) as u64;

    // Jitter in [0.7, 1.3]
    let jitter = rng.next_between(70, 130) as u64;
    (base * jitter / 100) as u32
}

fn hesitation(
    personality: &Personality,
    weights: &DecisionWeights,
    ctx: &DecisionContext,
    choice: Choice,
    rng: &mut SeededRng,
) -> Hesitation {
    let mut score = personality.neuroticism as i32;
    if choice == Choice::CashOut {
        score += pick(rng, weights.defect_hesitation);
    }
    if ctx.round_number >= LAST_ROUND {
        score += pick(rng, weights.final_round_hesitation);
    }
    if weights.scattered_bonus > 0 && personality.conscientiousness < 30 {
        score += weights.scattered_bonus as i32;
    }
    let score = score.clamp(0, 100) as u8;

    let toggle_count = if score <= weights.calm_threshold {
        0
    } else if score <= 70 {
        rng.next_between(1, 2) as u8
    } else {
        rng.next_between(2, 5) as u8
    };

    // An odd toggle count means the pointer started on the other option.
    let initial_choice = if toggle_count % 2 == 1 {
        choice.opposite()
    } else {
        choice
    };

    Hesitation {
        score,
        toggle_count,
        initial_choice,
        changed_choice: initial_choice != choice,
    }
}

/// Produce one round decision for an actor.
///
/// Pure function of the personality, weight table, context and RNG state:
/// the same inputs replay to the same decision.
pub fn decide(
    personality: &Personality,
    weights: &DecisionWeights,
    ctx: &DecisionContext,
    rng: &mut SeededRng,
) -> Decision {
    let probability = cooperation_probability(personality, weights, ctx.round_number, rng)
        .clamp(0, 100) as u32;
    let roll = rng.next_range(101);
    let choice = if roll <= probability {
        Choice::Invest
    } else {
        Choice::CashOut
    };

    let investment = match choice {
        Choice::Invest => investment_amount(personality, weights, ctx, rng),
        Choice::CashOut => 0,
    };
    let decision_time_ms = decision_latency_ms(personality, weights, rng);
    let hesitation = hesitation(personality, weights, ctx, choice, rng);

    Decision {
        choice,
        investment,
        decision_time_ms,
        hesitation,
    }
}
