//! Long-run profile accumulation
//!
//! Runs once per human player when a game finalizes. The trust score moves
//! by fixed configured deltas: down when the player defected at all, up when
//! they stayed cooperative, whether or not they were burned for it.

use tracing::debug;

use crate::config::GameConfig;
use crate::state::UserAccount;

/// One player's session summary, derived from their result rows.
#[derive(Clone, Copy, Debug)]
pub(crate) struct GameTally {
    pub rounds_cooperated: u32,
    pub rounds_defected: u32,
    pub was_betrayed: bool,
    pub net_result: i64,
}

pub(crate) fn accumulate(user: &mut UserAccount, tally: &GameTally, config: &GameConfig) {
    let profile = &mut user.profile;

    profile.matches_played += 1;
    profile.rounds_cooperated += tally.rounds_cooperated;
    profile.rounds_defected += tally.rounds_defected;
    if tally.was_betrayed {
        profile.times_betrayed += 1;
    }

    let n = profile.matches_played as f64;
    profile.average_earnings =
        (profile.average_earnings * (n - 1.0) + tally.net_result as f64) / n;

    // Any defection costs trust; a fully cooperative session earns it,
    // including the betrayed-but-cooperative case.
    let score = profile.trust_score as i32;
    let score = if tally.rounds_defected > 0 {
        score - config.trust_score_decrease as i32
    } else {
        score + config.trust_score_increase as i32
    };
    profile.trust_score = score.clamp(0, 100) as u8;

    debug!(
        user = user.id,
        matches = profile.matches_played,
        trust = profile.trust_score,
        "profile updated"
    );
}
