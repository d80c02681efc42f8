//! Engine error taxonomy

use crate::state::{BotId, GameId, PlayerId, RoundId, UserId};
use thiserror::Error;

pub type Result<T, E = EngineError> = std::result::Result<T, E>;

/// Errors surfaced to the calling layer. Every variant is rejected before
/// any state mutation; a failed call leaves the store untouched.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("investment {amount} outside allowed bounds [{min}, {max}]")]
    InvestmentOutOfBounds { amount: u64, min: u64, max: u64 },

    #[error("insufficient balance: have {balance}, need {required}")]
    InsufficientFunds { balance: i64, required: u64 },

    #[error("game {0} not found")]
    GameNotFound(GameId),

    #[error("round {0} not found")]
    RoundNotFound(RoundId),

    #[error("player {0} not found")]
    PlayerNotFound(PlayerId),

    #[error("user {0} not found")]
    UserNotFound(UserId),

    #[error("bot {0} not found")]
    BotNotFound(BotId),

    #[error("no active bot available for matchmaking")]
    NoActiveBot,

    #[error("game {0} is not accepting choices")]
    GameNotActive(GameId),

    #[error("round {0} is already settled")]
    RoundSettled(RoundId),

    #[error("round {0} is not settled yet")]
    RoundNotSettled(RoundId),

    #[error("player {0} already chose this round")]
    AlreadyChose(PlayerId),
}
