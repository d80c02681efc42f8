//! Trust Arena session engine
//!
//! Stateful layer over [`trust_logic`]: matchmaking, round submission and
//! settlement, game orchestration, long-run player profiles, and the
//! simulation harness used for behavioral dataset generation.
//!
//! The engine owns an in-memory store and a 32-byte randomness seed. Every
//! operation takes the current unix time from the caller and performs its
//! mutations as one all-or-nothing unit after validation, so a rejected call
//! never leaves partial state. The HTTP/session layer, persistence backend
//! and UI are external collaborators that call into [`GameService`].

mod config;
mod error;
mod game;
mod matchmaking;
mod profile;
mod round;
mod simulator;
mod state;
mod store;

pub use config::GameConfig;
pub use error::{EngineError, Result};
pub use game::GameService;
pub use simulator::{demo_roster, run_batch, SimulationMode};
pub use state::{
    ArenaStats, Bot, BotId, ChoiceTelemetry, Game, GameId, GameStatus, JoinedGame, Player,
    PlayerId, Round, RoundId, RoundOutcome, RoundResult, RoundSnapshot, RoundStat, SubmitOutcome,
    TrustProfile, UserAccount, UserId,
};
pub use store::Store;

pub use trust_logic::{Choice, Decision, DecisionWeights, Personality, SeededRng};
