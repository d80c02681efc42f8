//! Batch simulation runner for dataset generation.

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tracing::info;

use trust_arena::{demo_roster, run_batch, GameConfig, GameService, SimulationMode};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    /// Bot against bot.
    BotBot,
    /// Bot against a generated synthetic user.
    BotUser,
}

impl From<Mode> for SimulationMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::BotBot => SimulationMode::BotVsBot,
            Mode::BotUser => SimulationMode::BotVsUser,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "simulate", about = "Run simulated trust-game sessions and report statistics")]
struct Args {
    /// Number of games to simulate.
    #[arg(long, default_value_t = 100)]
    games: u32,

    /// Randomness seed; the same seed replays the same batch.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Opponent pairing.
    #[arg(long, value_enum, default_value_t = Mode::BotBot)]
    mode: Mode,

    /// Unix timestamp the batch starts at.
    #[arg(long, default_value_t = 1_700_000_000)]
    start_time: i64,

    /// Emit the report as JSON instead of text.
    #[arg(long)]
    json: bool,
}

fn seed_bytes(seed: u64) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    for (i, chunk) in bytes.chunks_mut(8).enumerate() {
        chunk.copy_from_slice(&seed.wrapping_add(i as u64).to_le_bytes());
    }
    bytes
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    info!(games = args.games, seed = args.seed, mode = ?args.mode, "starting batch");

    let mut service = GameService::new(GameConfig::default(), seed_bytes(args.seed));
    demo_roster(&mut service);

    let stats = run_batch(&mut service, args.mode.into(), args.games, args.start_time)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("games:        {} ({} completed)", stats.total_games, stats.completed_games);
        println!("rounds:       {}", stats.total_rounds);
        println!("cooperation:  {:.1}%", stats.cooperation_rate);
        println!("betrayal:     {:.1}%", stats.betrayal_rate);
        println!("avg net:      {:.1}", stats.average_net);
    }

    Ok(())
}
