//! Matchmaking
//!
//! Pairs a user with a random active bot and creates the session atomically:
//! the game, both players and round 1 are inserted together after every
//! check has passed, so a game can never exist without its two seats.

use tracing::info;
use trust_logic::Personality;

use crate::error::{EngineError, Result};
use crate::game::GameService;
use crate::state::{
    Bot, BotId, Game, GameId, GameStatus, JoinedGame, Player, PlayerId, TrustProfile,
    UserAccount, UserId,
};

/// Seat occupant used while assembling a game.
enum Occupant {
    User(UserId),
    Bot(BotId),
}

impl GameService {
    /// Register a user with the configured starting balance.
    pub fn register_user(&mut self, name: impl Into<String>, personality: Personality) -> UserId {
        self.store.insert_user(UserAccount {
            id: 0,
            name: name.into(),
            balance: self.config.starting_balance,
            personality,
            profile: TrustProfile::default(),
        })
    }

    /// Register an active bot with the configured bot balance.
    pub fn register_bot(&mut self, name: impl Into<String>, personality: Personality) -> BotId {
        self.store.insert_bot(Bot {
            id: 0,
            name: name.into(),
            personality,
            active: true,
            balance: self.config.bot_default_balance,
        })
    }

    pub fn set_bot_active(&mut self, bot_id: BotId, active: bool) -> Result<()> {
        let bot = self
            .store
            .bot_mut(bot_id)
            .ok_or(EngineError::BotNotFound(bot_id))?;
        bot.active = active;
        Ok(())
    }

    /// Match a user with a random active bot and start the session.
    pub fn join_queue(&mut self, user_id: UserId, now: i64) -> Result<JoinedGame> {
        let user = self
            .store
            .user(user_id)
            .ok_or(EngineError::UserNotFound(user_id))?;
        if user.balance < self.config.min_investment as i64 {
            return Err(EngineError::InsufficientFunds {
                balance: user.balance,
                required: self.config.min_investment,
            });
        }
        let user_personality = user.personality;

        let active = self.store.active_bot_ids();
        if active.is_empty() {
            return Err(EngineError::NoActiveBot);
        }

        let game_id = self.store.alloc_game_id();
        let mut rng = self.game_rng(game_id);
        let bot_id = active[rng.next_range(active.len() as u32) as usize];
        let bot_personality = self
            .store
            .bot(bot_id)
            .ok_or(EngineError::BotNotFound(bot_id))?
            .personality;

        // Random seat assignment for the human.
        let human_seat = rng.next_range(2) as usize;
        let mut occupants = [
            (Occupant::Bot(bot_id), bot_personality),
            (Occupant::Bot(bot_id), bot_personality),
        ];
        occupants[human_seat] = (Occupant::User(user_id), user_personality);

        let joined = self.create_game(game_id, occupants, true, now);
        info!(
            game = game_id,
            user = user_id,
            bot = bot_id,
            seat = human_seat as u8 + 1,
            "matched user with bot"
        );
        // `create_game` reports seats in order; flip so `player` is the human.
        let (player, opponent) = if human_seat == 0 {
            (joined.player, joined.opponent)
        } else {
            (joined.opponent, joined.player)
        };
        Ok(JoinedGame { player, opponent, ..joined })
    }

    /// Create a bot-vs-bot game (simulation only; no balance gate).
    pub fn create_bot_game(&mut self, bot_a: BotId, bot_b: BotId, now: i64) -> Result<JoinedGame> {
        let pa = self
            .store
            .bot(bot_a)
            .ok_or(EngineError::BotNotFound(bot_a))?
            .personality;
        let pb = self
            .store
            .bot(bot_b)
            .ok_or(EngineError::BotNotFound(bot_b))?
            .personality;

        let game_id = self.store.alloc_game_id();
        let joined = self.create_game(
            game_id,
            [(Occupant::Bot(bot_a), pa), (Occupant::Bot(bot_b), pb)],
            true,
            now,
        );
        info!(game = game_id, bot_a, bot_b, "created bot-vs-bot game");
        Ok(joined)
    }

    /// Insert the game, both players and round 1. Infallible by the time it
    /// runs: all validation happened in the caller.
    fn create_game(
        &mut self,
        game_id: GameId,
        occupants: [(Occupant, Personality); 2],
        has_bot: bool,
        now: i64,
    ) -> JoinedGame {
        let player_ids: [PlayerId; 2] = [self.store.alloc_player_id(), self.store.alloc_player_id()];

        for (seat, (occupant, personality)) in occupants.into_iter().enumerate() {
            let (user, bot) = match occupant {
                Occupant::User(id) => (Some(id), None),
                Occupant::Bot(id) => (None, Some(id)),
            };
            self.store.insert_player(Player {
                id: player_ids[seat],
                game: game_id,
                user,
                bot,
                number: seat as u8 + 1,
                personality,
                total_invested: 0,
                final_earnings: 0,
                net_result: 0,
                was_betrayed: false,
            });
        }

        self.store.insert_game(Game {
            id: game_id,
            status: GameStatus::Active,
            completed_rounds: 0,
            has_bot,
            players: player_ids,
            started_at: now,
            ended_at: None,
        });
        let round_id = self.create_round(game_id, 1, now);

        JoinedGame {
            game: game_id,
            round: round_id,
            player: player_ids[0],
            opponent: player_ids[1],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::simulator;

    fn neutral() -> Personality {
        Personality::from_ocean(50, 50, 50, 50, 50)
    }

    fn service() -> GameService {
        GameService::new(GameConfig::default(), [3u8; 32])
    }

    #[test]
    fn test_join_creates_game_players_and_round_one() {
        let mut svc = service();
        simulator::demo_roster(&mut svc);
        let user = svc.register_user("ada", neutral());

        let joined = svc.join_queue(user, 1_000).unwrap();

        let game = svc.store().game(joined.game).unwrap();
        assert_eq!(game.status, GameStatus::Active);
        assert!(game.has_bot);
        assert_eq!(game.completed_rounds, 0);
        assert_eq!(game.started_at, 1_000);

        // Exactly one player per seat, numbers 1 and 2.
        let p1 = svc.store().player(game.players[0]).unwrap();
        let p2 = svc.store().player(game.players[1]).unwrap();
        assert_eq!(p1.number, 1);
        assert_eq!(p2.number, 2);
        assert_ne!(p1.is_bot(), p2.is_bot(), "exactly one seat is the bot");

        let round = svc.store().round(joined.round).unwrap();
        assert_eq!(round.number, 1);
        assert_eq!(round.trust_bonus_percent, 20);
        assert_eq!(round.pot_before_bonus, 0);
        assert_eq!(round.pot_after_bonus, 0);
    }

    #[test]
    fn test_join_snapshots_personalities() {
        let mut svc = service();
        let bot_personality = Personality::from_ocean(10, 20, 30, 40, 50);
        svc.register_bot("b", bot_personality);
        let user_personality = Personality::from_ocean(90, 80, 70, 60, 50);
        let user = svc.register_user("ada", user_personality);

        let joined = svc.join_queue(user, 0).unwrap();

        let human = svc.store().player(joined.player).unwrap();
        let bot = svc.store().player(joined.opponent).unwrap();
        assert_eq!(human.personality, user_personality);
        assert_eq!(bot.personality, bot_personality);

        // Mutating the live profile later must not touch the snapshot.
        svc.store.user_mut(user).unwrap().personality = neutral();
        assert_eq!(
            svc.store().player(joined.player).unwrap().personality,
            user_personality
        );
    }

    #[test]
    fn test_join_requires_minimum_balance() {
        let mut svc = service();
        simulator::demo_roster(&mut svc);
        let user = svc.register_user("broke", neutral());
        svc.store.user_mut(user).unwrap().balance = 99;

        let err = svc.join_queue(user, 0).unwrap_err();
        assert_eq!(
            err,
            EngineError::InsufficientFunds { balance: 99, required: 100 }
        );
        assert_eq!(svc.store().games().count(), 0, "no partial game created");
    }

    #[test]
    fn test_join_requires_active_bot() {
        let mut svc = service();
        let user = svc.register_user("ada", neutral());
        assert_eq!(svc.join_queue(user, 0).unwrap_err(), EngineError::NoActiveBot);

        let bot = svc.register_bot("b", neutral());
        svc.set_bot_active(bot, false).unwrap();
        assert_eq!(svc.join_queue(user, 0).unwrap_err(), EngineError::NoActiveBot);

        svc.set_bot_active(bot, true).unwrap();
        assert!(svc.join_queue(user, 0).is_ok());
    }

    #[test]
    fn test_unknown_user_rejected() {
        let mut svc = service();
        assert_eq!(svc.join_queue(42, 0).unwrap_err(), EngineError::UserNotFound(42));
    }

    #[test]
    fn test_seat_assignment_varies_across_games() {
        let mut svc = service();
        simulator::demo_roster(&mut svc);
        let user = svc.register_user("ada", neutral());

        let mut seats = std::collections::HashSet::new();
        for _ in 0..20 {
            let joined = svc.join_queue(user, 0).unwrap();
            seats.insert(svc.store().player(joined.player).unwrap().number);
            // Finish the game so the user can queue again cleanly.
            svc.settle_expired(joined.round, 30).ok();
            let game = svc.store().game(joined.game).unwrap().clone();
            for round in svc.store().rounds_of(game.id) {
                assert!(round.number <= 3);
            }
            // Settle any remaining rounds by timeout.
            while svc.store().game(joined.game).unwrap().status == GameStatus::Active {
                let open: Vec<_> = svc
                    .store()
                    .rounds_of(joined.game)
                    .iter()
                    .filter(|r| !r.is_settled())
                    .map(|r| r.id)
                    .collect();
                for id in open {
                    svc.settle_expired(id, 60).unwrap();
                }
            }
        }

        assert_eq!(seats.len(), 2, "human should land in both seats across 20 games");
    }

    #[test]
    fn test_bot_game_creation_is_atomic_pair() {
        let mut svc = service();
        let a = svc.register_bot("a", neutral());
        let b = svc.register_bot("b", neutral());

        let joined = svc.create_bot_game(a, b, 5).unwrap();
        let game = svc.store().game(joined.game).unwrap();
        let p1 = svc.store().player(game.players[0]).unwrap();
        let p2 = svc.store().player(game.players[1]).unwrap();
        assert!(p1.is_bot() && p2.is_bot());
        assert_eq!(p1.bot, Some(a));
        assert_eq!(p2.bot, Some(b));

        assert_eq!(
            svc.create_bot_game(a, 99, 5).unwrap_err(),
            EngineError::BotNotFound(99)
        );
    }
}
