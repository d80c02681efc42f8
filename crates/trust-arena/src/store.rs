//! In-memory store
//!
//! Plain tables keyed by incrementing ids. The engine mutates the store only
//! through `&mut self` operations that validate everything before touching a
//! row, which is what gives each operation its all-or-nothing character.

use std::collections::BTreeMap;

use crate::state::{
    Bot, BotId, Game, GameId, Player, PlayerId, Round, RoundId, RoundResult, RoundStat,
    UserAccount, UserId,
};

#[derive(Debug, Default)]
pub struct Store {
    games: BTreeMap<GameId, Game>,
    players: BTreeMap<PlayerId, Player>,
    rounds: BTreeMap<RoundId, Round>,
    results: BTreeMap<(RoundId, PlayerId), RoundResult>,
    stats: BTreeMap<(RoundId, PlayerId), RoundStat>,
    bots: BTreeMap<BotId, Bot>,
    users: BTreeMap<UserId, UserAccount>,
    next_game: GameId,
    next_player: PlayerId,
    next_round: RoundId,
    next_bot: BotId,
    next_user: UserId,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Id allocation ────────────────────────────────────────────────

    pub fn alloc_game_id(&mut self) -> GameId {
        self.next_game += 1;
        self.next_game
    }

    pub fn alloc_player_id(&mut self) -> PlayerId {
        self.next_player += 1;
        self.next_player
    }

    pub fn alloc_round_id(&mut self) -> RoundId {
        self.next_round += 1;
        self.next_round
    }

    // ── Users and bots ───────────────────────────────────────────────

    pub fn insert_user(&mut self, mut user: UserAccount) -> UserId {
        self.next_user += 1;
        user.id = self.next_user;
        self.users.insert(user.id, user);
        self.next_user
    }

    pub fn insert_bot(&mut self, mut bot: Bot) -> BotId {
        self.next_bot += 1;
        bot.id = self.next_bot;
        self.bots.insert(bot.id, bot);
        self.next_bot
    }

    pub fn user(&self, id: UserId) -> Option<&UserAccount> {
        self.users.get(&id)
    }

    pub fn user_mut(&mut self, id: UserId) -> Option<&mut UserAccount> {
        self.users.get_mut(&id)
    }

    pub fn bot(&self, id: BotId) -> Option<&Bot> {
        self.bots.get(&id)
    }

    pub fn bot_mut(&mut self, id: BotId) -> Option<&mut Bot> {
        self.bots.get_mut(&id)
    }

    pub fn active_bot_ids(&self) -> Vec<BotId> {
        self.bots
            .values()
            .filter(|b| b.active)
            .map(|b| b.id)
            .collect()
    }

    // ── Games, players, rounds ───────────────────────────────────────

    pub fn insert_game(&mut self, game: Game) {
        self.games.insert(game.id, game);
    }

    pub fn insert_player(&mut self, player: Player) {
        self.players.insert(player.id, player);
    }

    pub fn insert_round(&mut self, round: Round) {
        self.rounds.insert(round.id, round);
    }

    pub fn game(&self, id: GameId) -> Option<&Game> {
        self.games.get(&id)
    }

    pub fn game_mut(&mut self, id: GameId) -> Option<&mut Game> {
        self.games.get_mut(&id)
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    pub fn round(&self, id: RoundId) -> Option<&Round> {
        self.rounds.get(&id)
    }

    pub fn round_mut(&mut self, id: RoundId) -> Option<&mut Round> {
        self.rounds.get_mut(&id)
    }

    /// Rounds of a game ordered by round number.
    pub fn rounds_of(&self, game: GameId) -> Vec<&Round> {
        let mut rounds: Vec<&Round> = self.rounds.values().filter(|r| r.game == game).collect();
        rounds.sort_by_key(|r| r.number);
        rounds
    }

    pub fn round_of_number(&self, game: GameId, number: u8) -> Option<&Round> {
        self.rounds
            .values()
            .find(|r| r.game == game && r.number == number)
    }

    pub fn games(&self) -> impl Iterator<Item = &Game> {
        self.games.values()
    }

    pub fn all_rounds(&self) -> impl Iterator<Item = &Round> {
        self.rounds.values()
    }

    // ── Result and stat rows (unique per round+player) ───────────────

    pub fn insert_result(&mut self, result: RoundResult) {
        self.results.insert((result.round, result.player), result);
    }

    pub fn insert_stat(&mut self, stat: RoundStat) {
        self.stats.insert((stat.round, stat.player), stat);
    }

    pub fn result(&self, round: RoundId, player: PlayerId) -> Option<&RoundResult> {
        self.results.get(&(round, player))
    }

    pub fn stat(&self, round: RoundId, player: PlayerId) -> Option<&RoundStat> {
        self.stats.get(&(round, player))
    }

    /// All result rows for one player, across games.
    pub fn results_of_player(&self, player: PlayerId) -> Vec<&RoundResult> {
        self.results
            .values()
            .filter(|r| r.player == player)
            .collect()
    }
}
