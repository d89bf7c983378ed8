//! In-memory storage implementation
//!
//! Every repository trait is implemented by [`InMemoryStorage`]. When both the
//! player table and the game tables are needed, the player lock is always taken
//! first. Player deletion additionally takes the account lock last.

use crate::error::{LadderError, Result};
use crate::game::Game;
use crate::leaderboard::LeaderBoardEntry;
use crate::player::{rating_order, Player};
use crate::records::{NewTournament, Patch, Tournament, TournamentId, UberAccount};
use crate::storage::players::{GameRepository, PlayerRepository};
use crate::storage::records::{
    AccountRepository, LeaderboardRepository, PatchRepository, TournamentRepository,
};
use crate::types::{GameId, PlayerId};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::RwLock;
use tracing::debug;

#[derive(Debug, Default)]
struct GameTables {
    games: BTreeMap<GameId, Game>,
    games_by_player: HashMap<PlayerId, BTreeSet<GameId>>,
    processed: HashSet<GameId>,
}

impl GameTables {
    fn insert(&mut self, game: Game) {
        for player_id in game.players() {
            self.games_by_player
                .entry(*player_id)
                .or_default()
                .insert(game.id());
        }
        self.games.insert(game.id(), game);
    }

    fn remove(&mut self, game_id: GameId) -> Option<Game> {
        let game = self.games.remove(&game_id)?;
        for player_id in game.players() {
            if let Some(ids) = self.games_by_player.get_mut(player_id) {
                ids.remove(&game_id);
            }
        }
        self.processed.remove(&game_id);
        Some(game)
    }
}

#[derive(Debug, Default)]
struct TournamentTable {
    next_id: TournamentId,
    by_id: BTreeMap<TournamentId, Tournament>,
}

/// In-memory store for players, games, reference data and the leaderboard
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    players: RwLock<HashMap<PlayerId, Player>>,
    games: RwLock<GameTables>,
    patches: RwLock<BTreeMap<String, Patch>>,
    tournaments: RwLock<TournamentTable>,
    accounts: RwLock<BTreeMap<String, UberAccount>>,
    leaderboard: RwLock<Vec<LeaderBoardEntry>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted(mut players: Vec<Player>) -> Vec<Player> {
        players.sort_by(rating_order);
        players
    }

    fn filter_players(&self, keep: impl Fn(&Player) -> bool) -> Result<Vec<Player>> {
        let players = self
            .players
            .read()
            .map_err(|_| LadderError::lock_poisoned("players read"))?;

        Ok(Self::sorted(
            players.values().filter(|p| keep(p)).cloned().collect(),
        ))
    }
}

impl PlayerRepository for InMemoryStorage {
    fn load_player(&self, player_id: PlayerId) -> Result<Player> {
        let players = self
            .players
            .read()
            .map_err(|_| LadderError::lock_poisoned("players read"))?;

        players
            .get(&player_id)
            .cloned()
            .ok_or_else(|| LadderError::PlayerNotFound { player_id }.into())
    }

    fn create_player(&self, player: Player) -> Result<()> {
        let mut players = self
            .players
            .write()
            .map_err(|_| LadderError::lock_poisoned("players write"))?;

        if players.contains_key(&player.id()) {
            return Err(LadderError::DuplicateKey {
                entity: "player",
                key: player.id().to_string(),
            }
            .into());
        }

        debug!(player_id = player.id(), "Created player {}", player.name());
        players.insert(player.id(), player);
        Ok(())
    }

    fn save_player(&self, player: &Player) -> Result<()> {
        self.save_players(std::slice::from_ref(player))
    }

    fn save_players(&self, batch: &[Player]) -> Result<()> {
        let mut players = self
            .players
            .write()
            .map_err(|_| LadderError::lock_poisoned("players write"))?;

        // check first so a missing player leaves the batch unwritten
        if let Some(missing) = batch.iter().find(|p| !players.contains_key(&p.id())) {
            return Err(LadderError::PlayerNotFound {
                player_id: missing.id(),
            }
            .into());
        }

        for player in batch {
            players.insert(player.id(), player.clone());
        }
        Ok(())
    }

    fn delete_player(&self, player_id: PlayerId) -> Result<()> {
        let mut players = self
            .players
            .write()
            .map_err(|_| LadderError::lock_poisoned("players write"))?;
        let mut tables = self
            .games
            .write()
            .map_err(|_| LadderError::lock_poisoned("games write"))?;
        let mut accounts = self
            .accounts
            .write()
            .map_err(|_| LadderError::lock_poisoned("accounts write"))?;

        if players.remove(&player_id).is_none() {
            return Err(LadderError::PlayerNotFound { player_id }.into());
        }

        let game_ids = tables
            .games_by_player
            .remove(&player_id)
            .unwrap_or_default();

        let mut removed = 0usize;
        for game_id in game_ids {
            let was_processed = tables.processed.contains(&game_id);
            let Some(game) = tables.remove(game_id) else {
                continue;
            };

            // a game survives losing a loser as long as two players remain
            if game.winner() == Some(player_id) {
                removed += 1;
                continue;
            }
            let remaining = game.players().iter().copied().filter(|id| *id != player_id);
            match Game::new(game.id(), game.winner(), remaining) {
                Ok(shrunk) => {
                    tables.insert(shrunk);
                    if was_processed {
                        tables.processed.insert(game_id);
                    }
                }
                Err(_) => removed += 1,
            }
        }

        for account in accounts.values_mut() {
            if account.player_id == Some(player_id) {
                account.player_id = None;
            }
        }

        debug!(player_id, games_removed = removed, "Deleted player");
        Ok(())
    }

    fn players_by_rating(&self) -> Result<Vec<Player>> {
        self.filter_players(|_| true)
    }

    fn search_by_name(&self, fragment: &str) -> Result<Vec<Player>> {
        let needle = fragment.to_lowercase();
        self.filter_players(|p| p.name().to_lowercase().contains(&needle))
    }

    fn players_updated_before(&self, before: DateTime<Utc>) -> Result<Vec<Player>> {
        self.filter_players(|p| p.updated() < before)
    }

    fn players_rated_above(&self, rating: f64) -> Result<Vec<Player>> {
        self.filter_players(|p| p.rating() > rating)
    }

    fn player_count(&self) -> Result<usize> {
        let players = self
            .players
            .read()
            .map_err(|_| LadderError::lock_poisoned("players read"))?;

        Ok(players.len())
    }
}

impl GameRepository for InMemoryStorage {
    fn load_game(&self, game_id: GameId) -> Result<Game> {
        let tables = self
            .games
            .read()
            .map_err(|_| LadderError::lock_poisoned("games read"))?;

        tables
            .games
            .get(&game_id)
            .cloned()
            .ok_or_else(|| LadderError::GameNotFound { game_id }.into())
    }

    fn create_game(&self, game: Game) -> Result<()> {
        let players = self
            .players
            .read()
            .map_err(|_| LadderError::lock_poisoned("players read"))?;
        let mut tables = self
            .games
            .write()
            .map_err(|_| LadderError::lock_poisoned("games write"))?;

        if tables.games.contains_key(&game.id()) {
            return Err(LadderError::DuplicateKey {
                entity: "game",
                key: game.id().to_string(),
            }
            .into());
        }
        if let Some(missing) = game.players().iter().find(|id| !players.contains_key(id)) {
            return Err(LadderError::PlayerNotFound {
                player_id: *missing,
            }
            .into());
        }

        tables.insert(game);
        Ok(())
    }

    fn games_for_player(&self, player_id: PlayerId) -> Result<Vec<Game>> {
        let tables = self
            .games
            .read()
            .map_err(|_| LadderError::lock_poisoned("games read"))?;

        Ok(tables
            .games_by_player
            .get(&player_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| tables.games.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }

    fn draws(&self) -> Result<Vec<Game>> {
        let tables = self
            .games
            .read()
            .map_err(|_| LadderError::lock_poisoned("games read"))?;

        Ok(tables
            .games
            .values()
            .filter(|g| g.is_draw())
            .cloned()
            .collect())
    }

    fn all_games(&self) -> Result<Vec<Game>> {
        let tables = self
            .games
            .read()
            .map_err(|_| LadderError::lock_poisoned("games read"))?;

        Ok(tables.games.values().cloned().collect())
    }

    fn mark_processed(&self, game_id: GameId) -> Result<()> {
        let mut tables = self
            .games
            .write()
            .map_err(|_| LadderError::lock_poisoned("games write"))?;

        if !tables.games.contains_key(&game_id) {
            return Err(LadderError::GameNotFound { game_id }.into());
        }
        if !tables.processed.insert(game_id) {
            return Err(LadderError::GameAlreadyProcessed { game_id }.into());
        }
        Ok(())
    }

    fn is_processed(&self, game_id: GameId) -> Result<bool> {
        let tables = self
            .games
            .read()
            .map_err(|_| LadderError::lock_poisoned("games read"))?;

        Ok(tables.processed.contains(&game_id))
    }
}

impl PatchRepository for InMemoryStorage {
    fn create_patch(&self, patch: Patch) -> Result<()> {
        let mut patches = self
            .patches
            .write()
            .map_err(|_| LadderError::lock_poisoned("patches write"))?;

        if patches.contains_key(&patch.name) {
            return Err(LadderError::DuplicateKey {
                entity: "patch",
                key: patch.name,
            }
            .into());
        }
        patches.insert(patch.name.clone(), patch);
        Ok(())
    }

    fn replace_patch(&self, patch: Patch) -> Result<()> {
        let mut patches = self
            .patches
            .write()
            .map_err(|_| LadderError::lock_poisoned("patches write"))?;

        patches.insert(patch.name.clone(), patch);
        Ok(())
    }

    fn load_patch(&self, name: &str) -> Result<Option<Patch>> {
        let patches = self
            .patches
            .read()
            .map_err(|_| LadderError::lock_poisoned("patches read"))?;

        Ok(patches.get(name).cloned())
    }

    fn list_patches(&self) -> Result<Vec<Patch>> {
        let patches = self
            .patches
            .read()
            .map_err(|_| LadderError::lock_poisoned("patches read"))?;

        let mut list: Vec<Patch> = patches.values().cloned().collect();
        list.sort_by(|a, b| b.updated.cmp(&a.updated).then_with(|| a.name.cmp(&b.name)));
        Ok(list)
    }
}

impl TournamentRepository for InMemoryStorage {
    fn create_tournament(&self, tournament: NewTournament) -> Result<Tournament> {
        tournament.validate()?;

        let mut table = self
            .tournaments
            .write()
            .map_err(|_| LadderError::lock_poisoned("tournaments write"))?;

        if table.by_id.values().any(|t| t.details.path == tournament.path) {
            return Err(LadderError::DuplicateKey {
                entity: "tournament path",
                key: tournament.path,
            }
            .into());
        }

        table.next_id += 1;
        let stored = Tournament {
            id: table.next_id,
            details: tournament,
        };
        table.by_id.insert(stored.id, stored.clone());
        Ok(stored)
    }

    fn load_tournament(&self, tournament_id: TournamentId) -> Result<Option<Tournament>> {
        let table = self
            .tournaments
            .read()
            .map_err(|_| LadderError::lock_poisoned("tournaments read"))?;

        Ok(table.by_id.get(&tournament_id).cloned())
    }

    fn tournaments_by_date(&self) -> Result<Vec<Tournament>> {
        let table = self
            .tournaments
            .read()
            .map_err(|_| LadderError::lock_poisoned("tournaments read"))?;

        let mut list: Vec<Tournament> = table.by_id.values().cloned().collect();
        list.sort_by(|a, b| a.details.date.cmp(&b.details.date).then(a.id.cmp(&b.id)));
        Ok(list)
    }

    fn tournaments_with_winner(&self) -> Result<Vec<Tournament>> {
        Ok(self
            .tournaments_by_date()?
            .into_iter()
            .filter(|t| t.details.winner.is_some())
            .collect())
    }
}

impl AccountRepository for InMemoryStorage {
    fn create_account(&self, account: UberAccount) -> Result<()> {
        let mut accounts = self
            .accounts
            .write()
            .map_err(|_| LadderError::lock_poisoned("accounts write"))?;

        if accounts.contains_key(&account.uber_name) {
            return Err(LadderError::DuplicateKey {
                entity: "uber name",
                key: account.uber_name,
            }
            .into());
        }
        if accounts.values().any(|a| a.uber_id == account.uber_id) {
            return Err(LadderError::DuplicateKey {
                entity: "uber id",
                key: account.uber_id,
            }
            .into());
        }

        accounts.insert(account.uber_name.clone(), account);
        Ok(())
    }

    fn account_by_uber_id(&self, uber_id: &str) -> Result<Option<UberAccount>> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| LadderError::lock_poisoned("accounts read"))?;

        Ok(accounts.values().find(|a| a.uber_id == uber_id).cloned())
    }

    fn account_for_player(&self, player_id: PlayerId) -> Result<Option<UberAccount>> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| LadderError::lock_poisoned("accounts read"))?;

        Ok(accounts
            .values()
            .find(|a| a.player_id == Some(player_id))
            .cloned())
    }

    fn all_accounts(&self) -> Result<Vec<UberAccount>> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| LadderError::lock_poisoned("accounts read"))?;

        Ok(accounts.values().cloned().collect())
    }
}

impl LeaderboardRepository for InMemoryStorage {
    fn replace_snapshot(&self, entries: Vec<LeaderBoardEntry>) -> Result<()> {
        let mut leaderboard = self
            .leaderboard
            .write()
            .map_err(|_| LadderError::lock_poisoned("leaderboard write"))?;

        *leaderboard = entries;
        Ok(())
    }

    fn snapshot(&self) -> Result<Vec<LeaderBoardEntry>> {
        let leaderboard = self
            .leaderboard
            .read()
            .map_err(|_| LadderError::lock_poisoned("leaderboard read"))?;

        Ok(leaderboard.clone())
    }
}
