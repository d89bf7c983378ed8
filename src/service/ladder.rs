//! Ladder service facade
//!
//! Ties the repositories, the match outcome processor and the leaderboard
//! together behind the operations callers need.

use crate::error::{LadderError, Result};
use crate::game::{Game, GameRecord};
use crate::leaderboard::{LeaderBoardEntry, LeaderboardRefresher};
use crate::metrics::MetricsCollector;
use crate::player::{rank_position, Player, PlayerRecord, PlayerStats, WinDrawLoss};
use crate::rating::{MatchOutcomeProcessor, ProcessedGame, SkillInput};
use crate::records::{NewTournament, Patch, UberAccount};
use crate::storage::{
    AccountRepository, GameRepository, LeaderboardRepository, PatchRepository, PlayerRepository,
    TournamentRepository,
};
use crate::types::{GameId, PlayerId};
use crate::utils::current_timestamp;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Bulk data accepted by [`LadderService::import`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Dataset {
    pub players: Vec<PlayerRecord>,
    /// Applied in order
    pub games: Vec<GameRecord>,
    pub accounts: Vec<UberAccount>,
    pub patches: Vec<Patch>,
    pub tournaments: Vec<NewTournament>,
}

impl Dataset {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read dataset {}: {}", path.display(), e))?;
        Self::from_json(&text)
    }
}

/// Outcome counts of an import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub players_created: usize,
    pub players_skipped: usize,
    pub games_processed: usize,
    pub games_rejected: usize,
    pub records_created: usize,
    pub records_skipped: usize,
}

/// Repository handles the service works against
#[derive(Clone)]
pub struct Repositories {
    pub players: Arc<dyn PlayerRepository>,
    pub games: Arc<dyn GameRepository>,
    pub accounts: Arc<dyn AccountRepository>,
    pub patches: Arc<dyn PatchRepository>,
    pub tournaments: Arc<dyn TournamentRepository>,
    pub leaderboard: Arc<dyn LeaderboardRepository>,
}

/// High level ladder operations
pub struct LadderService {
    repos: Repositories,
    processor: Arc<MatchOutcomeProcessor>,
    refresher: Arc<LeaderboardRefresher>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl LadderService {
    pub fn new(
        repos: Repositories,
        processor: Arc<MatchOutcomeProcessor>,
        refresher: Arc<LeaderboardRefresher>,
    ) -> Self {
        Self {
            repos,
            processor,
            refresher,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn processor(&self) -> &Arc<MatchOutcomeProcessor> {
        &self.processor
    }

    pub fn refresher(&self) -> &Arc<LeaderboardRefresher> {
        &self.refresher
    }

    /// Register a player with the calculator's initial skill
    pub fn register_player(&self, player_id: PlayerId, name: &str) -> Result<Player> {
        let skill = self.processor.calculator().initial_skill();
        let player = Player::new(player_id, name, skill, current_timestamp());
        self.repos.players.create_player(player.clone())?;

        if let Some(metrics) = &self.metrics {
            metrics.set_players_registered(self.repos.players.player_count()?);
        }
        info!(player_id, "👤 Registered player {}", name);
        Ok(player)
    }

    pub fn load_player(&self, player_id: PlayerId) -> Result<Player> {
        self.repos.players.load_player(player_id)
    }

    /// Create a game and apply its outcome
    ///
    /// An invalid game fails before anything is stored.
    pub fn record_game(
        &self,
        game_id: GameId,
        winner: Option<PlayerId>,
        players: Vec<PlayerId>,
    ) -> Result<ProcessedGame> {
        let game = match Game::new(game_id, winner, players) {
            Ok(game) => game,
            Err(e) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_game_rejected("invalid_game");
                }
                return Err(e);
            }
        };

        self.repos.games.create_game(game.clone())?;
        self.processor.process(&game)
    }

    /// Apply an admin skill override; malformed input is ignored
    pub fn override_skill(&self, player_id: PlayerId, input: &SkillInput) -> Result<bool> {
        self.processor.override_skill(player_id, input)
    }

    pub fn win_draw_loss(&self, player_id: PlayerId) -> Result<WinDrawLoss> {
        let player = self.repos.players.load_player(player_id)?;
        let games = self.repos.games.games_for_player(player_id)?;
        Ok(player.win_draw_loss(&games))
    }

    /// 1-based position among all players by rating
    pub fn rank_position(&self, player_id: PlayerId) -> Result<usize> {
        let players = self.repos.players.players_by_rating()?;
        rank_position(&players, player_id)
            .ok_or_else(|| LadderError::PlayerNotFound { player_id }.into())
    }

    pub fn player_stats(&self, player_id: PlayerId) -> Result<PlayerStats> {
        let player = self.repos.players.load_player(player_id)?;
        let record = player.win_draw_loss(&self.repos.games.games_for_player(player_id)?);
        let rank = self.rank_position(player_id)?;
        Ok(PlayerStats::new(&player, record, rank))
    }

    pub fn win_probability(&self, player_id: PlayerId, opponent_id: PlayerId) -> Result<f64> {
        self.processor.win_probability(player_id, opponent_id)
    }

    /// Delete a player and, by cascade, its game memberships
    pub fn delete_player(&self, player_id: PlayerId) -> Result<()> {
        self.processor.delete_player(player_id)?;
        if let Some(metrics) = &self.metrics {
            metrics.set_players_registered(self.repos.players.player_count()?);
        }
        info!(player_id, "🗑️ Deleted player");
        Ok(())
    }

    pub fn rebuild_leaderboard(&self) -> Result<Vec<LeaderBoardEntry>> {
        self.refresher.rebuild()
    }

    /// Last stored leaderboard snapshot
    pub fn leaderboard(&self) -> Result<Vec<LeaderBoardEntry>> {
        self.repos.leaderboard.snapshot()
    }

    /// Load a dataset: reference records and players first, then games in order
    ///
    /// Records that fail are logged and counted; storage lock failures abort.
    pub fn import(&self, dataset: Dataset) -> Result<ImportSummary> {
        let mut summary = ImportSummary::default();

        for patch in dataset.patches {
            Self::tally(
                self.repos.patches.replace_patch(patch),
                &mut summary.records_created,
                &mut summary.records_skipped,
                "patch",
            )?;
        }
        for tournament in dataset.tournaments {
            Self::tally(
                self.repos.tournaments.create_tournament(tournament).map(|_| ()),
                &mut summary.records_created,
                &mut summary.records_skipped,
                "tournament",
            )?;
        }

        let now = current_timestamp();
        for record in dataset.players {
            Self::tally(
                self.repos.players.create_player(record.into_player(now)),
                &mut summary.players_created,
                &mut summary.players_skipped,
                "player",
            )?;
        }
        for account in dataset.accounts {
            Self::tally(
                self.repos.accounts.create_account(account),
                &mut summary.records_created,
                &mut summary.records_skipped,
                "account",
            )?;
        }

        for record in dataset.games {
            let outcome = Game::try_from(record).and_then(|game| {
                self.repos.games.create_game(game.clone())?;
                self.processor.process(&game)
            });
            Self::tally(
                outcome.map(|_| ()),
                &mut summary.games_processed,
                &mut summary.games_rejected,
                "game",
            )?;
        }

        if let Some(metrics) = &self.metrics {
            metrics.set_players_registered(self.repos.players.player_count()?);
        }
        info!("📥 Import finished: {:?}", summary);
        Ok(summary)
    }

    fn tally(
        outcome: Result<()>,
        ok: &mut usize,
        skipped: &mut usize,
        what: &str,
    ) -> Result<()> {
        match outcome {
            Ok(()) => *ok += 1,
            Err(e) => match e.downcast_ref::<LadderError>() {
                Some(LadderError::InternalError { .. }) => return Err(e),
                _ => {
                    warn!("Skipping {}: {}", what, e);
                    *skipped += 1;
                }
            },
        }
        Ok(())
    }
}
