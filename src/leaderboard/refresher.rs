//! Scheduled leaderboard rebuilds
//!
//! A rebuild reads a point-in-time copy of all players, projects it and
//! replaces the stored snapshot. It never takes player write locks, so it runs
//! alongside game processing and may lag behind it.

use crate::error::Result;
use crate::leaderboard::projection::{league_sizes, LeaderBoardEntry, LeaderboardProjection};
use crate::metrics::MetricsCollector;
use crate::storage::{AccountRepository, LeaderboardRepository, PlayerRepository};
use crate::types::PlayerId;
use crate::utils::current_timestamp;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Rebuilds and stores the leaderboard
pub struct LeaderboardRefresher {
    players: Arc<dyn PlayerRepository>,
    accounts: Arc<dyn AccountRepository>,
    store: Arc<dyn LeaderboardRepository>,
    projection: LeaderboardProjection,
    metrics: Option<Arc<MetricsCollector>>,
}

impl LeaderboardRefresher {
    pub fn new(
        players: Arc<dyn PlayerRepository>,
        accounts: Arc<dyn AccountRepository>,
        store: Arc<dyn LeaderboardRepository>,
        projection: LeaderboardProjection,
    ) -> Self {
        Self {
            players,
            accounts,
            store,
            projection,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Project the current players and replace the stored snapshot
    pub fn rebuild(&self) -> Result<Vec<LeaderBoardEntry>> {
        let players = self.players.players_by_rating()?;
        let uber_ids: HashMap<PlayerId, String> = self
            .accounts
            .all_accounts()?
            .into_iter()
            .filter_map(|account| account.player_id.map(|pid| (pid, account.uber_id)))
            .collect();

        let now = current_timestamp();
        let entries = self.projection.project(&players, &uber_ids, now);
        self.store.replace_snapshot(entries.clone())?;

        let sizes = league_sizes(&entries);
        if let Some(metrics) = &self.metrics {
            metrics.record_leaderboard_rebuild(&sizes, now.timestamp());
            metrics.set_players_registered(players.len());
        }
        debug!(entries = entries.len(), "Leaderboard league sizes: {:?}", sizes);

        Ok(entries)
    }

    /// Rebuild every `every` while `is_running` stays true
    ///
    /// The first rebuild happens immediately.
    pub fn spawn(self: Arc<Self>, every: Duration, is_running: Arc<RwLock<bool>>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            info!("Leaderboard refresh task started ({}s interval)", every.as_secs());

            while *is_running.read().await {
                interval.tick().await;

                match self.rebuild() {
                    Ok(entries) => {
                        debug!("Leaderboard refreshed with {} entries", entries.len());
                    }
                    Err(e) => {
                        warn!("Leaderboard refresh failed: {}", e);
                    }
                }
            }

            info!("Leaderboard refresh task stopped");
        })
    }
}
