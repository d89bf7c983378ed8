//! Main application state and service coordination
//!
//! This module contains the AppState that wires storage, the rating
//! calculator, the match outcome processor and the leaderboard refresher
//! together and owns the background tasks.

use crate::config::AppConfig;
use crate::leaderboard::{LeaderboardProjection, LeaderboardRefresher};
use crate::metrics::MetricsCollector;
use crate::rating::{MatchOutcomeProcessor, TrueSkillCalculator};
use crate::service::ladder::{LadderService, Repositories};
use crate::storage::InMemoryStorage;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{debug, info};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },
}

/// Main application state containing all service components
pub struct AppState {
    /// Application configuration
    config: AppConfig,

    /// Ladder operations
    service: Arc<LadderService>,

    /// Shared metrics collector
    metrics: Arc<MetricsCollector>,

    /// Background task handles
    background_tasks: Vec<JoinHandle<()>>,

    /// Service status
    is_running: Arc<RwLock<bool>>,
}

impl AppState {
    /// Initialize the application with all dependencies
    pub fn new(config: AppConfig) -> Result<Self, ServiceError> {
        info!("Initializing commander-ladder service");
        info!(
            "Configuration: service={}, beta={:.3}, dynamics={:.4}, draw_probability={:.2}",
            config.service.name,
            config.rating.beta,
            config.rating.dynamics,
            config.rating.draw_probability
        );

        let metrics = Arc::new(MetricsCollector::new().map_err(|e| {
            ServiceError::Initialization {
                message: format!("Failed to create metrics collector: {}", e),
            }
        })?);

        let service = Arc::new(Self::initialize_ladder(&config, metrics.clone())?);

        Ok(Self {
            config,
            service,
            metrics,
            background_tasks: Vec::new(),
            is_running: Arc::new(RwLock::new(false)),
        })
    }

    fn initialize_ladder(
        config: &AppConfig,
        metrics: Arc<MetricsCollector>,
    ) -> Result<LadderService, ServiceError> {
        let storage = Arc::new(InMemoryStorage::new());
        let repos = Repositories {
            players: storage.clone(),
            games: storage.clone(),
            accounts: storage.clone(),
            patches: storage.clone(),
            tournaments: storage.clone(),
            leaderboard: storage.clone(),
        };

        let calculator = Arc::new(TrueSkillCalculator::new(config.rating.clone()).map_err(
            |e| ServiceError::Configuration {
                message: format!("Failed to initialize rating calculator: {}", e),
            },
        )?);
        let processor = Arc::new(
            MatchOutcomeProcessor::new(repos.players.clone(), repos.games.clone(), calculator)
                .with_metrics(metrics.clone()),
        );

        let projection = LeaderboardProjection::new(config.leaderboard.partition.clone())
            .map_err(|e| ServiceError::Configuration {
                message: format!("Invalid league partition: {}", e),
            })?;
        let refresher = Arc::new(
            LeaderboardRefresher::new(
                repos.players.clone(),
                repos.accounts.clone(),
                repos.leaderboard.clone(),
                projection,
            )
            .with_metrics(metrics.clone()),
        );

        Ok(LadderService::new(repos, processor, refresher).with_metrics(metrics))
    }

    /// Start the leaderboard refresher and the uptime task
    pub async fn start(&mut self) -> Result<(), ServiceError> {
        info!("Starting commander-ladder service");

        *self.is_running.write().await = true;

        let refresh_interval = self.config.leaderboard_refresh_interval();
        info!(
            "Starting leaderboard refresh task ({}s interval)...",
            refresh_interval.as_secs()
        );
        let refresh_task = self
            .service
            .refresher()
            .clone()
            .spawn(refresh_interval, self.is_running.clone());

        let uptime_task = {
            let metrics = self.metrics.clone();
            let is_running = self.is_running.clone();

            tokio::spawn(async move {
                let mut interval = tokio::time::interval(Duration::from_secs(60));
                let start_time = tokio::time::Instant::now();

                while *is_running.read().await {
                    interval.tick().await;
                    let uptime = start_time.elapsed();
                    metrics.set_uptime(uptime);
                    debug!("Updated service uptime: {}s", uptime.as_secs());
                }
            })
        };

        self.background_tasks.push(refresh_task);
        self.background_tasks.push(uptime_task);

        info!("✅ Commander-ladder service started successfully");
        Ok(())
    }

    /// Perform graceful shutdown
    pub async fn shutdown(&mut self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown of commander-ladder service");

        *self.is_running.write().await = false;
        self.stop_background_tasks().await;

        info!("✅ Commander-ladder service shutdown completed");
        Ok(())
    }

    /// Get service configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Check if service is running
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    pub fn service(&self) -> Arc<LadderService> {
        self.service.clone()
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    /// Stop all background tasks
    async fn stop_background_tasks(&mut self) {
        let task_count = self.background_tasks.len();
        if task_count == 0 {
            info!("No background tasks to stop");
            return;
        }

        info!("Stopping {} background tasks...", task_count);

        for (i, task) in self.background_tasks.drain(..).enumerate() {
            debug!("Aborting background task {}/{}", i + 1, task_count);
            task.abort();
        }

        tokio::time::sleep(std::time::Duration::from_millis(500)).await;

        info!("✅ All {} background tasks stopped", task_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaderboard::LeaguePartition;

    #[test]
    fn test_new_wires_service() {
        let state = AppState::new(AppConfig::default()).unwrap();
        let service = state.service();

        service.register_player(1, "alpha").unwrap();
        service.register_player(2, "beta").unwrap();
        service.record_game(1, Some(2), vec![1, 2]).unwrap();

        assert_eq!(service.rank_position(2).unwrap(), 1);
        let rendered = state.metrics().render().unwrap();
        assert!(rendered.contains("commander_ladder_games_processed_total"));
    }

    #[test]
    fn test_new_rejects_bad_partition() {
        let mut config = AppConfig::default();
        config.leaderboard.partition = LeaguePartition::Threshold {
            uber: 1.0,
            platinum: 2.0,
            gold: 3.0,
            silver: 4.0,
        };
        assert!(matches!(
            AppState::new(config),
            Err(ServiceError::Configuration { .. })
        ));
    }

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let mut state = AppState::new(AppConfig::default()).unwrap();
        state.service().register_player(1, "alpha").unwrap();

        state.start().await.unwrap();
        assert!(state.is_running().await);

        // first refresh runs right away
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(state.service().leaderboard().unwrap().len(), 1);

        state.shutdown().await.unwrap();
        assert!(!state.is_running().await);
    }
}
