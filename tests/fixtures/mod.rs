//! Test fixtures for integration testing
#![allow(dead_code)]

use commander_ladder::leaderboard::{LeaderboardProjection, LeaderboardRefresher, LeaguePartition};
use commander_ladder::metrics::MetricsCollector;
use commander_ladder::rating::{
    MatchOutcomeProcessor, RatingCalculator, TrueSkillCalculator, TrueSkillConfig,
};
use commander_ladder::service::{LadderService, Repositories};
use commander_ladder::storage::InMemoryStorage;
use std::sync::Arc;

/// A complete ladder backed by in-memory storage
pub struct TestLadder {
    pub storage: Arc<InMemoryStorage>,
    pub service: Arc<LadderService>,
    pub metrics: Arc<MetricsCollector>,
}

pub fn create_test_ladder() -> TestLadder {
    let calculator = TrueSkillCalculator::new(TrueSkillConfig::default()).unwrap();
    create_ladder_with(Arc::new(calculator), LeaguePartition::default())
}

pub fn create_ladder_with(
    calculator: Arc<dyn RatingCalculator>,
    partition: LeaguePartition,
) -> TestLadder {
    let storage = Arc::new(InMemoryStorage::new());
    let metrics = Arc::new(MetricsCollector::new().unwrap());
    let repos = Repositories {
        players: storage.clone(),
        games: storage.clone(),
        accounts: storage.clone(),
        patches: storage.clone(),
        tournaments: storage.clone(),
        leaderboard: storage.clone(),
    };

    let processor = Arc::new(
        MatchOutcomeProcessor::new(storage.clone(), storage.clone(), calculator)
            .with_metrics(metrics.clone()),
    );
    let refresher = Arc::new(
        LeaderboardRefresher::new(
            storage.clone(),
            storage.clone(),
            storage.clone(),
            LeaderboardProjection::new(partition).unwrap(),
        )
        .with_metrics(metrics.clone()),
    );
    let service = Arc::new(
        LadderService::new(repos, processor, refresher).with_metrics(metrics.clone()),
    );

    TestLadder {
        storage,
        service,
        metrics,
    }
}

/// Register players `ids` named `player_<id>`
pub fn register_players(ladder: &TestLadder, ids: impl IntoIterator<Item = i64>) {
    for id in ids {
        ladder
            .service
            .register_player(id, &format!("player_{}", id))
            .unwrap();
    }
}
