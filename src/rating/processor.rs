//! Match outcome processor
//!
//! Applies a finished game to the skills of its players. For one game the
//! processor:
//!
//! 1. takes the write lock of every participant, in ascending id order
//! 2. reads all current skills as one snapshot
//! 3. asks the [`RatingCalculator`] for the whole group's new skills
//! 4. writes every player back in a single `save_players` batch
//! 5. marks the game as processed
//!
//! Games that share a player are serialized by step 1; games with disjoint
//! players run in parallel. Skill overrides and player deletion take the same
//! per-player lock.

use crate::error::{LadderError, Result};
use crate::game::Game;
use crate::metrics::MetricsCollector;
use crate::player::Player;
use crate::rating::calculator::{RatingCalculator, RatingChange};
use crate::rating::skill::SkillInput;
use crate::storage::{GameRepository, PlayerRepository};
use crate::types::{GameId, OutcomeKind, PlayerId};
use crate::utils::current_timestamp;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Summary of one applied game
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedGame {
    pub game_id: GameId,
    pub outcome: OutcomeKind,
    pub match_quality: f64,
    pub changes: Vec<RatingChange>,
}

/// Per-player write locks
#[derive(Debug, Default)]
struct PlayerLocks {
    locks: Mutex<HashMap<PlayerId, Arc<Mutex<()>>>>,
}

impl PlayerLocks {
    /// Lock handles for `player_ids`, which must be sorted ascending
    fn handles(&self, player_ids: &[PlayerId]) -> Result<Vec<Arc<Mutex<()>>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| LadderError::lock_poisoned("player lock table"))?;

        Ok(player_ids
            .iter()
            .map(|id| locks.entry(*id).or_default().clone())
            .collect())
    }

    /// Drop the entry for `player_id` unless a handle is still out
    fn forget(&self, player_id: PlayerId) -> Result<()> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| LadderError::lock_poisoned("player lock table"))?;

        if locks
            .get(&player_id)
            .is_some_and(|handle| Arc::strong_count(handle) == 1)
        {
            locks.remove(&player_id);
        }
        Ok(())
    }
}

/// Applies game outcomes to player skills
pub struct MatchOutcomeProcessor {
    players: Arc<dyn PlayerRepository>,
    games: Arc<dyn GameRepository>,
    calculator: Arc<dyn RatingCalculator>,
    metrics: Option<Arc<MetricsCollector>>,
    locks: PlayerLocks,
}

impl MatchOutcomeProcessor {
    pub fn new(
        players: Arc<dyn PlayerRepository>,
        games: Arc<dyn GameRepository>,
        calculator: Arc<dyn RatingCalculator>,
    ) -> Self {
        Self {
            players,
            games,
            calculator,
            metrics: None,
            locks: PlayerLocks::default(),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn calculator(&self) -> &Arc<dyn RatingCalculator> {
        &self.calculator
    }

    /// Apply `game` to its players' skills
    ///
    /// Storage errors are returned unchanged. Nothing is written unless the
    /// whole group was rated.
    pub fn process(&self, game: &Game) -> Result<ProcessedGame> {
        let result = self.process_locked(game);

        if let Err(e) = &result {
            let reason = match e.downcast_ref::<LadderError>() {
                Some(LadderError::GameAlreadyProcessed { .. }) => "already_processed",
                Some(LadderError::PlayerNotFound { .. }) => "player_not_found",
                Some(LadderError::RatingCalculationFailed { .. }) => "calculation_failed",
                _ => "storage_error",
            };
            warn!(game_id = game.id(), reason, "Game not applied: {}", e);
            if let Some(metrics) = &self.metrics {
                metrics.record_game_rejected(reason);
            }
        }

        result
    }

    /// Load a stored game and apply it
    pub fn process_by_id(&self, game_id: GameId) -> Result<ProcessedGame> {
        let game = self.games.load_game(game_id)?;
        self.process(&game)
    }

    /// Probability that `player_id` beats `opponent_id` given current skills
    pub fn win_probability(&self, player_id: PlayerId, opponent_id: PlayerId) -> Result<f64> {
        let player = self.players.load_player(player_id)?;
        let opponent = self.players.load_player(opponent_id)?;
        Ok(self
            .calculator
            .win_probability(&player.skill(), &opponent.skill()))
    }

    /// Admin override of one player's skill
    ///
    /// Returns `Ok(false)` without writing when `input` is malformed.
    pub fn override_skill(&self, player_id: PlayerId, input: &SkillInput) -> Result<bool> {
        let handles = self.locks.handles(&[player_id])?;
        let _guard = handles[0]
            .lock()
            .map_err(|_| LadderError::lock_poisoned("player write"))?;

        let mut player = self.players.load_player(player_id)?;
        if !player.set_skill(input, current_timestamp()) {
            warn!(player_id, "Ignoring malformed skill override {:?}", input);
            return Ok(false);
        }

        self.players.save_player(&player)?;
        info!(player_id, "Skill overridden to {}", player.skill());
        Ok(true)
    }

    /// Delete a player while holding its write lock
    ///
    /// Waits for any game in flight for the player to finish.
    pub fn delete_player(&self, player_id: PlayerId) -> Result<()> {
        let deleted = {
            let handles = self.locks.handles(&[player_id])?;
            let _guard = handles[0]
                .lock()
                .map_err(|_| LadderError::lock_poisoned("player write"))?;
            self.players.delete_player(player_id)
        };

        self.locks.forget(player_id)?;
        deleted
    }

    fn process_locked(&self, game: &Game) -> Result<ProcessedGame> {
        let handles = self.locks.handles(game.players())?;
        let mut guards = Vec::with_capacity(handles.len());
        for handle in &handles {
            guards.push(
                handle
                    .lock()
                    .map_err(|_| LadderError::lock_poisoned("player write"))?,
            );
        }

        if self.games.is_processed(game.id())? {
            return Err(LadderError::GameAlreadyProcessed { game_id: game.id() }.into());
        }

        let mut snapshot: Vec<Player> = game
            .players()
            .iter()
            .map(|id| self.players.load_player(*id))
            .collect::<Result<_>>()?;
        let skills: Vec<_> = snapshot.iter().map(|p| (p.id(), p.skill())).collect();

        let timer = self.metrics.as_ref().map(|m| m.start_timer());
        let result = self
            .calculator
            .calculate_rating_changes(&skills, &game.ranks())?;
        if let (Some(metrics), Some(timer)) = (&self.metrics, timer) {
            metrics.record_rating_calculation(timer.stop());
        }

        let now = current_timestamp();
        for player in &mut snapshot {
            let change = result.change_for(player.id()).ok_or_else(|| {
                LadderError::RatingCalculationFailed {
                    reason: format!("no rating change returned for player {}", player.id()),
                }
            })?;
            player.apply_skill(change.new_skill, now);
        }

        self.players.save_players(&snapshot)?;
        self.games.mark_processed(game.id())?;

        for change in &result.rating_changes {
            debug!(
                game_id = game.id(),
                player_id = change.player_id,
                delta = change.rating_delta(),
                "{} -> {}",
                change.old_skill,
                change.new_skill
            );
        }
        info!(
            game_id = game.id(),
            outcome = %game.outcome_kind(),
            players = game.players().len(),
            match_quality = result.match_quality,
            "🎲 Applied {}",
            game
        );

        if let Some(metrics) = &self.metrics {
            metrics.record_game_processed(game.outcome_kind(), result.match_quality);
        }

        Ok(ProcessedGame {
            game_id: game.id(),
            outcome: game.outcome_kind(),
            match_quality: result.match_quality,
            changes: result.rating_changes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rating::calculator::MockRatingCalculator;
    use crate::rating::skill::SkillModel;
    use crate::rating::trueskill::{TrueSkillCalculator, TrueSkillConfig};
    use crate::storage::players::{MockGameRepository, MockPlayerRepository};
    use crate::storage::InMemoryStorage;

    fn seeded_storage(n: PlayerId) -> Arc<InMemoryStorage> {
        let storage = Arc::new(InMemoryStorage::new());
        for id in 0..n {
            storage
                .create_player(Player::register(id, format!("p{}", id), current_timestamp()))
                .unwrap();
        }
        storage
    }

    fn trueskill_processor(storage: &Arc<InMemoryStorage>) -> MatchOutcomeProcessor {
        MatchOutcomeProcessor::new(
            storage.clone(),
            storage.clone(),
            Arc::new(TrueSkillCalculator::new(TrueSkillConfig::default()).unwrap()),
        )
    }

    fn error_of(err: anyhow::Error) -> LadderError {
        err.downcast::<LadderError>().unwrap()
    }

    #[test]
    fn test_decisive_game_updates_both_players() {
        let storage = seeded_storage(2);
        let processor = trueskill_processor(&storage);
        let game = Game::new(1, Some(0), vec![0, 1]).unwrap();
        storage.create_game(game.clone()).unwrap();

        let processed = processor.process(&game).unwrap();
        assert_eq!(processed.outcome, OutcomeKind::Decisive);
        assert_eq!(processed.changes.len(), 2);

        let winner = storage.load_player(0).unwrap();
        let loser = storage.load_player(1).unwrap();
        assert!(winner.rating() > loser.rating());
        assert!(winner.rating() > 0.0);
        assert!(loser.rating() < 0.0);
        assert!((winner.mu() - 29.396).abs() < 1e-2);
        assert_eq!(winner.rating(), winner.skill().conservative_rating());
        assert!(storage.is_processed(1).unwrap());
    }

    #[test]
    fn test_game_is_only_applied_once() {
        let storage = seeded_storage(2);
        let metrics = Arc::new(MetricsCollector::new().unwrap());
        let processor = trueskill_processor(&storage).with_metrics(metrics.clone());
        let game = Game::new(1, None, vec![0, 1]).unwrap();
        storage.create_game(game.clone()).unwrap();

        processor.process(&game).unwrap();
        let after_first = storage.load_player(0).unwrap();

        let err = processor.process_by_id(1).unwrap_err();
        assert_eq!(error_of(err), LadderError::GameAlreadyProcessed { game_id: 1 });
        assert_eq!(storage.load_player(0).unwrap(), after_first);
        assert_eq!(
            metrics
                .rating()
                .games_rejected_total
                .with_label_values(&["already_processed"])
                .get(),
            1
        );
        assert_eq!(
            metrics
                .rating()
                .games_processed_total
                .with_label_values(&["draw"])
                .get(),
            1
        );
    }

    #[test]
    fn test_free_for_all_uses_one_snapshot() {
        let storage = seeded_storage(4);
        let calculator = Arc::new(MockRatingCalculator::new());
        calculator.set_winner_shift(1.0);
        let processor =
            MatchOutcomeProcessor::new(storage.clone(), storage.clone(), calculator.clone());

        let mut seeded = storage.load_player(3).unwrap();
        seeded.set_skill(&SkillInput::new(30.0, 4.0), current_timestamp());
        storage.save_player(&seeded).unwrap();

        let game = Game::new(9, Some(2), vec![0, 1, 2, 3]).unwrap();
        storage.create_game(game.clone()).unwrap();
        processor.process(&game).unwrap();

        let calls = calculator.get_calculation_calls();
        assert_eq!(calls.len(), 1);
        let (skills, ranks) = &calls[0];
        assert_eq!(skills.len(), 4);
        assert_eq!(skills[3], (3, SkillModel::new(30.0, 4.0).unwrap()));
        assert!(skills[..3].iter().all(|(_, s)| *s == SkillModel::default()));
        assert_eq!(ranks, &vec![(0, 2), (1, 2), (2, 1), (3, 2)]);

        assert_eq!(storage.load_player(2).unwrap().mu(), 26.0);
        assert_eq!(storage.load_player(3).unwrap().mu(), 29.0);
        assert_eq!(storage.load_player(0).unwrap().mu(), 24.0);
    }

    #[test]
    fn test_win_probability() {
        let storage = seeded_storage(2);
        let processor = trueskill_processor(&storage);
        let mut strong = storage.load_player(0).unwrap();
        strong.set_skill(&SkillInput::new(40.0, 2.0), current_timestamp());
        storage.save_player(&strong).unwrap();

        assert!(processor.win_probability(0, 1).unwrap() > 0.5);
        assert!(processor.win_probability(1, 0).unwrap() < 0.5);
        assert!(processor.win_probability(0, 5).is_err());
    }

    #[test]
    fn test_missing_player_propagates_and_writes_nothing() {
        let mut players = MockPlayerRepository::new();
        let mut games = MockGameRepository::new();

        games.expect_is_processed().returning(|_| Ok(false));
        games.expect_mark_processed().times(0);
        players.expect_load_player().returning(|id| {
            if id == 1 {
                Err(LadderError::PlayerNotFound { player_id: id }.into())
            } else {
                Ok(Player::register(id, "x", current_timestamp()))
            }
        });
        players.expect_save_players().times(0);

        let processor = MatchOutcomeProcessor::new(
            Arc::new(players),
            Arc::new(games),
            Arc::new(MockRatingCalculator::new()),
        );
        let game = Game::new(5, Some(0), vec![0, 1]).unwrap();

        let err = processor.process(&game).unwrap_err();
        assert_eq!(error_of(err), LadderError::PlayerNotFound { player_id: 1 });
    }

    #[test]
    fn test_save_failure_propagates_unmodified() {
        let mut players = MockPlayerRepository::new();
        let mut games = MockGameRepository::new();

        games.expect_is_processed().returning(|_| Ok(false));
        games.expect_mark_processed().times(0);
        players
            .expect_load_player()
            .returning(|id| Ok(Player::register(id, "x", current_timestamp())));
        players.expect_save_players().times(1).returning(|_| {
            Err(LadderError::InternalError {
                message: "disk full".to_string(),
            }
            .into())
        });

        let processor = MatchOutcomeProcessor::new(
            Arc::new(players),
            Arc::new(games),
            Arc::new(MockRatingCalculator::new()),
        );
        let game = Game::new(5, None, vec![0, 1]).unwrap();

        let err = processor.process(&game).unwrap_err();
        assert_eq!(
            error_of(err),
            LadderError::InternalError {
                message: "disk full".to_string()
            }
        );
    }

    #[test]
    fn test_saved_batch_carries_consistent_ratings() {
        let mut players = MockPlayerRepository::new();
        let mut games = MockGameRepository::new();

        games.expect_is_processed().returning(|_| Ok(false));
        games.expect_mark_processed().times(1).returning(|_| Ok(()));
        players
            .expect_load_player()
            .returning(|id| Ok(Player::register(id, "x", current_timestamp())));
        players
            .expect_save_players()
            .withf(|batch| {
                batch.len() == 3
                    && batch
                        .iter()
                        .all(|p| p.rating() == p.skill().conservative_rating())
            })
            .times(1)
            .returning(|_| Ok(()));

        let processor = MatchOutcomeProcessor::new(
            Arc::new(players),
            Arc::new(games),
            Arc::new(TrueSkillCalculator::new(TrueSkillConfig::default()).unwrap()),
        );
        let game = Game::new(5, Some(2), vec![0, 1, 2]).unwrap();

        let processed = processor.process(&game).unwrap();
        assert_eq!(processed.outcome, OutcomeKind::FreeForAll);
    }

    #[test]
    fn test_override_skill() {
        let storage = seeded_storage(1);
        let processor = trueskill_processor(&storage);
        let before = storage.load_player(0).unwrap();

        assert!(!processor
            .override_skill(0, &SkillInput { mu: Some(10.0), sigma: None })
            .unwrap());
        assert_eq!(storage.load_player(0).unwrap(), before);

        assert!(processor.override_skill(0, &SkillInput::new(50.0, 4.0)).unwrap());
        let after = storage.load_player(0).unwrap();
        assert_eq!(after.rating(), 38.0);

        let err = processor
            .override_skill(3, &SkillInput::new(50.0, 4.0))
            .unwrap_err();
        assert_eq!(error_of(err), LadderError::PlayerNotFound { player_id: 3 });
    }

    #[test]
    fn test_delete_player_waits_for_player_lock() {
        let storage = seeded_storage(2);
        let processor = trueskill_processor(&storage);

        let handles = processor.locks.handles(&[0]).unwrap();
        let guard = handles[0].lock().unwrap();
        std::thread::scope(|s| {
            let deleter = s.spawn(|| processor.delete_player(0));
            std::thread::sleep(std::time::Duration::from_millis(50));
            assert!(storage.load_player(0).is_ok());

            drop(guard);
            deleter.join().unwrap().unwrap();
        });

        assert!(storage.load_player(0).is_err());
        assert!(storage.load_player(1).is_ok());
    }

    #[test]
    fn test_delete_player_keeps_lock_entry_while_handle_is_out() {
        let storage = seeded_storage(2);
        let processor = trueskill_processor(&storage);

        let held = processor.locks.handles(&[0]).unwrap();
        processor.delete_player(0).unwrap();
        let again = processor.locks.handles(&[0]).unwrap();
        assert!(Arc::ptr_eq(&held[0], &again[0]));

        processor.delete_player(1).unwrap();
        assert!(!processor.locks.locks.lock().unwrap().contains_key(&1));

        let err = processor.delete_player(1).unwrap_err();
        assert_eq!(error_of(err), LadderError::PlayerNotFound { player_id: 1 });
        assert!(!processor.locks.locks.lock().unwrap().contains_key(&1));
    }
}
