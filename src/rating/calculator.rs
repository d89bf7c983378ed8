//! Rating calculator trait and implementations
//!
//! This module defines the interface the match outcome processor uses to turn
//! a ranked snapshot of skills into updated skills.

use crate::rating::skill::SkillModel;
use crate::types::PlayerId;
use serde::{Deserialize, Serialize};

/// Rating change information for a player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingChange {
    pub player_id: PlayerId,
    pub old_skill: SkillModel,
    pub new_skill: SkillModel,
    pub rank: u32, // 1 = winner; equal ranks are tied
}

impl RatingChange {
    /// Change in conservative rating
    pub fn rating_delta(&self) -> f64 {
        self.new_skill.conservative_rating() - self.old_skill.conservative_rating()
    }
}

/// Result of a rating calculation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingCalculationResult {
    /// Rating changes for all players, in the order they were supplied
    pub rating_changes: Vec<RatingChange>,
    /// Quality score of the match (0.0 to 1.0, higher is more even)
    pub match_quality: f64,
}

impl RatingCalculationResult {
    pub fn change_for(&self, player_id: PlayerId) -> Option<&RatingChange> {
        self.rating_changes
            .iter()
            .find(|change| change.player_id == player_id)
    }
}

/// Trait for calculating rating changes after games
pub trait RatingCalculator: Send + Sync {
    /// Calculate rating changes for players based on game results
    ///
    /// # Arguments
    /// * `players` - List of (player_id, current_skill) pairs, all read before the game is applied
    /// * `rankings` - List of (player_id, rank) pairs where 1 = first place and equal ranks tie
    ///
    /// # Returns
    /// Result containing rating changes and match quality
    fn calculate_rating_changes(
        &self,
        players: &[(PlayerId, SkillModel)],
        rankings: &[(PlayerId, u32)],
    ) -> crate::error::Result<RatingCalculationResult>;

    /// Probability that `player` beats `opponent` in a decisive game
    fn win_probability(&self, player: &SkillModel, opponent: &SkillModel) -> f64;

    /// Get the initial skill for new players
    fn initial_skill(&self) -> SkillModel;

    /// Get current configuration as JSON
    fn config(&self) -> serde_json::Value;
}

/// Mock rating calculator for testing
///
/// Records every call and, unless a fixed shift is configured, leaves skills
/// unchanged.
#[derive(Debug, Default)]
pub struct MockRatingCalculator {
    calculation_calls: std::sync::Mutex<Vec<(Vec<(PlayerId, SkillModel)>, Vec<(PlayerId, u32)>)>>,
    winner_shift: std::sync::RwLock<Option<f64>>,
}

impl MockRatingCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `shift` to the mean of every rank-1 player and subtract it from everyone else
    pub fn set_winner_shift(&self, shift: f64) {
        if let Ok(mut fixed) = self.winner_shift.write() {
            *fixed = Some(shift);
        }
    }

    /// Get all calculation calls made (for testing)
    pub fn get_calculation_calls(
        &self,
    ) -> Vec<(Vec<(PlayerId, SkillModel)>, Vec<(PlayerId, u32)>)> {
        self.calculation_calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

impl RatingCalculator for MockRatingCalculator {
    fn calculate_rating_changes(
        &self,
        players: &[(PlayerId, SkillModel)],
        rankings: &[(PlayerId, u32)],
    ) -> crate::error::Result<RatingCalculationResult> {
        if let Ok(mut calls) = self.calculation_calls.lock() {
            calls.push((players.to_vec(), rankings.to_vec()));
        }

        let shift = self
            .winner_shift
            .read()
            .map(|shift| shift.unwrap_or(0.0))
            .unwrap_or(0.0);

        let mut rating_changes = Vec::with_capacity(players.len());
        for (player_id, skill) in players {
            let rank = rankings
                .iter()
                .find(|(id, _)| id == player_id)
                .map(|(_, rank)| *rank)
                .unwrap_or(1);
            let mu = if rank == 1 {
                skill.mu() + shift
            } else {
                skill.mu() - shift
            };

            rating_changes.push(RatingChange {
                player_id: *player_id,
                old_skill: *skill,
                new_skill: SkillModel::new(mu, skill.sigma())?,
                rank,
            });
        }

        Ok(RatingCalculationResult {
            rating_changes,
            match_quality: 0.8,
        })
    }

    fn win_probability(&self, _player: &SkillModel, _opponent: &SkillModel) -> f64 {
        0.5
    }

    fn initial_skill(&self) -> SkillModel {
        SkillModel::default()
    }

    fn config(&self) -> serde_json::Value {
        serde_json::json!({ "type": "mock" })
    }
}
