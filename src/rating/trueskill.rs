//! TrueSkill rating system implementation
//!
//! This module provides the production rating calculator on top of the
//! skillratings crate. Every participant is rated as a single-player team.

use crate::error::{LadderError, Result};
use crate::rating::calculator::{RatingCalculationResult, RatingCalculator, RatingChange};
use crate::rating::skill::{SkillModel, DEFAULT_MU, DEFAULT_SIGMA};
use crate::types::PlayerId;
use serde::{Deserialize, Serialize};
use skillratings::trueskill::{
    expected_score, match_quality_multi_team, trueskill_multi_team, TrueSkillRating,
};
use skillratings::MultiTeamOutcome;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Configuration for the TrueSkill rating system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrueSkillConfig {
    /// Prior mean for new players
    pub initial_mu: f64,
    /// Prior standard deviation for new players
    pub initial_sigma: f64,
    /// Performance noise; the skill gap that gives ~76% win chance
    pub beta: f64,
    /// Additive sigma applied before every game
    ///
    /// The posterior sigma is capped at the pre-game sigma, so this only
    /// slows down how fast a belief narrows.
    pub dynamics: f64,
    /// Probability that two evenly matched players draw
    pub draw_probability: f64,
}

impl Default for TrueSkillConfig {
    fn default() -> Self {
        Self {
            initial_mu: DEFAULT_MU,
            initial_sigma: DEFAULT_SIGMA,
            beta: DEFAULT_SIGMA / 2.0,
            dynamics: DEFAULT_SIGMA / 100.0,
            draw_probability: 0.10,
        }
    }
}

impl TrueSkillConfig {
    /// Create conservative configuration (slower rating changes)
    pub fn conservative() -> Self {
        Self {
            beta: DEFAULT_SIGMA * 0.75,
            dynamics: 0.0,
            ..Self::default()
        }
    }

    /// Create aggressive configuration (faster rating changes)
    pub fn aggressive() -> Self {
        Self {
            beta: DEFAULT_SIGMA / 3.0,
            dynamics: DEFAULT_SIGMA / 30.0,
            ..Self::default()
        }
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        let fail = |message: &str| -> Result<()> {
            Err(LadderError::ConfigurationError {
                message: message.to_string(),
            }
            .into())
        };

        if !self.initial_mu.is_finite() {
            return fail("Initial mu must be finite");
        }
        if !(self.initial_sigma > 0.0 && self.initial_sigma.is_finite()) {
            return fail("Initial sigma must be positive");
        }
        if !(self.beta > 0.0 && self.beta.is_finite()) {
            return fail("Beta must be positive");
        }
        if !(self.dynamics >= 0.0 && self.dynamics.is_finite()) {
            return fail("Dynamics must be non-negative");
        }
        if !(self.draw_probability > 0.0 && self.draw_probability < 1.0) {
            return fail("Draw probability must be in (0, 1)");
        }

        Ok(())
    }

    fn skillratings_config(&self) -> skillratings::trueskill::TrueSkillConfig {
        skillratings::trueskill::TrueSkillConfig {
            draw_probability: self.draw_probability,
            beta: self.beta,
            default_dynamics: self.dynamics,
        }
    }
}

/// TrueSkill rating calculator implementation
#[derive(Debug)]
pub struct TrueSkillCalculator {
    config: TrueSkillConfig,
}

impl TrueSkillCalculator {
    /// Create a new TrueSkill rating calculator
    pub fn new(config: TrueSkillConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self { config })
    }

    /// Get quality score for a match (0.0 to 1.0, higher is better)
    ///
    /// Draw probability of the whole game with every player as its own team.
    pub fn calculate_match_quality(&self, skills: &[SkillModel]) -> f64 {
        if skills.len() < 2 {
            return 0.0;
        }

        let teams: Vec<[TrueSkillRating; 1]> = skills.iter().map(|s| [(*s).into()]).collect();
        let team_refs: Vec<&[TrueSkillRating]> = teams.iter().map(|t| t.as_slice()).collect();

        match_quality_multi_team(&team_refs, &self.config.skillratings_config()).clamp(0.0, 1.0)
    }
}

impl RatingCalculator for TrueSkillCalculator {
    fn calculate_rating_changes(
        &self,
        players: &[(PlayerId, SkillModel)],
        rankings: &[(PlayerId, u32)], // (player_id, rank) where 1 = first place
    ) -> Result<RatingCalculationResult> {
        if players.len() < 2 {
            return Err(LadderError::RatingCalculationFailed {
                reason: format!("need at least 2 players, got {}", players.len()),
            }
            .into());
        }

        let ranking_map: HashMap<PlayerId, u32> = rankings.iter().cloned().collect();
        let mut seen = HashSet::with_capacity(players.len());
        for (player_id, _) in players {
            if !seen.insert(*player_id) {
                return Err(LadderError::RatingCalculationFailed {
                    reason: format!("player {} appears twice", player_id),
                }
                .into());
            }
            if !ranking_map.contains_key(player_id) {
                return Err(LadderError::RatingCalculationFailed {
                    reason: format!("no ranking provided for player {}", player_id),
                }
                .into());
            }
        }

        // Tied players are chained in id order so the result never depends on input order
        let mut order: Vec<usize> = (0..players.len()).collect();
        order.sort_by_key(|&i| (ranking_map[&players[i].0], players[i].0));

        let teams: Vec<([TrueSkillRating; 1], MultiTeamOutcome)> = order
            .iter()
            .map(|&i| {
                let (player_id, skill) = players[i];
                (
                    [skill.into()],
                    MultiTeamOutcome::new(ranking_map[&player_id] as usize),
                )
            })
            .collect();
        let team_refs: Vec<(&[TrueSkillRating], MultiTeamOutcome)> = teams
            .iter()
            .map(|(team, outcome)| (team.as_slice(), *outcome))
            .collect();

        let updated = trueskill_multi_team(&team_refs, &self.config.skillratings_config());
        if updated.len() != players.len() {
            return Err(LadderError::RatingCalculationFailed {
                reason: format!(
                    "expected {} rated teams, got {}",
                    players.len(),
                    updated.len()
                ),
            }
            .into());
        }

        let mut new_skills = vec![SkillModel::default(); players.len()];
        for (team, &index) in updated.iter().zip(&order) {
            let old_skill = players[index].1;
            let rating = team.first().ok_or_else(|| LadderError::RatingCalculationFailed {
                reason: format!("empty team returned for player {}", players[index].0),
            })?;
            new_skills[index] =
                SkillModel::new(rating.rating, rating.uncertainty.min(old_skill.sigma()))?;
        }

        let rating_changes: Vec<RatingChange> = players
            .iter()
            .zip(new_skills)
            .map(|((player_id, old_skill), new_skill)| RatingChange {
                player_id: *player_id,
                old_skill: *old_skill,
                new_skill,
                rank: ranking_map[player_id],
            })
            .collect();

        for change in &rating_changes {
            debug!(
                player_id = change.player_id,
                rank = change.rank,
                "{} -> {}",
                change.old_skill,
                change.new_skill
            );
        }

        let snapshot: Vec<SkillModel> = players.iter().map(|(_, skill)| *skill).collect();
        Ok(RatingCalculationResult {
            rating_changes,
            match_quality: self.calculate_match_quality(&snapshot),
        })
    }

    fn win_probability(&self, player: &SkillModel, opponent: &SkillModel) -> f64 {
        let (win, _loss) = expected_score(
            &TrueSkillRating::from(*player),
            &TrueSkillRating::from(*opponent),
            &self.config.skillratings_config(),
        );
        win
    }

    fn initial_skill(&self) -> SkillModel {
        SkillModel::new(self.config.initial_mu, self.config.initial_sigma).unwrap_or_default()
    }

    fn config(&self) -> serde_json::Value {
        serde_json::to_value(&self.config).unwrap_or(serde_json::Value::Null)
    }
}
