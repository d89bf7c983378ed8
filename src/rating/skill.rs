//! Gaussian skill belief for a single player
//!
//! A player's skill is a normal distribution `(mu, sigma)`. The sortable
//! scalar used everywhere else is the conservative rating `mu - 3 * sigma`.

use crate::error::{LadderError, Result};
use serde::{Deserialize, Serialize};

/// Prior mean for a freshly registered player
pub const DEFAULT_MU: f64 = 25.0;

/// Prior standard deviation for a freshly registered player
pub const DEFAULT_SIGMA: f64 = DEFAULT_MU / 3.0;

/// Number of standard deviations subtracted from the mean
pub const CONSERVATIVE_K: f64 = 3.0;

/// Conservative rating of a `(mu, sigma)` pair
pub fn conservative_rating(mu: f64, sigma: f64) -> f64 {
    mu - CONSERVATIVE_K * sigma
}

/// Skill belief of a player
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkillModel {
    mu: f64,
    sigma: f64,
}

impl SkillModel {
    /// Create a skill model, rejecting non-finite values and non-positive sigma
    pub fn new(mu: f64, sigma: f64) -> Result<Self> {
        if !mu.is_finite() || !sigma.is_finite() || sigma <= 0.0 {
            return Err(LadderError::RatingCalculationFailed {
                reason: format!("invalid skill pair mu={} sigma={}", mu, sigma),
            }
            .into());
        }
        Ok(Self { mu, sigma })
    }

    pub fn mu(&self) -> f64 {
        self.mu
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Sortable scalar derived from this belief
    pub fn conservative_rating(&self) -> f64 {
        conservative_rating(self.mu, self.sigma)
    }
}

impl Default for SkillModel {
    fn default() -> Self {
        Self {
            mu: DEFAULT_MU,
            sigma: DEFAULT_SIGMA,
        }
    }
}

impl std::fmt::Display for SkillModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "N({:.3}, {:.3})", self.mu, self.sigma)
    }
}

/// Skill pair coming from outside the engine (admin override, imports)
///
/// Either field may be missing or malformed; [`SkillInput::to_skill`] only
/// yields a model when both are usable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillInput {
    #[serde(default)]
    pub mu: Option<f64>,
    #[serde(default)]
    pub sigma: Option<f64>,
}

impl SkillInput {
    pub fn new(mu: f64, sigma: f64) -> Self {
        Self {
            mu: Some(mu),
            sigma: Some(sigma),
        }
    }

    /// Read `mu` and `sigma` from a JSON object, tolerating anything
    pub fn from_json(value: &serde_json::Value) -> Self {
        Self {
            mu: value.get("mu").and_then(|v| v.as_f64()),
            sigma: value.get("sigma").and_then(|v| v.as_f64()),
        }
    }

    /// The skill model this input describes, if it is well-formed
    pub fn to_skill(&self) -> Option<SkillModel> {
        match (self.mu, self.sigma) {
            (Some(mu), Some(sigma)) => SkillModel::new(mu, sigma).ok(),
            _ => None,
        }
    }
}

impl From<SkillModel> for SkillInput {
    fn from(skill: SkillModel) -> Self {
        Self::new(skill.mu, skill.sigma)
    }
}

impl From<SkillModel> for skillratings::trueskill::TrueSkillRating {
    fn from(skill: SkillModel) -> Self {
        Self {
            rating: skill.mu,
            uncertainty: skill.sigma,
        }
    }
}

impl TryFrom<skillratings::trueskill::TrueSkillRating> for SkillModel {
    type Error = anyhow::Error;

    fn try_from(rating: skillratings::trueskill::TrueSkillRating) -> Result<Self> {
        SkillModel::new(rating.rating, rating.uncertainty)
    }
}
