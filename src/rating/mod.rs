//! Skill rating using the TrueSkill algorithm
//!
//! This module provides the skill model, the TrueSkill calculator, the
//! calculator interface and the processor that applies finished games to
//! stored players.

pub mod calculator;
pub mod processor;
pub mod skill;
pub mod trueskill;

// Re-export commonly used types
pub use calculator::{
    MockRatingCalculator, RatingCalculationResult, RatingCalculator, RatingChange,
};
pub use processor::{MatchOutcomeProcessor, ProcessedGame};
pub use skill::{conservative_rating, SkillInput, SkillModel};
pub use trueskill::{TrueSkillCalculator, TrueSkillConfig};
