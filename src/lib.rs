//! Commander Ladder - TrueSkill rating service for multiplayer games
//!
//! This crate records game outcomes between players, updates their
//! TrueSkill ratings with a factor graph and projects all players into a
//! league leaderboard.

pub mod config;
pub mod error;
pub mod game;
pub mod leaderboard;
pub mod metrics;
pub mod player;
pub mod rating;
pub mod records;
pub mod service;
pub mod storage;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{LadderError, Result};
pub use types::*;

// Re-export key components
pub use game::Game;
pub use player::{Player, PlayerStats, WinDrawLoss};
pub use rating::{
    MatchOutcomeProcessor, RatingCalculator, SkillInput, SkillModel, TrueSkillCalculator,
    TrueSkillConfig,
};
pub use service::LadderService;
pub use storage::InMemoryStorage;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
