//! Error types for the ladder engine
//!
//! Domain failures are modelled with thiserror and carried through
//! anyhow so that persistence errors reach the caller unmodified.

use crate::types::{GameId, PlayerId};

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific ladder scenarios
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LadderError {
    #[error("Player not found: {player_id}")]
    PlayerNotFound { player_id: PlayerId },

    #[error("Game not found: {game_id}")]
    GameNotFound { game_id: GameId },

    #[error("Game {game_id} needs at least 2 distinct players, got {distinct}")]
    NotEnoughPlayers { game_id: GameId, distinct: usize },

    #[error("Game {game_id} winner {winner} is not one of its players")]
    WinnerNotAParticipant { game_id: GameId, winner: PlayerId },

    #[error("Game {game_id} has already been rated")]
    GameAlreadyProcessed { game_id: GameId },

    #[error("Duplicate {entity} key: {key}")]
    DuplicateKey { entity: &'static str, key: String },

    #[error("Invalid record: {reason}")]
    InvalidRecord { reason: String },

    #[error("Rating calculation failed: {reason}")]
    RatingCalculationFailed { reason: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}

impl LadderError {
    /// Lock poisoning is the only way the in-memory store can fail internally
    pub(crate) fn lock_poisoned(what: &str) -> Self {
        LadderError::InternalError {
            message: format!("Failed to acquire {} lock", what),
        }
    }
}
