//! Configuration management for the commander-ladder service
//!
//! This module handles configuration loading from TOML files and environment
//! variables, validation, and default values.

pub mod app;
pub mod leaderboard;

// Re-export commonly used types
pub use app::{validate_config, AppConfig, ServiceSettings};
pub use leaderboard::LeaderboardSettings;
