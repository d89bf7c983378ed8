//! Main application configuration
//!
//! This module defines the primary configuration structures for the
//! commander-ladder service, including TOML and environment variable loading
//! and validation.

use crate::config::leaderboard::LeaderboardSettings;
use crate::rating::TrueSkillConfig;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub rating: TrueSkillConfig,
    pub leaderboard: LeaderboardSettings,
}

/// Service-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "commander-ladder".to_string(),
            log_level: "info".to_string(),
            shutdown_timeout_seconds: 30,
        }
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| anyhow!("Invalid {} value: {}", key, value))
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from a TOML file; missing keys take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&text)
            .with_context(|| format!("Failed to load config file {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Build configuration from any variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        // Service settings
        if let Some(name) = lookup("SERVICE_NAME") {
            config.service.name = name;
        }
        if let Some(log_level) = lookup("LOG_LEVEL") {
            config.service.log_level = log_level;
        }
        if let Some(timeout) = lookup("SHUTDOWN_TIMEOUT_SECONDS") {
            config.service.shutdown_timeout_seconds =
                parse_var("SHUTDOWN_TIMEOUT_SECONDS", &timeout)?;
        }

        // Rating settings
        if let Some(mu) = lookup("RATING_INITIAL_MU") {
            config.rating.initial_mu = parse_var("RATING_INITIAL_MU", &mu)?;
        }
        if let Some(sigma) = lookup("RATING_INITIAL_SIGMA") {
            config.rating.initial_sigma = parse_var("RATING_INITIAL_SIGMA", &sigma)?;
        }
        if let Some(beta) = lookup("RATING_BETA") {
            config.rating.beta = parse_var("RATING_BETA", &beta)?;
        }
        if let Some(dynamics) = lookup("RATING_DYNAMICS") {
            config.rating.dynamics = parse_var("RATING_DYNAMICS", &dynamics)?;
        }
        if let Some(draw) = lookup("RATING_DRAW_PROBABILITY") {
            config.rating.draw_probability = parse_var("RATING_DRAW_PROBABILITY", &draw)?;
        }

        // Leaderboard settings
        if let Some(refresh) = lookup("LEADERBOARD_REFRESH_SECONDS") {
            config.leaderboard.refresh_interval_seconds =
                parse_var("LEADERBOARD_REFRESH_SECONDS", &refresh)?;
        }

        validate_config(&config)?;
        Ok(config)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }

    /// Get leaderboard refresh interval as Duration
    pub fn leaderboard_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.leaderboard.refresh_interval_seconds)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.name.is_empty() {
        return Err(anyhow!("Service name cannot be empty"));
    }
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }

    config.rating.validate()?;
    config.leaderboard.validate()?;

    Ok(())
}
