//! Leaderboard configuration

use crate::leaderboard::LeaguePartition;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Leaderboard settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaderboardSettings {
    /// Seconds between scheduled leaderboard rebuilds
    pub refresh_interval_seconds: u64,
    /// League boundaries
    pub partition: LeaguePartition,
}

impl Default for LeaderboardSettings {
    fn default() -> Self {
        Self {
            refresh_interval_seconds: 300, // 5 minutes
            partition: LeaguePartition::default(),
        }
    }
}

impl LeaderboardSettings {
    pub fn validate(&self) -> Result<()> {
        if self.refresh_interval_seconds == 0 {
            return Err(anyhow!("Leaderboard refresh interval must be greater than 0"));
        }
        self.partition.validate()
    }
}
