//! Leaderboard projection
//!
//! Orders every player by conservative rating and cuts the ordering into
//! leagues. The result is a snapshot; nothing here is updated incrementally.

use crate::error::{LadderError, Result};
use crate::player::{rating_order, Player};
use crate::types::{League, PlayerId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How the ordered player list is cut into leagues
///
/// Bronze always takes whatever is left over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LeaguePartition {
    /// Number of players in each league, best league first
    FixedSize {
        uber: usize,
        platinum: usize,
        gold: usize,
        silver: usize,
    },
    /// Minimum conservative rating for each league
    Threshold {
        uber: f64,
        platinum: f64,
        gold: f64,
        silver: f64,
    },
}

impl Default for LeaguePartition {
    fn default() -> Self {
        LeaguePartition::FixedSize {
            uber: 20,
            platinum: 80,
            gold: 200,
            silver: 500,
        }
    }
}

impl LeaguePartition {
    pub fn validate(&self) -> Result<()> {
        if let LeaguePartition::Threshold {
            uber,
            platinum,
            gold,
            silver,
        } = self
        {
            let bounds = [*uber, *platinum, *gold, *silver];
            if bounds.iter().any(|b| !b.is_finite()) {
                return Err(LadderError::ConfigurationError {
                    message: "League thresholds must be finite".to_string(),
                }
                .into());
            }
            if bounds.windows(2).any(|pair| pair[0] <= pair[1]) {
                return Err(LadderError::ConfigurationError {
                    message: "League thresholds must strictly decrease from Uber to Silver"
                        .to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// League of the player at 0-based `position` with conservative `rating`
    fn league_for(&self, position: usize, rating: f64) -> League {
        match self {
            LeaguePartition::FixedSize {
                uber,
                platinum,
                gold,
                silver,
            } => {
                let mut limit = 0;
                for (league, size) in League::ALL.iter().zip([*uber, *platinum, *gold, *silver]) {
                    limit += size;
                    if position < limit {
                        return *league;
                    }
                }
                League::Bronze
            }
            LeaguePartition::Threshold {
                uber,
                platinum,
                gold,
                silver,
            } => League::ALL
                .iter()
                .zip([*uber, *platinum, *gold, *silver])
                .find(|(_, minimum)| rating >= *minimum)
                .map(|(league, _)| *league)
                .unwrap_or(League::Bronze),
        }
    }
}

/// One row of the materialized leaderboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderBoardEntry {
    pub league: League,
    /// 1-based rank inside the league
    pub rank: u32,
    /// 1-based position on the whole board
    pub position: u32,
    pub player_id: PlayerId,
    /// Linked external account, when there is one
    pub uber_id: Option<String>,
    pub rating: f64,
    /// When this snapshot was taken
    pub last: DateTime<Utc>,
}

/// Builds leaderboard snapshots from player ratings
#[derive(Debug, Clone, Default)]
pub struct LeaderboardProjection {
    partition: LeaguePartition,
}

impl LeaderboardProjection {
    pub fn new(partition: LeaguePartition) -> Result<Self> {
        partition.validate()?;
        Ok(Self { partition })
    }

    pub fn partition(&self) -> &LeaguePartition {
        &self.partition
    }

    /// Project `players` into a leaderboard taken at `now`
    ///
    /// `uber_ids` maps player ids to linked account ids. Every player appears
    /// exactly once, ordered by rating descending with ties broken by
    /// ascending player id.
    pub fn project(
        &self,
        players: &[Player],
        uber_ids: &HashMap<PlayerId, String>,
        now: DateTime<Utc>,
    ) -> Vec<LeaderBoardEntry> {
        let mut ordered: Vec<&Player> = players.iter().collect();
        ordered.sort_by(|a, b| rating_order(a, b));

        let mut league_counts: HashMap<League, u32> = HashMap::new();
        ordered
            .into_iter()
            .enumerate()
            .map(|(position, player)| {
                let league = self.partition.league_for(position, player.rating());
                let rank = league_counts.entry(league).or_insert(0);
                *rank += 1;

                LeaderBoardEntry {
                    league,
                    rank: *rank,
                    position: position as u32 + 1,
                    player_id: player.id(),
                    uber_id: uber_ids.get(&player.id()).cloned(),
                    rating: player.rating(),
                    last: now,
                }
            })
            .collect()
    }
}

/// Number of entries per league, every league listed
pub fn league_sizes(entries: &[LeaderBoardEntry]) -> Vec<(League, usize)> {
    League::ALL
        .iter()
        .map(|league| {
            (
                *league,
                entries.iter().filter(|e| e.league == *league).count(),
            )
        })
        .collect()
}
