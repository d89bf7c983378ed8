//! Common types used throughout the ladder engine

use serde::{Deserialize, Serialize};

/// Unique identifier for players
pub type PlayerId = i64;

/// Unique identifier for games
pub type GameId = i64;

/// League tier of a leaderboard entry, strongest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum League {
    Uber,
    Platinum,
    Gold,
    Silver,
    Bronze,
}

impl League {
    /// All leagues in descending order of strength
    pub const ALL: [League; 5] = [
        League::Uber,
        League::Platinum,
        League::Gold,
        League::Silver,
        League::Bronze,
    ];
}

impl std::fmt::Display for League {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            League::Uber => write!(f, "Uber"),
            League::Platinum => write!(f, "Platinum"),
            League::Gold => write!(f, "Gold"),
            League::Silver => write!(f, "Silver"),
            League::Bronze => write!(f, "Bronze"),
        }
    }
}

/// Shape of a finished game, used for logging and metrics labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutcomeKind {
    /// Two players, one winner
    Decisive,
    /// No winner
    Draw,
    /// More than two players, one winner, everyone else tied behind
    FreeForAll,
}

impl OutcomeKind {
    pub fn as_label(&self) -> &'static str {
        match self {
            OutcomeKind::Decisive => "decisive",
            OutcomeKind::Draw => "draw",
            OutcomeKind::FreeForAll => "free_for_all",
        }
    }
}

impl std::fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_label())
    }
}
