//! Reference data kept next to the ladder
//!
//! None of these records take part in rating. They are stored and queried
//! through [`crate::storage`] only.

use crate::error::{LadderError, Result};
use crate::types::PlayerId;
use crate::utils::is_md5_hex;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for tournaments, assigned by storage
pub type TournamentId = i64;

/// A game build/version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patch {
    pub name: String,
    pub build: String,
    pub description: String,
    pub updated: DateTime<Utc>,
}

/// Tournament metadata before storage assigns an id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTournament {
    pub title: String,
    pub date: DateTime<Utc>,
    /// Free-text winner name, not a player reference
    #[serde(default)]
    pub winner: Option<String>,
    pub mode: String,
    pub url: String,
    /// Source path the tournament was imported from
    pub path: String,
    pub md5_hash: String,
}

impl NewTournament {
    pub fn validate(&self) -> Result<()> {
        if !is_md5_hex(&self.md5_hash) {
            return Err(LadderError::InvalidRecord {
                reason: format!(
                    "tournament {} has malformed md5 hash {:?}",
                    self.path, self.md5_hash
                ),
            }
            .into());
        }
        if self.path.is_empty() {
            return Err(LadderError::InvalidRecord {
                reason: format!("tournament {:?} has an empty source path", self.title),
            }
            .into());
        }
        Ok(())
    }
}

/// A stored tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    #[serde(flatten)]
    pub details: NewTournament,
}

/// Link between an external account and an optional ladder player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UberAccount {
    pub uber_name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub uber_id: String,
    #[serde(default)]
    pub player_id: Option<PlayerId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tournament(hash: &str) -> NewTournament {
        NewTournament {
            title: "Spring Cup".to_string(),
            date: DateTime::from_timestamp(1_400_000_000, 0).unwrap(),
            winner: Some("someone".to_string()),
            mode: "1v1".to_string(),
            url: "https://example.org/cup".to_string(),
            path: "cups/spring.json".to_string(),
            md5_hash: hash.to_string(),
        }
    }

    #[test]
    fn test_tournament_validation() {
        assert!(tournament("0123456789abcdef0123456789abcdef").validate().is_ok());

        let err = tournament("nothex").validate().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LadderError>(),
            Some(LadderError::InvalidRecord { .. })
        ));

        let mut no_path = tournament("0123456789abcdef0123456789abcdef");
        no_path.path.clear();
        assert!(no_path.validate().is_err());
    }

    #[test]
    fn test_tournament_serialization_is_flat() {
        let stored = Tournament {
            id: 3,
            details: tournament("0123456789abcdef0123456789abcdef"),
        };
        let json = serde_json::to_value(&stored).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["title"], "Spring Cup");
    }
}
