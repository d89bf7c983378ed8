//! Recorded games
//!
//! A [`Game`] can only be obtained through [`Game::new`], which enforces the
//! participant invariants. An invalid game therefore never reaches storage or
//! the rating engine.

use crate::error::{LadderError, Result};
use crate::types::{GameId, OutcomeKind, PlayerId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A finished game between two or more distinct players
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Game {
    id: GameId,
    winner: Option<PlayerId>,
    players: Vec<PlayerId>, // sorted, distinct
}

impl Game {
    /// Build a game. Duplicate player ids are collapsed.
    ///
    /// Fails with [`LadderError::NotEnoughPlayers`] when fewer than two
    /// distinct players remain and with [`LadderError::WinnerNotAParticipant`]
    /// when `winner` is not among them.
    pub fn new(
        id: GameId,
        winner: Option<PlayerId>,
        players: impl IntoIterator<Item = PlayerId>,
    ) -> Result<Self> {
        let players: BTreeSet<PlayerId> = players.into_iter().collect();

        if players.len() < 2 {
            return Err(LadderError::NotEnoughPlayers {
                game_id: id,
                distinct: players.len(),
            }
            .into());
        }

        if let Some(winner) = winner {
            if !players.contains(&winner) {
                return Err(LadderError::WinnerNotAParticipant {
                    game_id: id,
                    winner,
                }
                .into());
            }
        }

        Ok(Self {
            id,
            winner,
            players: players.into_iter().collect(),
        })
    }

    pub fn id(&self) -> GameId {
        self.id
    }

    pub fn winner(&self) -> Option<PlayerId> {
        self.winner
    }

    /// Participants in ascending id order
    pub fn players(&self) -> &[PlayerId] {
        &self.players
    }

    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.players.binary_search(&player_id).is_ok()
    }

    pub fn is_draw(&self) -> bool {
        self.winner.is_none()
    }

    pub fn outcome_kind(&self) -> OutcomeKind {
        match self.winner {
            None => OutcomeKind::Draw,
            Some(_) if self.players.len() == 2 => OutcomeKind::Decisive,
            Some(_) => OutcomeKind::FreeForAll,
        }
    }

    /// Outcome ranks handed to the rating calculator
    ///
    /// The winner gets rank 1 and everyone else shares rank 2. In a draw all
    /// players share rank 1.
    pub fn ranks(&self) -> Vec<(PlayerId, u32)> {
        self.players
            .iter()
            .map(|&player_id| {
                let rank = match self.winner {
                    Some(winner) if winner != player_id => 2,
                    _ => 1,
                };
                (player_id, rank)
            })
            .collect()
    }
}

impl std::fmt::Display for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.winner {
            Some(winner) => write!(
                f,
                "game {} won by {} ({} players)",
                self.id,
                winner,
                self.players.len()
            ),
            None => write!(f, "game {} drawn ({} players)", self.id, self.players.len()),
        }
    }
}

/// Unvalidated game as it arrives from imports and callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: GameId,
    #[serde(default)]
    pub winner: Option<PlayerId>,
    pub players: Vec<PlayerId>,
}

impl TryFrom<GameRecord> for Game {
    type Error = anyhow::Error;

    fn try_from(record: GameRecord) -> Result<Self> {
        Game::new(record.id, record.winner, record.players)
    }
}

impl From<&Game> for GameRecord {
    fn from(game: &Game) -> Self {
        Self {
            id: game.id,
            winner: game.winner,
            players: game.players.clone(),
        }
    }
}
