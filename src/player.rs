//! Player aggregate
//!
//! A player owns its skill belief and the cached conservative rating derived
//! from it. Statistics such as win/draw/loss counts and rank position are
//! computed on demand from the games and players handed in, never stored.

use crate::game::Game;
use crate::rating::skill::{SkillInput, SkillModel};
use crate::types::PlayerId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A registered player
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Player {
    id: PlayerId,
    name: String,
    skill: SkillModel,
    rating: f64, // always skill.conservative_rating()
    updated: DateTime<Utc>,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>, skill: SkillModel, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            rating: skill.conservative_rating(),
            skill,
            updated: now,
        }
    }

    /// New player starting from the default prior
    pub fn register(id: PlayerId, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self::new(id, name, SkillModel::default(), now)
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn skill(&self) -> SkillModel {
        self.skill
    }

    pub fn mu(&self) -> f64 {
        self.skill.mu()
    }

    pub fn sigma(&self) -> f64 {
        self.skill.sigma()
    }

    /// Cached conservative rating
    pub fn rating(&self) -> f64 {
        self.rating
    }

    pub fn updated(&self) -> DateTime<Utc> {
        self.updated
    }

    /// Overwrite the skill from an external pair
    ///
    /// Returns `false` and leaves the player untouched when the input is not
    /// a complete, valid `(mu, sigma)` pair.
    pub fn set_skill(&mut self, input: &SkillInput, now: DateTime<Utc>) -> bool {
        match input.to_skill() {
            Some(skill) => {
                self.apply_skill(skill, now);
                true
            }
            None => false,
        }
    }

    /// Replace skill, rating and timestamp together
    pub fn apply_skill(&mut self, skill: SkillModel, now: DateTime<Utc>) {
        self.skill = skill;
        self.rating = skill.conservative_rating();
        self.updated = now;
    }

    /// Wins, draws and losses over the games this player took part in
    ///
    /// Games in `games` that do not include the player are ignored.
    pub fn win_draw_loss<'a>(&self, games: impl IntoIterator<Item = &'a Game>) -> WinDrawLoss {
        let mut record = WinDrawLoss::default();
        for game in games.into_iter().filter(|g| g.contains(self.id)) {
            match game.winner() {
                Some(winner) if winner == self.id => record.wins += 1,
                Some(_) => record.losses += 1,
                None => record.draws += 1,
            }
        }
        record
    }
}

impl std::fmt::Display for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} #{} {} rating {:.2}",
            self.name, self.id, self.skill, self.rating
        )
    }
}

/// Leaderboard order: rating descending, then player id ascending
pub fn rating_order(a: &Player, b: &Player) -> Ordering {
    b.rating
        .total_cmp(&a.rating)
        .then_with(|| a.id.cmp(&b.id))
}

/// 1-based position of `player_id` among `players` in [`rating_order`]
pub fn rank_position(players: &[Player], player_id: PlayerId) -> Option<usize> {
    let target = players.iter().find(|p| p.id == player_id)?;
    let ahead = players
        .iter()
        .filter(|other| rating_order(other, target) == Ordering::Less)
        .count();
    Some(ahead + 1)
}

/// Per-player outcome counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinDrawLoss {
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
}

impl WinDrawLoss {
    pub fn total(&self) -> u32 {
        self.wins + self.draws + self.losses
    }
}

/// Read-only summary of a player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub player_id: PlayerId,
    pub name: String,
    pub mu: f64,
    pub sigma: f64,
    pub rating: f64,
    pub rank: usize,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub games_played: u32,
}

impl PlayerStats {
    pub fn new(player: &Player, record: WinDrawLoss, rank: usize) -> Self {
        Self {
            player_id: player.id,
            name: player.name.clone(),
            mu: player.mu(),
            sigma: player.sigma(),
            rating: player.rating,
            rank,
            wins: record.wins,
            draws: record.draws,
            losses: record.losses,
            games_played: record.total(),
        }
    }
}

/// Player as it arrives from imports: skill fields are optional and tolerated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub id: PlayerId,
    pub name: String,
    #[serde(flatten)]
    pub skill: SkillInput,
}

impl PlayerRecord {
    /// Build the player; a malformed skill pair falls back to the prior
    pub fn into_player(self, now: DateTime<Utc>) -> Player {
        let mut player = Player::register(self.id, self.name, now);
        player.set_skill(&self.skill, now);
        player
    }
}
