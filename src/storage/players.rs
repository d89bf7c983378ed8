//! Player and game repositories
//!
//! The rating engine only talks to storage through these traits. Games and
//! players are linked by two independent lookups kept by the implementation:
//! each [`Game`] lists its players and storage indexes games by player id.

use crate::error::Result;
use crate::game::Game;
use crate::player::Player;
use crate::types::{GameId, PlayerId};
use chrono::{DateTime, Utc};

/// Trait for player storage operations
#[cfg_attr(test, mockall::automock)]
pub trait PlayerRepository: Send + Sync {
    /// Load a player, failing with `PlayerNotFound` when absent
    fn load_player(&self, player_id: PlayerId) -> Result<Player>;

    /// Insert a new player, failing with `DuplicateKey` when the id is taken
    fn create_player(&self, player: Player) -> Result<()>;

    /// Persist skill, rating and timestamp of an existing player together
    fn save_player(&self, player: &Player) -> Result<()>;

    /// Persist several players atomically: either all are written or none
    fn save_players(&self, players: &[Player]) -> Result<()>;

    /// Remove a player together with its game memberships
    fn delete_player(&self, player_id: PlayerId) -> Result<()>;

    /// All players, rating descending then id ascending
    fn players_by_rating(&self) -> Result<Vec<Player>>;

    /// Players whose name contains `fragment` (case-insensitive)
    fn search_by_name(&self, fragment: &str) -> Result<Vec<Player>>;

    /// Players whose skill has not changed since `before`
    fn players_updated_before(&self, before: DateTime<Utc>) -> Result<Vec<Player>>;

    /// Players with a conservative rating strictly above `rating`, best first
    fn players_rated_above(&self, rating: f64) -> Result<Vec<Player>>;

    /// Get total number of players
    fn player_count(&self) -> Result<usize>;
}

/// Trait for game storage operations
#[cfg_attr(test, mockall::automock)]
pub trait GameRepository: Send + Sync {
    /// Load a game, failing with `GameNotFound` when absent
    fn load_game(&self, game_id: GameId) -> Result<Game>;

    /// Insert a new game; every participant must already exist
    fn create_game(&self, game: Game) -> Result<()>;

    /// Games the player took part in, by ascending game id
    fn games_for_player(&self, player_id: PlayerId) -> Result<Vec<Game>>;

    /// Games without a winner
    fn draws(&self) -> Result<Vec<Game>>;

    /// Every stored game, by ascending game id
    fn all_games(&self) -> Result<Vec<Game>>;

    /// Record that the game's outcome has been applied to ratings
    fn mark_processed(&self, game_id: GameId) -> Result<()>;

    fn is_processed(&self, game_id: GameId) -> Result<bool>;
}
