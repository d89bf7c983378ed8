//! Persistence boundary
//!
//! Repository traits per entity and the in-memory implementation used by the
//! service and the tests.

pub mod memory;
pub mod players;
pub mod records;

pub use memory::InMemoryStorage;
pub use players::{GameRepository, PlayerRepository};
pub use records::{AccountRepository, LeaderboardRepository, PatchRepository, TournamentRepository};
