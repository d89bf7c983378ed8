//! Repositories for reference data and the leaderboard snapshot

use crate::error::Result;
use crate::leaderboard::LeaderBoardEntry;
use crate::records::{NewTournament, Patch, Tournament, TournamentId, UberAccount};
use crate::types::PlayerId;

#[cfg_attr(test, mockall::automock)]
pub trait PatchRepository: Send + Sync {
    /// Insert a patch, failing with `DuplicateKey` when the name is taken
    fn create_patch(&self, patch: Patch) -> Result<()>;

    /// Insert or fully replace the patch with the same name
    fn replace_patch(&self, patch: Patch) -> Result<()>;

    fn load_patch(&self, name: &str) -> Result<Option<Patch>>;

    /// All patches, most recently updated first
    fn list_patches(&self) -> Result<Vec<Patch>>;
}

#[cfg_attr(test, mockall::automock)]
pub trait TournamentRepository: Send + Sync {
    /// Validate and insert a tournament, assigning its id
    fn create_tournament(&self, tournament: NewTournament) -> Result<Tournament>;

    fn load_tournament(&self, tournament_id: TournamentId) -> Result<Option<Tournament>>;

    /// All tournaments, oldest first
    fn tournaments_by_date(&self) -> Result<Vec<Tournament>>;

    /// Tournaments with a recorded winner, oldest first
    fn tournaments_with_winner(&self) -> Result<Vec<Tournament>>;
}

#[cfg_attr(test, mockall::automock)]
pub trait AccountRepository: Send + Sync {
    /// Insert an account; both the uber name and the uber id must be unused
    fn create_account(&self, account: UberAccount) -> Result<()>;

    fn account_by_uber_id(&self, uber_id: &str) -> Result<Option<UberAccount>>;

    fn account_for_player(&self, player_id: PlayerId) -> Result<Option<UberAccount>>;

    fn all_accounts(&self) -> Result<Vec<UberAccount>>;
}

#[cfg_attr(test, mockall::automock)]
pub trait LeaderboardRepository: Send + Sync {
    /// Replace the whole stored leaderboard with `entries`
    fn replace_snapshot(&self, entries: Vec<LeaderBoardEntry>) -> Result<()>;

    /// The last stored leaderboard, in league then rank order
    fn snapshot(&self) -> Result<Vec<LeaderBoardEntry>>;
}
