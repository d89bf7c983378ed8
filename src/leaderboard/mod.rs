//! Leaderboard projection and scheduled refresh

pub mod projection;
pub mod refresher;

pub use projection::{league_sizes, LeaderBoardEntry, LeaderboardProjection, LeaguePartition};
pub use refresher::LeaderboardRefresher;
