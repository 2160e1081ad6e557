pub mod alias;
pub mod cli;
pub mod config;
pub mod error;
pub mod git;
pub mod leaderboard;
pub mod model;
pub mod output;
pub mod rank;
pub mod tally;

pub use alias::AliasTable;
pub use error::{LeaderboardError, Result};
pub use git::{CommitSource, GitRepo};
pub use leaderboard::{build, Leaderboard};
pub use model::{CommitMeta, ContributorStats, Identity, LineDelta, RankedEntry, WalkSummary};
