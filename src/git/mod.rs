pub mod repo;

pub use repo::{CommitWalk, GitRepo};

use crate::error::Result;
use crate::model::{CommitMeta, LineDelta};

/// Anything that can enumerate a commit history and diff its commits.
///
/// `commits` must visit every commit in range exactly once and may be called
/// again to restart the walk. Errors from the iterator are fatal to a run,
/// while an error from `line_delta` only affects that one commit.
pub trait CommitSource {
    fn commits(&self) -> Result<Box<dyn Iterator<Item = Result<CommitMeta>> + '_>>;

    fn line_delta(&self, commit: &CommitMeta) -> Result<LineDelta>;
}
