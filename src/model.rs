use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

/// Author and parentage of one commit, as yielded by a [`crate::git::CommitSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitMeta {
    pub id: String,
    pub author_name: String,
    pub author_email: String,
    pub timestamp: DateTime<Utc>,
    pub parent_ids: Vec<String>,
}

impl CommitMeta {
    pub fn is_root(&self) -> bool {
        self.parent_ids.is_empty()
    }

    pub fn is_merge(&self) -> bool {
        self.parent_ids.len() > 1
    }

    pub fn short_id(&self) -> &str {
        self.id.get(..8).unwrap_or(&self.id)
    }
}

/// Line totals of a single commit against its first parent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineDelta {
    pub insertions: u64,
    pub deletions: u64,
}

impl LineDelta {
    pub fn new(insertions: u64, deletions: u64) -> Self {
        Self { insertions, deletions }
    }
}

impl std::ops::AddAssign for LineDelta {
    fn add_assign(&mut self, rhs: Self) {
        self.insertions += rhs.insertions;
        self.deletions += rhs.deletions;
    }
}

/// Contributor key: author display name plus alias-resolved email.
///
/// Ordering and equality follow the rendered `Name <email>` string, which is
/// also the tie-break key of the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    key: String,
    name_len: usize,
}

impl Identity {
    pub fn new(name: &str, email: &str) -> Self {
        Self {
            key: format!("{name} <{email}>"),
            name_len: name.len(),
        }
    }

    pub fn name(&self) -> &str {
        &self.key[..self.name_len]
    }

    pub fn email(&self) -> &str {
        &self.key[self.name_len + 2..self.key.len() - 1]
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

impl Ord for Identity {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key.cmp(&other.key)
    }
}

impl PartialOrd for Identity {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Serialize for Identity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.key)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContributorStats {
    pub loc_added: u64,
    pub loc_removed: u64,
    pub commits: u64,
    /// Reserved; nothing populates review counts yet.
    pub pr_reviews: u64,
}

impl ContributorStats {
    pub fn add_commit(&mut self, delta: LineDelta) {
        self.loc_added += delta.insertions;
        self.loc_removed += delta.deletions;
        self.commits += 1;
    }

    /// Fold another partial tally for the same identity into this one.
    pub fn merge(&mut self, other: &ContributorStats) {
        self.loc_added += other.loc_added;
        self.loc_removed += other.loc_removed;
        self.commits += other.commits;
        self.pr_reviews += other.pr_reviews;
    }

    /// Lines added minus lines removed. Exact for every pair of `u64` counters.
    pub fn net(&self) -> i128 {
        i128::from(self.loc_added) - i128::from(self.loc_removed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedEntry {
    pub rank: usize,
    #[serde(rename = "contributor")]
    pub identity: Identity,
    pub loc_added: u64,
    pub loc_removed: u64,
    pub commits: u64,
    pub pr_reviews: u64,
}

impl RankedEntry {
    pub fn new(rank: usize, identity: Identity, stats: &ContributorStats) -> Self {
        Self {
            rank,
            identity,
            loc_added: stats.loc_added,
            loc_removed: stats.loc_removed,
            commits: stats.commits,
            pr_reviews: stats.pr_reviews,
        }
    }
}

/// Counters describing one pass over the commit history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkSummary {
    pub visited: u64,
    pub attributed: u64,
    pub skipped_root: u64,
    pub skipped_merge: u64,
    pub failed_diff: u64,
}

impl WalkSummary {
    pub fn skipped(&self) -> u64 {
        self.skipped_root + self.skipped_merge + self.failed_diff
    }
}

#[derive(Debug, Clone)]
pub struct DateRange {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn new() -> Self {
        Self { since: None, until: None }
    }

    pub fn with_since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn with_until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn contains(&self, timestamp: &DateTime<Utc>) -> bool {
        if let Some(since) = self.since {
            if timestamp < &since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if timestamp > &until {
                return false;
            }
        }
        true
    }
}

impl Default for DateRange {
    fn default() -> Self {
        Self::new()
    }
}
