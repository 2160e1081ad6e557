use crate::alias::AliasTable;
use crate::config::{RootPolicy, WalkOptions};
use crate::error::Result;
use crate::git::CommitSource;
use crate::model::{CommitMeta, ContributorStats, Identity, WalkSummary};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Per-identity totals after one pass over the history.
#[derive(Debug, Default)]
pub struct Tally {
    pub stats: HashMap<Identity, ContributorStats>,
    pub summary: WalkSummary,
}

impl Tally {
    pub fn total_commits(&self) -> u64 {
        self.stats.values().map(|s| s.commits).sum()
    }

    /// Fold a tally built from a disjoint slice of history into this one.
    pub fn absorb(&mut self, other: Tally) {
        for (identity, stats) in other.stats {
            self.stats.entry(identity).or_default().merge(&stats);
        }
        self.summary.visited += other.summary.visited;
        self.summary.attributed += other.summary.attributed;
        self.summary.skipped_root += other.summary.skipped_root;
        self.summary.skipped_merge += other.summary.skipped_merge;
        self.summary.failed_diff += other.summary.failed_diff;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Skip {
    Root,
    Merge,
}

pub struct Accumulator<'a> {
    aliases: &'a AliasTable,
    options: WalkOptions,
    show_progress: bool,
}

impl<'a> Accumulator<'a> {
    pub fn new(aliases: &'a AliasTable, options: WalkOptions) -> Self {
        Self {
            aliases,
            options,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Canonical contributor key for a commit author.
    pub fn identity_of(&self, commit: &CommitMeta) -> Identity {
        let email = self.aliases.resolve(&commit.author_email);
        Identity::new(&commit.author_name, email)
    }

    /// Walk every commit of `source` once and total lines per contributor.
    ///
    /// A commit whose diff cannot be computed is logged and left out. An
    /// error from the walk itself aborts the pass.
    pub fn run<S: CommitSource + ?Sized>(&self, source: &S) -> Result<Tally> {
        let pb = if self.show_progress {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} {msg} ({pos} commits)")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.set_message("Walking history...");
            pb
        } else {
            ProgressBar::hidden()
        };

        let mut tally = Tally::default();

        for commit in source.commits()? {
            let commit = commit?;
            tally.summary.visited += 1;
            pb.inc(1);

            if let Some(reason) = self.skip_reason(&commit) {
                debug!(commit = commit.short_id(), ?reason, "skipping commit");
                match reason {
                    Skip::Root => tally.summary.skipped_root += 1,
                    Skip::Merge => tally.summary.skipped_merge += 1,
                }
                continue;
            }

            let delta = match source.line_delta(&commit) {
                Ok(delta) => delta,
                Err(e) => {
                    warn!(commit = %commit.id, error = %e, "could not compute diff, commit left out");
                    tally.summary.failed_diff += 1;
                    continue;
                }
            };

            let identity = self.identity_of(&commit);
            tally.stats.entry(identity).or_default().add_commit(delta);
            tally.summary.attributed += 1;
        }

        pb.finish_and_clear();
        info!(
            visited = tally.summary.visited,
            attributed = tally.summary.attributed,
            skipped = tally.summary.skipped(),
            contributors = tally.stats.len(),
            "history walk complete"
        );
        Ok(tally)
    }

    fn skip_reason(&self, commit: &CommitMeta) -> Option<Skip> {
        if commit.is_root() && self.options.root_policy == RootPolicy::Exclusive {
            return Some(Skip::Root);
        }
        if commit.is_merge() && !self.options.include_merges {
            return Some(Skip::Merge);
        }
        None
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::LeaderboardError;
    use crate::model::LineDelta;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    /// In-memory history: each commit carries its delta, `None` = diff fails.
    #[derive(Default)]
    pub(crate) struct FakeSource {
        pub commits: Vec<(CommitMeta, Option<LineDelta>)>,
        pub fail_walk_at: Option<usize>,
    }

    impl FakeSource {
        pub fn push(&mut self, name: &str, email: &str, parents: usize, delta: Option<(u64, u64)>) {
            let n = self.commits.len();
            let meta = CommitMeta {
                id: format!("{n:040x}"),
                author_name: name.to_string(),
                author_email: email.to_string(),
                timestamp: Utc::now(),
                parent_ids: (0..parents).map(|p| format!("{:040x}", 1000 + n * 10 + p)).collect(),
            };
            self.commits.push((meta, delta.map(|(a, d)| LineDelta::new(a, d))));
        }
    }

    impl CommitSource for FakeSource {
        fn commits(&self) -> Result<Box<dyn Iterator<Item = Result<CommitMeta>> + '_>> {
            let fail_at = self.fail_walk_at;
            Ok(Box::new(self.commits.iter().enumerate().map(move |(i, (meta, _))| {
                if Some(i) == fail_at {
                    Err(std::io::Error::other("object store unreadable").into())
                } else {
                    Ok(meta.clone())
                }
            })))
        }

        fn line_delta(&self, commit: &CommitMeta) -> Result<LineDelta> {
            self.commits
                .iter()
                .find(|(meta, _)| meta.id == commit.id)
                .and_then(|(_, delta)| *delta)
                .ok_or_else(|| LeaderboardError::Diff {
                    commit: commit.id.clone(),
                    reason: "blob missing".to_string(),
                })
        }
    }

    fn stats_for<'t>(tally: &'t Tally, key: &str) -> &'t ContributorStats {
        tally
            .stats
            .iter()
            .find(|(id, _)| id.as_str() == key)
            .map(|(_, s)| s)
            .unwrap_or_else(|| panic!("no entry for {key}"))
    }

    #[test]
    fn aliases_collapse_into_one_contributor() {
        let aliases = AliasTable::parse("Jane Doe <jane@co.com> <jane.doe@old.com>");
        let mut source = FakeSource::default();
        source.push("Jane Doe", "jane@co.com", 1, Some((10, 2)));
        source.push("Jane Doe", "jane.doe@old.com", 1, Some((5, 1)));

        let tally = Accumulator::new(&aliases, WalkOptions::default()).run(&source).unwrap();

        assert_eq!(tally.stats.len(), 1);
        assert_eq!(
            *stats_for(&tally, "Jane Doe <jane@co.com>"),
            ContributorStats {
                loc_added: 15,
                loc_removed: 3,
                commits: 2,
                pr_reviews: 0,
            }
        );
    }

    #[test]
    fn differing_names_stay_separate() {
        let aliases = AliasTable::parse("Jane <jane@co.com> <jd@old.com>");
        let mut source = FakeSource::default();
        source.push("Jane", "jane@co.com", 1, Some((1, 0)));
        source.push("J. Doe", "jd@old.com", 1, Some((1, 0)));

        let tally = Accumulator::new(&aliases, WalkOptions::default()).run(&source).unwrap();

        assert_eq!(tally.stats.len(), 2);
        assert_eq!(stats_for(&tally, "Jane <jane@co.com>").commits, 1);
        assert_eq!(stats_for(&tally, "J. Doe <jane@co.com>").commits, 1);
    }

    #[test]
    fn root_policy_controls_first_commit() {
        let aliases = AliasTable::new();
        let mut source = FakeSource::default();
        source.push("A", "a@x", 1, Some((3, 0)));
        source.push("A", "a@x", 0, Some((100, 0)));

        let inclusive = Accumulator::new(&aliases, WalkOptions::default()).run(&source).unwrap();
        assert_eq!(stats_for(&inclusive, "A <a@x>").loc_added, 103);
        assert_eq!(inclusive.summary.skipped_root, 0);

        let options = WalkOptions {
            root_policy: RootPolicy::Exclusive,
            ..WalkOptions::default()
        };
        let exclusive = Accumulator::new(&aliases, options).run(&source).unwrap();
        assert_eq!(stats_for(&exclusive, "A <a@x>").loc_added, 3);
        assert_eq!(exclusive.summary.skipped_root, 1);
        assert_eq!(exclusive.total_commits(), 1);
    }

    #[test]
    fn failed_diff_skips_only_that_commit() {
        let aliases = AliasTable::new();
        let mut source = FakeSource::default();
        source.push("A", "a@x", 1, Some((1, 1)));
        source.push("B", "b@x", 1, None);
        source.push("A", "a@x", 1, Some((2, 0)));

        let tally = Accumulator::new(&aliases, WalkOptions::default()).run(&source).unwrap();

        assert_eq!(tally.summary.visited, 3);
        assert_eq!(tally.summary.failed_diff, 1);
        assert_eq!(tally.total_commits(), 2);
        assert!(tally.stats.keys().all(|id| id.as_str() != "B <b@x>"));
    }

    #[test]
    fn merges_can_be_excluded() {
        let aliases = AliasTable::new();
        let mut source = FakeSource::default();
        source.push("A", "a@x", 2, Some((7, 0)));
        source.push("A", "a@x", 1, Some((1, 0)));

        let with = Accumulator::new(&aliases, WalkOptions::default()).run(&source).unwrap();
        assert_eq!(with.total_commits(), 2);

        let options = WalkOptions {
            include_merges: false,
            ..WalkOptions::default()
        };
        let without = Accumulator::new(&aliases, options).run(&source).unwrap();
        assert_eq!(without.total_commits(), 1);
        assert_eq!(without.summary.skipped_merge, 1);
    }

    #[test]
    fn walk_error_is_fatal() {
        let aliases = AliasTable::new();
        let mut source = FakeSource::default();
        source.push("A", "a@x", 1, Some((1, 0)));
        source.push("A", "a@x", 1, Some((1, 0)));
        source.fail_walk_at = Some(1);

        let result = Accumulator::new(&aliases, WalkOptions::default()).run(&source);
        assert!(matches!(result, Err(LeaderboardError::Io(_))));
    }

    #[test]
    fn commit_total_matches_summary() {
        let aliases = AliasTable::new();
        let mut source = FakeSource::default();
        source.push("A", "a@x", 0, Some((1, 0)));
        source.push("B", "b@x", 1, None);
        source.push("C", "c@x", 1, Some((4, 4)));
        source.push("A", "a@x", 2, Some((0, 9)));
        let options = WalkOptions {
            root_policy: RootPolicy::Exclusive,
            include_merges: true,
        };

        let tally = Accumulator::new(&aliases, options).run(&source).unwrap();
        let s = tally.summary;
        assert_eq!(tally.total_commits(), s.visited - s.skipped());
        assert_eq!(tally.total_commits(), s.attributed);
    }

    #[test]
    fn absorbing_partitions_matches_single_pass() {
        let aliases = AliasTable::new();
        let mut whole = FakeSource::default();
        let mut left = FakeSource::default();
        let mut right = FakeSource::default();
        for (i, (name, added)) in [("A", 3), ("B", 5), ("A", 1), ("C", 2)].into_iter().enumerate() {
            let email = format!("{}@x", name.to_lowercase());
            whole.push(name, &email, 1, Some((added, 1)));
            let half = if i < 2 { &mut left } else { &mut right };
            half.push(name, &email, 1, Some((added, 1)));
        }

        let acc = Accumulator::new(&aliases, WalkOptions::default());
        let single = acc.run(&whole).unwrap();
        let mut merged = acc.run(&left).unwrap();
        merged.absorb(acc.run(&right).unwrap());

        assert_eq!(merged.stats, single.stats);
        assert_eq!(merged.summary, single.summary);
    }

    #[test]
    fn counters_never_decrease_while_folding() {
        let aliases = AliasTable::parse("A <a@x> <a@old>");
        let mut history = FakeSource::default();
        history.push("A", "a@x", 0, Some((12, 0)));
        history.push("B", "b@x", 1, Some((0, 7)));
        history.push("A", "a@old", 1, Some((3, 9)));
        history.push("B", "b@x", 1, None);
        history.push("A", "a@x", 2, Some((0, 0)));
        history.push("B", "b@x", 1, Some((5, 5)));

        let acc = Accumulator::new(&aliases, WalkOptions::default());
        let mut previous = Tally::default();
        for len in 1..=history.commits.len() {
            let prefix = FakeSource {
                commits: history.commits[..len].to_vec(),
                fail_walk_at: None,
            };
            let tally = acc.run(&prefix).unwrap();

            for (id, before) in &previous.stats {
                let after = tally.stats.get(id).unwrap_or_else(|| panic!("{id} disappeared"));
                assert!(after.loc_added >= before.loc_added, "{id} loc_added dropped");
                assert!(after.loc_removed >= before.loc_removed, "{id} loc_removed dropped");
                assert!(after.commits >= before.commits, "{id} commits dropped");
            }
            previous = tally;
        }
        assert_eq!(previous.total_commits(), 5);
    }
}
