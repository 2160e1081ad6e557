use crate::alias::AliasTable;
use crate::config::{LeaderboardConfig, MailmapSource, RankMetric, WalkOptions};
use crate::error::Result;
use crate::git::{CommitSource, GitRepo};
use crate::model::{RankedEntry, WalkSummary};
use crate::output::{output_table, write_targets};
use crate::rank::rank;
use crate::tally::Accumulator;
use anyhow::Context;
use tracing::debug;

/// Ranked contributors and how the walk went.
#[derive(Debug, Clone)]
pub struct Leaderboard {
    pub entries: Vec<RankedEntry>,
    pub summary: WalkSummary,
}

/// Alias resolution, accumulation and ranking over any commit source.
pub fn build<S: CommitSource + ?Sized>(
    source: &S,
    aliases: &AliasTable,
    walk: WalkOptions,
    metric: RankMetric,
    show_progress: bool,
) -> Result<Leaderboard> {
    let tally = Accumulator::new(aliases, walk)
        .with_progress(show_progress)
        .run(source)?;
    let entries = rank(&tally.stats, metric);
    Ok(Leaderboard {
        entries,
        summary: tally.summary,
    })
}

pub fn exec(config: LeaderboardConfig) -> anyhow::Result<()> {
    let repo = GitRepo::open(config.repo.as_ref()).context("Failed to open git repository")?;

    let range = repo
        .resolve_range(config.since.as_deref(), config.until.as_deref())
        .context("Failed to resolve date range")?;
    let repo = repo.with_start(config.rev.clone()).with_range(range);

    let aliases = match config.mailmap.path(repo.path()) {
        Some(p) if config.mailmap == MailmapSource::Repository => AliasTable::load(p),
        Some(p) => AliasTable::load_explicit(p),
        None => Ok(AliasTable::new()),
    }
    .context("Failed to read alias file")?;
    debug!(aliases = aliases.len(), "alias table ready");

    let board = build(&repo, &aliases, config.walk, config.metric, config.progress)
        .context("Failed to walk commit history")?;

    if config.outputs.is_empty() {
        output_table(&board.entries, &board.summary, config.limit)?;
    } else {
        write_targets(&config.outputs, &board.entries).context("Failed to write leaderboard")?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RootPolicy;
    use crate::tally::tests::FakeSource;
    use pretty_assertions::assert_eq;

    fn jane_history() -> FakeSource {
        let mut source = FakeSource::default();
        source.push("Jane Doe", "jane@co.com", 1, Some((10, 2)));
        source.push("Jane Doe", "jane.doe@old.com", 1, Some((5, 1)));
        source
    }

    #[test]
    fn jane_collapses_to_single_first_place_entry() {
        let aliases = AliasTable::parse("Jane Doe <jane@co.com> <jane.doe@old.com>\n");
        let board = build(&jane_history(), &aliases, WalkOptions::default(), RankMetric::Added, false).unwrap();

        assert_eq!(board.entries.len(), 1);
        let top = &board.entries[0];
        assert_eq!(top.rank, 1);
        assert_eq!(top.identity.as_str(), "Jane Doe <jane@co.com>");
        assert_eq!((top.loc_added, top.loc_removed, top.commits, top.pr_reviews), (15, 3, 2, 0));
    }

    #[test]
    fn without_aliases_the_emails_stay_apart() {
        let board = build(
            &jane_history(),
            &AliasTable::new(),
            WalkOptions::default(),
            RankMetric::Added,
            false,
        )
        .unwrap();
        assert_eq!(board.entries.len(), 2);
        assert_eq!(board.entries[0].identity.as_str(), "Jane Doe <jane@co.com>");
    }

    #[test]
    fn repeated_runs_are_identical() {
        let mut source = FakeSource::default();
        for (name, added) in [("Zoe", 10), ("Adam", 10), ("Mia", 10), ("Eve", 3), ("Bo", 10)] {
            source.push(name, &format!("{}@x", name.to_lowercase()), 1, Some((added, 0)));
        }
        source.push("Root", "root@x", 0, Some((1, 0)));
        let aliases = AliasTable::new();
        let walk = WalkOptions {
            root_policy: RootPolicy::Exclusive,
            include_merges: true,
        };

        let first = build(&source, &aliases, walk, RankMetric::Added, false).unwrap();
        for _ in 0..10 {
            let again = build(&source, &aliases, walk, RankMetric::Added, false).unwrap();
            assert_eq!(again.entries, first.entries);
        }

        let order: Vec<&str> = first.entries.iter().map(|e| e.identity.name()).collect();
        assert_eq!(order, vec!["Adam", "Bo", "Mia", "Zoe", "Eve"]);
        let ranks: Vec<usize> = first.entries.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, (1..=5).collect::<Vec<_>>());
        assert_eq!(first.summary.skipped_root, 1);
    }
}
