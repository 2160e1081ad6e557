use crate::config::RankMetric;
use crate::model::{ContributorStats, Identity, RankedEntry};
use std::cmp::Reverse;
use std::collections::HashMap;

impl RankMetric {
    pub fn score(self, stats: &ContributorStats) -> i128 {
        match self {
            RankMetric::Added => i128::from(stats.loc_added),
            RankMetric::Net => stats.net(),
        }
    }
}

/// Order contributors by `metric` (highest first), breaking ties on the
/// identity string, and number them 1..=N.
pub fn rank(stats: &HashMap<Identity, ContributorStats>, metric: RankMetric) -> Vec<RankedEntry> {
    let mut rows: Vec<(&Identity, &ContributorStats)> = stats.iter().collect();
    rows.sort_by_key(|(identity, s)| (Reverse(metric.score(s)), *identity));

    rows.into_iter()
        .enumerate()
        .map(|(i, (identity, s))| RankedEntry::new(i + 1, identity.clone(), s))
        .collect()
}
