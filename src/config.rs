use clap::ValueEnum;
use std::path::{Path, PathBuf};

pub const DEFAULT_MAILMAP: &str = ".mailmap";
pub const DEFAULT_MARKDOWN_FILE: &str = "leaderboard.md";
pub const DEFAULT_JSON_FILE: &str = "leaderboard.json";
pub const DEFAULT_TABLE_LIMIT: usize = 50;

/// How commits without a parent are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum RootPolicy {
    /// Attribute root commits, diffed against the empty tree.
    #[default]
    Inclusive,
    /// Skip root commits entirely.
    Exclusive,
}

/// Scalar the leaderboard is ordered by, highest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum RankMetric {
    /// Lines added.
    #[default]
    Added,
    /// Lines added minus lines removed.
    Net,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkOptions {
    pub root_policy: RootPolicy,
    pub include_merges: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            root_policy: RootPolicy::Inclusive,
            include_merges: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailmapSource {
    /// `.mailmap` in the repository work tree, if present.
    Repository,
    File(PathBuf),
    Disabled,
}

impl MailmapSource {
    pub fn path(&self, workdir: &Path) -> Option<PathBuf> {
        match self {
            MailmapSource::Repository => Some(workdir.join(DEFAULT_MAILMAP)),
            MailmapSource::File(p) => Some(p.clone()),
            MailmapSource::Disabled => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Markdown,
    Json,
}

/// Where a rendered leaderboard goes. `-` as a path means stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    pub format: Format,
    pub path: PathBuf,
}

impl OutputTarget {
    pub fn new(format: Format, path: impl Into<PathBuf>) -> Self {
        Self { format, path: path.into() }
    }

    pub fn is_stdout(&self) -> bool {
        self.path.as_os_str() == "-"
    }
}

/// Everything one run needs, resolved from the command line.
#[derive(Debug, Clone)]
pub struct LeaderboardConfig {
    pub repo: Option<PathBuf>,
    pub rev: Option<String>,
    pub since: Option<String>,
    pub until: Option<String>,
    pub mailmap: MailmapSource,
    pub walk: WalkOptions,
    pub metric: RankMetric,
    /// Empty means "print the terminal table".
    pub outputs: Vec<OutputTarget>,
    pub limit: usize,
    pub progress: bool,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            repo: None,
            rev: None,
            since: None,
            until: None,
            mailmap: MailmapSource::Repository,
            walk: WalkOptions::default(),
            metric: RankMetric::default(),
            outputs: Vec::new(),
            limit: DEFAULT_TABLE_LIMIT,
            progress: false,
        }
    }
}
