use crate::config::{
    Format, LeaderboardConfig, MailmapSource, OutputTarget, RankMetric, RootPolicy, WalkOptions,
    DEFAULT_JSON_FILE, DEFAULT_MARKDOWN_FILE, DEFAULT_TABLE_LIMIT,
};
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "glead")]
#[command(about = "Rank contributors of a git repository by lines added, lines removed and commits")]
#[command(version)]
pub struct Cli {
    #[arg(long, help = "Path to git repository")]
    pub repo: Option<PathBuf>,

    #[arg(long, help = "Revision to walk history from (default: HEAD)")]
    pub rev: Option<String>,

    #[arg(long, help = "Start from this commit or date (RFC3339, YYYY-MM-DD, or natural language)")]
    pub since: Option<String>,

    #[arg(long, help = "End at this commit or date (RFC3339, YYYY-MM-DD, or natural language)")]
    pub until: Option<String>,

    #[arg(long, help = "Alias file mapping extra emails to a canonical one (default: <repo>/.mailmap)")]
    pub mailmap: Option<PathBuf>,

    #[arg(long, conflicts_with = "mailmap", help = "Ignore any alias file")]
    pub no_mailmap: bool,

    #[arg(long, value_enum, default_value_t = RootPolicy::Inclusive, help = "How to treat commits without a parent")]
    pub root_policy: RootPolicy,

    #[arg(long, value_enum, default_value_t = RankMetric::Added, help = "Metric the leaderboard is sorted by")]
    pub metric: RankMetric,

    #[arg(long, help = "Skip merge commits")]
    pub no_merges: bool,

    #[arg(
        long,
        value_name = "PATH",
        num_args = 0..=1,
        default_missing_value = DEFAULT_MARKDOWN_FILE,
        help = "Write a Markdown leaderboard ('-' for stdout)"
    )]
    pub markdown: Option<PathBuf>,

    #[arg(
        long,
        value_name = "PATH",
        num_args = 0..=1,
        default_missing_value = DEFAULT_JSON_FILE,
        help = "Write a JSON leaderboard ('-' for stdout)"
    )]
    pub json: Option<PathBuf>,

    #[arg(long, default_value_t = DEFAULT_TABLE_LIMIT, help = "Rows shown in the terminal table")]
    pub limit: usize,

    #[arg(long, help = "Show a progress spinner while walking history")]
    pub progress: bool,

    #[arg(short, long, help = "Enable debug logging")]
    pub verbose: bool,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn execute(self) -> Result<()> {
        init_logging(self.verbose);
        crate::leaderboard::exec(self.into_config())
    }

    pub fn into_config(self) -> LeaderboardConfig {
        let mailmap = match (self.no_mailmap, self.mailmap) {
            (true, _) => MailmapSource::Disabled,
            (false, Some(path)) => MailmapSource::File(path),
            (false, None) => MailmapSource::Repository,
        };

        let mut outputs = Vec::new();
        if let Some(path) = self.markdown {
            outputs.push(OutputTarget::new(Format::Markdown, path));
        }
        if let Some(path) = self.json {
            outputs.push(OutputTarget::new(Format::Json, path));
        }

        LeaderboardConfig {
            repo: self.repo,
            rev: self.rev,
            since: self.since,
            until: self.until,
            mailmap,
            walk: WalkOptions {
                root_policy: self.root_policy,
                include_merges: !self.no_merges,
            },
            metric: self.metric,
            outputs,
            limit: self.limit,
            progress: self.progress,
        }
    }
}

/// Log to stderr; `RUST_LOG` takes precedence over `--verbose`.
fn init_logging(verbose: bool) {
    let default = if verbose { "glead=debug" } else { "glead=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
