use super::CommitSource;
use crate::error::{LeaderboardError, Result};
use crate::model::{CommitMeta, DateRange, LineDelta};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use gix::object::tree::diff::ChangeDetached;
use gix::{discover, ObjectId, Repository};
use similar::{ChangeTag, TextDiff};
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::debug;

const BINARY_SNIFF_LEN: usize = 8000;

pub struct GitRepo {
    repo: Repository,
    path: PathBuf,
    start: Option<String>,
    range: DateRange,
}

impl GitRepo {
    /// Open a repository at `path`, or current dir if `None`
    pub fn open<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let repo_path = match path {
            Some(p) => p.as_ref().to_path_buf(),
            None => std::env::current_dir()?,
        };

        let repo = discover(&repo_path)?;
        let path = repo.workdir().unwrap_or_else(|| repo.path()).to_path_buf();
        debug!(path = %path.display(), "opened git repository");

        Ok(Self {
            repo,
            path,
            start: None,
            range: DateRange::new(),
        })
    }

    /// Walk from `rev` instead of `HEAD`.
    pub fn with_start(mut self, rev: Option<String>) -> Self {
        self.start = rev;
        self
    }

    /// Only yield commits whose author time falls inside `range`.
    pub fn with_range(mut self, range: DateRange) -> Self {
        self.range = range;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn resolve_range(&self, since: Option<&str>, until: Option<&str>) -> Result<DateRange> {
        let mut range = DateRange::new();

        let since_dt = since.map(|s| self.parse_commit_or_date(s)).transpose()?;
        let until_dt = until.map(|u| self.parse_commit_or_date(u)).transpose()?;

        if let (Some(s), Some(u)) = (since_dt, until_dt) {
            if s > u {
                return Err(LeaderboardError::InvalidDate(format!(
                    "Invalid range: since ({s}) is after until ({u})"
                )));
            }
        }

        if let Some(s) = since_dt {
            range = range.with_since(s);
        }
        if let Some(u) = until_dt {
            range = range.with_until(u);
        }

        Ok(range)
    }

    fn parse_commit_or_date(&self, input: &str) -> Result<DateTime<Utc>> {
        if let Some(dt) = parse_date(input)? {
            return Ok(dt);
        }

        let commit = self.resolve_commit(input)?;
        let secs = commit.time()?.seconds;
        DateTime::<Utc>::from_timestamp(secs, 0)
            .ok_or_else(|| LeaderboardError::InvalidDate(format!("Invalid timestamp: {secs}")))
    }

    fn resolve_commit(&self, rev: &str) -> Result<gix::Commit<'_>> {
        let id = self
            .repo
            .rev_parse_single(rev)
            .map_err(|e| LeaderboardError::Parse(format!("Invalid revision '{rev}': {e}")))?;

        let commit = id
            .object()?
            .try_into_commit()
            .map_err(|_| LeaderboardError::Parse(format!("Not a commit: {rev}")))?;
        Ok(commit)
    }

    fn start_id(&self) -> Result<ObjectId> {
        match self.start.as_deref() {
            Some(rev) => Ok(self.resolve_commit(rev)?.id),
            None => {
                let mut head = self.repo.head()?;
                Ok(head.peel_to_commit_in_place()?.id)
            }
        }
    }

    fn tree_delta(&self, old: Option<&gix::Tree<'_>>, new: &gix::Tree<'_>) -> Result<LineDelta> {
        // renames are reported as a deletion plus an addition, like `git diff --no-renames`
        let mut options = gix::diff::Options::default();
        options.with_rewrites(None);
        let changes: Vec<ChangeDetached> = self.repo.diff_tree_to_tree(old, Some(new), options)?;

        let mut delta = LineDelta::default();
        for change in changes {
            delta += self.change_delta(change)?;
        }
        Ok(delta)
    }

    fn change_delta(&self, change: ChangeDetached) -> Result<LineDelta> {
        match change {
            ChangeDetached::Addition { id, entry_mode, .. } => {
                if skip_entry(entry_mode) {
                    return Ok(LineDelta::default());
                }
                let obj = self.repo.find_object(id)?;
                Ok(LineDelta::new(text_lines(&obj.data), 0))
            }
            ChangeDetached::Deletion { id, entry_mode, .. } => {
                if skip_entry(entry_mode) {
                    return Ok(LineDelta::default());
                }
                let obj = self.repo.find_object(id)?;
                Ok(LineDelta::new(0, text_lines(&obj.data)))
            }
            ChangeDetached::Modification {
                previous_id,
                id,
                entry_mode,
                ..
            } => {
                if skip_entry(entry_mode) {
                    return Ok(LineDelta::default());
                }
                let old_obj = self.repo.find_object(previous_id)?;
                let new_obj = self.repo.find_object(id)?;
                Ok(line_diff(&old_obj.data, &new_obj.data))
            }
            ChangeDetached::Rewrite {
                source_id,
                source_entry_mode,
                id,
                entry_mode,
                copy,
                ..
            } => {
                let mut delta = LineDelta::default();
                if !copy && !skip_entry(source_entry_mode) {
                    delta.deletions = text_lines(&self.repo.find_object(source_id)?.data);
                }
                if !skip_entry(entry_mode) {
                    delta.insertions = text_lines(&self.repo.find_object(id)?.data);
                }
                Ok(delta)
            }
        }
    }
}

impl CommitSource for GitRepo {
    fn commits(&self) -> Result<Box<dyn Iterator<Item = Result<CommitMeta>> + '_>> {
        let start = self.start_id()?;
        Ok(Box::new(CommitWalk::new(&self.repo, start, self.range.clone())))
    }

    fn line_delta(&self, commit: &CommitMeta) -> Result<LineDelta> {
        self.first_parent_delta(commit).map_err(|e| LeaderboardError::Diff {
            commit: commit.id.clone(),
            reason: e.to_string(),
        })
    }
}

impl GitRepo {
    fn first_parent_delta(&self, commit: &CommitMeta) -> Result<LineDelta> {
        let commit_id = parse_oid(&commit.id)?;
        let commit_tree = self.repo.find_commit(commit_id)?.tree()?;

        match commit.parent_ids.first() {
            Some(parent) => {
                let parent_tree = self.repo.find_commit(parse_oid(parent)?)?.tree()?;
                self.tree_delta(Some(&parent_tree), &commit_tree)
            }
            None => self.tree_delta(None, &commit_tree),
        }
    }
}

/// Lazy traversal of every commit reachable from a start point.
///
/// Each commit is yielded at most once. Commits outside the date range are
/// not yielded but their ancestors are still explored.
pub struct CommitWalk<'repo> {
    repo: &'repo Repository,
    range: DateRange,
    seen: HashSet<ObjectId>,
    stack: VecDeque<ObjectId>,
}

impl<'repo> CommitWalk<'repo> {
    pub fn new(repo: &'repo Repository, start: ObjectId, range: DateRange) -> Self {
        Self {
            repo,
            range,
            seen: HashSet::new(),
            stack: VecDeque::from([start]),
        }
    }

    fn visit(&mut self, commit_id: ObjectId) -> Result<Option<CommitMeta>> {
        let commit = self.repo.find_commit(commit_id)?;
        let secs = commit.time()?.seconds;
        let timestamp = DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| LeaderboardError::InvalidDate(format!("Invalid timestamp: {secs}")))?;

        let parents: Vec<ObjectId> = commit.parent_ids().map(|id| id.detach()).collect();
        for pid in &parents {
            self.stack.push_back(*pid);
        }

        if !self.range.contains(&timestamp) {
            return Ok(None);
        }

        let author = commit.author()?;
        Ok(Some(CommitMeta {
            id: commit_id.to_string(),
            author_name: author.name.to_string(),
            author_email: author.email.to_string(),
            timestamp,
            parent_ids: parents.iter().map(|id| id.to_string()).collect(),
        }))
    }
}

impl Iterator for CommitWalk<'_> {
    type Item = Result<CommitMeta>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(commit_id) = self.stack.pop_back() {
            if !self.seen.insert(commit_id) {
                continue;
            }

            match self.visit(commit_id) {
                Ok(Some(meta)) => return Some(Ok(meta)),
                Ok(None) => continue,
                Err(e) => {
                    self.stack.clear();
                    return Some(Err(e));
                }
            }
        }
        None
    }
}

fn parse_oid(hex: &str) -> Result<ObjectId> {
    ObjectId::from_hex(hex.as_bytes())
        .map_err(|e| LeaderboardError::Parse(format!("Invalid commit ID '{hex}': {e}")))
}

fn skip_entry(mode: gix::objs::tree::EntryMode) -> bool {
    mode.is_tree() || mode.is_commit()
}

fn is_binary(data: &[u8]) -> bool {
    data.iter().take(BINARY_SNIFF_LEN).any(|&b| b == 0)
}

fn text_lines(data: &[u8]) -> u64 {
    if is_binary(data) {
        return 0;
    }
    String::from_utf8_lossy(data).lines().count() as u64
}

/// Inserted and deleted line counts between two blobs. Binary blobs count 0.
pub(crate) fn line_diff(old: &[u8], new: &[u8]) -> LineDelta {
    if is_binary(old) || is_binary(new) {
        return LineDelta::default();
    }

    let old_text = String::from_utf8_lossy(old);
    let new_text = String::from_utf8_lossy(new);
    let diff = TextDiff::from_lines(old_text.as_ref(), new_text.as_ref());

    let mut delta = LineDelta::default();
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Insert => delta.insertions += 1,
            ChangeTag::Delete => delta.deletions += 1,
            ChangeTag::Equal => {}
        }
    }
    delta
}

/// RFC3339, `YYYY-MM-DD`, or a relative phrase. `Ok(None)` means "try it as a revision".
fn parse_date(input: &str) -> Result<Option<DateTime<Utc>>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        if let Some(datetime) = date.and_hms_opt(0, 0, 0) {
            return Ok(Some(Utc.from_utc_datetime(&datetime)));
        }
    }

    if let Some(duration) = parse_natural_duration(input) {
        let target = SystemTime::now()
            .checked_sub(duration)
            .ok_or_else(|| LeaderboardError::InvalidDate(format!("Duration overflow for '{input}'")))?;
        return Ok(Some(DateTime::<Utc>::from(target)));
    }

    Ok(None)
}

fn parse_natural_duration(input: &str) -> Option<Duration> {
    let input = input.trim().to_lowercase();

    let units: [(&str, u64); 6] = [
        (" day ago", 86400),
        (" days ago", 86400),
        (" week ago", 7 * 86400),
        (" weeks ago", 7 * 86400),
        (" month ago", 30 * 86400),
        (" months ago", 30 * 86400),
    ];

    units.iter().find_map(|(suffix, secs)| {
        let n = input.strip_suffix(suffix)?.trim().parse::<u64>().ok()?;
        Some(Duration::from_secs(n.checked_mul(*secs)?))
    })
}
