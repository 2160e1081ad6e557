use crate::config::{Format, OutputTarget};
use crate::error::Result;
use crate::model::{RankedEntry, WalkSummary};
use console::style;
use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;

pub const MARKDOWN_TITLE: &str = "## 📊 Contributor Leaderboard";

pub fn render_markdown(entries: &[RankedEntry]) -> String {
    let mut out = String::new();
    out.push_str(MARKDOWN_TITLE);
    out.push_str("\n\n");
    out.push_str("| Rank | Contributor | LOC Added | LOC Removed | Commits | PR Reviews |\n");
    out.push_str("|------|-------------|-----------|-------------|---------|------------|\n");

    for e in entries {
        // writing to a String cannot fail
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} |",
            e.rank,
            e.identity.as_str().replace('|', "\\|"),
            e.loc_added,
            e.loc_removed,
            e.commits,
            e.pr_reviews
        );
    }
    out
}

pub fn render_json(entries: &[RankedEntry]) -> Result<String> {
    let mut json = serde_json::to_string_pretty(entries)?;
    json.push('\n');
    Ok(json)
}

pub fn render(format: Format, entries: &[RankedEntry]) -> Result<String> {
    match format {
        Format::Markdown => Ok(render_markdown(entries)),
        Format::Json => render_json(entries),
    }
}

/// Render every target, stage each file next to its destination, then move
/// them all into place. A failure before the final step leaves no file behind.
pub fn write_targets(targets: &[OutputTarget], entries: &[RankedEntry]) -> Result<()> {
    let rendered = targets
        .iter()
        .map(|t| render(t.format, entries).map(|body| (t, body)))
        .collect::<Result<Vec<_>>>()?;

    let mut staged = Vec::new();
    for (target, body) in &rendered {
        if target.is_stdout() {
            continue;
        }
        let dir = target
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(body.as_bytes())?;
        staged.push((*target, tmp));
    }

    for (target, tmp) in staged {
        tmp.persist(&target.path).map_err(|e| e.error)?;
        info!(path = %target.path.display(), format = ?target.format, "wrote leaderboard");
    }

    for (_, body) in rendered.iter().filter(|(t, _)| t.is_stdout()) {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(body.as_bytes())?;
        stdout.flush()?;
    }
    Ok(())
}

pub fn output_table(entries: &[RankedEntry], summary: &WalkSummary, limit: usize) -> Result<()> {
    let mut stdout = std::io::stdout().lock();

    if entries.is_empty() {
        writeln!(stdout, "No commits to rank")?;
        return Ok(());
    }

    writeln!(
        stdout,
        "{:>4}  {:<50} {:>10} {:>10} {:>8} {:>6}",
        style("Rank").bold(),
        style("Contributor").bold(),
        style("Added").bold(),
        style("Removed").bold(),
        style("Commits").bold(),
        style("PRs").bold()
    )?;
    writeln!(stdout, "{}", "─".repeat(94))?;

    for e in entries.iter().take(limit) {
        writeln!(
            stdout,
            "{:>4}  {:<50} {:>10} {:>10} {:>8} {:>6}",
            e.rank,
            truncate(e.identity.as_str(), 50),
            style(e.loc_added).green(),
            style(e.loc_removed).red(),
            e.commits,
            e.pr_reviews
        )?;
    }
    if entries.len() > limit {
        writeln!(stdout, "\n... and {} more contributors", entries.len() - limit)?;
    }

    writeln!(
        stdout,
        "\n{} commits attributed, {} skipped",
        style(summary.attributed).cyan(),
        style(summary.skipped()).dim()
    )?;
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut cut: String = s.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
