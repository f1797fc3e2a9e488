use std::fmt::Write;

use super::{ci_badge, short_sha, OutputFormat, Renderer};
use crate::error::RenderError;
use crate::models::{MonitorReport, MonitoredRepository};

#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownRenderer;

impl Renderer for MarkdownRenderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::Markdown
    }

    fn file_name(&self) -> &'static str {
        "report.md"
    }

    fn render(&self, report: &MonitorReport) -> Result<String, RenderError> {
        render_markdown(report).map_err(|e| RenderError::Encode(e.to_string()))
    }
}

fn render_markdown(report: &MonitorReport) -> Result<String, std::fmt::Error> {
    let mut out = String::new();

    writeln!(out, "# GitHub Project Monitor Report")?;
    writeln!(out)?;
    writeln!(
        out,
        "**Generated:** {}  ",
        report.generated_at().format("%Y-%m-%d %H:%M:%S UTC")
    )?;
    writeln!(out, "**Scan Period:** Last {} days", report.scan_period_days())?;
    writeln!(out)?;

    writeln!(out, "## Summary")?;
    writeln!(out)?;
    writeln!(out, "- **Total Repositories:** {}", report.total_repositories())?;
    writeln!(out, "- **Open Pull Requests:** {}", report.total_open_prs())?;
    writeln!(out, "- **Branches Without PRs:** {}", report.total_branches_without_prs())?;
    writeln!(out, "- **CI Passing:** {}", report.passing_ci())?;
    writeln!(out, "- **CI Failing:** {}", report.failing_ci())?;
    writeln!(out, "- **GitHub Pages Enabled:** {}", report.pages_enabled())?;

    for repo in report.repositories() {
        writeln!(out)?;
        writeln!(out, "---")?;
        writeln!(out)?;
        render_repository(&mut out, repo)?;
    }

    Ok(out)
}

fn render_repository(out: &mut String, repo: &MonitoredRepository) -> std::fmt::Result {
    writeln!(out, "## [{}]({})", repo.full_name, repo.url)?;
    writeln!(out)?;
    writeln!(
        out,
        "**Language:** {} | **Stars:** {} | **Forks:** {} | **Open Issues:** {}",
        repo.primary_language.as_deref().unwrap_or("Unknown"),
        repo.stars,
        repo.forks,
        repo.open_issues
    )?;
    writeln!(out)?;

    writeln!(out, "### Last Commit")?;
    writeln!(out)?;
    match &repo.last_commit {
        Some(commit) => writeln!(
            out,
            "`{}` {} by {} on {}",
            short_sha(&commit.sha),
            escape(&commit.message),
            commit.author,
            commit.date.format("%Y-%m-%d")
        )?,
        None => writeln!(out, "_No commit information available_")?,
    }
    writeln!(out)?;

    writeln!(out, "### Open Pull Requests ({})", repo.open_prs.len())?;
    writeln!(out)?;
    if repo.open_prs.is_empty() {
        writeln!(out, "_No open pull requests_")?;
    }
    for pr in &repo.open_prs {
        writeln!(
            out,
            "- [#{} {}]({}) by {}, {} days old",
            pr.number,
            escape(&pr.title),
            pr.url,
            pr.author,
            pr.age_days
        )?;
    }
    writeln!(out)?;

    writeln!(out, "### Branches Without PRs ({})", repo.branches_without_prs.len())?;
    writeln!(out)?;
    if repo.branches_without_prs.is_empty() {
        writeln!(out, "_None_")?;
    }
    for branch in &repo.branches_without_prs {
        writeln!(out, "- `{}`", branch)?;
    }
    writeln!(out)?;

    writeln!(out, "### CI Status")?;
    writeln!(out)?;
    write!(
        out,
        "**{}** ({:.0}% success rate)",
        ci_badge(repo.ci_status),
        repo.ci_success_rate * 100.0
    )?;
    if let Some(failure) = repo.last_ci_failure() {
        write!(out, ", last failure: {}", escape(failure))?;
    }
    writeln!(out)?;
    writeln!(out)?;

    writeln!(out, "### GitHub Pages")?;
    writeln!(out)?;
    match (repo.pages_enabled, repo.pages_url.as_deref()) {
        (true, Some(url)) => writeln!(out, "Enabled: {}", url),
        (true, None) => writeln!(out, "Enabled"),
        (false, _) => writeln!(out, "Disabled"),
    }
}

/// Keep free text from turning into links or emphasis
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '[' | ']' | '*' | '_' | '`' | '<' | '>') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
