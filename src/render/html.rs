use std::fmt::Write;

use super::{ci_badge, short_sha, OutputFormat, Renderer};
use crate::error::RenderError;
use crate::models::{CiStatus, MonitorReport, MonitoredRepository};

const STYLE: &str = r#"
body { font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Helvetica, Arial, sans-serif; margin: 0; background: #f6f8fa; color: #24292f; }
header { background: #24292f; color: #fff; padding: 24px 32px; }
header h1 { margin: 0 0 8px 0; font-size: 24px; }
main { padding: 24px 32px; }
.summary { display: flex; flex-wrap: wrap; gap: 12px; margin-bottom: 24px; }
.stat { background: #fff; border: 1px solid #d0d7de; border-radius: 6px; padding: 12px 16px; min-width: 140px; }
.stat .value { font-size: 24px; font-weight: 600; }
.repo { background: #fff; border: 1px solid #d0d7de; border-radius: 6px; padding: 16px; margin-bottom: 16px; }
.repo h2 { margin-top: 0; font-size: 18px; }
.meta { color: #57606a; font-size: 14px; }
.badge { display: inline-block; padding: 2px 8px; border-radius: 12px; font-size: 12px; font-weight: 600; color: #fff; }
.badge.success { background: #1a7f37; }
.badge.failure { background: #cf222e; }
.badge.pending { background: #9a6700; }
.badge.none { background: #6e7781; }
.empty { color: #6e7781; font-style: italic; }
code { background: #eaeef2; padding: 1px 4px; border-radius: 4px; }
"#;

#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

impl Renderer for HtmlRenderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::Html
    }

    fn file_name(&self) -> &'static str {
        "report.html"
    }

    fn render(&self, report: &MonitorReport) -> Result<String, RenderError> {
        render_html(report).map_err(|e| RenderError::Encode(e.to_string()))
    }
}

fn render_html(report: &MonitorReport) -> Result<String, std::fmt::Error> {
    let mut out = String::new();

    writeln!(out, "<!DOCTYPE html>")?;
    writeln!(out, "<html lang=\"en\">")?;
    writeln!(out, "<head>")?;
    writeln!(out, "<meta charset=\"utf-8\">")?;
    writeln!(out, "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">")?;
    writeln!(out, "<title>GitHub Project Monitor Report</title>")?;
    writeln!(out, "<style>{}</style>", STYLE)?;
    writeln!(out, "</head>")?;
    writeln!(out, "<body>")?;

    writeln!(out, "<header>")?;
    writeln!(out, "<h1>GitHub Project Monitor Report</h1>")?;
    writeln!(
        out,
        "<div>Generated {} &middot; Last {} days</div>",
        report.generated_at().format("%Y-%m-%d %H:%M:%S UTC"),
        report.scan_period_days()
    )?;
    writeln!(out, "</header>")?;

    writeln!(out, "<main>")?;
    writeln!(out, "<section class=\"summary\">")?;
    for (label, value) in [
        ("Repositories", report.total_repositories()),
        ("Open PRs", report.total_open_prs()),
        ("Branches without PRs", report.total_branches_without_prs()),
        ("CI passing", report.passing_ci()),
        ("CI failing", report.failing_ci()),
        ("Pages enabled", report.pages_enabled()),
    ] {
        writeln!(
            out,
            "<div class=\"stat\"><div class=\"value\">{}</div><div class=\"meta\">{}</div></div>",
            value, label
        )?;
    }
    writeln!(out, "</section>")?;

    if report.repositories().is_empty() {
        writeln!(out, "<p class=\"empty\">No repositories with recent activity.</p>")?;
    }
    for repo in report.repositories() {
        render_repository(&mut out, repo)?;
    }

    writeln!(out, "</main>")?;
    writeln!(out, "</body>")?;
    writeln!(out, "</html>")?;

    Ok(out)
}

fn render_repository(out: &mut String, repo: &MonitoredRepository) -> std::fmt::Result {
    writeln!(out, "<article class=\"repo\">")?;
    writeln!(
        out,
        "<h2><a href=\"{}\">{}</a> <span class=\"badge {}\">{}</span></h2>",
        escape(&repo.url),
        escape(&repo.full_name),
        badge_class(repo.ci_status),
        ci_badge(repo.ci_status)
    )?;
    writeln!(
        out,
        "<div class=\"meta\">{} &middot; &#9733; {} &middot; {} forks &middot; {} open issues &middot; CI success {:.0}%</div>",
        escape(repo.primary_language.as_deref().unwrap_or("Unknown")),
        repo.stars,
        repo.forks,
        repo.open_issues,
        repo.ci_success_rate * 100.0
    )?;

    writeln!(out, "<h3>Last commit</h3>")?;
    match &repo.last_commit {
        Some(commit) => writeln!(
            out,
            "<p><code>{}</code> {} <span class=\"meta\">by {} on {}</span></p>",
            escape(short_sha(&commit.sha)),
            escape(&commit.message),
            escape(&commit.author),
            commit.date.format("%Y-%m-%d")
        )?,
        None => writeln!(out, "<p class=\"empty\">No commit information available</p>")?,
    }

    writeln!(out, "<h3>Open pull requests ({})</h3>", repo.open_prs.len())?;
    if repo.open_prs.is_empty() {
        writeln!(out, "<p class=\"empty\">No open pull requests</p>")?;
    } else {
        writeln!(out, "<ul>")?;
        for pr in &repo.open_prs {
            writeln!(
                out,
                "<li><a href=\"{}\">#{} {}</a> <span class=\"meta\">by {}, {} days old</span></li>",
                escape(&pr.url),
                pr.number,
                escape(&pr.title),
                escape(&pr.author),
                pr.age_days
            )?;
        }
        writeln!(out, "</ul>")?;
    }

    writeln!(
        out,
        "<h3>Branches without PRs ({})</h3>",
        repo.branches_without_prs.len()
    )?;
    if repo.branches_without_prs.is_empty() {
        writeln!(out, "<p class=\"empty\">None</p>")?;
    } else {
        writeln!(out, "<ul>")?;
        for branch in &repo.branches_without_prs {
            writeln!(out, "<li><code>{}</code></li>", escape(branch))?;
        }
        writeln!(out, "</ul>")?;
    }

    if let Some(failure) = repo.last_ci_failure() {
        writeln!(out, "<p class=\"meta\">Last CI failure: {}</p>", escape(failure))?;
    }

    match (repo.pages_enabled, repo.pages_url.as_deref()) {
        (true, Some(url)) => writeln!(
            out,
            "<p class=\"meta\">Pages: <a href=\"{0}\">{0}</a></p>",
            escape(url)
        )?,
        (true, None) => writeln!(out, "<p class=\"meta\">Pages: enabled</p>")?,
        (false, _) => {}
    }

    writeln!(out, "</article>")
}

fn badge_class(status: CiStatus) -> &'static str {
    match status {
        CiStatus::Success => "success",
        CiStatus::Failure => "failure",
        CiStatus::Pending => "pending",
        CiStatus::NoCi | CiStatus::Unknown => "none",
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
