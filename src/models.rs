//! Data collected in monitoring mode and the report built from it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashSet;

/// CI pipeline status for a repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CiStatus {
    Success,
    Failure,
    Pending,
    #[serde(rename = "no_ci")]
    NoCi,
    Unknown,
}

impl CiStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CiStatus::Success => "success",
            CiStatus::Failure => "failure",
            CiStatus::Pending => "pending",
            CiStatus::NoCi => "no_ci",
            CiStatus::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Commit {
    pub sha: String,
    /// First line of the commit message
    pub message: String,
    pub author: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub author: String,
    pub age_days: i64,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CiRun {
    pub name: String,
    pub status: String,
    /// `None` while the run has not finished
    pub conclusion: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Overall CI health derived from the most recent runs (newest first).
///
/// `status` follows the newest run only; `success_rate` covers every completed
/// run. The two answer different questions and are kept apart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CiSummary {
    pub status: CiStatus,
    pub success_rate: f64,
}

impl CiSummary {
    pub fn from_runs(runs: &[CiRun]) -> Self {
        let Some(latest) = runs.first() else {
            return Self {
                status: CiStatus::NoCi,
                success_rate: 0.0,
            };
        };

        let completed: Vec<&CiRun> = runs.iter().filter(|r| r.conclusion.is_some()).collect();
        let success_rate = if completed.is_empty() {
            0.0
        } else {
            let successful = completed
                .iter()
                .filter(|r| r.conclusion.as_deref() == Some("success"))
                .count();
            successful as f64 / completed.len() as f64
        };

        let status = match latest.conclusion.as_deref() {
            Some("success") => CiStatus::Success,
            Some("failure") => CiStatus::Failure,
            None => CiStatus::Pending,
            Some(_) => CiStatus::Unknown,
        };

        Self {
            status,
            success_rate,
        }
    }
}

/// Branch names that have never had a pull request, excluding `main` and `master`
pub fn branches_without_prs(branches: &[String], pr_branches: &HashSet<String>) -> Vec<String> {
    branches
        .iter()
        .filter(|b| b.as_str() != "main" && b.as_str() != "master")
        .filter(|b| !pr_branches.contains(b.as_str()))
        .cloned()
        .collect()
}

/// A repository with all metrics collected in one monitoring pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitoredRepository {
    pub name: String,
    pub owner: String,
    pub full_name: String,
    pub url: String,
    pub last_commit: Option<Commit>,
    pub open_prs: Vec<PullRequest>,
    pub branches_without_prs: Vec<String>,
    pub pages_enabled: bool,
    pub pages_url: Option<String>,
    pub ci_status: CiStatus,
    pub ci_recent_runs: Vec<CiRun>,
    pub ci_success_rate: f64,
    pub last_updated: DateTime<Utc>,
    pub stars: u64,
    pub forks: u64,
    pub open_issues: u64,
    pub primary_language: Option<String>,
}

impl MonitoredRepository {
    /// Name of the most recent failed CI run
    pub fn last_ci_failure(&self) -> Option<&str> {
        self.ci_recent_runs
            .iter()
            .find(|run| run.conclusion.as_deref() == Some("failure"))
            .map(|run| run.name.as_str())
    }

    pub fn to_value(&self) -> Value {
        json!({
            "name": self.name,
            "owner": self.owner,
            "full_name": self.full_name,
            "url": self.url,
            "last_commit": self.last_commit.as_ref().map(|c| json!({
                "sha": c.sha,
                "message": c.message,
                "author": c.author,
                "date": c.date.to_rfc3339(),
            })),
            "open_prs": self.open_prs.iter().map(|pr| json!({
                "number": pr.number,
                "title": pr.title,
                "created_at": pr.created_at.to_rfc3339(),
                "author": pr.author,
                "age_days": pr.age_days,
                "url": pr.url,
            })).collect::<Vec<_>>(),
            "pr_count": self.open_prs.len(),
            "branches_without_prs": self.branches_without_prs,
            "branch_without_pr_count": self.branches_without_prs.len(),
            "github_pages": {
                "enabled": self.pages_enabled,
                "url": self.pages_url,
            },
            "ci": {
                "status": self.ci_status.as_str(),
                "recent_runs": self.ci_recent_runs.iter().map(|run| json!({
                    "name": run.name,
                    "status": run.status,
                    "conclusion": run.conclusion,
                    "created_at": run.created_at.to_rfc3339(),
                })).collect::<Vec<_>>(),
                "success_rate": self.ci_success_rate,
            },
            "last_updated": self.last_updated.to_rfc3339(),
            "stats": {
                "stars": self.stars,
                "forks": self.forks,
                "open_issues": self.open_issues,
                "language": self.primary_language,
            },
        })
    }
}

/// Complete monitoring report. Totals are derived from `repositories` when the
/// report is built and cannot be set separately.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorReport {
    generated_at: DateTime<Utc>,
    scan_period_days: u32,
    repositories: Vec<MonitoredRepository>,
    total_repositories: usize,
    total_open_prs: usize,
    total_branches_without_prs: usize,
}

impl MonitorReport {
    pub fn new(
        generated_at: DateTime<Utc>,
        scan_period_days: u32,
        repositories: Vec<MonitoredRepository>,
    ) -> Self {
        let total_repositories = repositories.len();
        let total_open_prs = repositories.iter().map(|r| r.open_prs.len()).sum();
        let total_branches_without_prs =
            repositories.iter().map(|r| r.branches_without_prs.len()).sum();

        Self {
            generated_at,
            scan_period_days,
            repositories,
            total_repositories,
            total_open_prs,
            total_branches_without_prs,
        }
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn scan_period_days(&self) -> u32 {
        self.scan_period_days
    }

    pub fn repositories(&self) -> &[MonitoredRepository] {
        &self.repositories
    }

    pub fn total_repositories(&self) -> usize {
        self.total_repositories
    }

    pub fn total_open_prs(&self) -> usize {
        self.total_open_prs
    }

    pub fn total_branches_without_prs(&self) -> usize {
        self.total_branches_without_prs
    }

    pub fn passing_ci(&self) -> usize {
        self.count_ci(CiStatus::Success)
    }

    pub fn failing_ci(&self) -> usize {
        self.count_ci(CiStatus::Failure)
    }

    pub fn pages_enabled(&self) -> usize {
        self.repositories.iter().filter(|r| r.pages_enabled).count()
    }

    fn count_ci(&self, status: CiStatus) -> usize {
        self.repositories
            .iter()
            .filter(|r| r.ci_status == status)
            .count()
    }

    /// Structured form used by the TOON renderer
    pub fn to_value(&self) -> Value {
        json!({
            "report_metadata": {
                "generated_at": self.generated_at.to_rfc3339(),
                "scan_period_days": self.scan_period_days,
                "total_repositories": self.total_repositories,
                "total_open_prs": self.total_open_prs,
                "total_branches_without_prs": self.total_branches_without_prs,
            },
            "repositories": self.repositories.iter().map(|r| r.to_value()).collect::<Vec<_>>(),
        })
    }
}
