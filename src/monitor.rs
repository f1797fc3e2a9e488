//! Monitoring pass: collect metrics for every recently active repository.
//!
//! Only the repository listing is fatal. Each per-repository sub-fetch that
//! fails is logged and replaced with its empty value.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::discovery::{Inventory, RemoteRepoRef};
use crate::error::QueryError;
use crate::github::{CiRunInfo, CommitInfo, PullRequestInfo, RepoDetails, RepositoryMetadata};
use crate::models::{
    branches_without_prs, CiRun, CiSummary, Commit, MonitoredRepository, PullRequest,
};
use crate::progress::{CancelFlag, ProgressFn, ProgressTracker};

/// Default number of CI runs inspected per repository
pub const DEFAULT_CI_RUN_LIMIT: u32 = 20;

/// Orchestrates data collection across an account's repositories
#[derive(Clone)]
pub struct ProjectMonitor {
    inventory: Arc<dyn Inventory>,
    metadata: Arc<dyn RepositoryMetadata>,
    ci_run_limit: u32,
    cancel: CancelFlag,
}

impl ProjectMonitor {
    pub fn new(inventory: Arc<dyn Inventory>, metadata: Arc<dyn RepositoryMetadata>) -> Self {
        Self {
            inventory,
            metadata,
            ci_run_limit: DEFAULT_CI_RUN_LIMIT,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_ci_run_limit(mut self, limit: u32) -> Self {
        self.ci_run_limit = limit.max(1);
        self
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Collect metrics for every repository of `owner` pushed in the last `days`
    pub async fn collect_all(
        &self,
        owner: &str,
        days: u32,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<Vec<MonitoredRepository>, QueryError> {
        let repos = self.inventory.list_repositories(owner, Some(days)).await?;
        info!("Monitoring {} repositories for {}", repos.len(), owner);

        let mut tracker = ProgressTracker::new(repos.len());
        let mut collected = Vec::with_capacity(repos.len());

        for repo in &repos {
            if self.cancel.is_cancelled() {
                warn!(
                    "Monitoring interrupted after {} of {} repositories",
                    collected.len(),
                    repos.len()
                );
                break;
            }

            debug!("Processing {}/{}", owner, repo.name);
            collected.push(self.collect_repository(owner, repo).await);

            let percent = tracker.advance();
            if let Some(progress) = progress {
                progress(percent);
            }
        }

        Ok(collected)
    }

    /// Collect every metric for one repository
    pub async fn collect_repository(
        &self,
        owner: &str,
        repo: &RemoteRepoRef,
    ) -> MonitoredRepository {
        let name = repo.name.as_str();
        let now = Utc::now();

        let last_commit = self
            .metadata
            .last_commit(owner, name)
            .await
            .unwrap_or_else(|e| degrade("last commit", owner, name, e))
            .map(|info| commit_from(info, now));

        let open_prs = self
            .metadata
            .open_pull_requests(owner, name)
            .await
            .unwrap_or_else(|e| degrade("open pull requests", owner, name, e))
            .into_iter()
            .map(|pr| pull_request_from(pr, now))
            .collect();

        let branches = self
            .metadata
            .branches(owner, name)
            .await
            .unwrap_or_else(|e| degrade("branches", owner, name, e));
        let pr_branches: HashSet<String> = self
            .metadata
            .pr_branches(owner, name)
            .await
            .unwrap_or_else(|e| degrade("pull request branches", owner, name, e));

        let pages = self
            .metadata
            .pages(owner, name)
            .await
            .unwrap_or_else(|e| degrade("pages", owner, name, e));

        let ci_recent_runs: Vec<CiRun> = self
            .metadata
            .ci_runs(owner, name, self.ci_run_limit)
            .await
            .unwrap_or_else(|e| degrade("CI runs", owner, name, e))
            .into_iter()
            .map(|run| ci_run_from(run, now))
            .collect();
        let ci = CiSummary::from_runs(&ci_recent_runs);

        let details: RepoDetails = self
            .metadata
            .repo_details(owner, name)
            .await
            .unwrap_or_else(|e| degrade("repository details", owner, name, e));

        MonitoredRepository {
            name: name.to_string(),
            owner: owner.to_string(),
            full_name: format!("{}/{}", owner, name),
            url: repo
                .url
                .clone()
                .unwrap_or_else(|| format!("https://github.com/{}/{}", owner, name)),
            last_commit,
            open_prs,
            branches_without_prs: branches_without_prs(&branches, &pr_branches),
            pages_enabled: pages.is_some(),
            pages_url: pages.and_then(|p| p.html_url),
            ci_status: ci.status,
            ci_recent_runs,
            ci_success_rate: ci.success_rate,
            last_updated: now,
            stars: details.stargazer_count,
            forks: details.fork_count,
            open_issues: details.open_issues.total_count,
            primary_language: details.primary_language.and_then(|l| l.name),
        }
    }
}

fn degrade<T: Default>(what: &str, owner: &str, repo: &str, error: QueryError) -> T {
    warn!("Could not fetch {} for {}/{}: {}", what, owner, repo, error);
    T::default()
}

pub(crate) fn commit_from(info: CommitInfo, now: DateTime<Utc>) -> Commit {
    let author = info.commit.author.unwrap_or_default();
    Commit {
        sha: info.sha,
        message: info.commit.message.lines().next().unwrap_or_default().to_string(),
        author: author.name.unwrap_or_else(|| "Unknown".to_string()),
        date: author.date.unwrap_or(now),
    }
}

pub(crate) fn pull_request_from(info: PullRequestInfo, now: DateTime<Utc>) -> PullRequest {
    PullRequest {
        number: info.number,
        title: info.title,
        created_at: info.created_at,
        author: info
            .author
            .and_then(|a| a.login)
            .unwrap_or_else(|| "Unknown".to_string()),
        age_days: (now - info.created_at).num_days(),
        url: info.url,
    }
}

pub(crate) fn ci_run_from(info: CiRunInfo, now: DateTime<Utc>) -> CiRun {
    CiRun {
        name: info.name,
        status: info.status,
        conclusion: info.conclusion,
        created_at: info.created_at.unwrap_or(now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::{CommitAuthor, CommitDetail, Login};
    use chrono::Duration;

    #[test]
    fn test_commit_keeps_first_line() {
        let now = Utc::now();
        let info = CommitInfo {
            sha: "abc123".to_string(),
            commit: CommitDetail {
                message: "Fix parser\n\nLonger explanation".to_string(),
                author: Some(CommitAuthor {
                    name: Some("Jane".to_string()),
                    date: Some(now - Duration::days(1)),
                }),
            },
        };

        let commit = commit_from(info, now);
        assert_eq!(commit.message, "Fix parser");
        assert_eq!(commit.author, "Jane");
        assert_eq!(commit.date, now - Duration::days(1));
    }

    #[test]
    fn test_commit_defaults() {
        let now = Utc::now();
        let commit = commit_from(CommitInfo::default(), now);
        assert_eq!(commit.message, "");
        assert_eq!(commit.author, "Unknown");
        assert_eq!(commit.date, now);
    }

    #[test]
    fn test_pull_request_age_and_missing_author() {
        let now = Utc::now();
        let pr = pull_request_from(
            PullRequestInfo {
                number: 42,
                title: "Add feature".to_string(),
                created_at: now - Duration::days(5),
                author: None,
                url: "https://github.com/acme/tool/pull/42".to_string(),
            },
            now,
        );
        assert_eq!(pr.age_days, 5);
        assert_eq!(pr.author, "Unknown");

        let with_author = pull_request_from(
            PullRequestInfo {
                number: 43,
                title: "Other".to_string(),
                created_at: now,
                author: Some(Login {
                    login: Some("octocat".to_string()),
                }),
                url: String::new(),
            },
            now,
        );
        assert_eq!(with_author.author, "octocat");
        assert_eq!(with_author.age_days, 0);
    }

    #[test]
    fn test_ci_run_missing_timestamp() {
        let now = Utc::now();
        let run = ci_run_from(
            CiRunInfo {
                name: "CI".to_string(),
                status: "queued".to_string(),
                conclusion: None,
                created_at: None,
            },
            now,
        );
        assert_eq!(run.created_at, now);
        assert!(run.conclusion.is_none());
    }
}
