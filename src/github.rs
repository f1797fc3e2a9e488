//! GitHub access through the `gh` CLI
//!
//! Every call shells out to an authenticated `gh` session. Responses are parsed
//! into typed structs right here; missing fields fall back to explicit defaults.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashSet;
use tokio::process::Command as AsyncCommand;
use tracing::debug;

use crate::discovery::{filter_recent, Inventory, RemoteRepoRef};
use crate::error::QueryError;

/// Maximum repositories returned by a listing
pub const REPO_LIST_LIMIT: u32 = 1000;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepoListing {
    name: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    ssh_url: Option<String>,
    #[serde(default)]
    pushed_at: Option<DateTime<Utc>>,
}

impl From<RepoListing> for RemoteRepoRef {
    fn from(listing: RepoListing) -> Self {
        Self {
            name: listing.name,
            url: listing.url,
            ssh_url: listing.ssh_url,
            pushed_at: listing.pushed_at,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct CommitAuthor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct CommitDetail {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub author: Option<CommitAuthor>,
}

/// `repos/{owner}/{repo}/commits/{ref}`
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct CommitInfo {
    #[serde(default)]
    pub sha: String,
    #[serde(default)]
    pub commit: CommitDetail,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Login {
    #[serde(default)]
    pub login: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestInfo {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub author: Option<Login>,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullRequestHead {
    #[serde(default)]
    head_ref_name: String,
}

/// `repos/{owner}/{repo}/pages`
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PagesInfo {
    #[serde(default)]
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CiRunInfo {
    #[serde(default = "unknown")]
    pub name: String,
    #[serde(default = "unknown")]
    pub status: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub conclusion: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IssueCount {
    #[serde(default)]
    pub total_count: u64,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Language {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RepoDetails {
    #[serde(default)]
    pub stargazer_count: u64,
    #[serde(default)]
    pub fork_count: u64,
    #[serde(default)]
    pub open_issues: IssueCount,
    #[serde(default)]
    pub primary_language: Option<Language>,
}

fn unknown() -> String {
    "unknown".to_string()
}

/// gh reports unfinished runs with an empty conclusion string
fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// Per-repository metadata used in monitoring mode
#[async_trait]
pub trait RepositoryMetadata: Send + Sync {
    /// Latest commit on `main`, falling back to `master`
    async fn last_commit(&self, owner: &str, repo: &str) -> Result<Option<CommitInfo>, QueryError>;

    async fn open_pull_requests(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<PullRequestInfo>, QueryError>;

    async fn branches(&self, owner: &str, repo: &str) -> Result<Vec<String>, QueryError>;

    /// Head branches of every pull request, open or closed
    async fn pr_branches(&self, owner: &str, repo: &str) -> Result<HashSet<String>, QueryError>;

    /// `None` when pages are not enabled
    async fn pages(&self, owner: &str, repo: &str) -> Result<Option<PagesInfo>, QueryError>;

    /// Most recent runs, newest first
    async fn ci_runs(&self, owner: &str, repo: &str, limit: u32)
        -> Result<Vec<CiRunInfo>, QueryError>;

    async fn repo_details(&self, owner: &str, repo: &str) -> Result<RepoDetails, QueryError>;
}

/// GitHub client wrapper around the `gh` binary
#[derive(Debug, Clone)]
pub struct GhCli {
    program: String,
}

impl Default for GhCli {
    fn default() -> Self {
        Self::new()
    }
}

impl GhCli {
    pub fn new() -> Self {
        Self {
            program: "gh".to_string(),
        }
    }

    /// Use a different executable (mainly for tests)
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<String, QueryError> {
        let command = args.iter().take(2).copied().collect::<Vec<_>>().join(" ");
        debug!("{} {}", self.program, args.join(" "));

        let output = AsyncCommand::new(&self.program)
            .args(args)
            .env("GH_PROMPT_DISABLED", "1")
            .output()
            .await?;

        if !output.status.success() {
            return Err(QueryError::CommandFailed {
                command,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Run gh and parse its JSON output; empty output yields the default value
    async fn run_json<T>(&self, args: &[&str]) -> Result<T, QueryError>
    where
        T: DeserializeOwned + Default,
    {
        let stdout = self.run(args).await?;
        parse_json(args, &stdout)
    }
}

fn parse_json<T>(args: &[&str], stdout: &str) -> Result<T, QueryError>
where
    T: DeserializeOwned + Default,
{
    if stdout.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(stdout).map_err(|source| QueryError::Malformed {
        command: args.iter().take(2).copied().collect::<Vec<_>>().join(" "),
        source,
    })
}

#[async_trait]
impl Inventory for GhCli {
    async fn list_repositories(
        &self,
        account: &str,
        since_days: Option<u32>,
    ) -> Result<Vec<RemoteRepoRef>, QueryError> {
        let limit = REPO_LIST_LIMIT.to_string();
        let listings: Vec<RepoListing> = self
            .run_json(&[
                "repo",
                "list",
                account,
                "--json",
                "name,url,sshUrl,pushedAt",
                "--limit",
                &limit,
            ])
            .await?;

        let repos: Vec<RemoteRepoRef> = listings.into_iter().map(RemoteRepoRef::from).collect();
        debug!("gh listed {} repositories for {}", repos.len(), account);

        Ok(filter_recent(repos, since_days, Utc::now()))
    }
}

#[async_trait]
impl RepositoryMetadata for GhCli {
    async fn last_commit(&self, owner: &str, repo: &str) -> Result<Option<CommitInfo>, QueryError> {
        let main = format!("repos/{}/{}/commits/main", owner, repo);
        match self.run_json::<CommitInfo>(&["api", &main]).await {
            Ok(commit) => Ok(Some(commit)),
            Err(e) => {
                debug!("No main branch commit for {}/{}: {}", owner, repo, e);
                let master = format!("repos/{}/{}/commits/master", owner, repo);
                match self.run_json::<CommitInfo>(&["api", &master]).await {
                    Ok(commit) => Ok(Some(commit)),
                    Err(QueryError::CommandFailed { .. }) => Ok(None),
                    Err(e) => Err(e),
                }
            }
        }
    }

    async fn open_pull_requests(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<PullRequestInfo>, QueryError> {
        let full_name = format!("{}/{}", owner, repo);
        self.run_json(&[
            "pr",
            "list",
            "--repo",
            &full_name,
            "--state",
            "open",
            "--json",
            "number,title,createdAt,author,url",
            "--limit",
            "100",
        ])
        .await
    }

    async fn branches(&self, owner: &str, repo: &str) -> Result<Vec<String>, QueryError> {
        let endpoint = format!("repos/{}/{}/branches", owner, repo);
        // --jq flattens every page into one name per line
        let stdout = self
            .run(&["api", &endpoint, "--paginate", "--jq", ".[].name"])
            .await?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn pr_branches(&self, owner: &str, repo: &str) -> Result<HashSet<String>, QueryError> {
        let full_name = format!("{}/{}", owner, repo);
        let heads: Vec<PullRequestHead> = self
            .run_json(&[
                "pr",
                "list",
                "--repo",
                &full_name,
                "--state",
                "all",
                "--json",
                "headRefName",
                "--limit",
                "1000",
            ])
            .await?;
        Ok(heads.into_iter().map(|h| h.head_ref_name).collect())
    }

    async fn pages(&self, owner: &str, repo: &str) -> Result<Option<PagesInfo>, QueryError> {
        let endpoint = format!("repos/{}/{}/pages", owner, repo);
        match self.run_json::<PagesInfo>(&["api", &endpoint]).await {
            Ok(pages) => Ok(Some(pages)),
            // 404 when pages are disabled
            Err(QueryError::CommandFailed { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn ci_runs(
        &self,
        owner: &str,
        repo: &str,
        limit: u32,
    ) -> Result<Vec<CiRunInfo>, QueryError> {
        let full_name = format!("{}/{}", owner, repo);
        let limit = limit.to_string();
        self.run_json(&[
            "run",
            "list",
            "--repo",
            &full_name,
            "--limit",
            &limit,
            "--json",
            "status,conclusion,name,createdAt",
        ])
        .await
    }

    async fn repo_details(&self, owner: &str, repo: &str) -> Result<RepoDetails, QueryError> {
        let full_name = format!("{}/{}", owner, repo);
        self.run_json(&[
            "repo",
            "view",
            &full_name,
            "--json",
            "stargazerCount,forkCount,openIssues,primaryLanguage",
        ])
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_parse_repo_listing() {
        let stdout = r#"[
            {"name":"tool","url":"https://github.com/acme/tool","sshUrl":"git@github.com:acme/tool.git","pushedAt":"2024-05-01T10:00:00Z"},
            {"name":"bare"}
        ]"#;
        let listings: Vec<RepoListing> = parse_json(&["repo", "list"], stdout).unwrap();
        let repos: Vec<RemoteRepoRef> = listings.into_iter().map(RemoteRepoRef::from).collect();

        assert_eq!(repos.len(), 2);
        assert_eq!(repos[0].ssh_url.as_deref(), Some("git@github.com:acme/tool.git"));
        assert!(repos[0].pushed_at.is_some());
        assert!(repos[1].url.is_none());
        assert!(repos[1].clone_endpoint().is_none());
    }

    #[test]
    fn test_parse_empty_output_is_default() {
        let listings: Vec<RepoListing> = parse_json(&["repo", "list"], "  \n").unwrap();
        assert!(listings.is_empty());
    }

    #[test]
    fn test_parse_malformed_output() {
        let result: Result<Vec<RepoListing>, _> = parse_json(&["repo", "list"], "not json");
        assert_matches!(
            result,
            Err(QueryError::Malformed { command, .. }) if command == "repo list"
        );
    }

    #[test]
    fn test_ci_run_blank_conclusion_is_none() {
        let stdout = r#"[
            {"name":"CI","status":"in_progress","conclusion":"","createdAt":"2024-05-01T10:00:00Z"},
            {"name":"CI","status":"completed","conclusion":"success","createdAt":"2024-04-30T10:00:00Z"},
            {"status":"queued","conclusion":null}
        ]"#;
        let runs: Vec<CiRunInfo> = parse_json(&["run", "list"], stdout).unwrap();

        assert_eq!(runs[0].conclusion, None);
        assert_eq!(runs[1].conclusion.as_deref(), Some("success"));
        assert_eq!(runs[2].conclusion, None);
        assert_eq!(runs[2].name, "unknown");
        assert!(runs[2].created_at.is_none());
    }

    #[test]
    fn test_parse_repo_details_defaults() {
        let details: RepoDetails =
            parse_json(&["repo", "view"], r#"{"stargazerCount": 12}"#).unwrap();
        assert_eq!(details.stargazer_count, 12);
        assert_eq!(details.fork_count, 0);
        assert_eq!(details.open_issues.total_count, 0);
        assert!(details.primary_language.is_none());

        let full: RepoDetails = parse_json(
            &["repo", "view"],
            r#"{"stargazerCount":3,"forkCount":1,"openIssues":{"totalCount":4},"primaryLanguage":{"name":"Rust"}}"#,
        )
        .unwrap();
        assert_eq!(full.open_issues.total_count, 4);
        assert_eq!(
            full.primary_language.and_then(|l| l.name).as_deref(),
            Some("Rust")
        );
    }

    #[test]
    fn test_parse_commit() {
        let stdout = r#"{"sha":"abc123","commit":{"message":"Fix bug\n\nDetails","author":{"name":"Jane","date":"2024-05-01T10:00:00Z"}}}"#;
        let commit: CommitInfo = parse_json(&["api", "repos"], stdout).unwrap();
        assert_eq!(commit.sha, "abc123");
        assert_eq!(commit.commit.author.unwrap().name.as_deref(), Some("Jane"));
    }

    #[tokio::test]
    async fn test_missing_binary_is_query_error() {
        let gh = GhCli::with_program("gh-binary-that-does-not-exist");
        let result = gh.list_repositories("acme", None).await;
        assert_matches!(result, Err(QueryError::Spawn(_)));
    }
}
