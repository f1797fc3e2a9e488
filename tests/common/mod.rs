//! Shared fakes for the inventory, metadata and git ports
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration as StdDuration;

use gh_monitor::discovery::filter_recent;
use gh_monitor::github::{CiRunInfo, CommitInfo, PagesInfo, PullRequestInfo, RepoDetails};
use gh_monitor::{GitOps, Inventory, QueryError, RemoteRepoRef, RepositoryMetadata, SyncToolError};

pub fn remote(name: &str) -> RemoteRepoRef {
    RemoteRepoRef::new(name)
        .with_url(format!("https://github.com/acme/{}", name))
        .with_ssh_url(format!("git@github.com:acme/{}.git", name))
        .pushed(Utc::now() - Duration::days(1))
}

pub fn command_failed(stderr: &str) -> QueryError {
    QueryError::CommandFailed {
        command: "api repos".to_string(),
        stderr: stderr.to_string(),
    }
}

/// Inventory returning a fixed listing
#[derive(Default)]
pub struct FakeInventory {
    repos: Vec<RemoteRepoRef>,
    fail: bool,
    pub requests: Mutex<Vec<(String, Option<u32>)>>,
}

impl FakeInventory {
    pub fn new(repos: Vec<RemoteRepoRef>) -> Self {
        Self {
            repos,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl Inventory for FakeInventory {
    async fn list_repositories(
        &self,
        account: &str,
        since_days: Option<u32>,
    ) -> Result<Vec<RemoteRepoRef>, QueryError> {
        self.requests
            .lock()
            .unwrap()
            .push((account.to_string(), since_days));
        if self.fail {
            return Err(QueryError::CommandFailed {
                command: "repo list".to_string(),
                stderr: "HTTP 401: Bad credentials".to_string(),
            });
        }
        Ok(filter_recent(self.repos.clone(), since_days, Utc::now()))
    }
}

/// Scripted behaviour of one local checkout
#[derive(Debug, Clone)]
pub struct RepoScript {
    pub status: Result<String, SyncToolError>,
    pub branch: Option<String>,
    pub fetch: Result<(), SyncToolError>,
    pub behind: Result<u32, SyncToolError>,
    pub pull: Result<String, SyncToolError>,
}

impl Default for RepoScript {
    fn default() -> Self {
        Self {
            status: Ok(String::new()),
            branch: Some("main".to_string()),
            fetch: Ok(()),
            behind: Ok(0),
            pull: Ok("Fast-forward".to_string()),
        }
    }
}

impl RepoScript {
    pub fn current() -> Self {
        Self::default()
    }

    pub fn dirty() -> Self {
        Self {
            status: Ok(" M src/lib.rs\n".to_string()),
            ..Self::default()
        }
    }

    pub fn behind(count: u32) -> Self {
        Self {
            behind: Ok(count),
            ..Self::default()
        }
    }

    pub fn diverged() -> Self {
        Self {
            behind: Ok(1),
            pull: Err(SyncToolError::new(
                "pull",
                "fatal: Not possible to fast-forward, aborting.",
            )),
            ..Self::default()
        }
    }
}

/// Git double keyed by the checkout's directory name
#[derive(Default)]
pub struct FakeGit {
    scripts: HashMap<String, RepoScript>,
    clone_failures: HashMap<String, String>,
    panics_on_clone: HashSet<String>,
    clone_delay: Option<StdDuration>,
    calls: Mutex<Vec<(String, String)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeGit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repo(mut self, name: &str, script: RepoScript) -> Self {
        self.scripts.insert(name.to_string(), script);
        self
    }

    pub fn with_clone_failure(mut self, name: &str, message: &str) -> Self {
        self.clone_failures
            .insert(name.to_string(), message.to_string());
        self
    }

    pub fn with_clone_panic(mut self, name: &str) -> Self {
        self.panics_on_clone.insert(name.to_string());
        self
    }

    pub fn with_clone_delay(mut self, delay: StdDuration) -> Self {
        self.clone_delay = Some(delay);
        self
    }

    /// `(operation, repository)` in call order
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, op: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|(o, _)| o == op)
            .map(|(_, repo)| repo)
            .collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, op: &str, path: &Path) -> String {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.calls
            .lock()
            .unwrap()
            .push((op.to_string(), name.clone()));
        name
    }

    fn script(&self, name: &str) -> RepoScript {
        self.scripts.get(name).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl GitOps for FakeGit {
    async fn status(&self, path: &Path) -> Result<String, SyncToolError> {
        let name = self.record("status", path);
        self.script(&name).status
    }

    async fn current_branch(&self, path: &Path) -> Result<Option<String>, SyncToolError> {
        let name = self.record("branch", path);
        Ok(self.script(&name).branch)
    }

    async fn fetch(&self, path: &Path) -> Result<(), SyncToolError> {
        let name = self.record("fetch", path);
        self.script(&name).fetch
    }

    async fn behind_count(&self, path: &Path) -> Result<u32, SyncToolError> {
        let name = self.record("behind", path);
        self.script(&name).behind
    }

    async fn pull(&self, path: &Path) -> Result<String, SyncToolError> {
        let name = self.record("pull", path);
        self.script(&name).pull
    }

    async fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), SyncToolError> {
        let name = self.record("clone", dest);
        if self.panics_on_clone.contains(&name) {
            panic!("clone of {} exploded", url);
        }

        let active = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(active, Ordering::SeqCst);
        if let Some(delay) = self.clone_delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(message) = self.clone_failures.get(&name) {
            return Err(SyncToolError::new("clone", message.clone()));
        }
        std::fs::create_dir_all(dest.join(".git"))
            .map_err(|e| SyncToolError::new("clone", e.to_string()))?;
        Ok(())
    }
}

/// Canned metadata for one repository
#[derive(Debug, Clone, Default)]
pub struct RepoMetadata {
    pub commit: Option<CommitInfo>,
    pub pull_requests: Vec<PullRequestInfo>,
    pub branches: Vec<String>,
    pub pr_branches: HashSet<String>,
    pub pages: Option<PagesInfo>,
    pub runs: Vec<CiRunInfo>,
    pub details: RepoDetails,
}

/// Metadata double; repositories listed in `failing` error on every call
#[derive(Default)]
pub struct FakeMetadata {
    repos: HashMap<String, RepoMetadata>,
    failing: HashSet<String>,
    pub ci_limits: Mutex<Vec<u32>>,
}

impl FakeMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repo(mut self, name: &str, metadata: RepoMetadata) -> Self {
        self.repos.insert(name.to_string(), metadata);
        self
    }

    pub fn failing_for(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    fn get(&self, repo: &str) -> Result<RepoMetadata, QueryError> {
        if self.failing.contains(repo) {
            return Err(command_failed("HTTP 502: Bad Gateway"));
        }
        Ok(self.repos.get(repo).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl RepositoryMetadata for FakeMetadata {
    async fn last_commit(
        &self,
        _owner: &str,
        repo: &str,
    ) -> Result<Option<CommitInfo>, QueryError> {
        Ok(self.get(repo)?.commit)
    }

    async fn open_pull_requests(
        &self,
        _owner: &str,
        repo: &str,
    ) -> Result<Vec<PullRequestInfo>, QueryError> {
        Ok(self.get(repo)?.pull_requests)
    }

    async fn branches(&self, _owner: &str, repo: &str) -> Result<Vec<String>, QueryError> {
        Ok(self.get(repo)?.branches)
    }

    async fn pr_branches(&self, _owner: &str, repo: &str) -> Result<HashSet<String>, QueryError> {
        Ok(self.get(repo)?.pr_branches)
    }

    async fn pages(&self, _owner: &str, repo: &str) -> Result<Option<PagesInfo>, QueryError> {
        Ok(self.get(repo)?.pages)
    }

    async fn ci_runs(
        &self,
        _owner: &str,
        repo: &str,
        limit: u32,
    ) -> Result<Vec<CiRunInfo>, QueryError> {
        self.ci_limits.lock().unwrap().push(limit);
        Ok(self.get(repo)?.runs)
    }

    async fn repo_details(&self, _owner: &str, repo: &str) -> Result<RepoDetails, QueryError> {
        Ok(self.get(repo)?.details)
    }
}
