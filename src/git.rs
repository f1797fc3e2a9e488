use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio::process::Command as AsyncCommand;
use tracing::{debug, warn};

use crate::error::SyncToolError;

/// Local git operations used by the prober and the sync engine.
///
/// Every call is a blocking round-trip to the `git` binary; `fetch`, `pull`
/// and `clone` may hit the network.
#[async_trait]
pub trait GitOps: Send + Sync {
    /// `git status --porcelain` output (empty when clean)
    async fn status(&self, path: &Path) -> Result<String, SyncToolError>;

    /// Checked-out branch, `None` when HEAD is detached
    async fn current_branch(&self, path: &Path) -> Result<Option<String>, SyncToolError>;

    /// Update remote-tracking refs
    async fn fetch(&self, path: &Path) -> Result<(), SyncToolError>;

    /// Number of upstream commits missing from HEAD
    async fn behind_count(&self, path: &Path) -> Result<u32, SyncToolError>;

    /// Fast-forward-only pull
    async fn pull(&self, path: &Path) -> Result<String, SyncToolError>;

    async fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), SyncToolError>;
}

/// Represents the state of a local checkout for sync decision making.
///
/// Derived fresh on every pass; nothing here is cached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalRepoState {
    pub exists: bool,
    pub is_repo: bool,
    pub is_clean: bool,
    pub current_branch: Option<String>,
    pub ahead_behind_known: bool,
    pub behind_count: u32,
}

impl LocalRepoState {
    pub fn missing() -> Self {
        Self::default()
    }

    pub fn is_behind(&self) -> bool {
        self.ahead_behind_known && self.behind_count > 0
    }
}

/// Git operations backed by the `git` binary
#[derive(Debug, Clone, Default)]
pub struct GitCli;

impl GitCli {
    pub fn new() -> Self {
        Self
    }
}

/// Run in `dir` with repository discovery stopped at `dir` itself, so a
/// broken `.git` fails instead of resolving to an enclosing repository.
fn confine(cmd: &mut AsyncCommand, dir: &Path) {
    cmd.current_dir(dir);
    match dir.canonicalize() {
        Ok(resolved) => {
            if let Some(parent) = resolved.parent() {
                cmd.env("GIT_CEILING_DIRECTORIES", parent);
            }
        }
        Err(e) => debug!("Cannot resolve {}: {}", dir.display(), e),
    }
}

/// Run git and return its trimmed output (stdout, or stderr when stdout is empty)
pub async fn run_git(args: &[&str], cwd: Option<&Path>) -> Result<String, SyncToolError> {
    let command = args.first().copied().unwrap_or_default().to_string();

    let mut cmd = AsyncCommand::new("git");
    cmd.args(args).env("GIT_TERMINAL_PROMPT", "0");
    if let Some(dir) = cwd {
        confine(&mut cmd, dir);
    }

    debug!("git {} (in {:?})", args.join(" "), cwd);

    let output = cmd
        .output()
        .await
        .map_err(|e| SyncToolError::new(&command, format!("failed to execute git: {}", e)))?;

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

    if output.status.success() {
        Ok(if stdout.is_empty() { stderr } else { stdout })
    } else {
        let message = if stderr.is_empty() { stdout } else { stderr };
        Err(SyncToolError::new(command, message))
    }
}

#[async_trait]
impl GitOps for GitCli {
    async fn status(&self, path: &Path) -> Result<String, SyncToolError> {
        // stderr noise on success must not read as pending changes
        let mut cmd = AsyncCommand::new("git");
        cmd.args(["status", "--porcelain"]);
        confine(&mut cmd, path);
        let output = cmd
            .output()
            .await
            .map_err(|e| SyncToolError::new("status", format!("failed to execute git: {}", e)))?;

        if !output.status.success() {
            return Err(SyncToolError::new(
                "status",
                String::from_utf8_lossy(&output.stderr).trim(),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn current_branch(&self, path: &Path) -> Result<Option<String>, SyncToolError> {
        match run_git(&["symbolic-ref", "--short", "-q", "HEAD"], Some(path)).await {
            Ok(branch) if !branch.is_empty() => Ok(Some(branch)),
            Ok(_) => Ok(None),
            Err(e) => {
                debug!("No symbolic HEAD in {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    async fn fetch(&self, path: &Path) -> Result<(), SyncToolError> {
        run_git(&["fetch", "--quiet"], Some(path)).await.map(|_| ())
    }

    async fn behind_count(&self, path: &Path) -> Result<u32, SyncToolError> {
        let output = run_git(&["rev-list", "--count", "HEAD..@{upstream}"], Some(path)).await?;
        output
            .parse::<u32>()
            .map_err(|_| SyncToolError::new("rev-list", format!("unexpected count: {}", output)))
    }

    async fn pull(&self, path: &Path) -> Result<String, SyncToolError> {
        run_git(&["pull", "--ff-only"], Some(path)).await
    }

    async fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), SyncToolError> {
        let dest = dest.to_string_lossy();
        run_git(&["clone", url, dest.as_ref()], None).await.map(|_| ())
    }
}

/// Inspects local checkouts. Query failures are folded into the conservative
/// answer ("not clean", "not behind") instead of being returned.
#[derive(Clone)]
pub struct Prober {
    git: Arc<dyn GitOps>,
}

impl Prober {
    pub fn new(git: Arc<dyn GitOps>) -> Self {
        Self { git }
    }

    /// Classify `path`. Fetches at most once, and only for clean checkouts.
    pub async fn probe(&self, path: &Path) -> LocalRepoState {
        if !path.exists() {
            return LocalRepoState::missing();
        }

        if !path.join(".git").exists() {
            debug!("{} exists but is not a git repository", path.display());
            return LocalRepoState {
                exists: true,
                ..LocalRepoState::default()
            };
        }

        let current_branch = self.current_branch(path).await;
        let is_clean = self.is_clean(path).await;

        let mut state = LocalRepoState {
            exists: true,
            is_repo: true,
            is_clean,
            current_branch,
            ahead_behind_known: false,
            behind_count: 0,
        };

        if is_clean {
            if let Some(count) = self.upstream_gap(path).await {
                state.ahead_behind_known = true;
                state.behind_count = count;
            }
        }

        state
    }

    pub async fn is_clean(&self, path: &Path) -> bool {
        match self.git.status(path).await {
            Ok(output) => output.trim().is_empty(),
            Err(e) => {
                warn!("Treating {} as dirty: {}", path.display(), e);
                false
            }
        }
    }

    pub async fn current_branch(&self, path: &Path) -> Option<String> {
        self.git.current_branch(path).await.unwrap_or_else(|e| {
            debug!("Could not determine branch for {}: {}", path.display(), e);
            None
        })
    }

    pub async fn behind_upstream(&self, path: &Path) -> bool {
        self.upstream_gap(path).await.is_some_and(|count| count > 0)
    }

    async fn upstream_gap(&self, path: &Path) -> Option<u32> {
        if let Err(e) = self.git.fetch(path).await {
            warn!("Failed to fetch remote for {}: {}", path.display(), e);
        }

        match self.git.behind_count(path).await {
            Ok(count) => Some(count),
            Err(e) => {
                debug!("No upstream comparison for {}: {}", path.display(), e);
                None
            }
        }
    }
}
