//! Sync Engine - mirrors an account's repositories into a local directory
//!
//! Each repository is classified against its local checkout and receives
//! exactly one action: clone when missing, skip when dirty, pull when clean and
//! behind, nothing when already current. Failures are captured per repository
//! and never abort the pass.

use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::discovery::{ExcludeFilter, Inventory, RemoteRepoRef};
use crate::error::SyncError;
use crate::git::{GitOps, Prober};
use crate::progress::{CancelFlag, ProgressFn, ProgressTracker};

/// Outcome of syncing a single repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Repository was missing locally and has been cloned
    Cloned { path: PathBuf },
    /// Repository was behind its upstream and has been fast-forwarded
    Pulled { branch: Option<String> },
    /// Clean and not behind; nothing to do
    AlreadyCurrent { branch: Option<String> },
    /// Local changes present; left untouched
    SkippedDirty { branch: Option<String> },
    /// Clone, pull or processing failed
    SkippedError { reason: String },
}

/// Result of syncing one repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncResult {
    pub repo_name: String,
    pub outcome: SyncOutcome,
}

impl SyncResult {
    pub fn new(repo_name: impl Into<String>, outcome: SyncOutcome) -> Self {
        Self {
            repo_name: repo_name.into(),
            outcome,
        }
    }

    pub fn branch(&self) -> Option<&str> {
        match &self.outcome {
            SyncOutcome::Pulled { branch }
            | SyncOutcome::AlreadyCurrent { branch }
            | SyncOutcome::SkippedDirty { branch } => branch.as_deref(),
            _ => None,
        }
    }

    /// Human-readable explanation for the summary
    pub fn message(&self) -> String {
        match &self.outcome {
            SyncOutcome::Cloned { path } => format!("Cloned to {}", path.display()),
            SyncOutcome::Pulled { .. } => "Updated successfully".to_string(),
            SyncOutcome::AlreadyCurrent { .. } => "Already up to date".to_string(),
            SyncOutcome::SkippedDirty { .. } => "Uncommitted changes present".to_string(),
            SyncOutcome::SkippedError { reason } => reason.clone(),
        }
    }
}

/// Summary of a sync pass, partitioned by outcome
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    cloned: Vec<SyncResult>,
    pulled: Vec<SyncResult>,
    already_current: Vec<SyncResult>,
    skipped_dirty: Vec<SyncResult>,
    skipped_error: Vec<SyncResult>,
    interrupted: bool,
}

impl SyncReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route a result into the list matching its outcome
    pub fn add_result(&mut self, result: SyncResult) {
        let bucket = match result.outcome {
            SyncOutcome::Cloned { .. } => &mut self.cloned,
            SyncOutcome::Pulled { .. } => &mut self.pulled,
            SyncOutcome::AlreadyCurrent { .. } => &mut self.already_current,
            SyncOutcome::SkippedDirty { .. } => &mut self.skipped_dirty,
            SyncOutcome::SkippedError { .. } => &mut self.skipped_error,
        };
        bucket.push(result);
    }

    pub fn cloned(&self) -> &[SyncResult] {
        &self.cloned
    }

    pub fn pulled(&self) -> &[SyncResult] {
        &self.pulled
    }

    pub fn already_current(&self) -> &[SyncResult] {
        &self.already_current
    }

    pub fn skipped_dirty(&self) -> &[SyncResult] {
        &self.skipped_dirty
    }

    pub fn skipped_error(&self) -> &[SyncResult] {
        &self.skipped_error
    }

    /// True when the pass was cancelled before every repository was processed
    pub fn interrupted(&self) -> bool {
        self.interrupted
    }

    pub fn total(&self) -> usize {
        self.cloned.len()
            + self.pulled.len()
            + self.already_current.len()
            + self.skipped_dirty.len()
            + self.skipped_error.len()
    }

    /// Every repository name in the report, category by category
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.cloned
            .iter()
            .chain(&self.pulled)
            .chain(&self.already_current)
            .chain(&self.skipped_dirty)
            .chain(&self.skipped_error)
            .map(|r| r.repo_name.as_str())
    }
}

/// Engine tuning
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Repositories processed concurrently; 1 means strictly sequential
    pub max_parallel: usize,
    /// Name patterns removed from the listing before syncing
    pub exclude_patterns: Vec<String>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            max_parallel: 1,
            exclude_patterns: Vec::new(),
        }
    }
}

/// Serializes work on the same local path across workers
#[derive(Default)]
struct PathLocks {
    locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl PathLocks {
    async fn acquire(&self, path: &Path) -> tokio::sync::OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.entry(path.to_path_buf()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

/// Syncs an account's repositories with a local directory
#[derive(Clone)]
pub struct GitSyncer {
    inventory: Arc<dyn Inventory>,
    git: Arc<dyn GitOps>,
    prober: Prober,
    options: SyncOptions,
    exclude: ExcludeFilter,
    cancel: CancelFlag,
    path_locks: Arc<PathLocks>,
}

impl GitSyncer {
    pub fn new(inventory: Arc<dyn Inventory>, git: Arc<dyn GitOps>) -> Self {
        Self::with_options(inventory, git, SyncOptions::default())
    }

    pub fn with_options(
        inventory: Arc<dyn Inventory>,
        git: Arc<dyn GitOps>,
        options: SyncOptions,
    ) -> Self {
        let exclude = ExcludeFilter::new(&options.exclude_patterns);
        Self {
            inventory,
            prober: Prober::new(git.clone()),
            git,
            options,
            exclude,
            cancel: CancelFlag::new(),
            path_locks: Arc::new(PathLocks::default()),
        }
    }

    /// Use an externally owned cancellation flag
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Sync every repository of `account` into `local_root`.
    ///
    /// Only listing the repositories or creating `local_root` can fail; every
    /// per-repository problem lands in the report as `SkippedError`.
    pub async fn sync_all(
        &self,
        account: &str,
        local_root: &Path,
        since_days: Option<u32>,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<SyncReport, SyncError> {
        tokio::fs::create_dir_all(local_root)
            .await
            .map_err(|source| SyncError::CreateRoot {
                path: local_root.to_path_buf(),
                source,
            })?;

        let repos = self
            .inventory
            .list_repositories(account, since_days)
            .await?;
        let repos = self.exclude.apply(repos);
        let total = repos.len();

        info!(
            "Syncing {} repositories for {} into {} (max_parallel={})",
            total,
            account,
            local_root.display(),
            self.options.max_parallel
        );

        let mut report = SyncReport::new();
        if total == 0 {
            return Ok(report);
        }

        let mut tracker = ProgressTracker::new(total);
        let root = local_root.to_path_buf();

        let mut results = stream::iter(repos)
            .map(|repo| {
                let syncer = self.clone();
                let root = root.clone();
                async move {
                    if syncer.cancel.is_cancelled() {
                        debug!("Cancelled before {}", repo.name);
                        return None;
                    }
                    let name = repo.name.clone();
                    let task =
                        tokio::spawn(async move { syncer.sync_repository(&repo, &root).await });
                    Some(match task.await {
                        Ok(result) => result,
                        Err(e) => {
                            warn!("Sync task for {} failed: {}", name, e);
                            SyncResult::new(
                                name,
                                SyncOutcome::SkippedError {
                                    reason: format!("Sync task failed: {}", e),
                                },
                            )
                        }
                    })
                }
            })
            .buffer_unordered(self.options.max_parallel.max(1));

        while let Some(result) = results.next().await {
            let Some(result) = result else {
                report.interrupted = true;
                continue;
            };

            debug!("{}: {:?}", result.repo_name, result.outcome);
            report.add_result(result);

            let percent = tracker.advance();
            if let Some(progress) = progress {
                progress(percent);
            }
        }

        if report.interrupted {
            warn!(
                "Sync interrupted after {} of {} repositories",
                tracker.completed(),
                total
            );
        } else {
            info!(
                "Sync finished: {} cloned, {} pulled, {} current, {} dirty, {} errors",
                report.cloned.len(),
                report.pulled.len(),
                report.already_current.len(),
                report.skipped_dirty.len(),
                report.skipped_error.len()
            );
        }

        Ok(report)
    }

    /// Decide and run the single action for one repository
    pub async fn sync_repository(&self, repo: &RemoteRepoRef, root: &Path) -> SyncResult {
        let path = repo.local_path(root);
        let _guard = self.path_locks.acquire(&path).await;

        let state = self.prober.probe(&path).await;

        if !(state.exists && state.is_repo) {
            return self.clone_repository(repo, &path).await;
        }

        if !state.is_clean {
            info!("Skipping {}: uncommitted changes", repo.name);
            return SyncResult::new(
                &repo.name,
                SyncOutcome::SkippedDirty {
                    branch: state.current_branch,
                },
            );
        }

        if !state.is_behind() {
            debug!("Repository is up to date: {}", path.display());
            return SyncResult::new(
                &repo.name,
                SyncOutcome::AlreadyCurrent {
                    branch: state.current_branch,
                },
            );
        }

        info!("Pulling {} ({} commits behind)", repo.name, state.behind_count);
        match self.git.pull(&path).await {
            Ok(_) => SyncResult::new(
                &repo.name,
                SyncOutcome::Pulled {
                    branch: state.current_branch,
                },
            ),
            Err(e) => {
                warn!("Pull failed for {}: {}", repo.name, e);
                SyncResult::new(
                    &repo.name,
                    SyncOutcome::SkippedError {
                        reason: format!("Pull failed: {}", e.message),
                    },
                )
            }
        }
    }

    async fn clone_repository(&self, repo: &RemoteRepoRef, path: &Path) -> SyncResult {
        let Some((url, method)) = repo.clone_endpoint() else {
            return SyncResult::new(
                &repo.name,
                SyncOutcome::SkippedError {
                    reason: "No clone URL available".to_string(),
                },
            );
        };

        info!("Cloning {} via {:?} -> {}", repo.name, method, path.display());
        match self.git.clone_repo(url, path).await {
            Ok(()) => SyncResult::new(
                &repo.name,
                SyncOutcome::Cloned {
                    path: path.to_path_buf(),
                },
            ),
            Err(e) => {
                warn!("Clone failed for {}: {}", repo.name, e);
                SyncResult::new(
                    &repo.name,
                    SyncOutcome::SkippedError {
                        reason: format!("Clone failed: {}", e.message),
                    },
                )
            }
        }
    }
}
