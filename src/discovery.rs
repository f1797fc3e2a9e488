//! Remote repository inventory
//!
//! Provider-agnostic description of what lives on the hosting side, and the
//! port the sync engine and the monitor use to list it.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::QueryError;

/// Clone method chosen for a repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CloneMethod {
    /// Use SSH (git@github.com:user/repo.git)
    #[default]
    Ssh,
    /// Use HTTPS (https://github.com/user/repo.git)
    Https,
}

/// A repository as reported by the hosting service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRepoRef {
    /// Repository name (e.g., "gh-project-monitor")
    pub name: String,

    /// HTTPS endpoint, also used as the browsable URL
    pub url: Option<String>,

    /// SSH endpoint
    pub ssh_url: Option<String>,

    /// Last push to any branch
    pub pushed_at: Option<DateTime<Utc>>,
}

impl RemoteRepoRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: None,
            ssh_url: None,
            pushed_at: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_ssh_url(mut self, ssh_url: impl Into<String>) -> Self {
        self.ssh_url = Some(ssh_url.into());
        self
    }

    pub fn pushed(mut self, pushed_at: DateTime<Utc>) -> Self {
        self.pushed_at = Some(pushed_at);
        self
    }

    /// Endpoint to clone from: SSH when present, HTTPS otherwise
    pub fn clone_endpoint(&self) -> Option<(&str, CloneMethod)> {
        match (&self.ssh_url, &self.url) {
            (Some(ssh), _) if !ssh.is_empty() => Some((ssh.as_str(), CloneMethod::Ssh)),
            (_, Some(https)) if !https.is_empty() => Some((https.as_str(), CloneMethod::Https)),
            _ => None,
        }
    }

    /// Local checkout location under `root`
    pub fn local_path(&self, root: &Path) -> PathBuf {
        root.join(&self.name)
    }

    /// Whether the last push is strictly newer than `now - days`.
    /// A window reaching past the earliest representable date admits everything.
    pub fn pushed_within(&self, days: u32, now: DateTime<Utc>) -> bool {
        match now.checked_sub_signed(Duration::days(i64::from(days))) {
            Some(cutoff) => self.pushed_at.is_some_and(|pushed| pushed > cutoff),
            None => true,
        }
    }
}

/// Source of repository listings for an account
#[async_trait]
pub trait Inventory: Send + Sync {
    /// All repositories of `account`, or only those pushed within `since_days`
    async fn list_repositories(
        &self,
        account: &str,
        since_days: Option<u32>,
    ) -> Result<Vec<RemoteRepoRef>, QueryError>;
}

/// Keep only repositories pushed strictly within the last `since_days`.
/// Repositories without a push timestamp never pass an active filter.
pub fn filter_recent(
    repos: Vec<RemoteRepoRef>,
    since_days: Option<u32>,
    now: DateTime<Utc>,
) -> Vec<RemoteRepoRef> {
    match since_days {
        None => repos,
        Some(days) => repos
            .into_iter()
            .filter(|repo| {
                let keep = repo.pushed_within(days, now);
                if !keep {
                    debug!("Excluding {} (no push in the last {} days)", repo.name, days);
                }
                keep
            })
            .collect(),
    }
}

/// Name-based exclusion with `*` globs
#[derive(Debug, Clone, Default)]
pub struct ExcludeFilter {
    patterns: Vec<regex::Regex>,
    literals: Vec<String>,
}

impl ExcludeFilter {
    pub fn new(patterns: &[String]) -> Self {
        let mut filter = Self::default();
        for pattern in patterns {
            if pattern.contains('*') {
                let body = regex::escape(pattern).replace(r"\*", ".*");
                match regex::Regex::new(&format!("^{}$", body)) {
                    Ok(re) => filter.patterns.push(re),
                    Err(e) => tracing::warn!("Ignoring exclusion pattern {}: {}", pattern, e),
                }
            } else {
                filter.literals.push(pattern.clone());
            }
        }
        filter
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.literals.iter().any(|l| l == name) || self.patterns.iter().any(|re| re.is_match(name))
    }

    pub fn apply(&self, repos: Vec<RemoteRepoRef>) -> Vec<RemoteRepoRef> {
        repos
            .into_iter()
            .filter(|repo| {
                let excluded = self.is_excluded(&repo.name);
                if excluded {
                    debug!("Excluding repository due to pattern match: {}", repo.name);
                }
                !excluded
            })
            .collect()
    }
}
