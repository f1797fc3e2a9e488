//! Publish the HTML report to an orphan pages branch.
//!
//! A throwaway repository is built next to the reports, holding a single
//! commit with `index.html`, and force-pushed over the target branch.

use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::PublishConfig;
use crate::error::PublishError;
use crate::git::run_git;

const STAGING_DIR: &str = ".publish-staging";
const COMMITTER_NAME: &str = "gh-monitor";
const COMMITTER_EMAIL: &str = "gh-monitor@users.noreply.github.com";

#[derive(Debug, Clone)]
pub struct PagesPublisher {
    remote: String,
    branch: String,
}

impl PagesPublisher {
    pub fn from_config(config: &PublishConfig) -> Result<Self, PublishError> {
        let repository = config
            .repository
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or(PublishError::NoRepository)?;

        Ok(Self {
            remote: remote_url(repository, config.use_ssh),
            branch: config.branch.clone(),
        })
    }

    /// Push to an explicit remote (a URL or a local path)
    pub fn with_remote(remote: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
            branch: branch.into(),
        }
    }

    pub fn remote(&self) -> &str {
        &self.remote
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Publish `<output_dir>/report.html` as `index.html`
    pub async fn publish(&self, output_dir: &Path) -> Result<(), PublishError> {
        let artifact = output_dir.join("report.html");
        if !artifact.is_file() {
            return Err(PublishError::MissingArtifact(artifact));
        }

        let staging = output_dir.join(STAGING_DIR);
        let result = self.publish_from(&artifact, &staging).await;

        if let Err(e) = tokio::fs::remove_dir_all(&staging).await {
            debug!("Could not remove {}: {}", staging.display(), e);
        }

        result
    }

    async fn publish_from(&self, artifact: &Path, staging: &Path) -> Result<(), PublishError> {
        reset_dir(staging).await?;

        let index = staging.join("index.html");
        tokio::fs::copy(artifact, &index)
            .await
            .map_err(|source| staging_error(&index, source))?;
        let nojekyll = staging.join(".nojekyll");
        tokio::fs::write(&nojekyll, b"")
            .await
            .map_err(|source| staging_error(&nojekyll, source))?;

        let head = format!("refs/heads/{}", self.branch);
        let message = format!(
            "Update monitor report {}",
            Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
        );
        let refspec = format!("HEAD:{}", head);

        run_git(&["init", "-q"], Some(staging)).await?;
        run_git(&["symbolic-ref", "HEAD", &head], Some(staging)).await?;
        run_git(&["config", "user.name", COMMITTER_NAME], Some(staging)).await?;
        run_git(&["config", "user.email", COMMITTER_EMAIL], Some(staging)).await?;
        run_git(&["add", "-A"], Some(staging)).await?;
        run_git(&["commit", "-q", "-m", &message], Some(staging)).await?;

        info!("Pushing report to {} ({})", self.remote, self.branch);
        run_git(&["push", "--force", "--quiet", &self.remote, &refspec], Some(staging)).await?;

        Ok(())
    }
}

/// `owner/name` to a push URL
pub fn remote_url(repository: &str, use_ssh: bool) -> String {
    let repository = repository.trim_end_matches(".git");
    if use_ssh {
        format!("git@github.com:{}.git", repository)
    } else {
        format!("https://github.com/{}.git", repository)
    }
}

async fn reset_dir(path: &Path) -> Result<(), PublishError> {
    if path.exists() {
        warn!("Removing stale staging directory {}", path.display());
        tokio::fs::remove_dir_all(path)
            .await
            .map_err(|source| staging_error(path, source))?;
    }
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| staging_error(path, source))
}

fn staging_error(path: &Path, source: std::io::Error) -> PublishError {
    PublishError::Staging {
        path: PathBuf::from(path),
        source,
    }
}
