//! Error types shared across the inventory, sync, render and publish layers.

use std::path::PathBuf;
use thiserror::Error;

/// A `gh` invocation failed or returned something we could not parse.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("could not run gh: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("gh {command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("malformed response from gh {command}: {source}")]
    Malformed {
        command: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A local `git` invocation failed. The message is the tool's own output.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("git {command} failed: {message}")]
pub struct SyncToolError {
    pub command: String,
    pub message: String,
}

impl SyncToolError {
    pub fn new(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            message: message.into(),
        }
    }
}

/// Fatal errors for a sync pass. Per-repository failures never show up here.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("failed to list repositories: {0}")]
    Inventory(#[from] QueryError),

    #[error("failed to create sync directory {path}: {source}")]
    CreateRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("failed to encode report: {0}")]
    Encode(String),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("no repository configured for publishing (set publish.repository)")]
    NoRepository,

    #[error("report artifact missing: {0}")]
    MissingArtifact(PathBuf),

    #[error("failed to prepare staging directory {path}: {source}")]
    Staging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Git(#[from] SyncToolError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_tool_error_keeps_tool_message() {
        let err = SyncToolError::new("pull", "fatal: Not possible to fast-forward, aborting.");
        assert_eq!(
            err.to_string(),
            "git pull failed: fatal: Not possible to fast-forward, aborting."
        );
    }

    #[test]
    fn test_query_error_display() {
        let err = QueryError::CommandFailed {
            command: "repo list".to_string(),
            stderr: "HTTP 401: Bad credentials".to_string(),
        };
        assert!(err.to_string().contains("Bad credentials"));
    }
}
