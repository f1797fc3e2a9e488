//! End-to-end sync against real git repositories in temporary directories

mod common;

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use tempfile::TempDir;

use common::FakeInventory;
use gh_monitor::{GitCli, GitSyncer, RemoteRepoRef, SyncOutcome, SyncReport};

fn git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args([
            "-c",
            "user.name=Test",
            "-c",
            "user.email=test@example.com",
            "-c",
            "commit.gpgsign=false",
        ])
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

fn commit_file(dir: &Path, file: &str, contents: &str) {
    std::fs::write(dir.join(file), contents).unwrap();
    git(dir, &["add", file]);
    git(dir, &["commit", "-q", "-m", &format!("Update {}", file)]);
}

/// Workspace holding an upstream repository and a mirror root
struct Fixture {
    _dir: TempDir,
    upstream: PathBuf,
    root: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let upstream = dir.path().join("origin").join("project");
        let root = dir.path().join("mirrors");
        std::fs::create_dir_all(&upstream).unwrap();

        git(&upstream, &["init", "-q"]);
        git(&upstream, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        commit_file(&upstream, "README.md", "# project\n");

        Self {
            _dir: dir,
            upstream,
            root,
        }
    }

    fn mirror(&self) -> PathBuf {
        self.root.join("project")
    }

    async fn sync(&self) -> SyncReport {
        let repo = RemoteRepoRef::new("project").with_url(self.upstream.to_string_lossy());
        GitSyncer::new(
            Arc::new(FakeInventory::new(vec![repo])),
            Arc::new(GitCli::new()),
        )
        .sync_all("acme", &self.root, None, None)
        .await
        .unwrap()
    }
}

#[tokio::test]
async fn test_clone_then_already_current() {
    let fixture = Fixture::new();

    let first = fixture.sync().await;
    assert_eq!(first.cloned().len(), 1, "{:?}", first);
    assert!(fixture.mirror().join("README.md").exists());

    let second = fixture.sync().await;
    assert_eq!(second.already_current().len(), 1, "{:?}", second);
    assert_eq!(second.already_current()[0].branch(), Some("main"));
}

#[tokio::test]
async fn test_behind_checkout_is_fast_forwarded() {
    let fixture = Fixture::new();
    fixture.sync().await;

    commit_file(&fixture.upstream, "CHANGELOG.md", "v2\n");

    let report = fixture.sync().await;
    assert_eq!(report.pulled().len(), 1, "{:?}", report);
    assert_eq!(
        std::fs::read_to_string(fixture.mirror().join("CHANGELOG.md")).unwrap(),
        "v2\n"
    );
}

#[tokio::test]
async fn test_untracked_file_blocks_pull() {
    let fixture = Fixture::new();
    fixture.sync().await;

    std::fs::write(fixture.mirror().join("notes.txt"), "scratch").unwrap();
    commit_file(&fixture.upstream, "CHANGELOG.md", "v2\n");

    let report = fixture.sync().await;
    assert_eq!(report.skipped_dirty().len(), 1, "{:?}", report);
    assert!(!fixture.mirror().join("CHANGELOG.md").exists());
    assert!(fixture.mirror().join("notes.txt").exists());
}

#[tokio::test]
async fn test_diverged_checkout_is_an_error() {
    let fixture = Fixture::new();
    fixture.sync().await;

    commit_file(&fixture.mirror(), "local.txt", "mine\n");
    commit_file(&fixture.upstream, "remote.txt", "theirs\n");

    let report = fixture.sync().await;
    assert_eq!(report.skipped_error().len(), 1, "{:?}", report);
    match &report.skipped_error()[0].outcome {
        SyncOutcome::SkippedError { reason } => assert!(reason.starts_with("Pull failed:")),
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(fixture.mirror().join("local.txt").exists());
    assert!(!fixture.mirror().join("remote.txt").exists());
}

#[tokio::test]
async fn test_unreachable_upstream_fails_clone() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nowhere");
    let repo = RemoteRepoRef::new("ghost").with_url(missing.to_string_lossy());

    let report = GitSyncer::new(
        Arc::new(FakeInventory::new(vec![repo])),
        Arc::new(GitCli::new()),
    )
    .sync_all("acme", &dir.path().join("mirrors"), None, None)
    .await
    .unwrap();

    assert_eq!(report.skipped_error().len(), 1);
    assert!(report.skipped_error()[0].message().starts_with("Clone failed:"));
    assert!(!dir.path().join("mirrors").join("ghost").exists());
}

#[tokio::test]
async fn test_broken_checkout_never_touches_enclosing_repository() {
    let fixture = Fixture::new();
    let parent = fixture.root.parent().unwrap().to_path_buf();
    git(
        &parent,
        &[
            "clone",
            "-q",
            fixture.upstream.to_str().unwrap(),
            fixture.root.to_str().unwrap(),
        ],
    );
    commit_file(&fixture.upstream, "later.txt", "new\n");

    // `.git` exists but is not a repository
    std::fs::create_dir_all(fixture.mirror().join(".git")).unwrap();

    let report = fixture.sync().await;
    assert!(report.pulled().is_empty(), "{:?}", report);
    assert_eq!(report.skipped_dirty().len(), 1, "{:?}", report);
    assert!(!fixture.root.join("later.txt").exists());
}
