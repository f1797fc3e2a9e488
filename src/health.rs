//! Environment diagnostics behind `gh-monitor doctor`.

use std::path::Path;
use tokio::process::Command as AsyncCommand;

use crate::config::Config;

/// Result of every diagnostic
#[derive(Debug, Clone)]
pub struct Diagnostics {
    pub git: CheckResult,
    pub gh: CheckResult,
    pub gh_auth: CheckResult,
    pub sync_dir: CheckResult,
    /// SSH keys only matter for SSH clone URLs, so this never fails
    pub ssh: CheckResult,
}

/// Result of an individual check
#[derive(Debug, Clone, PartialEq)]
pub struct CheckResult {
    pub passed: bool,
    pub message: String,
    pub details: Option<String>,
    pub is_warning: bool,
}

impl CheckResult {
    fn ok(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
            details: Some(details.into()),
            is_warning: false,
        }
    }

    fn error(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: message.into(),
            details: Some(details.into()),
            is_warning: false,
        }
    }

    fn warning(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
            details: Some(details.into()),
            is_warning: true,
        }
    }

    pub fn icon(&self) -> &'static str {
        match (self.passed, self.is_warning) {
            (true, false) => "✅",
            (true, true) => "⚠️ ",
            (false, _) => "❌",
        }
    }
}

impl Diagnostics {
    pub async fn run(config: &Config) -> Self {
        let gh = check_tool("gh", "gh installed", "Install gh: https://cli.github.com").await;
        let gh_auth = if gh.passed {
            check_gh_auth().await
        } else {
            CheckResult::error("gh not authenticated", "Install gh first, then run: gh auth login")
        };

        Self {
            git: check_tool(
                "git",
                "Git installed",
                "Install git: https://git-scm.com/downloads",
            )
            .await,
            gh,
            gh_auth,
            sync_dir: check_sync_dir(Path::new(&config.sync.directory)),
            ssh: check_ssh(),
        }
    }

    /// Required checks only; warnings never fail the run
    pub fn all_passed(&self) -> bool {
        self.all_checks().iter().all(|(_, check)| check.passed)
    }

    pub fn errors(&self) -> Vec<&CheckResult> {
        self.all_checks()
            .into_iter()
            .map(|(_, check)| check)
            .filter(|check| !check.passed)
            .collect()
    }

    pub fn warnings(&self) -> Vec<&CheckResult> {
        self.all_checks()
            .into_iter()
            .map(|(_, check)| check)
            .filter(|check| check.is_warning)
            .collect()
    }

    pub fn all_checks(&self) -> [(&'static str, &CheckResult); 5] {
        [
            ("Git", &self.git),
            ("GitHub CLI", &self.gh),
            ("GitHub Authentication", &self.gh_auth),
            ("Sync Directory", &self.sync_dir),
            ("SSH Keys", &self.ssh),
        ]
    }
}

/// Run `<program> --version` and report the first output line
pub async fn check_tool(program: &str, label: &str, install_hint: &str) -> CheckResult {
    match AsyncCommand::new(program).arg("--version").output().await {
        Ok(output) if output.status.success() => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let version = stdout.lines().next().unwrap_or_default().trim().to_string();
            CheckResult::ok(label, version)
        }
        Ok(output) => CheckResult::error(
            format!("{} --version failed", program),
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ),
        Err(_) => CheckResult::error(format!("{} not found in PATH", program), install_hint),
    }
}

async fn check_gh_auth() -> CheckResult {
    match AsyncCommand::new("gh")
        .args(["auth", "status"])
        .env("GH_PROMPT_DISABLED", "1")
        .output()
        .await
    {
        Ok(output) if output.status.success() => {
            // gh has printed status to either stream depending on version
            let text = if output.stdout.is_empty() {
                output.stderr
            } else {
                output.stdout
            };
            let text = String::from_utf8_lossy(&text);
            let account = text
                .lines()
                .map(str::trim)
                .find(|line| line.contains("Logged in"))
                .unwrap_or("Authenticated")
                .trim_start_matches(['✓', ' '])
                .to_string();
            CheckResult::ok("gh authenticated", account)
        }
        Ok(_) => CheckResult::error("gh not authenticated", "Run: gh auth login"),
        Err(e) => CheckResult::error("Could not run gh auth status", e.to_string()),
    }
}

/// A missing directory is only a warning: sync creates it
pub fn check_sync_dir(path: &Path) -> CheckResult {
    if path.is_dir() {
        CheckResult::ok("Sync directory exists", path.display().to_string())
    } else if path.exists() {
        CheckResult::error(
            "Sync path is not a directory",
            format!("{} exists but is a file", path.display()),
        )
    } else {
        CheckResult::warning(
            "Sync directory does not exist yet",
            format!("It will be created on the first sync: {}", path.display()),
        )
    }
}

fn check_ssh() -> CheckResult {
    check_ssh_in(dirs::home_dir().as_deref())
}

fn check_ssh_in(home: Option<&Path>) -> CheckResult {
    let Some(home) = home else {
        return CheckResult::warning(
            "Home directory not found",
            "Cannot look for SSH keys. SSH clone URLs may not work.",
        );
    };

    let ssh_dir = home.join(".ssh");
    if !ssh_dir.exists() {
        return CheckResult::warning(
            "~/.ssh directory not found",
            "SSH clone URLs may not work. Run: ssh-keygen -t ed25519",
        );
    }

    let found_keys: Vec<&str> = ["id_rsa", "id_ed25519", "id_ecdsa"]
        .into_iter()
        .filter(|key| ssh_dir.join(key).exists())
        .collect();

    if found_keys.is_empty() {
        CheckResult::warning(
            "No SSH keys found",
            "SSH clone URLs may not work. Run: ssh-keygen -t ed25519",
        )
    } else {
        CheckResult::ok("SSH keys found", found_keys.join(", "))
    }
}
