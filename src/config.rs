use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for gh-monitor
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Config {
    /// Monitoring and report generation settings
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Local mirroring settings
    #[serde(default)]
    pub sync: SyncConfig,

    /// Report publishing settings
    #[serde(default)]
    pub publish: PublishConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Monitoring configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MonitorConfig {
    /// Directory reports are written to
    #[serde(default = "default_output_directory")]
    pub output_directory: String,

    /// Only repositories pushed within this many days are reported
    #[serde(default = "default_days")]
    pub days: u32,

    /// Report format: toon, markdown, html, list or all
    #[serde(default = "default_format")]
    pub format: String,

    /// CI runs inspected per repository
    #[serde(default = "default_ci_run_limit")]
    pub ci_run_limit: u32,

    /// Publish the HTML report after writing it
    #[serde(default)]
    pub publish: bool,
}

/// Synchronization configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SyncConfig {
    /// Root directory local mirrors live under
    #[serde(default = "default_sync_directory")]
    pub directory: String,

    /// Maximum parallel repositories (1 = sequential)
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,

    /// Repository exclusion patterns (`*` wildcards)
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

/// Publishing configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PublishConfig {
    /// Target repository as `owner/name`
    #[serde(default)]
    pub repository: Option<String>,

    /// Orphan branch the report is pushed to
    #[serde(default = "default_publish_branch")]
    pub branch: String,

    /// Push over SSH instead of HTTPS
    #[serde(default = "default_true")]
    pub use_ssh: bool,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Log level used when neither RUST_LOG nor --verbose is given
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_output_directory() -> String {
    "reports".to_string()
}
fn default_days() -> u32 {
    30
}
fn default_format() -> String {
    "all".to_string()
}
fn default_ci_run_limit() -> u32 {
    20
}
fn default_sync_directory() -> String {
    "~/git".to_string()
}
fn default_max_parallel() -> usize {
    1
}
fn default_publish_branch() -> String {
    "gh-pages".to_string()
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "warn".to_string()
}

// Default implementations
impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            output_directory: default_output_directory(),
            days: default_days(),
            format: default_format(),
            ci_run_limit: default_ci_run_limit(),
            publish: false,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            directory: default_sync_directory(),
            max_parallel: default_max_parallel(),
            exclude_patterns: Vec::new(),
        }
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            repository: None,
            branch: default_publish_branch(),
            use_ssh: default_true(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, falling back to defaults.
    /// Nothing is written when the file is missing.
    pub fn load_or_default() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load `path` if it exists, otherwise defaults with expanded paths
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!("No configuration at {:?}, using defaults", path);
            let mut config = Self::default();
            config.expand_paths()?;
            Ok(config)
        }
    }

    /// Load configuration from a specific file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let mut config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        config.expand_paths()?;

        Ok(config)
    }

    /// Get the default configuration file path (XDG compliant)
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = config_dir().context("Failed to get user config directory")?;

        Ok(config_dir.join("gh-monitor").join("config.yml"))
    }

    /// Expand `~` and environment variables in configuration paths
    pub fn expand_paths(&mut self) -> Result<()> {
        self.sync.directory = shellexpand::full(&self.sync.directory)
            .context("Failed to expand sync.directory path")?
            .into_owned();

        self.monitor.output_directory = shellexpand::full(&self.monitor.output_directory)
            .context("Failed to expand monitor.output_directory path")?
            .into_owned();

        Ok(())
    }

    pub fn sync_directory(&self) -> PathBuf {
        PathBuf::from(&self.sync.directory)
    }

    pub fn output_directory(&self) -> PathBuf {
        PathBuf::from(&self.monitor.output_directory)
    }
}
