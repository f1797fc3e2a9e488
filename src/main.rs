use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gh_monitor::render::{self, OutputFormat};
use gh_monitor::sync::SyncResult;
use gh_monitor::{
    CancelFlag, Config, Diagnostics, GhCli, GitCli, GitSyncer, MonitorReport, PagesPublisher,
    ProjectMonitor, SyncOptions, SyncReport,
};

#[derive(Parser)]
#[command(name = "gh-monitor")]
#[command(about = "Monitor GitHub project status, generate reports, and mirror repositories locally")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (defaults to XDG config location)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging and full error chains
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect metrics for recently active repositories and write reports
    Monitor {
        /// GitHub organization or user
        account: String,

        /// Output directory for reports
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Only repositories pushed in the last N days
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=365))]
        days: Option<u32>,

        /// Report format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Publish the HTML report to the configured pages branch
        #[arg(long, overrides_with = "no_publish")]
        publish: bool,

        /// Do not publish even if enabled in the configuration
        #[arg(long, overrides_with = "publish")]
        no_publish: bool,
    },

    /// Clone missing repositories and fast-forward clean ones
    Sync {
        /// GitHub organization or user
        account: String,

        /// Local directory holding the mirrors
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Only repositories pushed in the last N days
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=365))]
        days: Option<u32>,
    },

    /// Show version information
    Version,

    /// System health check and diagnostics
    Doctor,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Commands::Version = cli.command {
        println!("gh-project-monitor version {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    let verbose = cli.verbose;
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            if verbose {
                eprintln!("{:?}", e);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config(cli.config.as_deref())?;
    init_logging(cli.verbose, &config.logging.level);
    info!("Starting gh-monitor v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Monitor {
            account,
            output,
            days,
            format,
            publish,
            no_publish,
        } => {
            let publish = match (publish, no_publish) {
                (true, _) => true,
                (_, true) => false,
                _ => config.monitor.publish,
            };
            cmd_monitor(&account, output, days, format, publish, &config).await
        }
        Commands::Sync { account, dir, days } => cmd_sync(&account, dir, days, &config).await,
        Commands::Doctor => cmd_doctor(&config).await,
        Commands::Version => Ok(ExitCode::SUCCESS),
    }
}

/// RUST_LOG wins, then --verbose, then the configured level. Logs go to stderr.
fn init_logging(verbose: bool, level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Load configuration from specified path or default location
fn load_config(config_path: Option<&Path>) -> Result<Config> {
    match config_path {
        Some(path) => Config::load(path),
        None => Config::load_or_default(),
    }
}

fn expand_path(path: &Path) -> Result<PathBuf> {
    let expanded = shellexpand::full(&path.to_string_lossy())
        .with_context(|| format!("Failed to expand path: {}", path.display()))?
        .into_owned();
    Ok(PathBuf::from(expanded))
}

fn progress_bar(message: &'static str) -> ProgressBar {
    let bar = ProgressBar::new(100);
    let style = ProgressStyle::with_template("{msg} [{bar:40.cyan/blue}] {pos:>3}%")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    bar.set_style(style);
    bar.set_message(message);
    bar
}

/// Cancel cooperatively on Ctrl-C; work already started runs to completion
fn install_ctrl_c(cancel: CancelFlag) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing the current repository");
            cancel.cancel();
        }
    });
}

async fn cmd_monitor(
    account: &str,
    output: Option<PathBuf>,
    days: Option<u32>,
    format: Option<OutputFormat>,
    publish: bool,
    config: &Config,
) -> Result<ExitCode> {
    let output_dir = match output {
        Some(path) => expand_path(&path)?,
        None => config.output_directory(),
    };
    let days = days.unwrap_or(config.monitor.days);
    if !(1..=365).contains(&days) {
        bail!("monitor.days must be between 1 and 365, got {}", days);
    }
    let format = match format {
        Some(format) => format,
        None => OutputFormat::parse(&config.monitor.format).with_context(|| {
            format!("Unknown report format in configuration: {}", config.monitor.format)
        })?,
    };

    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    let cancel = CancelFlag::new();
    install_ctrl_c(cancel.clone());

    let gh = Arc::new(GhCli::new());
    let monitor = ProjectMonitor::new(gh.clone(), gh)
        .with_ci_run_limit(config.monitor.ci_run_limit)
        .with_cancel_flag(cancel.clone());

    println!("🔍 Monitoring repositories for {}...", account);

    let bar = progress_bar("Collecting data");
    let on_progress = |percent: u8| bar.set_position(u64::from(percent));
    let collected = monitor.collect_all(account, days, Some(&on_progress)).await;
    bar.finish_and_clear();

    let repositories = collected.context("Failed to list repositories")?;

    if repositories.is_empty() {
        println!("No repositories found with activity in the last {} days", days);
        return Ok(ExitCode::SUCCESS);
    }
    if cancel.is_cancelled() {
        println!("⚠️  Interrupted: the report covers {} repositories", repositories.len());
    }

    let report = MonitorReport::new(Utc::now(), days, repositories);
    let summary = render::write_reports(&report, format, &output_dir);

    for (format, error) in &summary.failed {
        println!("⚠️  {} report failed: {}", format, error);
    }
    if summary.all_failed() {
        println!("❌ No report could be generated");
        return Ok(ExitCode::FAILURE);
    }

    println!();
    println!(
        "✅ Successfully monitored {} repositories",
        report.total_repositories()
    );
    println!("   • {} open PRs", report.total_open_prs());
    println!(
        "   • {} branches without PRs",
        report.total_branches_without_prs()
    );
    println!();
    println!("📄 Generated reports:");
    for (format, path) in &summary.written {
        println!("   ✓ {}: {}", format, path.display());
    }

    if publish {
        publish_report(config, &output_dir).await;
    }

    Ok(ExitCode::SUCCESS)
}

/// Failures are reported but never change the exit code
async fn publish_report(config: &Config, output_dir: &Path) {
    let publisher = match PagesPublisher::from_config(&config.publish) {
        Ok(publisher) => publisher,
        Err(e) => {
            println!("⚠️  Publishing skipped: {}", e);
            return;
        }
    };

    println!();
    println!("🚀 Publishing report to {} ({})...", publisher.remote(), publisher.branch());
    match publisher.publish(output_dir).await {
        Ok(()) => println!("   ✓ Published"),
        Err(e) => {
            warn!("Publishing failed: {:?}", e);
            println!("⚠️  Publishing failed: {}", e);
        }
    }
}

async fn cmd_sync(
    account: &str,
    dir: Option<PathBuf>,
    days: Option<u32>,
    config: &Config,
) -> Result<ExitCode> {
    let root = match dir {
        Some(path) => expand_path(&path)?,
        None => config.sync_directory(),
    };

    let cancel = CancelFlag::new();
    install_ctrl_c(cancel.clone());

    let options = SyncOptions {
        max_parallel: config.sync.max_parallel,
        exclude_patterns: config.sync.exclude_patterns.clone(),
    };
    let syncer = GitSyncer::with_options(Arc::new(GhCli::new()), Arc::new(GitCli::new()), options)
        .with_cancel_flag(cancel);

    println!("🔄 Syncing repositories for {} to {}...", account, root.display());

    let bar = progress_bar("Syncing");
    let on_progress = |percent: u8| bar.set_position(u64::from(percent));
    let result = syncer.sync_all(account, &root, days, Some(&on_progress)).await;
    bar.finish_and_clear();

    let report = result.context("Sync failed")?;
    print_sync_report(&report);

    Ok(ExitCode::SUCCESS)
}

fn print_sync_report(report: &SyncReport) {
    fn with_branch(result: &SyncResult) -> String {
        match result.branch() {
            Some(branch) => format!("{} ({})", result.repo_name, branch),
            None => result.repo_name.clone(),
        }
    }

    println!();

    if !report.cloned().is_empty() {
        println!("📥 Cloned ({}):", report.cloned().len());
        for result in report.cloned() {
            println!("   + {}", result.repo_name);
        }
    }

    if !report.pulled().is_empty() {
        println!("⬇️  Updated ({}):", report.pulled().len());
        for result in report.pulled() {
            println!("   ↓ {}", with_branch(result));
        }
    }

    if !report.already_current().is_empty() {
        println!("✅ Already current ({})", report.already_current().len());
    }

    if !report.skipped_dirty().is_empty() {
        println!("⚠️  Skipped - dirty ({}):", report.skipped_dirty().len());
        for result in report.skipped_dirty() {
            println!("   ! {}", with_branch(result));
        }
    }

    if !report.skipped_error().is_empty() {
        println!("❌ Errors ({}):", report.skipped_error().len());
        for result in report.skipped_error() {
            println!("   ✗ {}: {}", result.repo_name, result.message());
        }
    }

    if report.interrupted() {
        println!();
        println!("⚠️  Interrupted before every repository was processed");
    }

    println!();
    println!("📊 Total: {} repositories", report.total());
}

/// System health check and diagnostics
async fn cmd_doctor(config: &Config) -> Result<ExitCode> {
    let health = Diagnostics::run(config).await;

    println!("🔍 gh-monitor System Diagnostics");
    println!();

    for (name, result) in health.all_checks() {
        println!("{}:", name);
        println!("  {} {}", result.icon(), result.message);
        if let Some(details) = &result.details {
            for line in details.lines() {
                println!("     {}", line);
            }
        }
        println!();
    }

    if health.all_passed() {
        println!("✅ All checks passed");
    } else {
        println!("❌ {} check(s) failed", health.errors().len());
    }

    Ok(ExitCode::SUCCESS)
}
