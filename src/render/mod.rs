//! Report renderers. Each format is derived purely from a [`MonitorReport`].

mod html;
mod list;
mod markdown;
mod toon;

pub use html::HtmlRenderer;
pub use list::ListRenderer;
pub use markdown::MarkdownRenderer;
pub use toon::ToonRenderer;

use clap::ValueEnum;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::RenderError;
use crate::models::{CiStatus, MonitorReport};

/// Report formats accepted by `--format`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum OutputFormat {
    Toon,
    #[value(alias = "md")]
    Markdown,
    Html,
    List,
    All,
}

impl OutputFormat {
    /// Concrete formats to produce; `All` expands to every renderer
    pub fn expand(self) -> Vec<OutputFormat> {
        match self {
            OutputFormat::All => vec![
                OutputFormat::Toon,
                OutputFormat::Markdown,
                OutputFormat::Html,
                OutputFormat::List,
            ],
            other => vec![other],
        }
    }

    /// Parse a config value such as `"md"` or `"all"`
    pub fn parse(value: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(value.trim(), true).ok()
    }

    pub fn label(self) -> &'static str {
        match self {
            OutputFormat::Toon => "TOON",
            OutputFormat::Markdown => "Markdown",
            OutputFormat::Html => "HTML",
            OutputFormat::List => "List",
            OutputFormat::All => "All",
        }
    }

    pub fn renderer(self) -> Option<Box<dyn Renderer>> {
        match self {
            OutputFormat::Toon => Some(Box::new(ToonRenderer)),
            OutputFormat::Markdown => Some(Box::new(MarkdownRenderer)),
            OutputFormat::Html => Some(Box::new(HtmlRenderer)),
            OutputFormat::List => Some(Box::new(ListRenderer)),
            OutputFormat::All => None,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Turns a report into the text of one artifact
pub trait Renderer: Send + Sync {
    fn format(&self) -> OutputFormat;

    /// Artifact file name inside the output directory
    fn file_name(&self) -> &'static str;

    fn render(&self, report: &MonitorReport) -> Result<String, RenderError>;
}

/// What a rendering pass produced
#[derive(Debug, Default)]
pub struct RenderSummary {
    pub written: Vec<(OutputFormat, PathBuf)>,
    pub failed: Vec<(OutputFormat, RenderError)>,
}

impl RenderSummary {
    pub fn all_failed(&self) -> bool {
        self.written.is_empty() && !self.failed.is_empty()
    }
}

/// Render the requested formats into `dir`, which must already exist
pub fn write_reports(report: &MonitorReport, format: OutputFormat, dir: &Path) -> RenderSummary {
    let renderers: Vec<Box<dyn Renderer>> = format
        .expand()
        .into_iter()
        .filter_map(OutputFormat::renderer)
        .collect();
    write_with(&renderers, report, dir)
}

/// Run each renderer independently; one failure never stops the others
pub fn write_with(
    renderers: &[Box<dyn Renderer>],
    report: &MonitorReport,
    dir: &Path,
) -> RenderSummary {
    let mut summary = RenderSummary::default();

    for renderer in renderers {
        let path = dir.join(renderer.file_name());
        let result = renderer.render(report).and_then(|content| {
            std::fs::write(&path, content).map_err(|source| RenderError::Write {
                path: path.clone(),
                source,
            })
        });

        match result {
            Ok(()) => {
                info!("Wrote {} report to {}", renderer.format(), path.display());
                summary.written.push((renderer.format(), path));
            }
            Err(e) => {
                warn!("Failed to generate {} report: {}", renderer.format(), e);
                summary.failed.push((renderer.format(), e));
            }
        }
    }

    summary
}

pub(crate) fn ci_badge(status: CiStatus) -> &'static str {
    match status {
        CiStatus::Success => "PASS",
        CiStatus::Failure => "FAIL",
        CiStatus::Pending => "PENDING",
        CiStatus::NoCi => "NO CI",
        CiStatus::Unknown => "UNKNOWN",
    }
}

pub(crate) fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}
