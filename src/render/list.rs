use super::{OutputFormat, Renderer};
use crate::error::RenderError;
use crate::models::MonitorReport;

/// One repository name per line
#[derive(Debug, Clone, Copy, Default)]
pub struct ListRenderer;

impl Renderer for ListRenderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::List
    }

    fn file_name(&self) -> &'static str {
        "list.txt"
    }

    fn render(&self, report: &MonitorReport) -> Result<String, RenderError> {
        let names: Vec<&str> = report.repositories().iter().map(|r| r.name.as_str()).collect();
        Ok(format!("{}\n", names.join("\n")))
    }
}
