//! TOON output through the `toon-format` encoder.

use super::{OutputFormat, Renderer};
use crate::error::RenderError;
use crate::models::MonitorReport;

#[derive(Debug, Clone, Copy, Default)]
pub struct ToonRenderer;

impl Renderer for ToonRenderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::Toon
    }

    fn file_name(&self) -> &'static str {
        "report.toon"
    }

    fn render(&self, report: &MonitorReport) -> Result<String, RenderError> {
        toon_format::encode_default(&report.to_value())
            .map_err(|e| RenderError::Encode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{pull_request, repository, run};
    use chrono::Utc;

    #[test]
    fn test_report_document() {
        let mut repo = repository("tool");
        repo.open_prs = vec![pull_request(42)];
        repo.ci_recent_runs = vec![run("CI", Some("success"))];
        let report = MonitorReport::new(Utc::now(), 30, vec![repo]);

        let out = ToonRenderer.render(&report).unwrap();

        assert!(out.starts_with("report_metadata:"));
        assert!(out.contains("scan_period_days: 30"));
        assert!(out.contains("total_open_prs: 1"));
        assert!(out.contains("repositories[1]"));
        assert!(out.contains("name: tool"));
        assert!(out.contains("open_prs[1]"));
    }

    #[test]
    fn test_metadata_precedes_repositories() {
        let repos = vec![repository("zeta"), repository("alpha")];
        let report = MonitorReport::new(Utc::now(), 7, repos);
        let out = ToonRenderer.render(&report).unwrap();

        let metadata = out.find("report_metadata:").unwrap();
        let zeta = out.find("zeta").unwrap();
        let alpha = out.find("alpha").unwrap();
        assert!(metadata < zeta);
        assert!(zeta < alpha);
    }

    #[test]
    fn test_empty_report() {
        let report = MonitorReport::new(Utc::now(), 7, Vec::new());
        let out = ToonRenderer.render(&report).unwrap();
        assert!(out.contains("total_repositories: 0"));
        assert!(out.contains("repositories[0]"));
    }
}
