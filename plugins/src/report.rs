use std::fmt::Write as _;

use async_trait::async_trait;
use windup_core::ingest::{FindingSet, Severity};
use windup_core::launch::ReportRenderer;
use windup_core::model::Configuration;

use crate::store::write_atomic;

pub const REPORT_FILE: &str = "report.txt";

/// Plain text summary written next to kantra's own output.
pub struct TextReportRenderer;

impl TextReportRenderer {
    pub fn render_text(configuration: &Configuration, findings: &FindingSet) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Analysis report: {}", configuration.name);
        if let Some(ts) = configuration.timestamp {
            let _ = writeln!(out, "Last run: {}", ts.to_rfc3339());
        }
        let _ = writeln!(
            out,
            "{} findings ({} mandatory, {} optional, {} information), effort {}",
            findings.len(),
            findings.count_by_severity(Severity::Error),
            findings.count_by_severity(Severity::Warning),
            findings.count_by_severity(Severity::Info),
            findings.total_effort()
        );
        for (file, items) in findings.by_file() {
            let _ = writeln!(out, "\n{file}");
            for f in items {
                let line = f
                    .location
                    .line
                    .map(|l| l.to_string())
                    .unwrap_or_else(|| "-".to_string());
                let _ = writeln!(
                    out,
                    "  {:>5}  {:<7}  {}  [{}]",
                    line,
                    severity_label(f.severity),
                    f.title,
                    f.rule_id
                );
            }
        }
        out
    }
}

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
        Severity::Info => "info",
    }
}

#[async_trait]
impl ReportRenderer for TextReportRenderer {
    async fn render(
        &self,
        configuration: &Configuration,
        findings: &FindingSet,
    ) -> anyhow::Result<()> {
        let text = Self::render_text(configuration, findings);
        let path = configuration.output_dir().join(REPORT_FILE);
        write_atomic(&path, text.as_bytes()).await?;
        tracing::info!(report = %path.display(), "report written");
        Ok(())
    }
}
