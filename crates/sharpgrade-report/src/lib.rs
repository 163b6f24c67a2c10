//! sharpgrade-report: Report rendering.
//!
//! Renders a [`GradeReport`] as the plain-text grading sheet, as JSON, or as
//! a SARIF 2.1.0 document.

pub mod sarif;
pub mod text;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use sharpgrade_core::report::GradeReport;

/// Output format of a written report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
    Sarif,
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportFormat::Text => write!(f, "text"),
            ReportFormat::Json => write!(f, "json"),
            ReportFormat::Sarif => write!(f, "sarif"),
        }
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            "sarif" => Ok(ReportFormat::Sarif),
            other => Err(format!("unknown report format: {other}")),
        }
    }
}

/// Render a report in the given format.
pub fn render(report: &GradeReport, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Text => Ok(text::generate_text(report)),
        ReportFormat::Json => {
            serde_json::to_string_pretty(report).context("failed to serialize report")
        }
        ReportFormat::Sarif => serde_json::to_string_pretty(&sarif::generate_sarif(report))
            .context("failed to serialize SARIF report"),
    }
}

/// Write a report to `path`, replacing any existing file.
pub fn write_report(report: &GradeReport, format: ReportFormat, path: &Path) -> Result<()> {
    let rendered = render(report, format)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    if path.exists() {
        std::fs::remove_file(path)
            .with_context(|| format!("existing report {} could not be deleted", path.display()))?;
    }
    std::fs::write(path, rendered)
        .with_context(|| format!("failed to write report to {}", path.display()))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parses_and_displays() {
        assert_eq!(
            "SARIF".parse::<ReportFormat>().unwrap(),
            ReportFormat::Sarif
        );
        assert_eq!("txt".parse::<ReportFormat>().unwrap(), ReportFormat::Text);
        assert!("html".parse::<ReportFormat>().is_err());
        assert_eq!(ReportFormat::Json.to_string(), "json");
    }

    #[test]
    fn json_render_roundtrips() {
        let report = fixtures::mixed_report();
        let rendered = render(&report, ReportFormat::Json).unwrap();
        let back: GradeReport = serde_json::from_str(&rendered).unwrap();
        assert_eq!(back.result, report.result);
    }

    #[test]
    fn write_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.txt");
        std::fs::write(&path, "stale contents that are much longer than needed").unwrap();

        write_report(&fixtures::mixed_report(), ReportFormat::Text, &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("Evaluated File: answer.cs"));
        assert!(!written.contains("stale"));
    }
}
