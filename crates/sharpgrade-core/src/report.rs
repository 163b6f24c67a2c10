//! Grade report types with JSON persistence.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::GradedSubmission;
use crate::model::{TargetType, TestBattery};
use crate::results::EvaluationResult;

/// A complete grade report for one submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeReport {
    /// Unique report identifier.
    pub id: Uuid,
    /// When the report was created.
    pub created_at: DateTime<Utc>,
    /// Path of the evaluated source file, as given.
    pub file_name: String,
    /// The battery the submission was graded against.
    pub battery: BatterySummary,
    /// Namespace and class the submission was normalized into.
    pub target: TargetType,
    /// Signature of the resolved method under test.
    #[serde(default)]
    pub entry_point: Option<String>,
    pub original_source: String,
    pub normalized_source: String,
    pub result: EvaluationResult,
    /// Wall-clock duration of compilation and testing in milliseconds.
    pub duration_ms: u64,
}

/// Summary of a battery (without the test closures).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatterySummary {
    pub id: String,
    pub name: String,
    pub test_count: usize,
}

impl BatterySummary {
    pub fn of(battery: &TestBattery) -> Self {
        Self {
            id: battery.id.clone(),
            name: battery.name.clone(),
            test_count: battery.tests.len(),
        }
    }
}

impl GradeReport {
    /// Build a report for a graded submission, stamped with the current time.
    pub fn new(
        file_name: impl Into<String>,
        battery: &TestBattery,
        graded: GradedSubmission,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            file_name: file_name.into(),
            battery: BatterySummary::of(battery),
            target: battery.target.clone(),
            entry_point: graded.entry_point,
            original_source: graded.original_source,
            normalized_source: graded.normalized_source,
            result: graded.result,
            duration_ms: graded.duration.as_millis() as u64,
        }
    }

    /// Save the report as pretty JSON, replacing any existing file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: GradeReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TestDefinition;
    use crate::results::{CompileError, EvaluationItem};
    use serde_json::json;
    use std::time::Duration;

    fn battery() -> TestBattery {
        TestBattery {
            id: "fizzbuzz".into(),
            name: "FizzBuzz".into(),
            description: String::new(),
            target: TargetType::new("FizzBuzzSample", "FizzBuzzClass"),
            tests: vec![
                TestDefinition::expecting("one", vec![json!(1)], "1"),
                TestDefinition::expecting("three", vec![json!(3)], "Fizz"),
            ],
        }
    }

    fn graded(result: EvaluationResult) -> GradedSubmission {
        GradedSubmission {
            original_source: "public string F(int n) { return \"1\"; }".into(),
            normalized_source: "namespace FizzBuzzSample\n{ }".into(),
            entry_point: Some("System.String F(Int32)".into()),
            result,
            duration: Duration::from_millis(1234),
        }
    }

    #[test]
    fn new_copies_submission_fields() {
        let battery = battery();
        let result = EvaluationResult::completed(vec![
            EvaluationItem::pass(&battery.tests[0], "1"),
            EvaluationItem::fail(&battery.tests[1], "3"),
        ]);
        let report = GradeReport::new("answer.cs", &battery, graded(result));

        assert_eq!(report.file_name, "answer.cs");
        assert_eq!(report.battery.test_count, 2);
        assert_eq!(report.target.class_name, "FizzBuzzClass");
        assert_eq!(report.duration_ms, 1234);
        assert_eq!(report.result.summary(), "1/2 tests passed.");
    }

    #[test]
    fn json_roundtrip() {
        let battery = battery();
        let result = EvaluationResult::does_not_build(
            &[CompileError::unlocated("compiler not found")],
            &battery.tests,
        );
        let report = GradeReport::new("broken.cs", &battery, graded(result));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("report.json");
        report.save_json(&path).unwrap();
        // Saving again replaces the file.
        report.save_json(&path).unwrap();

        let loaded = GradeReport::load_json(&path).unwrap();
        assert_eq!(loaded.id, report.id);
        assert_eq!(loaded.result, report.result);
        assert!(loaded.result.could_not_execute());
        assert_eq!(loaded.entry_point, report.entry_point);
    }

    #[test]
    fn load_missing_file_has_context() {
        let dir = tempfile::tempdir().unwrap();
        let err = GradeReport::load_json(&dir.path().join("absent.json")).unwrap_err();
        assert!(format!("{err:#}").contains("failed to read report"));
    }
}
