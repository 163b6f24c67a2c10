//! Evaluation result types and scoring.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::TestDefinition;

/// Actual-result text reported for every test when the candidate does not build.
pub const DOES_NOT_BUILD: &str = "Does not build";

/// A single compiler diagnostic reported for a failed build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileError {
    /// 1-based line in the submitted source (0 when the diagnostic has no location).
    pub line: u32,
    /// 1-based column (0 when unknown).
    #[serde(default)]
    pub column: u32,
    /// Compiler diagnostic code (e.g. "CS1525").
    #[serde(default)]
    pub code: Option<String>,
    /// Diagnostic text.
    pub message: String,
}

impl CompileError {
    /// A diagnostic with no source location.
    pub fn unlocated(message: impl Into<String>) -> Self {
        Self {
            line: 0,
            column: 0,
            code: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Line {}: {}", self.line, self.message)
    }
}

/// Classification of one evaluation item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemStatus {
    Pass,
    Fail,
    Error,
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemStatus::Pass => write!(f, "Pass"),
            ItemStatus::Fail => write!(f, "Fail"),
            ItemStatus::Error => write!(f, "Error"),
        }
    }
}

/// The reportable outcome of one test in one run.
///
/// Only the `pass`, `fail`, and `error` constructors exist, so an error item
/// can never also be a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationItem {
    test_name: String,
    expected_result: String,
    actual_result: String,
    is_pass: bool,
    is_error: bool,
}

impl EvaluationItem {
    pub fn pass(test: &TestDefinition, actual: impl Into<String>) -> Self {
        Self::new(test, actual.into(), true, false)
    }

    pub fn fail(test: &TestDefinition, actual: impl Into<String>) -> Self {
        Self::new(test, actual.into(), false, false)
    }

    pub fn error(test: &TestDefinition, actual: impl Into<String>) -> Self {
        Self::new(test, actual.into(), false, true)
    }

    fn new(test: &TestDefinition, actual_result: String, is_pass: bool, is_error: bool) -> Self {
        Self {
            test_name: test.name().to_string(),
            expected_result: test.expectation_description().to_string(),
            actual_result,
            is_pass,
            is_error,
        }
    }

    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    pub fn expected_result(&self) -> &str {
        &self.expected_result
    }

    pub fn actual_result(&self) -> &str {
        &self.actual_result
    }

    pub fn is_pass(&self) -> bool {
        self.is_pass
    }

    pub fn is_error(&self) -> bool {
        self.is_error
    }

    pub fn status(&self) -> ItemStatus {
        if self.is_error {
            ItemStatus::Error
        } else if self.is_pass {
            ItemStatus::Pass
        } else {
            ItemStatus::Fail
        }
    }
}

/// The complete outcome of grading one candidate against a battery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    summary: String,
    tests: Vec<EvaluationItem>,
    could_not_execute: bool,
    score: f64,
}

impl EvaluationResult {
    /// The result for a candidate that failed to build: every test is an
    /// error item and the diagnostics only appear in the summary.
    pub fn does_not_build(errors: &[CompileError], tests: &[TestDefinition]) -> Self {
        let rendered: Vec<String> = errors.iter().map(ToString::to_string).collect();
        Self {
            summary: format!(
                "Does not Build, {} Errors: {}",
                errors.len(),
                rendered.join(", ")
            ),
            tests: tests
                .iter()
                .map(|t| EvaluationItem::error(t, DOES_NOT_BUILD))
                .collect(),
            could_not_execute: true,
            score: 0.0,
        }
    }

    /// The result for a candidate whose battery ran to completion.
    pub fn completed(tests: Vec<EvaluationItem>) -> Self {
        let passed = tests.iter().filter(|t| t.is_pass()).count();
        Self {
            summary: format!("{}/{} tests passed.", passed, tests.len()),
            score: tally_score(&tests),
            tests,
            could_not_execute: false,
        }
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn tests(&self) -> &[EvaluationItem] {
        &self.tests
    }

    pub fn could_not_execute(&self) -> bool {
        self.could_not_execute
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn passed(&self) -> usize {
        self.count(ItemStatus::Pass)
    }

    pub fn failed(&self) -> usize {
        self.count(ItemStatus::Fail)
    }

    pub fn errored(&self) -> usize {
        self.count(ItemStatus::Error)
    }

    fn count(&self, status: ItemStatus) -> usize {
        self.tests.iter().filter(|t| t.status() == status).count()
    }
}

/// Score a completed battery: any error item collapses the score to 0.
///
/// Value mismatches alone never lower the score.
pub fn tally_score(items: &[EvaluationItem]) -> f64 {
    if items.iter().any(EvaluationItem::is_error) {
        0.0
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_named(name: &str, expected: &str) -> TestDefinition {
        TestDefinition::expecting(name, vec![json!(1)], expected)
    }

    #[test]
    fn item_constructors_uphold_error_invariant() {
        let t = test_named("t", "1");
        let pass = EvaluationItem::pass(&t, "1");
        let fail = EvaluationItem::fail(&t, "2");
        let error = EvaluationItem::error(&t, "boom");

        assert_eq!(pass.status(), ItemStatus::Pass);
        assert_eq!(fail.status(), ItemStatus::Fail);
        assert_eq!(error.status(), ItemStatus::Error);
        assert!(!error.is_pass());
        assert_eq!(error.expected_result(), "1");
        assert_eq!(error.actual_result(), "boom");
    }

    #[test]
    fn does_not_build_marks_every_test() {
        let tests = vec![test_named("a", "1"), test_named("b", "Fizz")];
        let errors = vec![
            CompileError {
                line: 7,
                column: 3,
                code: Some("CS1525".into()),
                message: "Unexpected symbol `broken'".into(),
            },
            CompileError::unlocated("second"),
        ];

        let result = EvaluationResult::does_not_build(&errors, &tests);

        assert!(result.could_not_execute());
        assert_eq!(result.score(), 0.0);
        assert_eq!(
            result.summary(),
            "Does not Build, 2 Errors: Line 7: Unexpected symbol `broken', Line 0: second"
        );
        assert_eq!(result.tests().len(), 2);
        for (item, test) in result.tests().iter().zip(&tests) {
            assert!(item.is_error());
            assert!(!item.is_pass());
            assert_eq!(item.actual_result(), DOES_NOT_BUILD);
            assert_eq!(item.expected_result(), test.expectation_description());
        }
    }

    #[test]
    fn completed_summary_counts_passes() {
        let t = test_named("t", "1");
        let result = EvaluationResult::completed(vec![
            EvaluationItem::pass(&t, "1"),
            EvaluationItem::fail(&t, "2"),
            EvaluationItem::pass(&t, "1"),
        ]);
        assert_eq!(result.summary(), "2/3 tests passed.");
        assert_eq!(result.passed(), 2);
        assert_eq!(result.failed(), 1);
        assert_eq!(result.errored(), 0);
        assert!(!result.could_not_execute());
    }

    #[test]
    fn one_error_collapses_score_but_mismatches_do_not() {
        let t = test_named("t", "1");

        let mut mostly_passing: Vec<_> = (0..9).map(|_| EvaluationItem::pass(&t, "1")).collect();
        mostly_passing.push(EvaluationItem::error(&t, "boom"));
        assert_eq!(EvaluationResult::completed(mostly_passing).score(), 0.0);

        let mut mostly_wrong: Vec<_> = (0..9).map(|_| EvaluationItem::fail(&t, "2")).collect();
        mostly_wrong.push(EvaluationItem::pass(&t, "1"));
        assert_eq!(EvaluationResult::completed(mostly_wrong).score(), 1.0);
    }

    #[test]
    fn empty_battery_scores_one() {
        let result = EvaluationResult::completed(vec![]);
        assert_eq!(result.summary(), "0/0 tests passed.");
        assert_eq!(result.score(), 1.0);
    }

    #[test]
    fn result_serde_roundtrip() {
        let t = test_named("t", "1");
        let result = EvaluationResult::completed(vec![EvaluationItem::pass(&t, "1")]);
        let json = serde_json::to_string(&result).unwrap();
        let back: EvaluationResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }
}
