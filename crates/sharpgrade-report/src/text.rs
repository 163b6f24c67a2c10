//! Plain-text grading sheet.
//!
//! The layout is the one graders read: a header with the final result, one
//! line per test, then the submitted and normalized code.

use std::path::Path;

use chrono::Local;

use sharpgrade_core::report::GradeReport;
use sharpgrade_core::results::{EvaluationItem, ItemStatus};

/// Render one individual-result line.
pub fn format_item(item: &EvaluationItem) -> String {
    match item.status() {
        ItemStatus::Error => format!("\tError\t- {}: {}", item.test_name(), item.actual_result()),
        ItemStatus::Fail => format!(
            "\tFail\t- {}: Expected '{}', Actual was '{}'",
            item.test_name(),
            item.expected_result(),
            item.actual_result()
        ),
        ItemStatus::Pass => format!("\tPass\t- {}", item.test_name()),
    }
}

/// Generate the text report.
pub fn generate_text(report: &GradeReport) -> String {
    let file_name = Path::new(&report.file_name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| report.file_name.clone());

    let items: Vec<String> = report.result.tests().iter().map(format_item).collect();

    let mut text = String::new();
    text.push_str(&format!("Evaluated File: {file_name}\n"));
    text.push_str(&format!(
        "Evaluation Time: {}\n",
        report
            .created_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
    ));
    text.push_str(&format!("Final Result: {}\n\n", report.result.summary()));
    text.push_str("Individual Results:\n");
    text.push_str(&items.join("\n"));
    text.push_str("\n\n-------------- Original Code ----------------\n\n");
    text.push_str(&report.original_source);
    text.push_str("\n\n------------------ Normalized Code ---------------\n");
    text.push_str(&report.normalized_source);
    text.push('\n');
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn header_names_file_and_summary() {
        let text = generate_text(&fixtures::mixed_report());
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Evaluated File: answer.cs"));
        assert!(lines.next().unwrap().starts_with("Evaluation Time: "));
        assert_eq!(lines.next(), Some("Final Result: 1/3 tests passed."));
        assert_eq!(lines.next(), Some(""));
        assert_eq!(lines.next(), Some("Individual Results:"));
    }

    #[test]
    fn item_lines_follow_status() {
        let text = generate_text(&fixtures::mixed_report());
        assert!(text.contains("\tPass\t- Standard number is returned as string\n"));
        assert!(text.contains(
            "\tFail\t- 3 is returned as 'Fizz': Expected 'Fizz', Actual was '3'\n"
        ));
        let error_line = concat!(
            "\tError\t- 5 is returned as 'Buzz': ",
            "System.DivideByZeroException: Attempted to divide by zero.\n"
        );
        assert!(text.contains(error_line));
    }

    #[test]
    fn code_sections_close_the_report() {
        let report = fixtures::mixed_report();
        let text = generate_text(&report);
        let original = text
            .find("-------------- Original Code ----------------")
            .unwrap();
        let normalized = text
            .find("------------------ Normalized Code ---------------")
            .unwrap();
        assert!(original < normalized);
        assert!(text[original..normalized].contains(&report.original_source));
        assert!(text.ends_with(&format!("{}\n", report.normalized_source)));
    }

    #[test]
    fn build_failure_lists_every_test_as_error() {
        let text = generate_text(&fixtures::broken_report());
        assert!(text.contains(
            "Final Result: Does not Build, 1 Errors: Line 3: Unexpected symbol `stuff'"
        ));
        assert_eq!(text.matches(": Does not build\n").count(), 3);
    }
}
