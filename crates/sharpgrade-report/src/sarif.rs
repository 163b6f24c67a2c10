//! SARIF (Static Analysis Results Interchange Format) output.
//!
//! Generates SARIF 2.1.0 documents so grading results can be shown by code
//! scanning tools next to the submitted file.

use serde_json::json;

use sharpgrade_core::report::GradeReport;
use sharpgrade_core::results::ItemStatus;

const RULES: [(&str, &str, &str); 3] = [
    (
        "build-failure",
        "Build Failure",
        "The submission could not be compiled or its method under test could not be resolved",
    ),
    (
        "runtime-error",
        "Runtime Error",
        "The method under test threw, crashed, or timed out",
    ),
    (
        "wrong-answer",
        "Wrong Answer",
        "The method under test returned a value that did not match the expectation",
    ),
];

/// Generate a SARIF 2.1.0 JSON document from a grade report.
pub fn generate_sarif(report: &GradeReport) -> serde_json::Value {
    let rules: Vec<_> = RULES
        .iter()
        .map(|(id, name, desc)| {
            json!({
                "id": id,
                "name": name,
                "shortDescription": { "text": desc },
            })
        })
        .collect();

    let location = json!({
        "physicalLocation": {
            "artifactLocation": { "uri": report.file_name.replace('\\', "/") }
        }
    });

    let mut results = Vec::new();

    if report.result.could_not_execute() {
        // Every item says "Does not build"; the diagnostics live in the summary.
        results.push(json!({
            "ruleId": "build-failure",
            "level": "error",
            "message": { "text": report.result.summary() },
            "locations": [location.clone()]
        }));
    } else {
        for item in report.result.tests() {
            let (rule, level, text) = match item.status() {
                ItemStatus::Pass => continue,
                ItemStatus::Error => (
                    "runtime-error",
                    "error",
                    format!(
                        "test '{}' errored: {}",
                        item.test_name(),
                        item.actual_result()
                    ),
                ),
                ItemStatus::Fail => (
                    "wrong-answer",
                    "warning",
                    format!(
                        "test '{}' expected '{}' but got '{}'",
                        item.test_name(),
                        item.expected_result(),
                        item.actual_result()
                    ),
                ),
            };
            results.push(json!({
                "ruleId": rule,
                "level": level,
                "message": { "text": text },
                "locations": [location.clone()]
            }));
        }
    }

    json!({
        "$schema": "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/main/sarif-2.1/schema/sarif-schema-2.1.0.json",
        "version": "2.1.0",
        "runs": [{
            "tool": {
                "driver": {
                    "name": "sharpgrade",
                    "version": env!("CARGO_PKG_VERSION"),
                    "rules": rules
                }
            },
            "results": results,
            "properties": {
                "battery": report.battery.id,
                "summary": report.result.summary(),
                "score": report.result.score()
            }
        }]
    })
}
