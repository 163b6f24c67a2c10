//! The `sharpgrade grade` command.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use sharpgrade_core::engine::{Evaluator, ProgressReporter};
use sharpgrade_core::report::GradeReport;
use sharpgrade_core::results::{CompileError, EvaluationItem, ItemStatus};
use sharpgrade_report::{write_report, ReportFormat};
use sharpgrade_runner::MonoRunner;

use super::{read_source, TargetArgs};
use crate::config::load_config_from;

/// Console progress reporter.
struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn on_build_failed(&self, errors: &[CompileError]) {
        eprintln!("  Build failed with {} error(s)", errors.len());
        for e in errors {
            eprintln!("    Line {}: {}", e.line, e.message);
        }
    }

    fn on_unit_loaded(&self, entry_point: &str) {
        eprintln!("  Loaded: {entry_point}");
    }

    fn on_test_complete(&self, index: usize, total: usize, item: &EvaluationItem) {
        eprintln!(
            "  [{}/{}] {} {}",
            index + 1,
            total,
            status_label(item.status()),
            item.test_name()
        );
    }
}

fn status_label(status: ItemStatus) -> &'static str {
    match status {
        ItemStatus::Pass => "PASS",
        ItemStatus::Fail => "FAIL",
        ItemStatus::Error => "ERROR",
    }
}

pub async fn execute(
    source: PathBuf,
    report_path: PathBuf,
    target: TargetArgs,
    format: ReportFormat,
    config_path: Option<PathBuf>,
    timeout_secs: Option<u64>,
) -> Result<()> {
    let raw = read_source(&source)?;
    let config = load_config_from(config_path.as_deref())?;
    let battery = target.resolve()?;

    let invoke_timeout = timeout_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.invoke_timeout());
    let runner = MonoRunner::new(config.toolchain.clone())
        .with_compile_timeout(config.compile_timeout())
        .with_invoke_timeout(invoke_timeout);

    eprintln!(
        "Grading {} against '{}' ({} tests, {})",
        source.display(),
        battery.name,
        battery.tests.len(),
        battery.target
    );

    let evaluator = Evaluator::for_battery(battery.clone(), Arc::new(runner));
    let graded = evaluator.grade_with(&raw, &ConsoleReporter).await;

    tracing::info!(
        summary = graded.result.summary(),
        score = graded.result.score(),
        "graded {}",
        source.display()
    );

    let report = GradeReport::new(source.display().to_string(), &battery, graded);
    write_report(&report, format, &report_path)?;

    print_summary(&report);
    println!(
        "Evaluation complete, results saved to {}",
        report_path.display()
    );

    Ok(())
}

fn print_summary(report: &GradeReport) {
    use comfy_table::{Cell, Table};

    let mut table = Table::new();
    table.set_header(vec!["Test", "Status", "Expected", "Actual"]);

    for item in report.result.tests() {
        table.add_row(vec![
            Cell::new(item.test_name()),
            Cell::new(status_label(item.status())),
            Cell::new(item.expected_result()),
            Cell::new(item.actual_result()),
        ]);
    }

    let result = &report.result;
    eprintln!("\n{table}");
    eprintln!(
        "{} ({} passed, {} failed, {} errors; score {:.2}, {}ms)",
        result.summary(),
        result.passed(),
        result.failed(),
        result.errored(),
        result.score(),
        report.duration_ms
    );
}
