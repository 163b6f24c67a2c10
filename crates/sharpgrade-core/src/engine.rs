//! The evaluator: normalize, compile once, run every test in order, score.
//!
//! Tests run strictly one after another on the caller's task. A failing test
//! never aborts the battery, and nothing in here returns an error: every
//! failure ends up encoded in the [`EvaluationResult`].

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::InvocationError;
use crate::model::{TargetType, TestBattery, TestDefinition};
use crate::normalize;
use crate::results::{CompileError, EvaluationItem, EvaluationResult};
use crate::traits::{LoadedUnit, UnitCompiler};

/// Progress reporting trait.
pub trait ProgressReporter: Send + Sync {
    fn on_build_failed(&self, errors: &[CompileError]);
    fn on_unit_loaded(&self, entry_point: &str);
    fn on_test_complete(&self, index: usize, total: usize, item: &EvaluationItem);
}

/// No-op progress reporter.
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_build_failed(&self, _: &[CompileError]) {}
    fn on_unit_loaded(&self, _: &str) {}
    fn on_test_complete(&self, _: usize, _: usize, _: &EvaluationItem) {}
}

/// Everything produced by grading one raw submission.
#[derive(Debug, Clone)]
pub struct GradedSubmission {
    /// The submission exactly as received.
    pub original_source: String,
    /// The submission after normalization.
    pub normalized_source: String,
    /// Signature of the resolved method under test, if the build succeeded.
    pub entry_point: Option<String>,
    /// Outcome of the battery.
    pub result: EvaluationResult,
    /// Wall-clock time spent compiling and running tests.
    pub duration: Duration,
}

/// Grades submissions against a fixed battery of tests.
pub struct Evaluator {
    target: TargetType,
    tests: Vec<TestDefinition>,
    compiler: Arc<dyn UnitCompiler>,
}

impl Evaluator {
    pub fn new(
        target: TargetType,
        tests: Vec<TestDefinition>,
        compiler: Arc<dyn UnitCompiler>,
    ) -> Self {
        Self {
            target,
            tests,
            compiler,
        }
    }

    /// Build an evaluator for a parsed battery.
    pub fn for_battery(battery: TestBattery, compiler: Arc<dyn UnitCompiler>) -> Self {
        Self::new(battery.target, battery.tests, compiler)
    }

    pub fn target(&self) -> &TargetType {
        &self.target
    }

    pub fn tests(&self) -> &[TestDefinition] {
        &self.tests
    }

    /// Rewrite raw source into canonical form for this evaluator's target.
    pub fn normalize(&self, code: &str) -> String {
        normalize::normalize(code, &self.target)
    }

    /// Compile `code` as given (raw or canonical) and run the battery.
    pub async fn evaluate(&self, code: &str) -> EvaluationResult {
        self.evaluate_with(code, &NoopReporter).await
    }

    /// Like [`Evaluator::evaluate`], reporting progress as tests complete.
    pub async fn evaluate_with(
        &self,
        code: &str,
        progress: &dyn ProgressReporter,
    ) -> EvaluationResult {
        self.run(code, progress).await.1
    }

    /// Normalize `raw`, then evaluate the canonical source.
    pub async fn grade(&self, raw: &str) -> GradedSubmission {
        self.grade_with(raw, &NoopReporter).await
    }

    /// Like [`Evaluator::grade`], reporting progress as tests complete.
    pub async fn grade_with(&self, raw: &str, progress: &dyn ProgressReporter) -> GradedSubmission {
        let start = Instant::now();
        let normalized_source = self.normalize(raw);
        let (entry_point, result) = self.run(&normalized_source, progress).await;
        GradedSubmission {
            original_source: raw.to_string(),
            normalized_source,
            entry_point,
            result,
            duration: start.elapsed(),
        }
    }

    async fn run(
        &self,
        code: &str,
        progress: &dyn ProgressReporter,
    ) -> (Option<String>, EvaluationResult) {
        let unit = match self.compiler.compile(code, &self.target).await {
            Ok(unit) => unit,
            Err(errors) => {
                tracing::warn!(
                    target_type = %self.target,
                    errors = errors.len(),
                    "submission does not build"
                );
                progress.on_build_failed(&errors);
                return (None, EvaluationResult::does_not_build(&errors, &self.tests));
            }
        };

        let entry_point = unit.entry_point().to_string();
        tracing::info!(
            target_type = %self.target,
            entry_point = %entry_point,
            tests = self.tests.len(),
            "submission loaded, running tests"
        );
        progress.on_unit_loaded(&entry_point);

        let total = self.tests.len();
        let mut items = Vec::with_capacity(total);
        for (index, test) in self.tests.iter().enumerate() {
            let item = run_test(unit.as_ref(), test).await;
            progress.on_test_complete(index, total, &item);
            items.push(item);
        }

        let result = EvaluationResult::completed(items);
        tracing::info!(
            summary = result.summary(),
            score = result.score(),
            "evaluation complete"
        );
        (Some(entry_point), result)
    }
}

/// Run one test against a fresh instance and classify the outcome.
///
/// Panics in the setup hook or the expectation check become error items.
async fn run_test(unit: &dyn LoadedUnit, test: &TestDefinition) -> EvaluationItem {
    let setup = match panic::catch_unwind(AssertUnwindSafe(|| test.perform_setup())) {
        Ok(setup) => setup,
        Err(payload) => Err(anyhow::anyhow!("panicked: {}", panic_message(&*payload))),
    };
    let outcome = match setup {
        Ok(()) => unit.invoke(test.inputs()).await,
        Err(e) => Err(InvocationError::Setup(format!("{e:#}"))),
    };

    let checked = outcome.and_then(|output| {
        panic::catch_unwind(AssertUnwindSafe(|| test.evaluate_output(&output)))
            .map_err(|payload| {
                let message = panic_message(&*payload);
                InvocationError::Harness(format!("expectation check panicked: {message}"))
            })
    });

    match checked {
        Ok(local) => {
            if local.is_pass() {
                EvaluationItem::pass(test, local.output())
            } else {
                tracing::debug!(test = test.name(), actual = local.output(), "wrong answer");
                EvaluationItem::fail(test, local.output())
            }
        }
        Err(err) => {
            if err.is_candidate_fault() {
                tracing::debug!(test = test.name(), "candidate raised: {err}");
            } else {
                // Reported the same way as a candidate fault; only the log differs.
                tracing::warn!(test = test.name(), "harness-level failure: {err}");
            }
            EvaluationItem::error(test, err.to_string())
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
