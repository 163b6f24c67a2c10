//! Core data model types for sharpgrade.
//!
//! These are the types the rest of the system uses to describe what is being
//! graded: the target type, individual test definitions, and test batteries.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Number;

/// A dynamically typed argument or return value.
pub type Value = serde_json::Value;

/// Comparison function applied to a test's actual output.
pub type EvaluateFn = dyn Fn(&Value) -> LocalEvaluationResult + Send + Sync;

/// Zero-argument hook run immediately before a test's invocation.
pub type SetupFn = dyn Fn() -> anyhow::Result<()> + Send + Sync;

/// The namespace and class a submission is normalized into and resolved from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetType {
    /// Namespace the canonical class lives in.
    pub namespace: String,
    /// Name of the canonical class.
    pub class_name: String,
}

impl TargetType {
    pub fn new(namespace: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            class_name: class_name.into(),
        }
    }

    /// Fully qualified `Namespace.ClassName`.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.namespace, self.class_name)
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.class_name)
    }
}

/// Outcome of comparing one actual output against one expectation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalEvaluationResult {
    is_pass: bool,
    output: String,
}

impl LocalEvaluationResult {
    pub fn new(is_pass: bool, output: impl Into<String>) -> Self {
        Self {
            is_pass,
            output: output.into(),
        }
    }

    pub fn is_pass(&self) -> bool {
        self.is_pass
    }

    /// Rendered actual output (empty for null/void).
    pub fn output(&self) -> &str {
        &self.output
    }
}

/// How a literal expectation is compared against the actual output.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Comparison {
    /// Structural equality; numbers compare by value.
    #[default]
    Exact,
    /// Strings compare after trimming surrounding whitespace.
    Trimmed,
    /// Strings compare case-insensitively.
    IgnoreCase,
    /// Numbers compare within an absolute tolerance.
    Approximate(f64),
}

impl Comparison {
    /// Check whether `actual` satisfies `expected` under this comparison.
    ///
    /// Non-string (or non-numeric, for `Approximate`) operands fall back to
    /// exact comparison.
    pub fn matches(&self, expected: &Value, actual: &Value) -> bool {
        match (self, expected, actual) {
            (Comparison::Trimmed, Value::String(e), Value::String(a)) => e.trim() == a.trim(),
            (Comparison::IgnoreCase, Value::String(e), Value::String(a)) => {
                e.to_lowercase() == a.to_lowercase()
            }
            (Comparison::Approximate(tolerance), Value::Number(e), Value::Number(a)) => {
                match (e.as_f64(), a.as_f64()) {
                    (Some(e), Some(a)) => (e - a).abs() <= *tolerance,
                    _ => false,
                }
            }
            _ => values_equal(expected, actual),
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparison::Exact => write!(f, "exact"),
            Comparison::Trimmed => write!(f, "trimmed"),
            Comparison::IgnoreCase => write!(f, "ignore_case"),
            Comparison::Approximate(tolerance) => write!(f, "approximate(±{tolerance})"),
        }
    }
}

/// Render a value the way reports show it.
///
/// Strings render without quotes, null renders as the empty string, and
/// everything else renders as compact JSON.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Structural equality where numbers compare by numeric value (`1 == 1.0`).
pub fn values_equal(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Number(a), Value::Number(b)) => numbers_equal(a, b),
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a
                    .iter()
                    .all(|(key, x)| b.get(key).is_some_and(|y| values_equal(x, y)))
        }
        _ => expected == actual,
    }
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

/// One case in a grading battery: inputs, an expectation, and an optional
/// setup hook.
///
/// Immutable once built. Cloning shares the evaluate and setup closures.
#[derive(Clone)]
pub struct TestDefinition {
    name: String,
    inputs: Vec<Value>,
    expectation_description: String,
    evaluate: Arc<EvaluateFn>,
    setup: Option<Arc<SetupFn>>,
}

impl TestDefinition {
    /// A test whose output must equal `expected` exactly.
    pub fn expecting(
        name: impl Into<String>,
        inputs: Vec<Value>,
        expected: impl Into<Value>,
    ) -> Self {
        Self::compared(name, inputs, expected, Comparison::Exact)
    }

    /// A test whose output is compared against `expected` with `comparison`.
    pub fn compared(
        name: impl Into<String>,
        inputs: Vec<Value>,
        expected: impl Into<Value>,
        comparison: Comparison,
    ) -> Self {
        let expected = expected.into();
        let description = render_value(&expected);
        Self::with_check(name, inputs, description, move |actual| {
            LocalEvaluationResult::new(comparison.matches(&expected, actual), render_value(actual))
        })
    }

    /// A test with a caller-supplied comparison function.
    pub fn with_check<F>(
        name: impl Into<String>,
        inputs: Vec<Value>,
        expectation_description: impl Into<String>,
        evaluate: F,
    ) -> Self
    where
        F: Fn(&Value) -> LocalEvaluationResult + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            inputs,
            expectation_description: expectation_description.into(),
            evaluate: Arc::new(evaluate),
            setup: None,
        }
    }

    /// Attach a setup hook run immediately before each invocation.
    pub fn with_setup<F>(mut self, setup: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.setup = Some(Arc::new(setup));
        self
    }

    /// Replace the rendered expectation shown in reports.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.expectation_description = description.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inputs(&self) -> &[Value] {
        &self.inputs
    }

    pub fn expectation_description(&self) -> &str {
        &self.expectation_description
    }

    pub fn has_setup(&self) -> bool {
        self.setup.is_some()
    }

    /// Run the setup hook, if any.
    pub fn perform_setup(&self) -> anyhow::Result<()> {
        match &self.setup {
            Some(setup) => setup(),
            None => Ok(()),
        }
    }

    /// Compare an actual output against this test's expectation.
    pub fn evaluate_output(&self, actual: &Value) -> LocalEvaluationResult {
        (self.evaluate)(actual)
    }
}

impl fmt::Debug for TestDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestDefinition")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("expectation_description", &self.expectation_description)
            .field("has_setup", &self.setup.is_some())
            .finish()
    }
}

/// A named, ordered list of tests plus the type they are run against.
#[derive(Debug, Clone)]
pub struct TestBattery {
    /// Unique identifier for this battery.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Description of what the battery checks.
    pub description: String,
    /// Namespace and class the submission is normalized into.
    pub target: TargetType,
    /// The tests, in execution order.
    pub tests: Vec<TestDefinition>,
}
