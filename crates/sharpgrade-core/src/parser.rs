//! TOML test battery parser.
//!
//! Loads batteries from TOML files and validates them.

use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;

use crate::model::{Comparison, TargetType, TestBattery, TestDefinition, Value};

/// Tolerance used by `approximate` tests that do not name one.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@?[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid")
});

/// A battery file as written on disk, before its tests become closures.
#[derive(Debug, Clone, Deserialize)]
pub struct BatteryFile {
    pub battery: BatteryHeader,
    #[serde(default)]
    pub tests: Vec<TestCase>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatteryHeader {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub namespace: String,
    pub class_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TestCase {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<Value>,
    #[serde(default)]
    pub expected: Option<Value>,
    /// TOML has no null literal; this stands in for `expected = null`.
    #[serde(default)]
    pub expected_null: bool,
    #[serde(default)]
    pub compare: CompareMode,
    #[serde(default)]
    pub tolerance: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
}

/// The `compare` key of a test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareMode {
    #[default]
    Exact,
    Trimmed,
    IgnoreCase,
    Approximate,
}

impl TestCase {
    /// The value the method must return.
    pub fn expectation(&self) -> Value {
        self.expected.clone().unwrap_or(Value::Null)
    }

    fn check_expectation(&self) -> Result<()> {
        let name = &self.name;
        match (&self.expected, self.expected_null) {
            (Some(_), true) => anyhow::bail!("test '{name}' sets both expected and expected_null"),
            (None, false) => anyhow::bail!("test '{name}' has no expected value"),
            _ => Ok(()),
        }
    }

    fn comparison(&self) -> Comparison {
        match self.compare {
            CompareMode::Exact => Comparison::Exact,
            CompareMode::Trimmed => Comparison::Trimmed,
            CompareMode::IgnoreCase => Comparison::IgnoreCase,
            CompareMode::Approximate => {
                Comparison::Approximate(self.tolerance.unwrap_or(DEFAULT_TOLERANCE))
            }
        }
    }

    /// Build the runnable test definition.
    pub fn to_definition(&self) -> TestDefinition {
        let test = TestDefinition::compared(
            self.name.clone(),
            self.inputs.clone(),
            self.expectation(),
            self.comparison(),
        );
        match &self.description {
            Some(description) => test.with_description(description.clone()),
            None => test,
        }
    }
}

impl BatteryFile {
    pub fn target(&self) -> TargetType {
        TargetType::new(&self.battery.namespace, &self.battery.class_name)
    }

    /// Turn the file into a runnable battery, preserving test order.
    pub fn to_battery(&self) -> TestBattery {
        TestBattery {
            id: self.battery.id.clone(),
            name: self.battery.name.clone(),
            description: self.battery.description.clone(),
            target: self.target(),
            tests: self.tests.iter().map(TestCase::to_definition).collect(),
        }
    }
}

/// Read and deserialize a battery file without building it.
pub fn load_battery_file(path: &Path) -> Result<BatteryFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read battery file: {}", path.display()))?;
    parse_battery_file_str(&content, path)
}

/// Deserialize battery TOML (useful for testing).
pub fn parse_battery_file_str(content: &str, source_path: &Path) -> Result<BatteryFile> {
    let parsed: BatteryFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;
    for test in &parsed.tests {
        test.check_expectation()
            .with_context(|| format!("invalid battery: {}", source_path.display()))?;
    }
    tracing::debug!(
        battery = %parsed.battery.id,
        tests = parsed.tests.len(),
        "parsed battery {}",
        source_path.display()
    );
    Ok(parsed)
}

/// Parse a single TOML file into a `TestBattery`.
pub fn parse_battery(path: &Path) -> Result<TestBattery> {
    Ok(load_battery_file(path)?.to_battery())
}

/// Parse a TOML string into a `TestBattery`.
pub fn parse_battery_str(content: &str, source_path: &Path) -> Result<TestBattery> {
    Ok(parse_battery_file_str(content, source_path)?.to_battery())
}

/// A warning from battery validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The test name (if applicable).
    pub test_name: Option<String>,
    /// Warning message.
    pub message: String,
}

/// Validate a battery file for common issues.
pub fn validate_battery(file: &BatteryFile) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if file.tests.is_empty() {
        warnings.push(ValidationWarning {
            test_name: None,
            message: "battery has no tests".into(),
        });
    }

    if !is_namespace(&file.battery.namespace) {
        warnings.push(ValidationWarning {
            test_name: None,
            message: format!(
                "namespace '{}' is not a valid C# namespace",
                file.battery.namespace
            ),
        });
    }

    if !IDENTIFIER.is_match(&file.battery.class_name) {
        warnings.push(ValidationWarning {
            test_name: None,
            message: format!(
                "class_name '{}' is not a valid C# identifier",
                file.battery.class_name
            ),
        });
    }

    let mut seen = HashSet::new();
    for test in &file.tests {
        if !seen.insert(test.name.as_str()) {
            warnings.push(ValidationWarning {
                test_name: Some(test.name.clone()),
                message: format!("duplicate test name: {}", test.name),
            });
        }
    }

    for test in &file.tests {
        if test.tolerance.is_some() && test.compare != CompareMode::Approximate {
            warnings.push(ValidationWarning {
                test_name: Some(test.name.clone()),
                message: "tolerance is only used with compare = \"approximate\"".into(),
            });
        }
        if test.compare == CompareMode::Approximate && !test.expectation().is_number() {
            warnings.push(ValidationWarning {
                test_name: Some(test.name.clone()),
                message: "approximate comparison against a non-numeric expectation".into(),
            });
        }
    }

    warnings
}

fn is_namespace(namespace: &str) -> bool {
    namespace
        .split('.')
        .all(|segment| IDENTIFIER.is_match(segment))
}
