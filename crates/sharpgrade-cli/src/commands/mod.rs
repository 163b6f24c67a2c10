pub mod grade;
pub mod init;
pub mod normalize;
pub mod validate;

use std::path::{Path, PathBuf};

use anyhow::Result;

use sharpgrade_core::model::TestBattery;
use sharpgrade_core::parser;

/// Where the battery and target type come from.
pub struct TargetArgs {
    pub battery: Option<PathBuf>,
    pub namespace: Option<String>,
    pub class_name: Option<String>,
}

impl TargetArgs {
    /// Load the named battery (or the built-in one) and apply the
    /// namespace/class overrides.
    pub fn resolve(&self) -> Result<TestBattery> {
        let mut battery = match &self.battery {
            Some(path) => parser::parse_battery(path)?,
            None => default_battery()?,
        };
        if let Some(namespace) = &self.namespace {
            battery.target.namespace = namespace.clone();
        }
        if let Some(class_name) = &self.class_name {
            battery.target.class_name = class_name.clone();
        }
        Ok(battery)
    }
}

/// The FizzBuzz battery that `init` writes out.
pub fn default_battery() -> Result<TestBattery> {
    parser::parse_battery_str(init::FIZZBUZZ_BATTERY, Path::new("<built-in fizzbuzz>"))
}

/// Read a source file, failing with the path when it does not exist.
pub fn read_source(path: &Path) -> Result<String> {
    if !path.is_file() {
        anyhow::bail!("source file not found: {}", path.display());
    }
    Ok(std::fs::read_to_string(path)?)
}
