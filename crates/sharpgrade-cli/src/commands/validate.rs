//! The `sharpgrade validate` command.

use std::path::PathBuf;

use anyhow::Result;

use sharpgrade_core::parser;

pub fn execute(battery_path: PathBuf) -> Result<()> {
    let file = parser::load_battery_file(&battery_path)?;
    println!(
        "Battery: {} ({} tests) -> {}",
        file.battery.name,
        file.tests.len(),
        file.target()
    );

    let warnings = parser::validate_battery(&file);
    for w in &warnings {
        let prefix = w
            .test_name
            .as_ref()
            .map(|name| format!("  [{name}]"))
            .unwrap_or_else(|| "  ".to_string());
        println!("{prefix} WARNING: {}", w.message);
    }

    if warnings.is_empty() {
        println!("Battery valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}
