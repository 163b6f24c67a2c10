//! The `sharpgrade init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    if Path::new("sharpgrade.toml").exists() {
        println!("sharpgrade.toml already exists, skipping.");
    } else {
        std::fs::write("sharpgrade.toml", SAMPLE_CONFIG)?;
        println!("Created sharpgrade.toml");
    }

    std::fs::create_dir_all("batteries")?;
    let battery_path = Path::new("batteries/fizzbuzz.toml");
    if battery_path.exists() {
        println!("batteries/fizzbuzz.toml already exists, skipping.");
    } else {
        std::fs::write(battery_path, FIZZBUZZ_BATTERY)?;
        println!("Created batteries/fizzbuzz.toml");
    }

    println!("\nNext steps:");
    println!("  1. Check the [toolchain] section of sharpgrade.toml");
    println!("  2. Run: sharpgrade validate --battery batteries/fizzbuzz.toml");
    println!("  3. Run: sharpgrade grade answer.cs report.txt --battery batteries/fizzbuzz.toml");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# sharpgrade configuration

compile_timeout_secs = 120
# Per-test limit; 0 disables it.
invoke_timeout_secs = 10

[toolchain]
compiler = "mcs"
# Remove to run the built assembly directly (.NET Framework on Windows).
runtime = "mono"
references = ["System.dll", "System.Core.dll", "System.Data.dll"]
extra_args = []
"#;

pub const FIZZBUZZ_BATTERY: &str = r#"[battery]
id = "fizzbuzz"
name = "FizzBuzz"
description = "Classic FizzBuzz: multiples of 3 are Fizz, of 5 Buzz, of both FizzBuzz"
namespace = "FizzBuzzSample"
class_name = "FizzBuzzClass"

[[tests]]
name = "Standard number is returned as string"
inputs = [1]
expected = "1"

[[tests]]
name = "3 is returned as 'Fizz'"
inputs = [3]
expected = "Fizz"

[[tests]]
name = "5 is returned as 'Buzz'"
inputs = [5]
expected = "Buzz"

[[tests]]
name = "15 is returned as 'FizzBuzz'"
inputs = [15]
expected = "FizzBuzz"

[[tests]]
name = "9 is returned as 'Fizz'"
inputs = [9]
expected = "Fizz"

[[tests]]
name = "20 is returned as 'Buzz'"
inputs = [20]
expected = "Buzz"

[[tests]]
name = "30 is returned as 'FizzBuzz'"
inputs = [30]
expected = "FizzBuzz"
"#;
