//! The `sharpgrade normalize` command.

use std::path::PathBuf;

use anyhow::Result;

use sharpgrade_core::normalize;

use super::{read_source, TargetArgs};

pub fn execute(source: PathBuf, target: TargetArgs) -> Result<()> {
    let raw = read_source(&source)?;
    let battery = target.resolve()?;
    print!("{}", normalize::normalize(&raw, &battery.target));
    Ok(())
}
