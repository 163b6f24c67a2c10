//! CLI configuration: timeouts and the C# toolchain.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use sharpgrade_runner::Toolchain;

/// Top-level sharpgrade configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharpgradeConfig {
    /// Upper bound for a single compiler run.
    #[serde(default = "default_compile_timeout")]
    pub compile_timeout_secs: u64,
    /// Upper bound for a single test invocation; 0 disables it.
    #[serde(default = "default_invoke_timeout")]
    pub invoke_timeout_secs: u64,
    #[serde(default)]
    pub toolchain: Toolchain,
}

fn default_compile_timeout() -> u64 {
    120
}
fn default_invoke_timeout() -> u64 {
    10
}

impl Default for SharpgradeConfig {
    fn default() -> Self {
        Self {
            compile_timeout_secs: default_compile_timeout(),
            invoke_timeout_secs: default_invoke_timeout(),
            toolchain: Toolchain::default(),
        }
    }
}

impl SharpgradeConfig {
    pub fn compile_timeout(&self) -> Duration {
        Duration::from_secs(self.compile_timeout_secs)
    }

    pub fn invoke_timeout(&self) -> Duration {
        Duration::from_secs(self.invoke_timeout_secs)
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        let var_name = &rest[start + 2..start + len];
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + len + 1..];
    }
    result.push_str(rest);
    result
}

fn resolve_toolchain(toolchain: &Toolchain) -> Toolchain {
    let all = |values: &[String]| -> Vec<String> {
        values.iter().map(|v| resolve_env_vars(v)).collect()
    };
    Toolchain {
        compiler: resolve_env_vars(&toolchain.compiler),
        runtime: toolchain.runtime.as_deref().map(resolve_env_vars),
        runtime_args: all(&toolchain.runtime_args),
        references: all(&toolchain.references),
        extra_args: all(&toolchain.extra_args),
    }
}

/// Load config from an explicit path, or search the default locations.
///
/// Search order:
/// 1. `path`, which must exist when given
/// 2. `sharpgrade.toml` in the current directory
/// 3. `~/.config/sharpgrade/config.toml`
///
/// Environment variable overrides: `SHARPGRADE_COMPILER`, `SHARPGRADE_RUNTIME`
/// (an empty runtime runs the assembly directly).
pub fn load_config_from(path: Option<&Path>) -> Result<SharpgradeConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("sharpgrade.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            parse_config(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => {
            tracing::debug!("no config file found, using defaults");
            SharpgradeConfig::default()
        }
    };

    if let Ok(compiler) = std::env::var("SHARPGRADE_COMPILER") {
        config.toolchain.compiler = compiler;
    }
    if let Ok(runtime) = std::env::var("SHARPGRADE_RUNTIME") {
        config.toolchain.runtime = Some(runtime).filter(|r| !r.is_empty());
    }

    config.toolchain = resolve_toolchain(&config.toolchain);
    Ok(config)
}

fn parse_config(content: &str) -> Result<SharpgradeConfig> {
    Ok(toml::from_str(content)?)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("sharpgrade"))
}
