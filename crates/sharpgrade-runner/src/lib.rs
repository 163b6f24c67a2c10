//! sharpgrade-runner: C# toolchain backend.
//!
//! Compiles each submission together with a generated harness in a
//! temporary sandbox, then runs every test invocation as its own child
//! process so no state survives from one test to the next.

pub mod compiler;
pub mod driver;
pub mod invoke;
pub mod sandbox;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use sharpgrade_core::error::InvocationError;
use sharpgrade_core::model::{TargetType, Value};
use sharpgrade_core::results::CompileError;
use sharpgrade_core::traits::{LoadedUnit, UnitCompiler};

use crate::sandbox::Sandbox;

/// External programs used to build and run submissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toolchain {
    /// C# compiler executable.
    #[serde(default = "default_compiler")]
    pub compiler: String,
    /// Host used to run the built assembly; `None` runs it directly.
    #[serde(default)]
    pub runtime: Option<String>,
    /// Arguments passed to the runtime before the assembly path.
    #[serde(default)]
    pub runtime_args: Vec<String>,
    /// Assemblies referenced by every build.
    #[serde(default = "default_references")]
    pub references: Vec<String>,
    /// Extra compiler arguments, appended after the fixed ones.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_compiler() -> String {
    "mcs".to_string()
}

fn default_references() -> Vec<String> {
    ["System.dll", "System.Core.dll", "System.Data.dll"]
        .iter()
        .map(|r| r.to_string())
        .collect()
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            compiler: default_compiler(),
            runtime: Some("mono".to_string()),
            runtime_args: Vec::new(),
            references: default_references(),
            extra_args: Vec::new(),
        }
    }
}

impl Toolchain {
    /// Check that the compiler (and runtime, if any) can be launched.
    pub fn is_installed(&self) -> bool {
        let launches = |program: &str| {
            std::process::Command::new(program)
                .arg("--version")
                .stdout(std::process::Stdio::null())
                .stderr(std::process::Stdio::null())
                .status()
                .is_ok()
        };
        launches(&self.compiler) && self.runtime.as_deref().map_or(true, launches)
    }
}

/// Compiles submissions with a Mono-style toolchain (`mcs` + `mono` by default).
pub struct MonoRunner {
    toolchain: Toolchain,
    compile_timeout: Duration,
    invoke_timeout: Option<Duration>,
}

impl MonoRunner {
    pub fn new(toolchain: Toolchain) -> Self {
        Self {
            toolchain,
            compile_timeout: Duration::from_secs(120),
            invoke_timeout: Some(Duration::from_secs(10)),
        }
    }

    pub fn with_compile_timeout(mut self, timeout: Duration) -> Self {
        self.compile_timeout = timeout;
        self
    }

    /// Bound every invocation by `timeout`; zero disables the bound.
    pub fn with_invoke_timeout(mut self, timeout: Duration) -> Self {
        self.invoke_timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    pub fn toolchain(&self) -> &Toolchain {
        &self.toolchain
    }
}

impl Default for MonoRunner {
    fn default() -> Self {
        Self::new(Toolchain::default())
    }
}

#[async_trait]
impl UnitCompiler for MonoRunner {
    async fn compile(
        &self,
        source: &str,
        target: &TargetType,
    ) -> Result<Box<dyn LoadedUnit>, Vec<CompileError>> {
        let setup_failed = |e: anyhow::Error| vec![CompileError::unlocated(format!("{e:#}"))];

        let sandbox = Sandbox::new().map_err(setup_failed)?;
        sandbox.write_source(source).map_err(setup_failed)?;
        sandbox
            .write_driver(&driver::render(target))
            .map_err(setup_failed)?;

        compiler::compile(&sandbox, &self.toolchain, self.compile_timeout).await?;

        let entry_point = invoke::describe(&sandbox, &self.toolchain, self.invoke_timeout)
            .await
            .map_err(|e| vec![e])?;
        tracing::info!(
            target_type = %target,
            entry_point = %entry_point,
            "resolved method under test"
        );

        Ok(Box::new(CompiledUnit {
            sandbox,
            toolchain: self.toolchain.clone(),
            entry_point,
            invoke_timeout: self.invoke_timeout,
        }))
    }
}

/// A built submission whose method under test has been resolved.
///
/// Dropping it removes the sandbox and the assembly in it.
pub struct CompiledUnit {
    sandbox: Sandbox,
    toolchain: Toolchain,
    entry_point: String,
    invoke_timeout: Option<Duration>,
}

#[async_trait]
impl LoadedUnit for CompiledUnit {
    fn entry_point(&self) -> &str {
        &self.entry_point
    }

    async fn invoke(&self, inputs: &[Value]) -> Result<Value, InvocationError> {
        invoke::invoke(&self.sandbox, &self.toolchain, inputs, self.invoke_timeout).await
    }
}
