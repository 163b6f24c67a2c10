//! Core trait definitions for compiling and invoking submissions.
//!
//! These async traits are implemented by the `sharpgrade-runner` crate. The
//! engine only ever talks to a submission through them.

use async_trait::async_trait;

use crate::error::InvocationError;
use crate::model::{TargetType, Value};
use crate::results::CompileError;

/// Builds canonical source into a unit whose entry point can be invoked.
#[async_trait]
pub trait UnitCompiler: Send + Sync {
    /// Compile `source` and resolve the first declared method of `target`.
    ///
    /// Every diagnostic is returned on failure; no partial artifact survives.
    async fn compile(
        &self,
        source: &str,
        target: &TargetType,
    ) -> Result<Box<dyn LoadedUnit>, Vec<CompileError>>;
}

/// A successfully compiled submission with a resolved method under test.
///
/// Read-only once built. Each call to [`LoadedUnit::invoke`] runs against a
/// fresh instance of the target type.
#[async_trait]
pub trait LoadedUnit: Send + Sync {
    /// Rendered signature of the method under test.
    fn entry_point(&self) -> &str;

    /// Invoke the method under test with `inputs` and return its raw result
    /// (`Value::Null` for `void`).
    async fn invoke(&self, inputs: &[Value]) -> Result<Value, InvocationError>;
}
