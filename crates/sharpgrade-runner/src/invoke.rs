//! Harness process execution and the result-file protocol.

use std::ffi::OsString;
use std::fmt::Write as _;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::process::Command;

use sharpgrade_core::error::InvocationError;
use sharpgrade_core::model::Value;
use sharpgrade_core::results::CompileError;

use crate::sandbox::{self, Sandbox};
use crate::Toolchain;

const INPUT_FILE: &str = "inputs.txt";
const RESULT_FILE: &str = "result.txt";
const STDERR_LIMIT: usize = 4096;

/// A reply written by the harness.
#[derive(Debug, Clone, PartialEq)]
pub enum HarnessOutcome {
    /// `describe`: signature of the resolved method.
    Method(String),
    /// `describe`: the type or a method could not be resolved.
    Missing(String),
    /// `run`: the method returned (null for `void`).
    Return(Value),
    /// `run`: the candidate's code threw; carries the rendered exception.
    Thrown(String),
    /// Anything that went wrong outside the candidate's code.
    Harness(String),
}

/// Parse the contents of a result file.
pub fn parse_outcome(text: &str) -> Result<HarnessOutcome> {
    let (kind, payload) = text.split_once('\n').unwrap_or((text, ""));
    let outcome = match kind.trim_end_matches('\r') {
        "METHOD" => HarnessOutcome::Method(payload.to_string()),
        "MISSING" => HarnessOutcome::Missing(payload.to_string()),
        "RETURN" => HarnessOutcome::Return(
            serde_json::from_str(payload).context("harness returned malformed JSON")?,
        ),
        "THROWN" => HarnessOutcome::Thrown(payload.to_string()),
        "HARNESS" => HarnessOutcome::Harness(payload.to_string()),
        other => bail!("unknown harness reply kind: {other:?}"),
    };
    Ok(outcome)
}

/// Encode invocation arguments in the harness's line-oriented input format.
pub fn encode_inputs(inputs: &[Value]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "a {}", inputs.len());
    for value in inputs {
        encode_value(&mut out, value);
    }
    out
}

fn encode_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("n\n"),
        Value::Bool(b) => {
            let _ = writeln!(out, "b {}", u8::from(*b));
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                if i32::try_from(i).is_ok() {
                    let _ = writeln!(out, "i {i}");
                } else {
                    let _ = writeln!(out, "l {i}");
                }
            } else if let Some(u) = n.as_u64() {
                let _ = writeln!(out, "u {u}");
            } else {
                let _ = writeln!(out, "d {:?}", n.as_f64().unwrap_or(f64::NAN));
            }
        }
        Value::String(s) => {
            let _ = writeln!(out, "s {}", escape_line(s));
        }
        Value::Array(items) => {
            let _ = writeln!(out, "a {}", items.len());
            for item in items {
                encode_value(out, item);
            }
        }
        Value::Object(map) => {
            let _ = writeln!(out, "o {}", map.len());
            for (key, item) in map {
                let _ = writeln!(out, "s {}", escape_line(key));
                encode_value(out, item);
            }
        }
    }
}

fn escape_line(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}

/// Ask the harness which method it resolved.
///
/// Any failure here means the submission cannot be tested, so it is reported
/// as a build failure at line 0.
pub async fn describe(
    sandbox: &Sandbox,
    toolchain: &Toolchain,
    timeout: Option<Duration>,
) -> Result<String, CompileError> {
    let scratch = sandbox
        .scratch()
        .map_err(|e| CompileError::unlocated(format!("{e:#}")))?;
    let result_path = scratch.path().join(RESULT_FILE);
    let args = [
        OsString::from("describe"),
        result_path.clone().into_os_string(),
    ];

    let reply = execute(
        sandbox,
        toolchain,
        scratch.path(),
        &args,
        &result_path,
        timeout,
    )
    .await
    .map_err(|e| CompileError::unlocated(format!("could not inspect the built assembly: {e}")))?;

    match reply {
        HarnessOutcome::Method(signature) => Ok(signature.trim().to_string()),
        HarnessOutcome::Missing(reason) => {
            tracing::warn!("method under test not found: {reason}");
            Err(CompileError::unlocated(reason))
        }
        other => Err(CompileError::unlocated(format!(
            "could not inspect the built assembly: {}",
            describe_unexpected(&other)
        ))),
    }
}

/// Invoke the method under test once, in a fresh process.
pub async fn invoke(
    sandbox: &Sandbox,
    toolchain: &Toolchain,
    inputs: &[Value],
    timeout: Option<Duration>,
) -> Result<Value, InvocationError> {
    let scratch = sandbox
        .scratch()
        .map_err(|e| InvocationError::Harness(format!("{e:#}")))?;
    let input_path = scratch.path().join(INPUT_FILE);
    let result_path = scratch.path().join(RESULT_FILE);

    let encoded = encode_inputs(inputs);
    tracing::debug!(bytes = encoded.len(), "encoded invocation inputs");
    std::fs::write(&input_path, encoded)
        .map_err(|e| InvocationError::Harness(format!("failed to write inputs: {e}")))?;

    let args = [
        OsString::from("run"),
        input_path.into_os_string(),
        result_path.clone().into_os_string(),
    ];
    let reply = execute(
        sandbox,
        toolchain,
        scratch.path(),
        &args,
        &result_path,
        timeout,
    )
    .await?;

    match reply {
        HarnessOutcome::Return(value) => Ok(value),
        HarnessOutcome::Thrown(exception) => Err(InvocationError::Candidate(exception)),
        HarnessOutcome::Harness(message) => Err(InvocationError::Harness(message)),
        other => Err(InvocationError::Harness(describe_unexpected(&other))),
    }
}

/// Run the harness and read its reply.
///
/// A process that exits without writing a reply crashed inside the
/// candidate's code (stack overflow, `Environment.Exit`, ...).
async fn execute(
    sandbox: &Sandbox,
    toolchain: &Toolchain,
    work_dir: &Path,
    args: &[OsString],
    result_path: &Path,
    timeout: Option<Duration>,
) -> Result<HarnessOutcome, InvocationError> {
    let mut cmd = harness_command(toolchain, &sandbox.assembly_path());
    cmd.args(args)
        .current_dir(work_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    for (key, val) in sandbox::build_env() {
        cmd.env(&key, &val);
    }

    let output = match timeout {
        Some(limit) => match tokio::time::timeout(limit, cmd.output()).await {
            Ok(output) => output,
            Err(_) => {
                tracing::warn!(
                    timeout_ms = limit.as_millis() as u64,
                    "invocation timed out"
                );
                return Err(InvocationError::TimedOut(limit));
            }
        },
        None => cmd.output().await,
    }
    .map_err(|e| {
        tracing::error!("failed to launch harness: {e}");
        InvocationError::Harness(format!("failed to launch harness: {e}"))
    })?;

    match std::fs::read_to_string(result_path) {
        Ok(text) => parse_outcome(&text).map_err(|e| InvocationError::Harness(format!("{e:#}"))),
        Err(_) => Err(InvocationError::Candidate(crash_message(
            output.status,
            &String::from_utf8_lossy(&output.stderr),
        ))),
    }
}

fn harness_command(toolchain: &Toolchain, assembly: &Path) -> Command {
    match &toolchain.runtime {
        Some(runtime) => {
            let mut cmd = Command::new(runtime);
            cmd.args(&toolchain.runtime_args).arg(assembly);
            cmd
        }
        None => Command::new(assembly),
    }
}

fn crash_message(status: ExitStatus, stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        return format!("process exited with {status} before reporting a result");
    }
    let mut start = stderr.len().saturating_sub(STDERR_LIMIT);
    while !stderr.is_char_boundary(start) {
        start += 1;
    }
    format!(
        "process exited with {status} before reporting a result:\n{}",
        &stderr[start..]
    )
}

fn describe_unexpected(outcome: &HarnessOutcome) -> String {
    match outcome {
        HarnessOutcome::Harness(message) => message.clone(),
        other => format!("unexpected harness reply: {other:?}"),
    }
}
