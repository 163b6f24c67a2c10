//! Compiler invocation and diagnostics parsing.

use std::path::Path;
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use regex::Regex;
use tokio::process::Command;

use sharpgrade_core::results::CompileError;

use crate::driver::DRIVER_TYPE;
use crate::sandbox::{self, Sandbox, ASSEMBLY_FILE, DRIVER_FILE, SUBMISSION_FILE};
use crate::Toolchain;

/// `file(line,col): error CS0000: message`, location optional.
static DIAGNOSTIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^(?:(?P<file>[^\r\n(]+)\((?P<line>\d+),(?P<column>\d+)\): )?(?P<level>error|warning) (?P<code>CS\d+): (?P<message>[^\r\n]*)",
    )
    .expect("diagnostic pattern is valid")
});

/// Arguments for building the sandbox's sources into `Submission.exe`.
pub fn compile_args(toolchain: &Toolchain) -> Vec<String> {
    let mut args = vec![
        "-nologo".to_string(),
        "-codepage:utf8".to_string(),
        "-target:exe".to_string(),
        format!("-out:{ASSEMBLY_FILE}"),
        format!("-main:{DRIVER_TYPE}"),
    ];
    args.extend(toolchain.references.iter().map(|r| format!("-r:{r}")));
    args.extend(toolchain.extra_args.iter().cloned());
    args.push(SUBMISSION_FILE.to_string());
    args.push(DRIVER_FILE.to_string());
    args
}

/// Compile the sources in a sandbox.
///
/// Every failure, including being unable to run the compiler at all, comes
/// back as a list of diagnostics.
pub async fn compile(
    sandbox: &Sandbox,
    toolchain: &Toolchain,
    timeout: Duration,
) -> Result<(), Vec<CompileError>> {
    let start = Instant::now();

    let mut cmd = Command::new(&toolchain.compiler);
    cmd.args(compile_args(toolchain))
        .current_dir(sandbox.work_dir())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    for (key, val) in sandbox::build_env() {
        cmd.env(&key, &val);
    }

    let output = match tokio::time::timeout(timeout, cmd.output()).await {
        Err(_) => {
            tracing::warn!(timeout_secs = timeout.as_secs(), "compilation timed out");
            return Err(vec![CompileError::unlocated(format!(
                "compilation timed out after {}s",
                timeout.as_secs()
            ))]);
        }
        Ok(Err(e)) => {
            tracing::error!(
                compiler = %toolchain.compiler,
                "failed to launch compiler: {e}"
            );
            return Err(vec![CompileError::unlocated(format!(
                "failed to launch compiler '{}': {e}",
                toolchain.compiler
            ))]);
        }
        Ok(Ok(output)) => output,
    };

    let duration_ms = start.elapsed().as_millis() as u64;
    // mcs reports on stdout, other compilers on stderr.
    let combined = format!(
        "{}\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    let (errors, warnings) = parse_diagnostics(&combined);

    for warning in &warnings {
        tracing::debug!(
            code = warning.code.as_deref(),
            "compiler warning: {warning}"
        );
    }

    let built = output.status.success() && sandbox.assembly_path().exists();
    if built && errors.is_empty() {
        tracing::info!(
            duration_ms,
            warnings = warnings.len(),
            "compilation succeeded"
        );
        return Ok(());
    }

    tracing::info!(duration_ms, errors = errors.len(), "compilation failed");
    if errors.is_empty() {
        return Err(vec![CompileError::unlocated(format!(
            "compiler exited with {} without reporting an error",
            output.status
        ))]);
    }
    Err(errors)
}

/// Parse compiler output into `(errors, warnings)`.
///
/// Diagnostics located in files other than the submission have no meaningful
/// line in it, so they are reported at line 0 with the file name in front.
pub fn parse_diagnostics(output: &str) -> (Vec<CompileError>, Vec<CompileError>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for caps in DIAGNOSTIC.captures_iter(output) {
        let file = caps.name("file").map(|m| m.as_str().trim());
        let message = caps["message"].trim().to_string();
        let code = Some(caps["code"].to_string());

        let diagnostic = match file {
            Some(file) if is_submission(file) => CompileError {
                line: caps["line"].parse().unwrap_or(0),
                column: caps["column"].parse().unwrap_or(0),
                code,
                message,
            },
            Some(file) => CompileError {
                line: 0,
                column: 0,
                code,
                message: format!("{file}: {message}"),
            },
            None => CompileError {
                line: 0,
                column: 0,
                code,
                message,
            },
        };

        match &caps["level"] {
            "error" => errors.push(diagnostic),
            _ => warnings.push(diagnostic),
        }
    }

    (errors, warnings)
}

fn is_submission(file: &str) -> bool {
    Path::new(file)
        .file_name()
        .is_some_and(|name| name == SUBMISSION_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_located_errors() {
        let output = "Submission.cs(9,14): error CS1525: Unexpected symbol `stuff'\n\
                      Submission.cs(12,1): error CS8025: Parsing error\n\
                      Compilation failed: 2 error(s), 0 warnings\n";
        let (errors, warnings) = parse_diagnostics(output);

        assert!(warnings.is_empty());
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].line, 9);
        assert_eq!(errors[0].column, 14);
        assert_eq!(errors[0].code.as_deref(), Some("CS1525"));
        assert_eq!(errors[0].message, "Unexpected symbol `stuff'");
        assert_eq!(errors[0].to_string(), "Line 9: Unexpected symbol `stuff'");
        assert_eq!(errors[1].line, 12);
    }

    #[test]
    fn parse_warnings_separately() {
        let output = concat!(
            "/tmp/sharpgrade-x/Submission.cs(4,17): warning CS0168: ",
            "The variable `x' is declared but never used\r\n",
            "Compilation succeeded - 1 warning(s)\r\n"
        );
        let (errors, warnings) = parse_diagnostics(output);
        assert!(errors.is_empty());
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].line, 4);
        assert_eq!(
            warnings[0].message,
            "The variable `x' is declared but never used"
        );
    }

    #[test]
    fn parse_unlocated_error() {
        let (errors, _) =
            parse_diagnostics("error CS0006: Metadata file `Missing.dll' could not be found\n");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line, 0);
        assert_eq!(errors[0].code.as_deref(), Some("CS0006"));
    }

    #[test]
    fn harness_errors_are_not_attributed_to_submission_lines() {
        let (errors, _) = parse_diagnostics(
            "Driver.cs(40,9): error CS0246: The type or namespace name `Foo' could not be found\n",
        );
        assert_eq!(errors[0].line, 0);
        assert!(errors[0].message.starts_with("Driver.cs: "));
    }

    #[test]
    fn unrelated_output_is_ignored() {
        let (errors, warnings) =
            parse_diagnostics("Compilation succeeded\nsome other error text\n");
        assert!(errors.is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn args_reference_fixed_assemblies_and_harness_entry() {
        let args = compile_args(&Toolchain::default());
        assert!(args.contains(&"-r:System.dll".to_string()));
        assert!(args.contains(&"-r:System.Core.dll".to_string()));
        assert!(args.contains(&"-r:System.Data.dll".to_string()));
        assert!(args.contains(&"-codepage:utf8".to_string()));
        assert!(args.contains(&format!("-main:{DRIVER_TYPE}")));
        assert_eq!(&args[args.len() - 2..], &[SUBMISSION_FILE, DRIVER_FILE]);
    }

    #[test]
    fn extra_args_precede_sources() {
        let toolchain = Toolchain {
            extra_args: vec!["-debug".into()],
            ..Toolchain::default()
        };
        let args = compile_args(&toolchain);
        let debug = args.iter().position(|a| a == "-debug").unwrap();
        let source = args.iter().position(|a| a == SUBMISSION_FILE).unwrap();
        assert!(debug < source);
    }

    #[tokio::test]
    async fn missing_compiler_reports_line_zero() {
        let sandbox = Sandbox::new().unwrap();
        let toolchain = Toolchain {
            compiler: "sharpgrade-no-such-compiler".into(),
            ..Toolchain::default()
        };
        let errors = compile(&sandbox, &toolchain, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line, 0);
        assert!(errors[0].message.starts_with("failed to launch compiler"));
    }
}
