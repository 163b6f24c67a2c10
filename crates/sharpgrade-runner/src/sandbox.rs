//! Temporary build directory for one submission.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;

/// File the candidate source is written to.
pub const SUBMISSION_FILE: &str = "Submission.cs";
/// File the generated harness is written to.
pub const DRIVER_FILE: &str = "Driver.cs";
/// Assembly produced by a successful build.
pub const ASSEMBLY_FILE: &str = "Submission.exe";

/// A scratch directory holding the submission, its harness, and the built
/// assembly.
///
/// On drop, the directory and everything built in it is removed.
pub struct Sandbox {
    work_dir: TempDir,
}

impl Sandbox {
    /// Create a new, empty sandbox.
    pub fn new() -> Result<Self> {
        let work_dir = tempfile::Builder::new()
            .prefix("sharpgrade-")
            .tempdir()
            .context("failed to create temp directory")?;
        Ok(Self { work_dir })
    }

    /// Get the path to the sandbox working directory.
    pub fn work_dir(&self) -> &Path {
        self.work_dir.path()
    }

    pub fn assembly_path(&self) -> PathBuf {
        self.work_dir.path().join(ASSEMBLY_FILE)
    }

    /// Write the candidate source, byte for byte, so compiler line numbers
    /// refer to the submitted text.
    pub fn write_source(&self, code: &str) -> Result<()> {
        std::fs::write(self.work_dir.path().join(SUBMISSION_FILE), code)
            .with_context(|| format!("failed to write {SUBMISSION_FILE}"))
    }

    pub fn write_driver(&self, code: &str) -> Result<()> {
        std::fs::write(self.work_dir.path().join(DRIVER_FILE), code)
            .with_context(|| format!("failed to write {DRIVER_FILE}"))
    }

    /// Create a per-invocation scratch directory inside the sandbox.
    ///
    /// It is removed when the returned handle drops, which is how each test
    /// releases what its invocation left behind.
    pub fn scratch(&self) -> Result<TempDir> {
        tempfile::Builder::new()
            .prefix("invoke-")
            .tempdir_in(self.work_dir.path())
            .context("failed to create invocation scratch directory")
    }
}

/// Build environment variables for child processes.
///
/// Blanks credentials and service endpoints so candidate code cannot read them.
pub fn build_env() -> Vec<(String, String)> {
    [
        "SSH_AUTH_SOCK",
        "AWS_ACCESS_KEY_ID",
        "AWS_SECRET_ACCESS_KEY",
        "AWS_SESSION_TOKEN",
        "AZURE_CLIENT_SECRET",
        "GITHUB_TOKEN",
        "GH_TOKEN",
        "NUGET_API_KEY",
        "DOCKER_HOST",
        "DOCKER_CONFIG",
        "KUBECONFIG",
        "DATABASE_URL",
        "NPM_TOKEN",
    ]
    .iter()
    .map(|var| (var.to_string(), String::new()))
    .collect()
}
