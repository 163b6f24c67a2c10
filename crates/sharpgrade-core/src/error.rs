//! Invocation error types.
//!
//! These errors describe why a single test invocation produced no value.
//! The engine never propagates them: each one becomes an error item in the
//! evaluation result.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while invoking the method under test.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvocationError {
    /// The candidate's own code threw. Carries the full rendered exception.
    #[error("{0}")]
    Candidate(String),

    /// Something outside the candidate's code failed (constructor lookup,
    /// argument coercion, an unreadable result).
    #[error("{0}")]
    Harness(String),

    /// The test's setup hook failed before the invocation started.
    #[error("setup failed: {0}")]
    Setup(String),

    /// The invocation did not finish within its wall-clock budget.
    #[error("invocation timed out after {}ms", .0.as_millis())]
    TimedOut(Duration),
}

impl InvocationError {
    /// Returns `true` if the failure originated in the candidate's code.
    pub fn is_candidate_fault(&self) -> bool {
        matches!(
            self,
            InvocationError::Candidate(_) | InvocationError::TimedOut(_)
        )
    }
}
