//! Completion Classifier
//!
//! Exactly one [`Settlement`] is produced per invocation. Exit status is then
//! classified: `Some(0)` proceeds to decoding, everything else is a
//! [`InvocationError::NonZeroExit`].

use std::io;
use tracing::warn;

use crate::collector::CapturedStream;
use crate::error::{exit_failure_message, DiagnosticOptions, InvocationError};

/// The one outcome honored for an invocation.
#[derive(Debug)]
pub enum Settlement {
    /// The worker exited; `None` when it ended without an exit code.
    Exited(Option<i32>),
    /// The OS failed while we were waiting on the worker.
    ProcessError(io::Error),
    /// The watchdog fired first.
    TimedOut,
    /// The caller cancelled first.
    Cancelled,
}

/// Captured output and exit status, before decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub stdout_truncated: bool,
    pub stderr_truncated: bool,
}

impl InvocationResult {
    pub fn from_streams(stdout: CapturedStream, stderr: CapturedStream, exit_code: Option<i32>) -> Self {
        Self {
            stdout: stdout.text,
            stderr: stderr.text,
            exit_code,
            stdout_truncated: stdout.truncated,
            stderr_truncated: stderr.truncated,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

pub fn classify(
    result: InvocationResult,
    options: DiagnosticOptions,
) -> Result<InvocationResult, InvocationError> {
    if result.succeeded() {
        return Ok(result);
    }

    let message = exit_failure_message(&result.stderr, result.exit_code, options);
    warn!(exit_code = ?result.exit_code, "Worker failed: {}", message);
    Err(InvocationError::NonZeroExit {
        exit_code: result.exit_code,
        stderr: result.stderr,
        message,
    })
}
