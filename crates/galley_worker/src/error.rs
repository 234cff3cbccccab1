//! Error taxonomy for a worker invocation.
//!
//! Every failure an invocation can hit surfaces as exactly one
//! [`InvocationError`]. Nothing in this crate retries.

use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::filters::FilterError;
use crate::staging::StagingError;

/// Prefix for a worker that ran and exited with a failure status.
pub const NON_ZERO_EXIT_HINT: &str = "worker failed to process upload";

/// Stands in for stderr when a malformed result comes with a silent worker.
pub const INVALID_OUTPUT_MESSAGE: &str = "worker produced invalid output";

#[derive(Debug, Error)]
pub enum InvocationError {
    /// Rejected before any file was written or process started.
    #[error(transparent)]
    InvalidFilter(#[from] FilterError),

    /// Upload refused by the staging checks (type, size, name).
    #[error(transparent)]
    RejectedUpload(#[from] StagingError),

    /// The OS could not start the worker, or failed while we waited on it.
    /// The error is the OS error itself.
    #[error(transparent)]
    LaunchFailure(io::Error),

    /// Deadline exceeded; the worker was forcibly terminated.
    #[error("Process timeout after {}ms", .timeout.as_millis())]
    Timeout { timeout: Duration },

    /// The worker ran and exited with a failure status (or was killed by a
    /// signal, in which case `exit_code` is `None`).
    #[error("{message}")]
    NonZeroExit {
        exit_code: Option<i32>,
        stderr: String,
        message: String,
    },

    /// The worker exited 0 but its output artifact is missing or unparsable.
    #[error("{message}")]
    MalformedResult {
        exit_code: Option<i32>,
        stderr: String,
        message: String,
    },

    /// Staging write or artifact read failed for reasons unrelated to the
    /// worker's exit status.
    #[error("Filesystem error at {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The caller cancelled the invocation; the worker was terminated.
    #[error("Invocation cancelled")]
    Cancelled,
}

impl InvocationError {
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            InvocationError::NonZeroExit { exit_code, .. }
            | InvocationError::MalformedResult { exit_code, .. } => *exit_code,
            _ => None,
        }
    }

    /// Raw stderr captured from the worker, when the failure carries it.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            InvocationError::NonZeroExit { stderr, .. }
            | InvocationError::MalformedResult { stderr, .. } => Some(stderr),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, InvocationError::Timeout { .. })
    }

    pub(crate) fn filesystem(path: impl Into<PathBuf>, source: io::Error) -> Self {
        InvocationError::Filesystem {
            path: path.into(),
            source,
        }
    }
}

/// Controls how much worker output is folded into error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosticOptions {
    pub include_stderr: bool,
}

impl Default for DiagnosticOptions {
    fn default() -> Self {
        Self {
            include_stderr: true,
        }
    }
}

fn render_exit_code(exit_code: Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("exit code {}", code),
        None => "exit code none (terminated by signal)".to_string(),
    }
}

/// `<hint>[: <trimmed stderr>]: exit code <n>`
pub(crate) fn exit_failure_message(
    stderr: &str,
    exit_code: Option<i32>,
    options: DiagnosticOptions,
) -> String {
    let mut parts = vec![NON_ZERO_EXIT_HINT.to_string()];
    let trimmed = stderr.trim();
    if options.include_stderr && !trimmed.is_empty() {
        parts.push(trimmed.to_string());
    }
    parts.push(render_exit_code(exit_code));
    parts.join(": ")
}

/// `<trimmed stderr | fixed fallback>: exit code <n>`
pub(crate) fn malformed_result_message(
    stderr: &str,
    exit_code: Option<i32>,
    options: DiagnosticOptions,
) -> String {
    let trimmed = stderr.trim();
    let lead = if options.include_stderr && !trimmed.is_empty() {
        trimmed
    } else {
        INVALID_OUTPUT_MESSAGE
    };
    format!("{}: {}", lead, render_exit_code(exit_code))
}
