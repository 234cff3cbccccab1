//! Helpful error types for CLI commands
//!
//! Every error includes:
//! - What went wrong
//! - Context about the situation
//! - Suggestions for how to fix it

use galley_worker::error::InvocationError;
use galley_worker::filters::FilterError;
use galley_worker::staging::StagingError;
use galley_worker::{Category, Mode, WorkerConfig};
use std::fmt;
use std::path::Path;

/// An error with helpful context and suggestions
#[derive(Debug)]
pub struct HelpfulError {
    /// The main error message
    pub message: String,
    /// Additional context about what was happening
    pub context: Option<String>,
    /// Suggestions for how to fix the error
    pub suggestions: Vec<String>,
}

impl HelpfulError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_suggestions(mut self, suggestions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.suggestions.extend(suggestions.into_iter().map(|s| s.into()));
        self
    }

    // === Common error constructors ===

    /// File does not exist
    pub fn file_not_found(path: &Path) -> Self {
        Self::new(format!("File not found: {}", path.display()))
            .with_context("The specified file does not exist")
            .with_suggestions([
                format!("TRY: Check if the file exists: ls -la {}", path.display()),
                format!("TRY: Look for similar files: ls {}",
                    path.parent().map(|p| p.display().to_string()).unwrap_or_else(|| ".".to_string())),
            ])
    }

    /// Config file exists but cannot be used
    pub fn invalid_config(path: &Path, reason: impl fmt::Display) -> Self {
        Self::new(format!("Cannot load config: {}", path.display()))
            .with_context(reason.to_string())
            .with_suggestions([
                "TRY: galley config   # Show the resolved configuration".to_string(),
                "TRY: galley init --force   # Rewrite the config with defaults".to_string(),
            ])
    }

    /// Map a failed invocation to something an operator can act on.
    pub fn from_invocation(err: &InvocationError, worker: &WorkerConfig) -> Self {
        match err {
            InvocationError::InvalidFilter(FilterError::InvalidMode(_)) => Self::new(err.to_string())
                .with_context(format!(
                    "Valid modes: {}",
                    join_names(worker.allowed_modes.iter().map(Mode::as_str))
                ))
                .with_suggestion("TRY: galley process <file.xls> --mode commandes --category salon"),
            InvocationError::InvalidFilter(FilterError::InvalidCategory(_)) => Self::new(err.to_string())
                .with_context(format!(
                    "Valid categories: {}",
                    join_names(worker.allowed_categories.iter().map(Category::as_str))
                ))
                .with_suggestion("TRY: galley process <file.xls> --mode commandes --category prestations"),
            InvocationError::RejectedUpload(StagingError::TooLarge { .. }) => Self::new(err.to_string())
                .with_context("Uploads larger than staging.max_upload_bytes are refused")
                .with_suggestion("TRY: Split the spreadsheet or raise staging.max_upload_bytes"),
            InvocationError::RejectedUpload(_) => Self::new(err.to_string())
                .with_context("Only spreadsheets exported in legacy Excel format are processed")
                .with_suggestion("TRY: Save the sheet as Excel 97-2003 (.xls) and retry"),
            InvocationError::LaunchFailure(source) => {
                Self::new(format!("Failed to launch worker: {}", source))
                    .with_context(format!(
                        "Command: {} {}",
                        worker.interpreter.display(),
                        worker.script.display()
                    ))
                    .with_suggestions([
                        format!("TRY: Check the interpreter is installed: which {}", worker.interpreter.display()),
                        "TRY: Set worker.interpreter and worker.script in config.toml".to_string(),
                    ])
            }
            InvocationError::Timeout { .. } => Self::new(err.to_string())
                .with_context("The worker did not finish in time and was terminated")
                .with_suggestion(format!(
                    "TRY: galley process <file.xls> ... --timeout-ms {}",
                    worker.timeout_ms.saturating_mul(3)
                )),
            InvocationError::NonZeroExit { .. } => Self::new(err.to_string())
                .with_context("The worker rejected the spreadsheet")
                .with_suggestions([
                    "TRY: Check the sheet has the expected flight columns",
                    "TRY: galley -v process ...   # Show worker diagnostics",
                ]),
            InvocationError::MalformedResult { .. } => Self::new(err.to_string())
                .with_context("The worker exited cleanly but its output was not a list of flights")
                .with_suggestion("TRY: galley process ... --keep-artifacts   # Inspect the output file"),
            InvocationError::Filesystem { path, .. } => Self::new(err.to_string())
                .with_suggestion(format!("TRY: Check permissions: ls -la {}", path.display())),
            InvocationError::Cancelled => Self::new(err.to_string())
                .with_context("Interrupted before the worker finished"),
        }
    }
}

fn join_names<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.collect::<Vec<_>>().join(", ")
}

impl fmt::Display for HelpfulError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ERROR: {}", self.message)?;

        if let Some(ctx) = &self.context {
            writeln!(f, "CONTEXT: {}", ctx)?;
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            for suggestion in &self.suggestions {
                writeln!(f, "  {}", suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for HelpfulError {}

/// Print an error as a JSON object on stdout for `--json` callers.
pub fn print_json_error(err: &anyhow::Error) {
    let payload = match err.downcast_ref::<HelpfulError>() {
        Some(helpful) => serde_json::json!({
            "error": {
                "message": helpful.message,
                "context": helpful.context,
                "suggestions": helpful.suggestions,
            }
        }),
        None => serde_json::json!({
            "error": {
                "message": format!("{:#}", err),
                "context": null,
                "suggestions": [],
            }
        }),
    };
    match serde_json::to_string_pretty(&payload) {
        Ok(text) => println!("{}", text),
        Err(_) => eprintln!("{:?}", err),
    }
}
