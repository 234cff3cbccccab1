//! Input staging
//!
//! Writes the uploaded spreadsheet to an invocation-scoped path and picks
//! the output path the worker will write. Paths carry a UTC timestamp and a
//! random suffix, so concurrent invocations never share artifacts.

use chrono::Utc;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::StagingConfig;
use crate::error::InvocationError;
use crate::filters::FilterParameters;
use crate::request::InvocationRequest;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StagingError {
    #[error("Upload has no file name")]
    MissingName,

    #[error("Only .{allowed} files are allowed, got '{file_name}'")]
    UnsupportedType { file_name: String, allowed: String },

    #[error("File exceeds {limit} bytes: '{file_name}' is {size} bytes")]
    TooLarge {
        file_name: String,
        size: u64,
        limit: u64,
    },
}

/// An uploaded file, held in memory until staged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    file_name: String,
    bytes: Vec<u8>,
}

impl Upload {
    /// `file_name` may be a path; only its last component is kept.
    pub fn new(file_name: impl AsRef<str>, bytes: Vec<u8>) -> Self {
        let file_name = Path::new(file_name.as_ref())
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { file_name, bytes }
    }

    /// Read a local file as an upload.
    pub async fn from_path(path: &Path) -> Result<Self, InvocationError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| InvocationError::filesystem(path, e))?;
        Ok(Self::new(path.to_string_lossy(), bytes))
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Type and size checks, no I/O.
pub fn check_upload(config: &StagingConfig, upload: &Upload) -> Result<(), StagingError> {
    if upload.file_name().is_empty() {
        return Err(StagingError::MissingName);
    }

    let extension = Path::new(upload.file_name())
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase());
    let accepted = extension
        .as_deref()
        .map(|ext| config.allowed_extensions.iter().any(|a| a.eq_ignore_ascii_case(ext)))
        .unwrap_or(false);
    if !accepted {
        return Err(StagingError::UnsupportedType {
            file_name: upload.file_name().to_string(),
            allowed: config.allowed_extensions.join(", ."),
        });
    }

    if upload.size() > config.max_upload_bytes {
        return Err(StagingError::TooLarge {
            file_name: upload.file_name().to_string(),
            size: upload.size(),
            limit: config.max_upload_bytes,
        });
    }

    Ok(())
}

/// Check the upload, write it under the staging directory, and build the
/// request. The write completes before this returns.
pub async fn stage(
    config: &StagingConfig,
    upload: &Upload,
    filters: FilterParameters,
) -> Result<InvocationRequest, InvocationError> {
    check_upload(config, upload)?;

    tokio::fs::create_dir_all(&config.dir)
        .await
        .map_err(|e| InvocationError::filesystem(&config.dir, e))?;

    let (input_path, output_path) = artifact_paths(&config.dir, upload.file_name());
    tokio::fs::write(&input_path, upload.bytes())
        .await
        .map_err(|e| InvocationError::filesystem(&input_path, e))?;

    debug!(
        bytes = upload.size(),
        "Staged upload at {}",
        input_path.display()
    );
    Ok(InvocationRequest::new(input_path, output_path, filters))
}

/// Delete both artifacts of a finished invocation. Missing files are fine.
pub async fn remove_artifacts(request: &InvocationRequest) {
    for path in [request.input_artifact_path(), request.output_artifact_path()] {
        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!("Removed artifact {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove artifact {}: {}", path.display(), e),
        }
    }
}

fn artifact_paths(dir: &Path, file_name: &str) -> (PathBuf, PathBuf) {
    let prefix = format!(
        "{}_{}",
        Utc::now().format("%Y%m%dT%H%M%S%3f"),
        &uuid::Uuid::new_v4().simple().to_string()[..8]
    );
    let safe_name = sanitize_name(file_name);
    let stem = Path::new(&safe_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());

    (
        dir.join(format!("{}_{}", prefix, safe_name)),
        dir.join(format!("{}_{}.json", prefix, stem)),
    )
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}
