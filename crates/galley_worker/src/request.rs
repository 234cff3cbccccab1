use std::path::{Path, PathBuf};

use crate::filters::FilterParameters;

/// One upload's worth of work for the worker. Owned by a single
/// orchestrator call and never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationRequest {
    input_artifact_path: PathBuf,
    output_artifact_path: PathBuf,
    filters: FilterParameters,
}

impl InvocationRequest {
    pub fn new(
        input_artifact_path: impl Into<PathBuf>,
        output_artifact_path: impl Into<PathBuf>,
        filters: FilterParameters,
    ) -> Self {
        Self {
            input_artifact_path: input_artifact_path.into(),
            output_artifact_path: output_artifact_path.into(),
            filters,
        }
    }

    pub fn input_artifact_path(&self) -> &Path {
        &self.input_artifact_path
    }

    pub fn output_artifact_path(&self) -> &Path {
        &self.output_artifact_path
    }

    pub fn filters(&self) -> FilterParameters {
        self.filters
    }
}
