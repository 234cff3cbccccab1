//! Galley worker orchestration
//!
//! Runs the external flight-sheet worker for one uploaded spreadsheet and
//! turns its output artifact into typed [`FlightRecord`] rows:
//!
//! - `filters`: mode and category validation
//! - `staging`: writes the upload and picks the artifact paths
//! - `invoker`: launches the worker process
//! - `collector`: captures stdout and stderr
//! - `watchdog`: deadline, terminate on expiry
//! - `classifier`: exit status to success or failure
//! - `decoder`: output artifact to rows
//! - `orchestrator`: ties the above together, settling each invocation once

pub mod classifier;
pub mod collector;
pub mod config;
pub mod decoder;
pub mod error;
pub mod filters;
pub mod invoker;
pub mod orchestrator;
pub mod record;
pub mod request;
pub mod staging;
pub mod watchdog;

pub use classifier::InvocationResult;
pub use config::{GalleyConfig, StagingConfig, WorkerConfig};
pub use error::InvocationError;
pub use filters::{Category, FilterError, FilterParameters, FilterValidator, Mode};
pub use orchestrator::Orchestrator;
pub use record::FlightRecord;
pub use request::InvocationRequest;
pub use staging::Upload;
pub use tokio_util::sync::CancellationToken;
