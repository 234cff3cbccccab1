//! Orchestrator
//!
//! ```text
//! validate ─► stage input ─► launch ─┬─► collect stdout ─┐
//!                                    ├─► collect stderr ─┤
//!                                    └─► select! {       │
//!                                          exit,         │
//!                                          watchdog,     ├─► classify ─► decode
//!                                          cancel,       │
//!                                        } ──────────────┘
//! ```
//!
//! The `select!` is the settlement point: whichever of exit, deadline or
//! cancellation completes first is the only outcome ever looked at. The
//! output artifact is read only after the exit has been observed.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::classifier::{classify, InvocationResult, Settlement};
use crate::collector::{drain_into, CapturedStream, StreamCapture};
use crate::config::{GalleyConfig, StagingConfig, WorkerConfig};
use crate::decoder::decode_artifact;
use crate::error::InvocationError;
use crate::filters::{FilterError, FilterParameters, FilterValidator};
use crate::invoker::{Launcher, ProcessLauncher, WorkerCommand, WorkerProcess, WorkerStream};
use crate::record::FlightRecord;
use crate::request::InvocationRequest;
use crate::staging::{self, Upload};
use crate::watchdog::Watchdog;

/// How long a terminated worker gets to be reaped
const REAP_GRACE: Duration = Duration::from_secs(2);

/// How long both stream collectors together get to hit EOF after the worker exits
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// One stream's capture plus the task draining into it.
struct Collector {
    name: &'static str,
    capture: StreamCapture,
    task: Option<JoinHandle<()>>,
}

impl Collector {
    fn start(name: &'static str, stream: Option<WorkerStream>, limit: usize) -> Self {
        let capture = StreamCapture::new(limit);
        let task = stream.map(|stream| tokio::spawn(drain_into(stream, capture.clone())));
        Self {
            name,
            capture,
            task,
        }
    }

    /// Wait for EOF. The task handle is consumed once it completes.
    async fn finished(&mut self) {
        if let Some(task) = self.task.as_mut() {
            if let Err(e) = task.await {
                warn!("Worker {} collector failed: {}", self.name, e);
            }
            self.task = None;
        }
    }

    fn abort(&self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}

pub struct Orchestrator<L: Launcher = ProcessLauncher> {
    worker: WorkerConfig,
    staging: StagingConfig,
    validator: FilterValidator,
    launcher: L,
}

impl Orchestrator<ProcessLauncher> {
    pub fn new(config: GalleyConfig) -> Self {
        Self::with_launcher(config, ProcessLauncher)
    }
}

impl<L: Launcher> Orchestrator<L> {
    pub fn with_launcher(config: GalleyConfig, launcher: L) -> Self {
        Self {
            validator: config.worker.validator(),
            worker: config.worker,
            staging: config.staging,
            launcher,
        }
    }

    pub fn worker_config(&self) -> &WorkerConfig {
        &self.worker
    }

    pub fn staging_config(&self) -> &StagingConfig {
        &self.staging
    }

    pub fn validate(&self, mode: &str, category: &str) -> Result<FilterParameters, FilterError> {
        self.validator.validate(mode, category)
    }

    /// Full upload path: validate, stage, invoke, clean up.
    ///
    /// An invalid filter returns before anything is written or launched.
    pub async fn process_upload(
        &self,
        upload: &Upload,
        mode: &str,
        category: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<FlightRecord>, InvocationError> {
        let filters = self.validate(mode, category)?;
        let request = staging::stage(&self.staging, upload, filters).await?;

        let outcome = self.invoke(&request, cancel).await;

        if self.staging.keep_artifacts {
            debug!(
                "Keeping artifacts {} and {}",
                request.input_artifact_path().display(),
                request.output_artifact_path().display()
            );
        } else {
            staging::remove_artifacts(&request).await;
        }
        outcome
    }

    /// Run the worker for an already staged request and decode its rows.
    pub async fn invoke(
        &self,
        request: &InvocationRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<FlightRecord>, InvocationError> {
        let diagnostics = self.worker.diagnostics();
        let result = self.run_worker(request, cancel).await?;
        let result = classify(result, diagnostics)?;
        decode_artifact(request.output_artifact_path(), &result, diagnostics).await
    }

    /// Launch the worker and settle it. Returns the raw result only when the
    /// worker exited on its own; timeout and cancellation are errors.
    pub async fn run_worker(
        &self,
        request: &InvocationRequest,
        cancel: &CancellationToken,
    ) -> Result<InvocationResult, InvocationError> {
        if cancel.is_cancelled() {
            return Err(InvocationError::Cancelled);
        }

        let command = WorkerCommand::for_request(&self.worker, request);
        let mut process = self.launcher.launch(&command).map_err(|e| {
            error!("Failed to launch worker '{}': {}", command.program.display(), e);
            InvocationError::LaunchFailure(e)
        })?;

        let limit = self.worker.max_stream_bytes;
        let mut stdout = Collector::start("stdout", process.take_stdout(), limit);
        let mut stderr = Collector::start("stderr", process.take_stderr(), limit);

        let mut watchdog = Watchdog::arm(self.worker.timeout());

        let settlement = tokio::select! {
            biased;

            exit = process.wait() => match exit {
                Ok(code) => Settlement::Exited(code),
                Err(e) => Settlement::ProcessError(e),
            },

            _ = watchdog.expired() => Settlement::TimedOut,

            _ = cancel.cancelled() => Settlement::Cancelled,
        };

        match settlement {
            Settlement::Exited(exit_code) => {
                watchdog.disarm();
                let (stdout, stderr) = drain(&mut stdout, &mut stderr).await;
                info!(exit_code = ?exit_code, "Worker finished");
                Ok(InvocationResult::from_streams(stdout, stderr, exit_code))
            }
            Settlement::ProcessError(e) => {
                watchdog.disarm();
                error!("Lost track of worker process: {}", e);
                shut_down(&mut process, &stdout, &stderr).await;
                Err(InvocationError::LaunchFailure(e))
            }
            Settlement::TimedOut => {
                warn!(
                    timeout_ms = watchdog.timeout().as_millis() as u64,
                    "Worker exceeded deadline, terminating"
                );
                shut_down(&mut process, &stdout, &stderr).await;
                Err(InvocationError::Timeout {
                    timeout: watchdog.timeout(),
                })
            }
            Settlement::Cancelled => {
                watchdog.disarm();
                info!("Invocation cancelled, terminating worker");
                shut_down(&mut process, &stdout, &stderr).await;
                Err(InvocationError::Cancelled)
            }
        }
    }
}

/// Terminate once, reap within the grace period, drop the collectors.
async fn shut_down<P: WorkerProcess>(process: &mut P, stdout: &Collector, stderr: &Collector) {
    process.terminate();
    match tokio::time::timeout(REAP_GRACE, process.wait()).await {
        Ok(Ok(code)) => debug!(exit_code = ?code, "Terminated worker reaped"),
        Ok(Err(e)) => warn!("Failed to reap terminated worker: {}", e),
        Err(_) => warn!(
            "Terminated worker not reaped within {:?}; it is killed on drop",
            REAP_GRACE
        ),
    }
    stdout.abort();
    stderr.abort();
}

/// Wait for both streams to hit EOF under one shared deadline, then
/// snapshot them. A stream still open at the deadline keeps what it had.
async fn drain(stdout: &mut Collector, stderr: &mut Collector) -> (CapturedStream, CapturedStream) {
    let both = async {
        tokio::join!(stdout.finished(), stderr.finished());
    };
    if tokio::time::timeout(DRAIN_GRACE, both).await.is_err() {
        // Something inherited the pipe and keeps it open past exit.
        warn!(
            "Worker streams still open {:?} after exit, keeping partial output",
            DRAIN_GRACE
        );
        stdout.abort();
        stderr.abort();
    }
    (stdout.capture.snapshot(), stderr.capture.snapshot())
}
