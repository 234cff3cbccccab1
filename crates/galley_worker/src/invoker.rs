//! Worker Invoker: launches the external worker and owns its process handle.
//!
//! The argument shape is fixed:
//!
//! ```text
//! <interpreter> <script> --input <path> --output <path> --mode <mode> --category <category>
//! ```
//!
//! [`Launcher`] is the seam tests use to substitute a scripted process.

use std::ffi::OsString;
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncRead;
use tokio::process::{Child, Command};
use tracing::{debug, info};

use crate::config::WorkerConfig;
use crate::request::InvocationRequest;

/// A diagnostic byte stream taken from a running worker.
pub type WorkerStream = Box<dyn AsyncRead + Send + Unpin>;

/// Fully resolved command line for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub working_dir: Option<PathBuf>,
}

impl WorkerCommand {
    pub fn for_request(config: &WorkerConfig, request: &InvocationRequest) -> Self {
        let filters = request.filters();
        let args = vec![
            config.script.clone().into_os_string(),
            OsString::from("--input"),
            request.input_artifact_path().as_os_str().to_os_string(),
            OsString::from("--output"),
            request.output_artifact_path().as_os_str().to_os_string(),
            OsString::from("--mode"),
            OsString::from(filters.mode().as_str()),
            OsString::from("--category"),
            OsString::from(filters.category().as_str()),
        ];
        Self {
            program: config.interpreter.clone(),
            args,
            working_dir: config.working_dir.clone(),
        }
    }

    /// Shell-like rendering for logs.
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().map(|a| a.to_string_lossy().into_owned()));
        parts.join(" ")
    }
}

/// A live worker process.
pub trait WorkerProcess: Send {
    /// OS process id, if the process still has one.
    fn id(&self) -> Option<u32>;

    fn take_stdout(&mut self) -> Option<WorkerStream>;

    fn take_stderr(&mut self) -> Option<WorkerStream>;

    /// Resolves when the process exits. `Ok(None)` means it ended without an
    /// exit code (killed by a signal).
    fn wait(&mut self) -> impl Future<Output = io::Result<Option<i32>>> + Send;

    /// Request termination. Safe to call any number of times, including
    /// after the process has exited; never fails.
    fn terminate(&mut self);
}

/// Starts worker processes.
pub trait Launcher: Send + Sync {
    type Process: WorkerProcess;

    fn launch(&self, command: &WorkerCommand) -> io::Result<Self::Process>;
}

/// Launches real OS processes through `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessLauncher;

impl Launcher for ProcessLauncher {
    type Process = ProcessHandle;

    fn launch(&self, command: &WorkerCommand) -> io::Result<ProcessHandle> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &command.working_dir {
            cmd.current_dir(dir);
        }

        let child = cmd.spawn()?;
        info!(pid = ?child.id(), "Spawned worker: {}", command.display());
        Ok(ProcessHandle::new(child))
    }
}

/// Handle over a spawned `tokio::process::Child`.
#[derive(Debug)]
pub struct ProcessHandle {
    child: Child,
    pid: Option<u32>,
    exited: bool,
    kill_sent: bool,
}

impl ProcessHandle {
    fn new(child: Child) -> Self {
        let pid = child.id();
        Self {
            child,
            pid,
            exited: false,
            kill_sent: false,
        }
    }
}

impl WorkerProcess for ProcessHandle {
    fn id(&self) -> Option<u32> {
        if self.exited {
            None
        } else {
            self.pid
        }
    }

    fn take_stdout(&mut self) -> Option<WorkerStream> {
        self.child
            .stdout
            .take()
            .map(|s| Box::new(s) as WorkerStream)
    }

    fn take_stderr(&mut self) -> Option<WorkerStream> {
        self.child
            .stderr
            .take()
            .map(|s| Box::new(s) as WorkerStream)
    }

    fn wait(&mut self) -> impl Future<Output = io::Result<Option<i32>>> + Send {
        async move {
            let status = self.child.wait().await?;
            self.exited = true;
            debug!(pid = ?self.pid, %status, "Worker exited");
            Ok(status.code())
        }
    }

    fn terminate(&mut self) {
        if self.exited || self.kill_sent {
            return;
        }
        if let Ok(Some(_)) = self.child.try_wait() {
            self.exited = true;
            return;
        }
        match self.child.start_kill() {
            Ok(()) => {
                self.kill_sent = true;
                debug!(pid = ?self.pid, "Sent kill to worker");
            }
            Err(e) => {
                debug!(pid = ?self.pid, "Worker already gone, kill skipped: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::{Category, FilterParameters, Mode};

    fn request() -> InvocationRequest {
        InvocationRequest::new(
            "/tmp/in.xls",
            "/tmp/out.json",
            FilterParameters::new(Mode::Orders, Category::Lounge),
        )
    }

    #[test]
    fn test_command_argument_shape() {
        let config = WorkerConfig::default();
        let command = WorkerCommand::for_request(&config, &request());

        assert_eq!(command.program, PathBuf::from("python"));
        let args: Vec<String> = command
            .args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "main.py",
                "--input",
                "/tmp/in.xls",
                "--output",
                "/tmp/out.json",
                "--mode",
                "commandes",
                "--category",
                "salon",
            ]
        );
        assert_eq!(
            command.display(),
            "python main.py --input /tmp/in.xls --output /tmp/out.json --mode commandes --category salon"
        );
    }

    #[tokio::test]
    async fn test_launch_missing_program_is_os_error() {
        let command = WorkerCommand {
            program: PathBuf::from("/definitely/not/a/galley/interpreter"),
            args: vec![],
            working_dir: None,
        };
        let err = ProcessLauncher.launch(&command).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_terminate_after_exit_is_noop() {
        let command = WorkerCommand {
            program: PathBuf::from("sh"),
            args: vec!["-c".into(), "exit 3".into()],
            working_dir: None,
        };
        let mut process = ProcessLauncher.launch(&command).unwrap();
        assert_eq!(process.wait().await.unwrap(), Some(3));

        process.terminate();
        process.terminate();
        assert!(process.id().is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_terminate_running_process_twice() {
        let command = WorkerCommand {
            program: PathBuf::from("sleep"),
            args: vec!["30".into()],
            working_dir: None,
        };
        let mut process = ProcessLauncher.launch(&command).unwrap();
        process.terminate();
        process.terminate();

        let code = tokio::time::timeout(std::time::Duration::from_secs(5), process.wait())
            .await
            .expect("killed process should be reaped promptly")
            .unwrap();
        assert_eq!(code, None);
    }
}
