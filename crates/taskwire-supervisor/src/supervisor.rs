//! Top-level task supervisor: resolve, launch, connect, invoke, collect.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use tokio::process::{Child, Command};
use tokio::time;
use tracing::{debug, error, info, warn};

use taskwire_core::{TaskName, TaskResult};
use taskwire_proto::Operation;

use crate::client;
use crate::config::SupervisorConfig;
use crate::error::SupervisorError;
use crate::port::PortAllocator;
use crate::relay::{ConsoleSink, OutputRelay, OutputSink};

/// Per-invocation options.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Drop the worker's stdout lines; stderr is always relayed.
    pub silent: bool,
}

/// Launches one worker process per task invocation and collects its result.
///
/// Each invocation owns exactly one worker process and one control endpoint,
/// and the two are always paired. The worker never outlives the call: every
/// exit path terminates it and drains the output relay before returning.
pub struct TaskSupervisor {
    config: SupervisorConfig,
    sink: Arc<dyn OutputSink>,
}

impl TaskSupervisor {
    /// Create a supervisor relaying worker output to the console.
    pub fn new(config: SupervisorConfig) -> Self {
        Self {
            config,
            sink: Arc::new(ConsoleSink),
        }
    }

    /// Replace the output sink (embedding, tests).
    pub fn with_sink(mut self, sink: Arc<dyn OutputSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Runs one named task to completion.
    ///
    /// Always resolves to exactly one [`TaskResult`]: a worker response is
    /// passed through unchanged (including `success: false`), and every
    /// supervisor failure is folded into a synthesized failure result.
    pub async fn run_task(&self, name: &TaskName, options: RunOptions) -> TaskResult {
        match self.try_run(name, options).await {
            Ok(result) => result,
            Err(e) => {
                error!(task = %name, error = %e, "Task invocation failed");
                TaskResult::failure(e.to_string())
            }
        }
    }

    async fn try_run(
        &self,
        name: &TaskName,
        options: RunOptions,
    ) -> Result<TaskResult, SupervisorError> {
        // Resolving: a missing executable fails before anything is spawned.
        let executable = self.resolve(name)?;

        // Launching: the endpoint is chosen before the worker starts and
        // handed to it as a startup argument.
        let allocator =
            PortAllocator::new(self.config.host, self.config.base_port, self.config.port_span);
        let port = allocator.allocate().await?;
        let endpoint = SocketAddr::new(self.config.host, port);

        info!(task = %name, executable = %executable.display(), port, "Launching worker");

        let mut child = Command::new(&executable)
            .arg("--control-port")
            .arg(port.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(SupervisorError::Spawn)?;

        // Streams are wired before the handshake starts so output emitted
        // while the worker boots is not lost.
        let relay = OutputRelay::new(name.as_str(), options.silent, self.sink.clone());
        let handles = match (child.stdout.take(), child.stderr.take()) {
            (Some(stdout), Some(stderr)) => relay.attach(stdout, stderr),
            _ => {
                let _ = child.kill().await;
                return Err(SupervisorError::Transport(
                    "worker stdio was not captured".to_string(),
                ));
            }
        };

        let outcome = self.drive(endpoint, &mut child).await;

        // Terminated: whichever path was taken, the worker must be gone and
        // the relay drained before we return.
        self.terminate(&mut child, outcome.is_err()).await;
        handles.drain().await;

        outcome
    }

    /// AwaitingReady → Invoking → Collecting, under the outer deadline.
    async fn drive(
        &self,
        endpoint: SocketAddr,
        child: &mut Child,
    ) -> Result<TaskResult, SupervisorError> {
        let deadline = self.config.task_deadline;

        // The handshake and the invocation share the outer budget; the
        // handshake additionally enforces its own, shorter connect budget.
        let invocation = async {
            let mut channel = client::connect(endpoint, &self.config).await?;
            channel.invoke(Operation::RunTask).await
        };
        let result = match time::timeout(deadline, invocation).await {
            Ok(inner) => inner?,
            Err(_) => return Err(SupervisorError::DeadlineExceeded(deadline)),
        };

        debug!(success = result.is_success(), "Worker reported a result");

        // Collecting: the worker is expected to exit on its own shortly
        // after responding.
        match time::timeout(self.config.exit_grace, child.wait()).await {
            Ok(Ok(status)) => {
                debug!(code = status.code(), "Worker exited");
                Ok(result)
            }
            Ok(Err(e)) => Err(SupervisorError::Transport(format!(
                "failed to reap worker: {e}"
            ))),
            Err(_) => Err(SupervisorError::ExitTimeout),
        }
    }

    fn resolve(&self, name: &TaskName) -> Result<PathBuf, SupervisorError> {
        let mut file = name.as_str().to_string();
        file.push_str(std::env::consts::EXE_SUFFIX);
        let path = self.config.tasks_dir.join(file);
        if path.is_file() {
            Ok(path)
        } else {
            Err(SupervisorError::TaskNotFound(path))
        }
    }

    /// Guarantees the worker is not running when the supervisor returns.
    ///
    /// Failure paths get a graceful interrupt first; a worker still alive
    /// after the escalation grace is killed unconditionally.
    async fn terminate(&self, child: &mut Child, graceful_first: bool) {
        if matches!(child.try_wait(), Ok(Some(_))) {
            return;
        }

        if graceful_first && interrupt(child) {
            match time::timeout(self.config.kill_grace, child.wait()).await {
                Ok(Ok(status)) => {
                    debug!(code = status.code(), "Worker exited after interrupt");
                    return;
                }
                Ok(Err(e)) => warn!(error = %e, "Failed waiting for interrupted worker"),
                Err(_) => warn!("Worker ignored interrupt; killing"),
            }
        }

        if let Err(e) = child.kill().await {
            warn!(error = %e, "Failed to kill worker process");
        }
    }
}

/// Sends SIGTERM on Unix; returns false when no graceful signal is possible.
#[cfg(unix)]
fn interrupt(child: &Child) -> bool {
    match child.id() {
        Some(pid) => unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) == 0 },
        None => false,
    }
}

#[cfg(not(unix))]
fn interrupt(_child: &Child) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_task_fails_without_spawning() {
        let dir = tempfile::tempdir().unwrap();
        let config = SupervisorConfig {
            tasks_dir: dir.path().to_path_buf(),
            ..SupervisorConfig::default()
        };

        let supervisor = TaskSupervisor::new(config);
        let result = supervisor
            .run_task(&TaskName::new("no_such_task"), RunOptions::default())
            .await;

        assert!(!result.is_success());
        let reason = result.reason.unwrap();
        assert!(reason.contains("Task not found"));
        assert!(reason.contains("no_such_task"));
    }

    #[tokio::test]
    async fn test_run_task_always_yields_a_result() {
        // Even with a nonsensical configuration the caller gets a result
        // mapping, never an error or a panic.
        let config = SupervisorConfig {
            tasks_dir: PathBuf::from("/definitely/not/a/real/directory"),
            ..SupervisorConfig::default()
        };

        let supervisor = TaskSupervisor::new(config);
        let result = supervisor
            .run_task(&TaskName::new("anything"), RunOptions { silent: true })
            .await;

        assert!(!result.is_success());
        assert!(result.reason.is_some());
    }
}
