//! Control-channel client: readiness handshake and the single invocation.

use std::net::SocketAddr;
use std::time::Instant;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time;
use tracing::{debug, trace};

use taskwire_core::TaskResult;
use taskwire_proto::{ControlRequest, Operation, READY_SENTINEL};

use crate::config::SupervisorConfig;
use crate::error::SupervisorError;

/// Transient state of the readiness probe loop.
#[derive(Debug)]
struct HandshakeState {
    attempts: u32,
    started: Instant,
    last_error: Option<String>,
}

impl HandshakeState {
    fn new() -> Self {
        Self {
            attempts: 0,
            started: Instant::now(),
            last_error: None,
        }
    }

    fn note_failure(&mut self, detail: impl Into<String>) {
        self.attempts += 1;
        self.last_error = Some(detail.into());
    }

    fn detail(&self) -> String {
        match &self.last_error {
            Some(error) => format!("{error} after {} attempts", self.attempts),
            None => "no connection attempt completed".to_string(),
        }
    }
}

/// A live control connection to a worker that has answered `ready`.
#[derive(Debug)]
pub struct ControlChannel {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl ControlChannel {
    fn new(stream: TcpStream) -> Self {
        let (read, write) = stream.into_split();
        Self {
            reader: BufReader::new(read),
            writer: write,
        }
    }

    /// Sends one request line and reads one response line.
    async fn exchange(&mut self, op: Operation) -> Result<String, SupervisorError> {
        let request = ControlRequest::new(op);
        let line = request.encode()?;
        trace!(id = %request.id, line = %line, "Sending control request");

        self.writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| SupervisorError::Transport(format!("write failed: {e}")))?;
        self.writer
            .write_all(b"\n")
            .await
            .map_err(|e| SupervisorError::Transport(format!("write failed: {e}")))?;
        self.writer
            .flush()
            .await
            .map_err(|e| SupervisorError::Transport(format!("write failed: {e}")))?;

        let mut response = String::new();
        let bytes_read = self
            .reader
            .read_line(&mut response)
            .await
            .map_err(|e| SupervisorError::Transport(format!("read failed: {e}")))?;
        if bytes_read == 0 {
            return Err(SupervisorError::Transport(
                "control connection closed before a response arrived".to_string(),
            ));
        }

        Ok(response.trim().to_string())
    }

    async fn probe_ready(&mut self) -> Result<bool, SupervisorError> {
        let response = self.exchange(Operation::ReadyCheck).await?;
        Ok(response == READY_SENTINEL)
    }

    /// Invokes an operation and decodes the worker's structured response.
    ///
    /// Carries no timeout of its own; the supervisor's outer deadline bounds
    /// the whole invocation. Invocation failures are not retried.
    pub async fn invoke(&mut self, op: Operation) -> Result<TaskResult, SupervisorError> {
        let response = self.exchange(op).await?;
        let value: serde_json::Value = serde_json::from_str(&response)
            .map_err(|e| SupervisorError::Transport(format!("undecodable result payload: {e}")))?;
        Ok(TaskResult::from_value(value)?)
    }
}

/// Runs the readiness handshake against `endpoint`.
///
/// The loop is bounded by elapsed time against the connect budget, not by
/// attempt count: worker start latency is environment-dependent. A refused
/// connection and a connected-but-not-ready probe are treated identically:
/// note the failure, back off, retry. Transport resources from a failed
/// attempt are closed before the next one.
pub async fn connect(
    endpoint: SocketAddr,
    config: &SupervisorConfig,
) -> Result<ControlChannel, SupervisorError> {
    // The worker needs a moment to open its listener; probing instantly
    // only burns attempts.
    time::sleep(config.warmup_delay).await;

    let mut state = HandshakeState::new();
    loop {
        if state.started.elapsed() >= config.connect_timeout {
            debug!(attempts = state.attempts, "Handshake budget exhausted");
            return Err(SupervisorError::ConnectTimeout {
                detail: state.detail(),
            });
        }

        match TcpStream::connect(endpoint).await {
            Ok(stream) => {
                let mut channel = ControlChannel::new(stream);
                match channel.probe_ready().await {
                    Ok(true) => {
                        debug!(attempts = state.attempts + 1, "Worker answered ready");
                        return Ok(channel);
                    }
                    Ok(false) => state.note_failure("worker is not ready yet"),
                    Err(e) => state.note_failure(e.to_string()),
                }
                // The failed channel is dropped here; no connections leak
                // across attempts.
            }
            Err(e) => state.note_failure(format!("connect failed: {e}")),
        }

        time::sleep(config.retry_backoff).await;
    }
}
