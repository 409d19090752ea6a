//! Control-protocol server loop for one task invocation.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use taskwire_core::TaskResult;
use taskwire_proto::{ControlRequest, Operation, READY_SENTINEL};

/// Executes the single unit of work this worker was launched for.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn run(&self) -> TaskResult;
}

/// Errors fatal to the worker harness.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The assigned control port could not be bound.
    #[error("Failed to bind control port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// Control socket read or write failed.
    #[error("Control socket error: {0}")]
    Io(#[from] std::io::Error),

    /// A result could not be encoded for the wire.
    #[error("Failed to encode result: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Serves the control protocol on `port` until the task has run once.
///
/// Ready-checks may arrive on any number of probe connections before the
/// supervisor issues the run-task call; connections are handled in
/// sequence. The first completed run-task response ends the loop so the
/// process can exit promptly.
pub async fn serve(port: u16, handler: Arc<dyn TaskHandler>) -> Result<(), WorkerError> {
    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| WorkerError::Bind { port, source })?;

    serve_on(listener, handler).await
}

async fn serve_on(listener: TcpListener, handler: Arc<dyn TaskHandler>) -> Result<(), WorkerError> {
    info!(addr = %listener.local_addr()?, "Control listener up");

    loop {
        let (stream, peer) = listener.accept().await?;
        debug!(%peer, "Control connection accepted");
        if serve_connection(stream, handler.as_ref()).await? {
            return Ok(());
        }
    }
}

/// Handles one control connection; true once a run-task response went out.
async fn serve_connection(
    stream: TcpStream,
    handler: &dyn TaskHandler,
) -> Result<bool, WorkerError> {
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();

    while let Some(line) = lines.next_line().await? {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let request = match ControlRequest::decode(trimmed) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Undecodable control request");
                let failure = TaskResult::failure(format!("undecodable control request: {e}"));
                write_result(&mut write, &failure).await?;
                continue;
            }
        };

        match request.op {
            Operation::ReadyCheck => {
                debug!(id = %request.id, "Answering ready-check");
                write.write_all(READY_SENTINEL.as_bytes()).await?;
                write.write_all(b"\n").await?;
                write.flush().await?;
            }
            Operation::RunTask => {
                info!(id = %request.id, "Running task");
                let result = handler.run().await;
                write_result(&mut write, &result).await?;
                return Ok(true);
            }
        }
    }

    // Probe connection closed by the supervisor; wait for the next one.
    Ok(false)
}

async fn write_result(write: &mut OwnedWriteHalf, result: &TaskResult) -> Result<(), WorkerError> {
    let line = serde_json::to_string(result)?;
    write.write_all(line.as_bytes()).await?;
    write.write_all(b"\n").await?;
    write.flush().await?;
    Ok(())
}
