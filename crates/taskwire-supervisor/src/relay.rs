//! Line-oriented relay of a worker's output streams.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::LinesStream;
use tokio_stream::StreamExt;
use tracing::warn;

/// Which of the worker's streams a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    /// Tag used in relayed line prefixes.
    pub fn label(self) -> &'static str {
        match self {
            Self::Stdout => "STDOUT",
            Self::Stderr => "STDERR",
        }
    }
}

/// Receives complete, tagged output lines.
///
/// Implementations must write one line at a time so output from different
/// tasks never interleaves mid-line.
#[async_trait]
pub trait OutputSink: Send + Sync {
    async fn write_line(&self, kind: StreamKind, line: String);
}

/// Sink that forwards to the supervising process's own stdout/stderr.
#[derive(Debug, Default)]
pub struct ConsoleSink;

#[async_trait]
impl OutputSink for ConsoleSink {
    async fn write_line(&self, kind: StreamKind, line: String) {
        match kind {
            StreamKind::Stdout => println!("{line}"),
            StreamKind::Stderr => eprintln!("{line}"),
        }
    }
}

/// Tags a worker's stdout/stderr lines with the task name and stream kind
/// and forwards them to a shared sink.
///
/// With `silent` set, stdout lines are dropped before the sink; stderr is
/// never suppressed.
pub struct OutputRelay {
    task: String,
    silent: bool,
    sink: Arc<dyn OutputSink>,
}

/// Join handles for the two relay loops.
pub struct RelayHandles {
    stdout: JoinHandle<()>,
    stderr: JoinHandle<()>,
}

impl RelayHandles {
    /// Waits for both loops to observe EOF on their streams.
    pub async fn drain(self) {
        let _ = self.stdout.await;
        let _ = self.stderr.await;
    }
}

impl OutputRelay {
    /// Create a relay for one task invocation.
    pub fn new(task: impl Into<String>, silent: bool, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            task: task.into(),
            silent,
            sink,
        }
    }

    /// Spawns the two line loops.
    ///
    /// Must be called before the handshake starts so no early worker output
    /// is lost. Each loop ends when its stream closes.
    pub fn attach<O, E>(&self, stdout: O, stderr: E) -> RelayHandles
    where
        O: AsyncRead + Unpin + Send + 'static,
        E: AsyncRead + Unpin + Send + 'static,
    {
        let stdout_handle = tokio::spawn(Self::pump(
            stdout,
            StreamKind::Stdout,
            self.task.clone(),
            self.silent,
            self.sink.clone(),
        ));
        let stderr_handle = tokio::spawn(Self::pump(
            stderr,
            StreamKind::Stderr,
            self.task.clone(),
            false,
            self.sink.clone(),
        ));

        RelayHandles {
            stdout: stdout_handle,
            stderr: stderr_handle,
        }
    }

    async fn pump<R>(
        stream: R,
        kind: StreamKind,
        task: String,
        drop_lines: bool,
        sink: Arc<dyn OutputSink>,
    ) where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let mut lines = LinesStream::new(BufReader::new(stream).lines());
        while let Some(next) = lines.next().await {
            match next {
                Ok(line) => {
                    if drop_lines {
                        continue;
                    }
                    let tagged = format!("[{task}] [{}] {line}", kind.label());
                    sink.write_line(kind, tagged).await;
                }
                Err(e) => {
                    warn!(error = %e, stream = kind.label(), "Error reading worker output");
                    break;
                }
            }
        }
    }
}
