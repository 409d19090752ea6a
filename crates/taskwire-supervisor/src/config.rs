//! Supervisor configuration.

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

/// Supervisor configuration.
///
/// The timeouts are layered: a long outer deadline for the whole invocation
/// wrapping a short budget for the readiness handshake, with a brief grace
/// window for the worker to exit after reporting its result.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Directory task executables are resolved from.
    pub tasks_dir: PathBuf,

    /// Host the worker binds its control listener on.
    pub host: IpAddr,

    /// First port the allocator probes.
    pub base_port: u16,

    /// Number of successive ports probed before allocation fails.
    pub port_span: u16,

    /// Outer grace-period deadline for the whole invocation.
    pub task_deadline: Duration,

    /// Budget for the readiness handshake.
    pub connect_timeout: Duration,

    /// Delay before the first handshake attempt.
    pub warmup_delay: Duration,

    /// Backoff between handshake attempts.
    pub retry_backoff: Duration,

    /// How long a finished worker gets to exit on its own.
    pub exit_grace: Duration,

    /// Pause between the graceful interrupt and the unconditional kill.
    pub kill_grace: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            tasks_dir: PathBuf::from("tasks"),
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            base_port: 41_000,
            port_span: 200,
            task_deadline: Duration::from_secs(11 * 60),
            connect_timeout: Duration::from_secs(2),
            warmup_delay: Duration::from_millis(100),
            retry_backoff: Duration::from_millis(200),
            exit_grace: Duration::from_secs(1),
            kill_grace: Duration::from_millis(500),
        }
    }
}
