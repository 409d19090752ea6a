//! Free-port allocation for worker control endpoints.

use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU32, Ordering};

use tokio::net::TcpListener;
use tracing::debug;

use crate::error::SupervisorError;

// Probe cursor shared by every allocator in the process, so concurrent
// invocations never probe the same port at the same time.
static PROBE_CURSOR: AtomicU32 = AtomicU32::new(0);

/// Finds a free local TCP port for a worker control endpoint.
///
/// Probes successive ports from a fixed base by binding a transient
/// listener; the first port that binds is released and returned. No sockets
/// are left open. Exhausting the probe span is fatal.
#[derive(Debug, Clone)]
pub struct PortAllocator {
    host: IpAddr,
    base: u16,
    span: u16,
}

impl PortAllocator {
    /// Create an allocator probing `span` ports starting at `base`.
    pub fn new(host: IpAddr, base: u16, span: u16) -> Self {
        Self { host, base, span }
    }

    /// Allocate one free port.
    pub async fn allocate(&self) -> Result<u16, SupervisorError> {
        for _ in 0..self.span {
            let offset = PROBE_CURSOR.fetch_add(1, Ordering::Relaxed) % u32::from(self.span);
            let Some(port) = self.base.checked_add(offset as u16) else {
                continue;
            };

            match TcpListener::bind(SocketAddr::new(self.host, port)).await {
                Ok(listener) => {
                    // Release immediately; only the port number escapes.
                    drop(listener);
                    debug!(port, "Allocated control port");
                    return Ok(port);
                }
                Err(_) => continue,
            }
        }

        Err(SupervisorError::PortAllocationExhausted {
            base: self.base,
            span: self.span,
        })
    }
}
