//! Demo Taskwire worker: answers the readiness probe and returns a fixed
//! successful result.
//!
//! Startup behavior can be shaped through the environment, which the
//! integration tests use to simulate slow or misbehaving workers:
//! - `TASKWIRE_DEMO_BIND_DELAY_MS`: sleep before binding the control port.
//! - `TASKWIRE_DEMO_STARTUP_LINES`: stdout lines printed before binding.
//! - `TASKWIRE_DEMO_STDERR_LINES`: stderr lines printed before binding.
//! - `TASKWIRE_DEMO_LINGER_MS`: sleep after serving, delaying process exit.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::Parser;
use serde_json::{json, Map};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use taskwire_core::TaskResult;
use taskwire_worker::{serve, TaskHandler};

/// Demo Taskwire worker
#[derive(Parser)]
#[command(name = "taskwire-worker")]
#[command(about = "Demo worker speaking the Taskwire control protocol", long_about = None)]
struct Args {
    /// Control port assigned by the supervisor
    #[arg(long)]
    control_port: u16,
}

struct DemoTask;

#[async_trait]
impl TaskHandler for DemoTask {
    async fn run(&self) -> TaskResult {
        info!("Demo task running");
        let mut data = Map::new();
        data.insert("value".to_string(), json!(42));
        TaskResult::success_with(data)
    }
}

fn env_millis(name: &str) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(0)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr; stdout belongs to the task's own output.
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    for i in 0..env_millis("TASKWIRE_DEMO_STARTUP_LINES") {
        println!("demo startup line {i}");
    }
    for i in 0..env_millis("TASKWIRE_DEMO_STDERR_LINES") {
        eprintln!("demo stderr line {i}");
    }

    let bind_delay = env_millis("TASKWIRE_DEMO_BIND_DELAY_MS");
    if bind_delay > 0 {
        tokio::time::sleep(Duration::from_millis(bind_delay)).await;
    }

    info!(port = args.control_port, "Starting demo worker");
    serve(args.control_port, Arc::new(DemoTask)).await?;

    let linger = env_millis("TASKWIRE_DEMO_LINGER_MS");
    if linger > 0 {
        tokio::time::sleep(Duration::from_millis(linger)).await;
    }

    Ok(())
}
