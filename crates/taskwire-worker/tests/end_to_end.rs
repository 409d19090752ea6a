//! End-to-end tests: the real supervisor against the real demo worker
//! binary, copied into a temporary tasks directory.

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::mpsc;

use taskwire_core::TaskName;
use taskwire_supervisor::{
    OutputSink, RunOptions, StreamKind, SupervisorConfig, TaskSupervisor,
};

// The demo worker reads its misbehavior knobs from the environment, which
// is process-global; tests that set them take this lock.
static ENV_LOCK: Mutex<()> = Mutex::new(());

fn lock_env() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

fn set_demo_env(startup_lines: u64, stderr_lines: u64, bind_delay_ms: u64, linger_ms: u64) {
    std::env::set_var("TASKWIRE_DEMO_STARTUP_LINES", startup_lines.to_string());
    std::env::set_var("TASKWIRE_DEMO_STDERR_LINES", stderr_lines.to_string());
    std::env::set_var("TASKWIRE_DEMO_BIND_DELAY_MS", bind_delay_ms.to_string());
    std::env::set_var("TASKWIRE_DEMO_LINGER_MS", linger_ms.to_string());
}

/// Copies the demo worker binary into a fresh tasks directory under `name`.
fn tasks_dir_with(name: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let mut file = name.to_string();
    file.push_str(std::env::consts::EXE_SUFFIX);
    fs::copy(
        PathBuf::from(env!("CARGO_BIN_EXE_taskwire-worker")),
        dir.path().join(file),
    )
    .unwrap();
    dir
}

fn config_for(dir: &tempfile::TempDir, base_port: u16) -> SupervisorConfig {
    SupervisorConfig {
        tasks_dir: dir.path().to_path_buf(),
        base_port,
        task_deadline: Duration::from_secs(10),
        ..SupervisorConfig::default()
    }
}

struct ChannelSink {
    tx: mpsc::UnboundedSender<(StreamKind, String)>,
}

#[async_trait]
impl OutputSink for ChannelSink {
    async fn write_line(&self, kind: StreamKind, line: String) {
        self.tx.send((kind, line)).ok();
    }
}

fn channel_sink() -> (
    Arc<dyn OutputSink>,
    mpsc::UnboundedReceiver<(StreamKind, String)>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(ChannelSink { tx }), rx)
}

fn captured(
    rx: &mut mpsc::UnboundedReceiver<(StreamKind, String)>,
) -> (Vec<String>, Vec<String>) {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    while let Ok((kind, line)) = rx.try_recv() {
        match kind {
            StreamKind::Stdout => stdout.push(line),
            StreamKind::Stderr => stderr.push(line),
        }
    }
    (stdout, stderr)
}

#[tokio::test]
async fn test_demo_task_end_to_end() {
    let _guard = lock_env();
    set_demo_env(0, 0, 0, 0);

    let dir = tasks_dir_with("demo");
    let (sink, _rx) = channel_sink();
    let supervisor = TaskSupervisor::new(config_for(&dir, 42_700)).with_sink(sink);

    let result = supervisor
        .run_task(&TaskName::new("demo"), RunOptions::default())
        .await;

    assert!(result.is_success(), "reason: {:?}", result.reason);
    assert_eq!(result.get("value"), Some(&json!(42)));
}

#[tokio::test]
async fn test_startup_output_is_not_lost() {
    let _guard = lock_env();
    // The worker prints five lines and only then, 300ms later, opens its
    // control port; every line must still be relayed.
    set_demo_env(5, 0, 300, 0);

    let dir = tasks_dir_with("chatty");
    let (sink, mut rx) = channel_sink();
    let supervisor = TaskSupervisor::new(config_for(&dir, 42_720)).with_sink(sink);

    let result = supervisor
        .run_task(&TaskName::new("chatty"), RunOptions::default())
        .await;
    assert!(result.is_success(), "reason: {:?}", result.reason);

    let (stdout, _stderr) = captured(&mut rx);
    let startup: Vec<_> = stdout
        .iter()
        .filter(|line| line.contains("demo startup line"))
        .collect();
    assert_eq!(startup.len(), 5, "captured stdout: {stdout:?}");
    assert!(startup[0].starts_with("[chatty] [STDOUT]"));
}

#[tokio::test]
async fn test_silent_mode_suppresses_stdout_only() {
    let _guard = lock_env();
    set_demo_env(3, 2, 0, 0);

    let dir = tasks_dir_with("quiet");
    let (sink, mut rx) = channel_sink();
    let supervisor = TaskSupervisor::new(config_for(&dir, 42_740)).with_sink(sink);

    let result = supervisor
        .run_task(&TaskName::new("quiet"), RunOptions { silent: true })
        .await;
    assert!(result.is_success(), "reason: {:?}", result.reason);

    let (stdout, stderr) = captured(&mut rx);
    assert!(stdout.is_empty(), "stdout leaked: {stdout:?}");

    let markers: Vec<_> = stderr
        .iter()
        .filter(|line| line.contains("demo stderr line"))
        .collect();
    assert_eq!(markers.len(), 2, "captured stderr: {stderr:?}");
    assert!(markers[0].starts_with("[quiet] [STDERR]"));
}

#[tokio::test]
async fn test_lingering_worker_is_killed_and_reported() {
    let _guard = lock_env();
    // The worker answers, then refuses to exit for 30s; the exit grace is
    // far shorter, so the supervisor must kill it and report the phase.
    set_demo_env(0, 0, 0, 30_000);

    let dir = tasks_dir_with("lingerer");
    let (sink, _rx) = channel_sink();
    let mut config = config_for(&dir, 42_760);
    config.exit_grace = Duration::from_millis(300);
    config.kill_grace = Duration::from_millis(300);
    let supervisor = TaskSupervisor::new(config).with_sink(sink);

    let started = Instant::now();
    let result = supervisor
        .run_task(&TaskName::new("lingerer"), RunOptions::default())
        .await;
    let elapsed = started.elapsed();

    assert!(!result.is_success());
    assert_eq!(
        result.reason.as_deref(),
        Some("Timeout waiting for task process to exit")
    );
    // Killed, not waited out.
    assert!(elapsed < Duration::from_secs(10), "took {elapsed:?}");
}
