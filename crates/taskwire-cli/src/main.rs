//! Taskwire CLI - run one supervised task and print its result.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use taskwire_core::TaskName;
use taskwire_supervisor::{RunOptions, SupervisorConfig, TaskSupervisor};

/// Taskwire - remote task supervisor
#[derive(Parser)]
#[command(name = "taskwire")]
#[command(about = "Run isolated task workers under a supervisor", long_about = None)]
struct Cli {
    /// Directory task executables are resolved from
    #[arg(long, default_value = "tasks")]
    tasks_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch a worker for one named task and wait for its result
    Run {
        /// Task name, resolved inside the tasks directory
        task: String,

        /// Suppress the worker's stdout lines (stderr is always shown)
        #[arg(long)]
        silent: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr; stdout carries relayed task output and the result.
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { task, silent } => {
            let config = SupervisorConfig {
                tasks_dir: cli.tasks_dir,
                ..SupervisorConfig::default()
            };
            let supervisor = TaskSupervisor::new(config);

            let result = supervisor
                .run_task(&TaskName::new(task), RunOptions { silent })
                .await;

            match serde_json::to_string_pretty(&result) {
                Ok(rendered) => println!("{rendered}"),
                Err(e) => eprintln!("failed to render result: {e}"),
            }

            if result.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
    }
}
