//! `Taskjr` — personal task board.
//!
//! Talks to a hosted PostgREST-style backend (or a local `taskjr-server`).
//! Configuration via CLI flags, environment variables, or config file
//! (`~/.config/taskjr/config.toml`).
//!
//! ```bash
//! # Against a local development server
//! cargo run --bin taskjr -- --backend-url http://127.0.0.1:54321 \
//!     --api-key dev --access-token alice-token list
//!
//! # Or via environment variables
//! TASKJR_URL=http://127.0.0.1:54321 TASKJR_API_KEY=dev TASKJR_TOKEN=alice-token \
//!     cargo run --bin taskjr -- board
//! ```

use std::path::Path;
use std::process::ExitCode;

use chrono::Utc;
use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;

use taskjr::backend::rest::RestBackend;
use taskjr::cli::{self, Cli};
use taskjr::config::ClientConfig;
use taskjr::store::TaskStore;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match ClientConfig::load(&cli.args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Logs go to a file; stdout is reserved for command output.
    let _log_guard = init_logging(&cli.args.log_level, cli.args.log_file.as_deref());

    tracing::info!("taskjr starting");

    let rest_config = match config.to_rest_config() {
        Ok(Some(c)) => c,
        Ok(None) => {
            eprintln!("No backend configured: set --backend-url and --api-key");
            return ExitCode::FAILURE;
        }
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let backend = match RestBackend::new(&rest_config) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let store = TaskStore::with_options(backend, config.store_options());

    let result = cli::execute(&store, cli.command.as_ref(), &config, Utc::now()).await;
    match result {
        Ok(output) => {
            print!("{output}");
            tracing::info!("taskjr exiting");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize file-based logging.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown to ensure all
/// buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("taskjr.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}
