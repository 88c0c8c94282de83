//! `Taskjr` development server: an in-memory stand-in for the hosted
//! backend.
//!
//! # Usage
//!
//! ```bash
//! # Run on the default address 127.0.0.1:54321
//! cargo run --bin taskjr-server -- --config dev-users.toml
//!
//! # Run on a custom address
//! TASKJR_SERVER_ADDR=127.0.0.1:8080 cargo run --bin taskjr-server
//! ```

use std::sync::Arc;

use clap::Parser;
use taskjr_server::config::{ServerCliArgs, ServerConfig};
use taskjr_server::server::{self, ServerState};

#[tokio::main]
async fn main() {
    let cli = ServerCliArgs::parse();

    let config = match ServerConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    if config.users.is_empty() {
        tracing::warn!("no [[users]] configured; every request will be rejected");
    }
    tracing::info!(addr = %config.bind_addr, users = config.users.len(), "starting taskjr server");

    let state = Arc::new(ServerState::from_config(&config));

    match server::start_server_with_state(&config.bind_addr, state).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "server listening");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "server task failed");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start server");
            std::process::exit(1);
        }
    }
}
