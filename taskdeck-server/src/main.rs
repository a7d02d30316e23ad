//! Taskdeck API server.
//!
//! # Usage
//!
//! ```bash
//! # Run on default address 0.0.0.0:5001, memory-only
//! cargo run --bin taskdeck-server
//!
//! # Persist tasks and accounts under ./data
//! cargo run --bin taskdeck-server -- --bind 127.0.0.1:8080 --data-dir ./data
//! ```

use std::sync::Arc;

use clap::Parser;
use taskdeck_server::config::{ServerCliArgs, ServerConfig};
use taskdeck_server::server::{self, AppState};

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

    tracing::info!(
        addr = %config.bind_addr,
        data_dir = ?config.data_dir,
        "starting taskdeck server"
    );

    let state = match AppState::from_config(&config).await {
        Ok(state) => Arc::new(state),
        Err(e) => {
            tracing::error!(error = %e, "failed to load saved data");
            std::process::exit(1);
        }
    };

    match server::start_server_with_state(&config.bind_addr, state, config.max_body_size).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "taskdeck server listening");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "taskdeck server task failed");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start taskdeck server");
            std::process::exit(1);
        }
    }
}
