//! echo-store: a single-shot TCP echo-store server
//!
//! The server accepts exactly one client connection, reads one buffer of
//! data, appends it to an on-disk artifact, streams the artifact's full
//! contents back to the client, deletes the artifact, and exits.
//!
//! Features:
//! - Store mode (the default) and a receive-only drain mode
//! - Configuration via CLI arguments or TOML file
//! - Blocking, single-threaded I/O throughout

mod config;
mod server;
mod storage;

use config::Config;
use server::Server;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        listen = %config.listen,
        storage_path = %config.storage_path.display(),
        mode = ?config.mode,
        "Starting echo-store server"
    );

    let server = Server::bind(config)?;
    server.run()?;

    info!("Session complete");
    Ok(())
}
