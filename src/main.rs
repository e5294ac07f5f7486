//! chatrelay - group chat relay server.

use chatrelay::config::{Cli, Config};
use chatrelay::server::run_server;
use chatrelay::ServerError;
use clap::Parser;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let cli = Cli::parse();
    let config = Config::load(&cli)?;

    init_tracing(config.log_filter.as_deref());

    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        ws_path = %config.server.ws_path,
        "Starting chat relay"
    );

    // Ctrl+C flips the watch channel and the server drains
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    ctrlc::set_handler(move || {
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    })?;

    let shutdown = async move {
        let _ = shutdown_rx.changed().await;
    };

    run_server(&config.server, shutdown).await
}

fn init_tracing(directive: Option<&str>) {
    let filter = match directive {
        Some(d) => EnvFilter::new(d),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("chatrelay=info,tower_http=info")),
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
