//! scannerd daemon - OTP session server for the scanning engine.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use scannerd::{Config, Daemon, Registry};

#[derive(Parser)]
#[command(name = "scannerd", about = "OTP session server for the scanning engine")]
struct Cli {
    /// Path to config file. If omitted, uses defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address. Overrides config file if specified.
    #[arg(long)]
    address: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = match cli.config {
        Some(ref path) => Config::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => Config::default(),
    };

    // CLI overrides
    if let Some(address) = cli.address {
        config.listener.address = address;
    }

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // The plugin indexer is a separate component; until one populates the
    // registry, sessions still speak the full protocol over an empty one.
    let daemon = Daemon::new(config, Registry::new());

    let address = daemon.address().to_string();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind: {address}"))?;

    info!(
        address = %address,
        feed_dir = %daemon.config().feed.dir.display(),
        "scannerd started"
    );

    let serve_handle = {
        let daemon = daemon.clone();
        tokio::spawn(async move {
            if let Err(e) = daemon.listen(listener).await {
                error!(error = %e, "OTP server error");
            }
        })
    };

    // Wait for shutdown signal
    let shutdown = async {
        let ctrl_c = signal::ctrl_c();
        #[cfg(unix)]
        {
            let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("Failed to register SIGTERM handler");
            tokio::select! {
                _ = ctrl_c => info!("Received SIGINT"),
                _ = sigterm.recv() => info!("Received SIGTERM"),
            }
        }
        #[cfg(not(unix))]
        {
            ctrl_c.await.expect("Failed to wait for Ctrl+C");
            info!("Received SIGINT");
        }
    };

    shutdown.await;

    serve_handle.abort();

    Ok(())
}
