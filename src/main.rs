use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use scale_bridge::config::{ConfigLoader, LogFormat, LoggingConfig};
use scale_bridge::rest_api::{build_router, RestContext};
use scale_bridge::{AppResult, ScaleService, SerialConnector};

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    version,
    about = "Bridges a serial-port postal scale to browser clients over local HTTP.",
    long_about = "Owns the scale's serial port and exposes /read, /get_settings and /update_settings on a local HTTP listener so web pages can read weights without direct hardware access."
)]
struct Args {
    /// Serial port the scale is attached to (e.g. /dev/ttyUSB0 or COM3).
    port: Option<String>,

    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind the HTTP server to.
    #[arg(long)]
    host: Option<String>,

    /// Port for the HTTP server.
    #[arg(short = 'l', long)]
    listen_port: Option<u16>,
}

// --- Main Application Entry Point ---
#[tokio::main]
async fn main() -> AppResult<()> {
    let args = Args::parse();

    let mut config = ConfigLoader::load(args.config.as_deref())?.into_config();
    if let Some(port) = args.port {
        config.scale.port = Some(port);
    }
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(listen_port) = args.listen_port {
        config.server.port = listen_port;
    }

    init_tracing(&config.logging);

    let service = ScaleService::new(Arc::new(SerialConnector), config.scale.clone());
    if config.scale.port.is_some() {
        let result = service.connect();
        match result.connection_error {
            None => info!(port = ?config.scale.port, "Scale connected"),
            Some(e) => warn!(error = %e, "Scale not connected at startup; use /update_settings"),
        }
    }

    let app = build_router(RestContext::new(service.clone()));
    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    info!("Scale bridge listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    service.shutdown();
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}

// --- Graceful Shutdown Handler ---
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Signal received, starting graceful shutdown...");
}
