#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::mpsc;
use tracing::{info, warn, Level as TraceLevel};
use tracing_subscriber::FmtSubscriber;

use panel_config::host::service::{self, HostEvent, HostService};
use panel_config::host::{default_socket_path, HostServer};

/// Privileged host daemon for the control panel's persisted configuration
#[derive(Parser, Debug)]
#[command(name = "panel-hostd", version, about)]
struct Args {
    /// Config document path (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Unix socket to listen on (defaults to the user runtime directory)
    #[arg(long)]
    socket: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Parse log level from environment variable
    let log_level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let config_path = args.config.unwrap_or_else(service::default_config_path);
    let socket_path = match args.socket {
        Some(path) => path,
        None => default_socket_path()?,
    };
    info!(
        config = %config_path.display(),
        socket = %socket_path.display(),
        "Starting host daemon"
    );

    let server = HostServer::bind_to(socket_path)?;
    let (event_tx, event_rx) = mpsc::channel();
    let listener = service::spawn_listener(server, HostService::new(config_path, event_tx));

    // No window is attached in this build; chrome signals are only logged
    loop {
        match event_rx.recv() {
            Ok(HostEvent::CloseRequested) => info!("Panel requested window close"),
            Ok(HostEvent::MinimizeRequested) => info!("Panel requested window minimize"),
            Ok(HostEvent::Shutdown) => {
                info!("Shutting down");
                break;
            }
            Err(_) => {
                warn!("Service listener stopped unexpectedly");
                break;
            }
        }
    }

    let _ = listener.join();
    Ok(())
}
