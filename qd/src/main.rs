//! queendaemon CLI entry point

use clap::Parser;
use eyre::{Context, Result};
use tracing::info;

use queendaemon::cli::{Cli, Command};
use queendaemon::config::Config;
use queendaemon::coordinator::Coordinator;
use queendaemon::gateway::{Gateway, GatewayClient, GatewayRequest, cleanup_socket};

fn setup_logging(cli_log_level: Option<&str>) -> Result<()> {
    let level = match cli_log_level.map(str::to_uppercase).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("INFO") | None => tracing::Level::INFO,
        Some("WARN") | Some("WARNING") => tracing::Level::WARN,
        Some("ERROR") => tracing::Level::ERROR,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{other}', defaulting to INFO");
            tracing::Level::INFO
        }
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    match cli.command {
        Command::Serve => cmd_serve(config).await,
        Command::Solve { n, workers } => cmd_solve(config, n, workers).await,
        Command::Status => cmd_status(config).await,
        Command::Ping => cmd_ping(config).await,
    }
}

/// Run the coordinator and gateway listener in the foreground
async fn cmd_serve(config: Config) -> Result<()> {
    let coordinator = Coordinator::spawn(config.monitor.clone(), config.worker.clone());
    let gateway = Gateway::new(config, coordinator.clone());
    let (listener, socket_path) = gateway.bind()?;
    info!(socket = %socket_path.display(), "gateway listening");

    let result = tokio::select! {
        result = gateway.serve(listener) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            Ok(())
        }
    };

    cleanup_socket(&socket_path);
    if let Err(e) = coordinator.shutdown().await {
        tracing::warn!(error = %e, "coordinator did not accept shutdown");
    }
    result
}

/// Submit a solve request, preferring a running daemon
async fn cmd_solve(config: Config, n: Option<u8>, workers: Option<usize>) -> Result<()> {
    let client = GatewayClient::new(config.gateway.socket_path());

    let response = if client.socket_exists() {
        let board = n.unwrap_or(config.limits.default_board_size);
        // margin on top of the daemon's own delivery timeout
        let reply_timeout = config.gateway.delivery_timeout(board) + std::time::Duration::from_secs(5);
        client.solve(n, workers, reply_timeout).await?
    } else {
        info!("no daemon socket, running in-process");
        let coordinator = Coordinator::spawn(config.monitor.clone(), config.worker.clone());
        let gateway = Gateway::new(config, coordinator.clone());
        let response = gateway.dispatch(GatewayRequest::Solve { n, workers }).await;
        let _ = coordinator.shutdown().await;
        response
    };

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

/// Show daemon status and the current run state
async fn cmd_status(config: Config) -> Result<()> {
    let client = GatewayClient::new(config.gateway.socket_path());
    if !client.socket_exists() {
        eyre::bail!("daemon is not running (no socket at {})", config.gateway.socket_path().display());
    }

    let response = client.status().await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

/// Check the daemon is alive
async fn cmd_ping(config: Config) -> Result<()> {
    let client = GatewayClient::new(config.gateway.socket_path());
    if !client.socket_exists() {
        eyre::bail!("daemon is not running (no socket at {})", config.gateway.socket_path().display());
    }

    let version = client.ping().await?;
    println!("queendaemon {version}");
    Ok(())
}
