//! Gateway listener for the daemon side
//!
//! Binds the gateway socket, validates incoming requests, and dispatches
//! them to the coordinator. Connections are served concurrently so a
//! long-running solve never blocks a ping.

use std::path::PathBuf;

use chrono::Utc;
use eyre::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::coordinator::{CoordinatorHandle, RunRequest};

use super::messages::{GatewayRequest, GatewayResponse};

/// Maximum request size in bytes
const MAX_REQUEST_SIZE: usize = 1024;

/// The request gateway: validation, dispatch, and reply formatting
#[derive(Clone)]
pub struct Gateway {
    config: Config,
    coordinator: CoordinatorHandle,
}

impl Gateway {
    pub fn new(config: Config, coordinator: CoordinatorHandle) -> Self {
        Self { config, coordinator }
    }

    /// Bind the configured socket, cleaning up a stale one first
    pub fn bind(&self) -> Result<(UnixListener, PathBuf)> {
        self.bind_at(&self.config.gateway.socket_path())
    }

    /// Bind a specific socket path
    pub fn bind_at(&self, socket_path: &PathBuf) -> Result<(UnixListener, PathBuf)> {
        debug!(?socket_path, "bind: creating gateway socket");

        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create socket directory")?;
        }

        if socket_path.exists() {
            debug!(?socket_path, "bind: removing stale socket");
            std::fs::remove_file(socket_path).context("Failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("Failed to bind gateway socket")?;
        debug!(?socket_path, "bind: socket bound successfully");

        Ok((listener, socket_path.clone()))
    }

    /// Accept and serve connections until the listener fails
    pub async fn serve(self, listener: UnixListener) -> Result<()> {
        loop {
            let (stream, _addr) = listener.accept().await.context("Gateway accept failed")?;
            let gateway = self.clone();
            tokio::spawn(async move {
                if let Err(e) = gateway.handle_connection(stream).await {
                    warn!(error = %e, "gateway connection error");
                }
            });
        }
    }

    async fn handle_connection(&self, mut stream: UnixStream) -> Result<()> {
        let request = read_request(&mut stream).await?;
        let response = self.dispatch(request).await;
        send_response(&mut stream, &response).await
    }

    /// Validate and route one request, producing exactly one reply
    pub async fn dispatch(&self, request: GatewayRequest) -> GatewayResponse {
        debug!(?request, "dispatch: called");
        match request {
            GatewayRequest::Solve { n, workers } => self.handle_solve(n, workers).await,
            GatewayRequest::Status => self.handle_status().await,
            GatewayRequest::Ping => GatewayResponse::Pong {
                version: crate::VERSION.to_string(),
            },
        }
    }

    async fn handle_solve(&self, n: Option<u8>, workers: Option<usize>) -> GatewayResponse {
        let limits = &self.config.limits;
        let n = n.unwrap_or(limits.default_board_size);
        let workers = workers.unwrap_or(limits.default_workers);

        if !limits.is_valid_board_size(n) {
            return GatewayResponse::Error {
                error: "invalid board size".to_string(),
                message: format!(
                    "n must be between {} and {}",
                    limits.min_board_size, limits.max_board_size
                ),
                provided: Some(i64::from(n)),
            };
        }
        if !limits.is_valid_worker_count(workers) {
            return GatewayResponse::Error {
                error: "invalid worker count".to_string(),
                message: format!("workers must be between {} and {}", limits.min_workers, limits.max_workers),
                provided: Some(workers as i64),
            };
        }

        let delivery_timeout = self.config.gateway.delivery_timeout(n);
        info!(n, workers, timeout_ms = delivery_timeout.as_millis() as u64, "solve request accepted");

        let run = self.coordinator.run(RunRequest { n, workers });
        match tokio::time::timeout(delivery_timeout, run).await {
            Ok(Ok(outcome)) => GatewayResponse::Result {
                outcome,
                timestamp: Utc::now(),
            },
            Ok(Err(e)) => GatewayResponse::Error {
                error: "run failed".to_string(),
                message: e.to_string(),
                provided: None,
            },
            Err(_) => GatewayResponse::Error {
                error: "delivery timeout".to_string(),
                message: format!("no reply within {} ms", delivery_timeout.as_millis()),
                provided: None,
            },
        }
    }

    async fn handle_status(&self) -> GatewayResponse {
        let current_state = match self.coordinator.summary().await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(error = %e, "coordinator unreachable for status");
                None
            }
        };
        GatewayResponse::Status {
            server: "queendaemon".to_string(),
            status: "running".to_string(),
            timestamp: Utc::now(),
            current_state,
        }
    }
}

/// Read one request line from the stream
pub async fn read_request(stream: &mut UnixStream) -> Result<GatewayRequest> {
    let mut reader = BufReader::new(stream);
    let mut line = String::new();

    let bytes_read = reader.read_line(&mut line).await.context("Failed to read gateway request")?;

    if bytes_read > MAX_REQUEST_SIZE {
        return Err(eyre::eyre!("Request too large: {} bytes", bytes_read));
    }
    if line.is_empty() {
        return Err(eyre::eyre!("Empty request received"));
    }

    let request: GatewayRequest = serde_json::from_str(line.trim()).context("Failed to parse gateway request")?;
    debug!(?request, "read_request: parsed request");

    Ok(request)
}

/// Send a response on the stream
pub async fn send_response(stream: &mut UnixStream, response: &GatewayResponse) -> Result<()> {
    let response_json = serde_json::to_string(response).context("Failed to serialize response")?;
    stream
        .write_all(response_json.as_bytes())
        .await
        .context("Failed to write response")?;
    stream.write_all(b"\n").await.context("Failed to write newline")?;
    stream.flush().await.context("Failed to flush response")?;
    debug!("send_response: sent response");
    Ok(())
}

/// Remove the socket file on shutdown
pub fn cleanup_socket(socket_path: &PathBuf) {
    if socket_path.exists() {
        debug!(?socket_path, "cleanup_socket: removing socket file");
        if let Err(e) = std::fs::remove_file(socket_path) {
            warn!(?socket_path, error = %e, "Failed to remove socket file");
        }
    }
}
