//! Gateway client for the CLI side
//!
//! Connects to the daemon's gateway socket, sends one request, and reads the
//! single reply.

use std::path::PathBuf;
use std::time::Duration;

use eyre::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tracing::debug;

use super::messages::{GatewayRequest, GatewayResponse};

/// Default timeout for short gateway operations
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Maximum response size in bytes; a summary can carry a full solution list
const MAX_RESPONSE_SIZE: usize = 1024 * 1024;

/// Client for talking to the daemon over the gateway socket
#[derive(Debug, Clone)]
pub struct GatewayClient {
    socket_path: PathBuf,
    timeout: Duration,
}

impl GatewayClient {
    pub fn new(socket_path: PathBuf) -> Self {
        Self {
            socket_path,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set a custom timeout for short operations
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check if the daemon socket exists
    pub fn socket_exists(&self) -> bool {
        self.socket_path.exists()
    }

    /// Check the daemon is alive and get its version
    pub async fn ping(&self) -> Result<String> {
        debug!("GatewayClient: pinging daemon");
        let response = self.send_request(GatewayRequest::Ping, self.timeout).await?;
        match response {
            GatewayResponse::Pong { version } => Ok(version),
            GatewayResponse::Error { message, .. } => Err(eyre::eyre!("Daemon error: {}", message)),
            _ => Err(eyre::eyre!("Unexpected response")),
        }
    }

    /// Fetch daemon status and the current run state
    pub async fn status(&self) -> Result<GatewayResponse> {
        debug!("GatewayClient: requesting status");
        self.send_request(GatewayRequest::Status, self.timeout).await
    }

    /// Submit a solve request
    ///
    /// `reply_timeout` must cover the run's delivery timeout; the daemon
    /// holds the connection open until the run replies.
    pub async fn solve(&self, n: Option<u8>, workers: Option<usize>, reply_timeout: Duration) -> Result<GatewayResponse> {
        debug!(?n, ?workers, "GatewayClient: submitting solve request");
        self.send_request(GatewayRequest::Solve { n, workers }, reply_timeout).await
    }

    async fn send_request(&self, request: GatewayRequest, reply_timeout: Duration) -> Result<GatewayResponse> {
        debug!(?self.socket_path, ?request, "GatewayClient: sending request");

        let mut stream = tokio::time::timeout(self.timeout, UnixStream::connect(&self.socket_path))
            .await
            .context("Connection timeout")?
            .context("Failed to connect to gateway socket")?;

        let request_json = serde_json::to_string(&request).context("Failed to serialize request")?;

        tokio::time::timeout(self.timeout, async {
            stream
                .write_all(request_json.as_bytes())
                .await
                .context("Failed to write request")?;
            stream.write_all(b"\n").await.context("Failed to write newline")?;
            stream.flush().await.context("Failed to flush stream")?;
            Ok::<_, eyre::Error>(())
        })
        .await
        .context("Write timeout")??;

        let mut reader = BufReader::new(&mut stream);
        let mut response_line = String::new();

        tokio::time::timeout(reply_timeout, async {
            let bytes_read = reader
                .read_line(&mut response_line)
                .await
                .context("Failed to read response")?;

            if bytes_read > MAX_RESPONSE_SIZE {
                return Err(eyre::eyre!("Response too large: {} bytes", bytes_read));
            }
            Ok::<_, eyre::Error>(())
        })
        .await
        .context("Read timeout")??;

        let response: GatewayResponse =
            serde_json::from_str(response_line.trim()).context("Failed to parse gateway response")?;

        debug!(?response, "GatewayClient: received response");
        Ok(response)
    }
}
