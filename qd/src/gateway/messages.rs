//! Gateway message types
//!
//! Simple JSON-over-newline protocol. Each message is a single line of JSON
//! followed by `\n`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::coordinator::RunOutcome;
use crate::state::StateSummary;

/// Requests accepted on the gateway socket
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum GatewayRequest {
    /// Solve one board; omitted fields fall back to configured defaults
    Solve {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        n: Option<u8>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        workers: Option<usize>,
    },

    /// Daemon state and current run summary
    Status,

    /// Liveness check
    Ping,
}

/// Replies sent back on the gateway socket
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum GatewayResponse {
    /// Outcome of a completed or timed-out run
    #[serde(rename_all = "camelCase")]
    Result {
        outcome: RunOutcome,
        timestamp: DateTime<Utc>,
    },

    /// Daemon status with the current run state, when one is live
    #[serde(rename_all = "camelCase")]
    Status {
        server: String,
        status: String,
        timestamp: DateTime<Utc>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        current_state: Option<StateSummary>,
    },

    /// Pong response to ping
    Pong { version: String },

    /// Rejected or failed request
    Error {
        error: String,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        provided: Option<i64>,
    },
}
