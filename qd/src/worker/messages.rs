//! Worker messages

use queenboard::{Placement, RowRange};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::oneshot;

/// Errors from worker operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkerError {
    #[error("Worker channel closed")]
    ChannelClosed,
}

/// How a worker participates in the search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerRole {
    /// Complete depth-first enumeration of the whole board, publishing each
    /// solution as it is found; never touches the row buckets
    Exhaustive,

    /// Expands frontier states, advancing row by row while inside `rows`
    Frontier { rows: RowRange },
}

/// Commands accepted by a running worker
#[derive(Debug)]
pub enum WorkerCommand {
    /// Feed a work unit into frontier expansion
    ///
    /// Acknowledged immediately; the expansion itself proceeds afterwards.
    Process {
        row: u8,
        placements: Vec<Placement>,
        reply: oneshot::Sender<ProcessAck>,
    },

    /// Stop the worker task
    Shutdown { reply: oneshot::Sender<()> },
}

/// Immediate acknowledgement for a dispatched work unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessAck {
    Processing,
}
