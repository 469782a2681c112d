//! State store messages
//!
//! Commands and responses for the actor pattern.

use queenboard::Placement;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::oneshot;

/// Errors from state operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("State store channel closed")]
    ChannelClosed,

    #[error("Stale epoch {got}, store is at epoch {current}")]
    StaleEpoch { current: u64, got: u64 },
}

/// Response from state operations
pub type StateResponse<T> = Result<T, StateError>;

/// Point-in-time view of the store
///
/// Not atomic across fields, but never undercounts solutions recorded before
/// the request was issued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSummary {
    pub total_solutions: u64,
    pub solutions: Vec<Placement>,
    /// Number of populated row buckets
    pub cache_size: usize,
}

/// Commands sent to the state store actor
///
/// Every mutation carries the epoch of the run that issued it; the store
/// discards mutations from any other generation so a writer that survived an
/// incomplete reset cannot corrupt the current run.
#[derive(Debug)]
pub enum StateCommand {
    /// Snapshot of one row bucket (empty if absent)
    GetRow {
        row: u8,
        reply: oneshot::Sender<Vec<Placement>>,
    },

    /// Union-merge placements into a row bucket, with deduplication
    AppendRow {
        epoch: u64,
        row: u8,
        placements: Vec<Placement>,
        reply: oneshot::Sender<StateResponse<()>>,
    },

    /// Append to the solution ledger; fire-and-forget
    RecordSolution { epoch: u64, solution: Placement },

    /// Point-in-time summary
    Summary {
        reply: oneshot::Sender<StateSummary>,
    },

    /// Clear all buckets and the ledger together
    Reset { reply: oneshot::Sender<()> },

    /// Stop the actor
    Shutdown,
}
