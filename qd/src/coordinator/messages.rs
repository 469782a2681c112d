//! Coordinator messages and run outcomes

use queenboard::Placement;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::state::StateSummary;

/// A request to solve one board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    pub n: u8,
    pub workers: usize,
}

/// Why the monitor declared a run finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    SolutionsFound,
    IterationCap,
    TimeLimit,
}

impl std::fmt::Display for CompletionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SolutionsFound => write!(f, "solutions found"),
            Self::IterationCap => write!(f, "iteration cap reached"),
            Self::TimeLimit => write!(f, "time limit exceeded"),
        }
    }
}

/// Terminal status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Completed,
    Timeout,
}

/// Reply to the caller of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub n: u8,
    pub total_solutions: u64,
    pub solutions: Vec<Placement>,
    pub elapsed_time_ms: u64,
    pub workers_deployed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<CompletionReason>,
}

/// Run failures surfaced to the caller
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordError {
    #[error("Deployment failed: {0}")]
    Deploy(String),

    #[error("Coordinator channel closed")]
    ChannelClosed,
}

/// Internal requests to the coordinator task
#[derive(Debug)]
pub enum CoordCommand {
    /// Execute a full run and reply with its outcome
    Run {
        request: RunRequest,
        reply: oneshot::Sender<Result<RunOutcome, CoordError>>,
    },

    /// Summary of the current run's store, if one is live
    Summary {
        reply: oneshot::Sender<Option<StateSummary>>,
    },

    /// Stop the coordinator, retiring any live components
    Shutdown,
}
