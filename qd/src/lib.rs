//! queendaemon - message-driven N-queens coordination service
//!
//! A coordinator, a shared state store, and a fleet of search workers
//! cooperate exclusively through asynchronous messages to find solutions to
//! the N-queens placement problem.
//!
//! # Core Concepts
//!
//! - **One synchronization boundary**: all shared state lives behind the
//!   state store's command channel; workers never share memory
//! - **Roles over identity**: the coordinator assigns each worker an explicit
//!   role (exhaustive sweep or frontier range) at spawn time
//! - **Epoch-guarded runs**: every mutation carries its run's generation, so
//!   a writer that survived an incomplete reset cannot corrupt the next run
//! - **One reply per request**: completion policy or hard backstop, whichever
//!   fires first - never both, never neither
//!
//! # Modules
//!
//! - [`config`] - bounds, cadences, timeouts, socket location
//! - [`state`] - the state store actor (frontier buckets + solution ledger)
//! - [`worker`] - search workers
//! - [`coordinator`] - run lifecycle: reset, deploy, monitor, reply
//! - [`gateway`] - the process boundary (JSON over a Unix socket)
//! - [`cli`] - command-line interface

pub mod cli;
pub mod config;
pub mod coordinator;
pub mod gateway;
pub mod state;
pub mod worker;

/// Crate version reported by ping
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Re-export commonly used types
pub use config::{Config, GatewayConfig, LimitsConfig, MonitorConfig, WorkerConfig};
pub use coordinator::{CompletionReason, CoordError, Coordinator, CoordinatorHandle, RunOutcome, RunRequest, RunStatus};
pub use gateway::{Gateway, GatewayClient, GatewayRequest, GatewayResponse};
pub use state::{SolutionNotice, StateError, StateResponse, StateStore, StateSummary};
pub use worker::{ProcessAck, Worker, WorkerHandle, WorkerRole, WorkerSpec};
