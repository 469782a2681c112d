//! Search workers
//!
//! Each worker is a tokio task driven by a command channel. Its role -
//! exhaustive sweep or frontier expansion over an assigned row range - is
//! decided by the coordinator at spawn time, never inferred from identity.

mod messages;
mod runner;

pub use messages::{ProcessAck, WorkerCommand, WorkerError, WorkerRole};
pub use runner::{Worker, WorkerHandle, WorkerSpec};
