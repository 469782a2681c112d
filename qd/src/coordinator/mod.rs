//! Run coordinator
//!
//! Owns the lifecycle of every run: retire the previous run's components,
//! deploy a fresh state store and worker fleet, monitor progress on a fixed
//! interval, and reply to the caller exactly once - by completion policy or
//! by the hard backstop, whichever fires first.

mod core;
mod messages;

pub use core::{Coordinator, CoordinatorHandle};
pub use messages::{CompletionReason, CoordCommand, CoordError, RunOutcome, RunRequest, RunStatus};
