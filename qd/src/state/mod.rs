//! Shared run state: frontier buckets and the solution ledger
//!
//! The state store runs as an actor. All access goes through the cloneable
//! [`StateStore`] handle, whose command channel is the only synchronization
//! boundary in the system: workers never touch shared memory directly.

mod messages;
mod store;

pub use messages::{StateCommand, StateError, StateResponse, StateSummary};
pub use store::{SolutionNotice, StateStore};
