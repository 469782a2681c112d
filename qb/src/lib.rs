//! Board domain for the N-queens coordination service
//!
//! Pure, synchronous building blocks shared by every search path:
//!
//! - [`Placement`] - an immutable partial assignment of queens to rows
//! - [`is_safe`] - the single conflict predicate (column + diagonal)
//! - [`Solutions`] - exhaustive depth-first enumeration of full solutions
//! - [`partition_rows`] - contiguous row ranges for worker deployment
//!
//! Nothing here knows about channels, actors, or the coordination protocol;
//! the daemon crate builds those on top.

pub mod partition;
pub mod placement;
pub mod solve;

pub use partition::{RowRange, partition_rows};
pub use placement::{Placement, is_safe};
pub use solve::Solutions;
