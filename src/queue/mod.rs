//! Queue primitives backing the scheduler.
//!
//! - **OrderedQueue**: plain FIFO; the general tier.
//! - **PriorityQueue**: kept sorted by rank (lower first) with stable
//!   insertion among equal ranks; the priority tier.
//!
//! Empty queues answer `None` rather than failing. Both are rebuilt from
//! scratch on every projection, so neither needs removal by id.

mod ordered;
mod priority;

pub use ordered::OrderedQueue;
pub use priority::{PriorityEntry, PriorityQueue};
