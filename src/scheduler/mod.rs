//! Scheduler module for doubt ordering.
//!
//! This module provides:
//! - **Projection**: rebuilds both tier queues from the full record set.
//! - **Scheduler**: answers "what next" with absolute priority-tier precedence.
//! - **Stats**: aggregate counts for dashboards.
//!
//! # Architecture
//!
//! 1. The session hands the scheduler the full record set after every change
//! 2. The projector filters to pending, sorts oldest first and classifies
//! 3. `next()` reads the priority head, falling back to the general head
//! 4. A confirmed resolution drops the head of the resolved doubt's tier
//!
//! # Example
//!
//! ```ignore
//! use doubtq::scheduler::Scheduler;
//!
//! let scheduler = Scheduler::from_records(&records);
//! if let Some(doubt) = scheduler.next() {
//!     println!("next up: {}", doubt.title);
//! }
//! ```

mod projector;
mod select;
mod stats;

pub use projector::{Projection, fifo_order, pending_in_fifo_order, project};
pub use select::Scheduler;
pub use stats::QueueStats;
