//! doubtq - two-tier doubt queue for classroom question resolution
//!
//! Students submit doubts, teachers resolve them. Pending doubts are split
//! into a priority tier, ordered by rank, and a general tier, ordered by age;
//! the priority tier is always served first.

pub mod domain;
pub mod error;
pub mod id;
pub mod queue;
pub mod scheduler;
pub mod session;
pub mod storage;

pub use error::{DoubtqError, Result};
pub use session::DoubtSession;
