//! Domain types for doubtq
//!
//! - Doubt: the record submitted by a student, with status and resolution
//! - ChangeEvent: insert/update/delete notifications from the record store

pub mod doubt;
pub mod event;

pub use doubt::{DEFAULT_GENERAL_RANK, DEFAULT_PRIORITY_RANK, Doubt, DoubtStatus, Identity, NewDoubt, Ranks, Tier};
pub use event::{ChangeEvent, ChangeKind};
