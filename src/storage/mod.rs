//! Storage layer for doubtq.
//!
//! - `Storage`: generic collection CRUD, implemented by `JsonlStorage`
//! - `RecordStore`: the contract a session consumes (load, subscribe,
//!   create, resolve), implemented by `DoubtStore` over any `Storage`

mod doubts;
mod jsonl;
mod traits;

pub use doubts::{DOUBTS_COLLECTION, DoubtStore};
pub use jsonl::JsonlStorage;
pub use traits::{Filter, HasId, RecordStore, Storage};
