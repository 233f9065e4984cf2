//! Change notifications from the record store

use serde::{Deserialize, Serialize};

use super::doubt::Doubt;

/// What happened to a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A single change to the record set, as delivered by the store.
///
/// Delivery is at-least-once and only best-effort ordered, so consumers use
/// the payload to patch their copy of the record set and then rebuild from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub record: Doubt,
}

impl ChangeEvent {
    /// Create an insert event
    pub fn insert(record: Doubt) -> Self {
        Self {
            kind: ChangeKind::Insert,
            record,
        }
    }

    /// Create an update event
    pub fn update(record: Doubt) -> Self {
        Self {
            kind: ChangeKind::Update,
            record,
        }
    }

    /// Create a delete event
    pub fn delete(record: Doubt) -> Self {
        Self {
            kind: ChangeKind::Delete,
            record,
        }
    }

    /// Id of the affected record
    pub fn record_id(&self) -> &str {
        &self.record.id
    }
}
