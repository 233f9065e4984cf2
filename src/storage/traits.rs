//! Storage trait definitions and filter types.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::broadcast;

use crate::domain::{ChangeEvent, Doubt, NewDoubt};
use crate::error::Result;

/// Equality filter on a top-level record field.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Field name to filter on
    pub field: String,
    /// Value the field must equal
    pub value: serde_json::Value,
}

impl Filter {
    /// Create an equality filter.
    pub fn eq(field: impl Into<String>, value: impl Serialize) -> Self {
        Self {
            field: field.into(),
            value: serde_json::to_value(value).unwrap_or(serde_json::Value::Null),
        }
    }

    /// Check if a record matches this filter. A missing field matches null.
    pub fn matches(&self, record: &serde_json::Value) -> bool {
        match record.get(&self.field) {
            Some(v) => *v == self.value,
            None => self.value.is_null(),
        }
    }
}

/// Trait for records that have an ID field.
pub trait HasId {
    /// Get the record's unique identifier.
    fn id(&self) -> &str;
}

impl HasId for Doubt {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Collection-oriented CRUD over serializable records.
pub trait Storage: Send + Sync {
    /// Create a new record.
    fn create<T: Serialize + HasId>(&self, collection: &str, record: &T) -> Result<()>;

    /// Get a record by ID.
    fn get<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Result<Option<T>>;

    /// Replace an existing record.
    fn update<T: Serialize + HasId>(&self, collection: &str, record: &T) -> Result<()>;

    /// Delete a record by ID.
    fn delete(&self, collection: &str, id: &str) -> Result<()>;

    /// Records matching every filter.
    fn query<T: DeserializeOwned>(&self, collection: &str, filters: &[Filter]) -> Result<Vec<T>>;

    /// All records in a collection, in insertion order.
    fn list<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>> {
        self.query(collection, &[])
    }
}

/// The authoritative source of doubts, as seen by a session.
///
/// Implementations persist changes and fan them out to subscribers. The
/// session never trusts event payloads for ordering; it rebuilds from its own
/// copy of the record set after applying each one.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Current full record set, in any order.
    async fn load_all(&self) -> Result<Vec<Doubt>>;

    /// Receive every change made through this store from now on.
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;

    /// Persist a new pending doubt.
    async fn create_record(&self, fields: NewDoubt) -> Result<Doubt>;

    /// Persist an answer, flipping the doubt to answered.
    async fn resolve_record(&self, id: &str, answer: &str, resolver: &str) -> Result<Doubt>;
}

/// Several sessions can share one store and its change stream.
#[async_trait]
impl<T: RecordStore + ?Sized> RecordStore for Arc<T> {
    async fn load_all(&self) -> Result<Vec<Doubt>> {
        (**self).load_all().await
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        (**self).subscribe()
    }

    async fn create_record(&self, fields: NewDoubt) -> Result<Doubt> {
        (**self).create_record(fields).await
    }

    async fn resolve_record(&self, id: &str, answer: &str, resolver: &str) -> Result<Doubt> {
        (**self).resolve_record(id, answer, resolver).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_eq_matches() {
        let filter = Filter::eq("status", "pending");
        assert!(filter.matches(&json!({"id": "1", "status": "pending"})));
    }

    #[test]
    fn test_filter_eq_no_match() {
        let filter = Filter::eq("status", "pending");
        assert!(!filter.matches(&json!({"id": "1", "status": "answered"})));
    }

    #[test]
    fn test_filter_bool_field() {
        let filter = Filter::eq("is_priority", true);
        assert!(filter.matches(&json!({"id": "1", "is_priority": true})));
        assert!(!filter.matches(&json!({"id": "2", "is_priority": false})));
    }

    #[test]
    fn test_filter_missing_field_matches_null() {
        let filter = Filter::eq("answered_by", serde_json::Value::Null);
        assert!(filter.matches(&json!({"id": "1"})));
        assert!(!Filter::eq("answered_by", "tch").matches(&json!({"id": "1"})));
    }

    #[test]
    fn test_doubt_has_id() {
        let doubt: Doubt = serde_json::from_value(json!({"id": "dbt-1", "status": "pending"})).unwrap();
        assert_eq!(HasId::id(&doubt), "dbt-1");
    }
}
