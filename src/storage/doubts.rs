//! Doubt-specific storage: the record store adapter over any `Storage`.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::broadcast;

use super::traits::{Filter, RecordStore, Storage};
use crate::domain::{ChangeEvent, Doubt, DoubtStatus, NewDoubt};
use crate::error::{DoubtqError, Result};

/// Collection name for doubts.
pub const DOUBTS_COLLECTION: &str = "doubts";

/// Capacity of the change broadcast; slower subscribers see `Lagged`.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Persists doubts and broadcasts every change made through it.
///
/// Writes are serialized, so a read-check-write such as `resolve` is atomic
/// with respect to every other write through the same store.
pub struct DoubtStore<S: Storage> {
    storage: S,
    event_tx: broadcast::Sender<ChangeEvent>,
    write_lock: Mutex<()>,
}

impl<S: Storage> DoubtStore<S> {
    /// Create a new DoubtStore wrapping the given storage.
    pub fn new(storage: S) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            storage,
            event_tx,
            write_lock: Mutex::new(()),
        }
    }

    /// Underlying storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn lock_writes(&self) -> Result<MutexGuard<'_, ()>> {
        self.write_lock.lock().map_err(|e| DoubtqError::Storage(e.to_string()))
    }

    fn broadcast(&self, event: ChangeEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }

    /// Every doubt that deserializes; malformed records are skipped.
    pub fn list_all(&self) -> Result<Vec<Doubt>> {
        let raw: Vec<Value> = self.storage.list(DOUBTS_COLLECTION)?;
        Ok(decode_lenient(raw))
    }

    /// Find all doubts with a specific status.
    pub fn find_by_status(&self, status: DoubtStatus) -> Result<Vec<Doubt>> {
        let raw: Vec<Value> = self
            .storage
            .query(DOUBTS_COLLECTION, &[Filter::eq("status", status)])?;
        Ok(decode_lenient(raw))
    }

    /// Find all pending doubts.
    pub fn find_pending(&self) -> Result<Vec<Doubt>> {
        self.find_by_status(DoubtStatus::Pending)
    }

    /// Find all doubts asked by one student.
    pub fn find_by_student(&self, student_id: &str) -> Result<Vec<Doubt>> {
        let raw: Vec<Value> = self
            .storage
            .query(DOUBTS_COLLECTION, &[Filter::eq("student_id", student_id)])?;
        Ok(decode_lenient(raw))
    }

    /// Get a doubt by ID.
    pub fn get(&self, id: &str) -> Result<Option<Doubt>> {
        self.storage.get(DOUBTS_COLLECTION, id)
    }

    /// Persist a new doubt and announce it.
    pub fn create(&self, fields: NewDoubt) -> Result<Doubt> {
        let doubt = Doubt::from_new(fields);
        let _guard = self.lock_writes()?;
        self.storage.create(DOUBTS_COLLECTION, &doubt)?;
        log::info!("Created doubt {} ({})", doubt.id, doubt.tier());
        self.broadcast(ChangeEvent::insert(doubt.clone()));
        Ok(doubt)
    }

    /// Record an answer and announce the update.
    pub fn resolve(&self, id: &str, answer: &str, resolver: &str) -> Result<Doubt> {
        let _guard = self.lock_writes()?;
        let mut doubt = self.get(id)?.ok_or_else(|| DoubtqError::NotFound(id.to_string()))?;
        if doubt.status.is_terminal() {
            return Err(DoubtqError::InvalidState(format!("doubt {} is already answered", id)));
        }

        doubt.resolve(answer, resolver, Utc::now());
        self.storage.update(DOUBTS_COLLECTION, &doubt)?;
        log::info!("Resolved doubt {} by {}", doubt.id, resolver);
        self.broadcast(ChangeEvent::update(doubt.clone()));
        Ok(doubt)
    }

    /// Remove a doubt entirely and announce the deletion.
    pub fn delete(&self, id: &str) -> Result<Doubt> {
        let _guard = self.lock_writes()?;
        let doubt = self.get(id)?.ok_or_else(|| DoubtqError::NotFound(id.to_string()))?;
        self.storage.delete(DOUBTS_COLLECTION, id)?;
        log::info!("Deleted doubt {}", id);
        self.broadcast(ChangeEvent::delete(doubt.clone()));
        Ok(doubt)
    }
}

fn decode_lenient(raw: Vec<Value>) -> Vec<Doubt> {
    raw.into_iter()
        .filter_map(|value| match serde_json::from_value::<Doubt>(value) {
            Ok(doubt) => Some(doubt),
            Err(e) => {
                log::warn!("Skipping malformed doubt record: {}", e);
                None
            }
        })
        .collect()
}

#[async_trait]
impl<S: Storage> RecordStore for DoubtStore<S> {
    async fn load_all(&self) -> Result<Vec<Doubt>> {
        self.list_all()
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.event_tx.subscribe()
    }

    async fn create_record(&self, fields: NewDoubt) -> Result<Doubt> {
        self.create(fields)
    }

    async fn resolve_record(&self, id: &str, answer: &str, resolver: &str) -> Result<Doubt> {
        self.resolve(id, answer, resolver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChangeKind, Identity};
    use crate::storage::JsonlStorage;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_store() -> (DoubtStore<JsonlStorage>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = JsonlStorage::new(temp_dir.path()).unwrap();
        (DoubtStore::new(storage), temp_dir)
    }

    fn ask(title: &str, is_priority: bool, student: &str) -> NewDoubt {
        NewDoubt::new(title, "", is_priority, Identity::new(student))
    }

    #[test]
    fn test_create_and_get() {
        let (store, _temp) = create_test_store();
        let doubt = store.create(ask("Traits?", false, "stu-1")).unwrap();

        let retrieved = store.get(&doubt.id).unwrap();
        assert_eq!(retrieved, Some(doubt));
    }

    #[test]
    fn test_find_by_status() {
        let (store, _temp) = create_test_store();
        let first = store.create(ask("one", false, "stu-1")).unwrap();
        store.create(ask("two", true, "stu-2")).unwrap();
        store.resolve(&first.id, "done", "tch-1").unwrap();

        assert_eq!(store.find_pending().unwrap().len(), 1);
        assert_eq!(store.find_by_status(DoubtStatus::Answered).unwrap().len(), 1);
    }

    #[test]
    fn test_racing_resolves_have_one_winner() {
        let (store, _temp) = create_test_store();
        let doubt = store.create(ask("q", true, "stu-1")).unwrap();

        let results: Vec<(String, Result<Doubt>)> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let store = &store;
                    let id = doubt.id.as_str();
                    scope.spawn(move || {
                        let teacher = format!("tch-{}", i);
                        let result = store.resolve(id, "answer", &teacher);
                        (teacher, result)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let winners: Vec<&String> = results.iter().filter(|(_, r)| r.is_ok()).map(|(t, _)| t).collect();
        assert_eq!(winners.len(), 1);
        assert!(
            results
                .iter()
                .filter(|(_, r)| r.is_err())
                .all(|(_, r)| matches!(r, Err(DoubtqError::InvalidState(_))))
        );

        let stored = store.get(&doubt.id).unwrap().unwrap();
        assert_eq!(stored.answered_by.as_deref(), Some(winners[0].as_str()));
    }

    #[test]
    fn test_find_by_student() {
        let (store, _temp) = create_test_store();
        store.create(ask("one", false, "stu-1")).unwrap();
        store.create(ask("two", false, "stu-2")).unwrap();
        store.create(ask("three", true, "stu-1")).unwrap();

        let mine = store.find_by_student("stu-1").unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|d| d.student_id.as_deref() == Some("stu-1")));
    }

    #[test]
    fn test_resolve_sets_answer() {
        let (store, _temp) = create_test_store();
        let doubt = store.create(ask("q", false, "stu-1")).unwrap();

        let resolved = store.resolve(&doubt.id, "Use Rc", "tch-1").unwrap();
        assert_eq!(resolved.status, DoubtStatus::Answered);
        assert_eq!(resolved.answer.as_deref(), Some("Use Rc"));
        assert_eq!(resolved.answered_by.as_deref(), Some("tch-1"));
        assert!(resolved.answered_at.is_some());
        assert_eq!(store.get(&doubt.id).unwrap(), Some(resolved));
    }

    #[test]
    fn test_resolve_twice_is_invalid_state() {
        let (store, _temp) = create_test_store();
        let doubt = store.create(ask("q", false, "stu-1")).unwrap();
        store.resolve(&doubt.id, "a", "tch-1").unwrap();

        let result = store.resolve(&doubt.id, "b", "tch-2");
        assert!(matches!(result, Err(DoubtqError::InvalidState(_))));
    }

    #[test]
    fn test_resolve_missing_is_not_found() {
        let (store, _temp) = create_test_store();
        let result = store.resolve("dbt-missing", "a", "tch-1");
        assert!(matches!(result, Err(DoubtqError::NotFound(_))));
    }

    #[test]
    fn test_malformed_record_skipped() {
        let (store, _temp) = create_test_store();
        store.create(ask("good", false, "stu-1")).unwrap();

        // A record with no id and an unknown status cannot become a Doubt
        let path = store.storage().collection_path(DOUBTS_COLLECTION);
        let mut content = fs::read_to_string(&path).unwrap();
        content.push_str("{\"title\":\"orphan\",\"status\":\"lost\"}\n");
        fs::write(&path, content).unwrap();

        let reopened = DoubtStore::new(JsonlStorage::new(store.storage().base_path()).unwrap());
        let all = reopened.list_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "good");
    }

    #[tokio::test]
    async fn test_changes_are_broadcast() {
        let (store, _temp) = create_test_store();
        let mut rx = store.subscribe();

        let doubt = store.create_record(ask("q", true, "stu-1")).await.unwrap();
        store.resolve_record(&doubt.id, "a", "tch-1").await.unwrap();
        store.delete(&doubt.id).unwrap();

        let kinds: Vec<ChangeKind> = (0..3).map(|_| rx.try_recv().unwrap().kind).collect();
        assert_eq!(kinds, vec![ChangeKind::Insert, ChangeKind::Update, ChangeKind::Delete]);
    }

    #[tokio::test]
    async fn test_failed_resolve_broadcasts_nothing() {
        let (store, _temp) = create_test_store();
        let mut rx = store.subscribe();

        assert!(store.resolve_record("dbt-missing", "a", "tch-1").await.is_err());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_load_all_returns_everything() {
        let (store, _temp) = create_test_store();
        store.create_record(ask("a", false, "s")).await.unwrap();
        store.create_record(ask("b", true, "s")).await.unwrap();
        assert_eq!(store.load_all().await.unwrap().len(), 2);
    }
}
