//! JSONL-based storage implementation with in-memory caching.
//!
//! One file per collection, one JSON object per line. Creates append; updates
//! and deletes write the whole collection to a temporary file beside it and
//! rename it into place, so a failed rewrite leaves the old file intact.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tempfile::NamedTempFile;

use super::traits::{Filter, HasId, Storage};
use crate::error::{DoubtqError, Result};

type Cache = HashMap<String, Vec<Value>>;

/// JSONL-based storage with in-memory caching.
pub struct JsonlStorage {
    base_path: PathBuf,
    cache: RwLock<Cache>,
}

impl std::fmt::Debug for JsonlStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonlStorage")
            .field("base_path", &self.base_path)
            .finish_non_exhaustive()
    }
}

impl JsonlStorage {
    /// Open (creating if needed) a storage directory.
    pub fn new(base_path: impl AsRef<Path>) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;
        Ok(Self {
            base_path,
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// Directory holding the collection files.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// File backing a collection.
    pub fn collection_path(&self, collection: &str) -> PathBuf {
        self.base_path.join(format!("{}.jsonl", collection))
    }

    fn read_cache(&self) -> Result<RwLockReadGuard<'_, Cache>> {
        self.cache.read().map_err(|e| DoubtqError::Storage(e.to_string()))
    }

    fn write_cache(&self) -> Result<RwLockWriteGuard<'_, Cache>> {
        self.cache.write().map_err(|e| DoubtqError::Storage(e.to_string()))
    }

    /// Load a collection into cache if not already loaded.
    ///
    /// Lines that are not valid JSON are skipped with a warning so that one
    /// corrupt line cannot hide the rest of the collection.
    fn ensure_loaded(&self, collection: &str) -> Result<()> {
        if self.read_cache()?.contains_key(collection) {
            return Ok(());
        }

        let mut cache = self.write_cache()?;
        if cache.contains_key(collection) {
            return Ok(());
        }

        let path = self.collection_path(collection);
        let mut records = Vec::new();
        if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            for (lineno, line) in reader.lines().enumerate() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<Value>(&line) {
                    Ok(record) => records.push(record),
                    Err(e) => log::warn!("Skipping {}:{}: {}", path.display(), lineno + 1, e),
                }
            }
        }

        log::debug!("Loaded {} records from {}", records.len(), path.display());
        cache.insert(collection.to_string(), records);
        Ok(())
    }

    fn append_to_file(&self, collection: &str, record: &Value) -> Result<()> {
        let path = self.collection_path(collection);
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(file, "{}", serde_json::to_string(record)?)?;
        Ok(())
    }

    fn rewrite_file(&self, collection: &str, records: &[Value]) -> Result<()> {
        let path = self.collection_path(collection);
        let mut tmp = NamedTempFile::new_in(&self.base_path)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            for record in records {
                writeln!(writer, "{}", serde_json::to_string(record)?)?;
            }
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| DoubtqError::Io(e.error))?;
        Ok(())
    }

    fn not_loaded(collection: &str) -> DoubtqError {
        DoubtqError::Storage(format!("Collection not loaded: {}", collection))
    }
}

fn record_id(record: &Value) -> Option<&str> {
    record.get("id").and_then(|v| v.as_str())
}

impl Storage for JsonlStorage {
    fn create<T: Serialize + HasId>(&self, collection: &str, record: &T) -> Result<()> {
        self.ensure_loaded(collection)?;
        let value = serde_json::to_value(record)?;

        let mut cache = self.write_cache()?;
        let records = cache.get_mut(collection).ok_or_else(|| Self::not_loaded(collection))?;
        if records.iter().any(|r| record_id(r) == Some(record.id())) {
            return Err(DoubtqError::Storage(format!("Duplicate id in {}: {}", collection, record.id())));
        }

        // File first; the cache only reflects what made it to disk
        self.append_to_file(collection, &value)?;
        records.push(value);
        Ok(())
    }

    fn get<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Result<Option<T>> {
        self.ensure_loaded(collection)?;

        let cache = self.read_cache()?;
        let records = cache.get(collection).ok_or_else(|| Self::not_loaded(collection))?;
        match records.iter().find(|r| record_id(r) == Some(id)) {
            Some(record) => Ok(Some(serde_json::from_value(record.clone())?)),
            None => Ok(None),
        }
    }

    fn update<T: Serialize + HasId>(&self, collection: &str, record: &T) -> Result<()> {
        self.ensure_loaded(collection)?;
        let value = serde_json::to_value(record)?;

        let mut cache = self.write_cache()?;
        let records = cache.get_mut(collection).ok_or_else(|| Self::not_loaded(collection))?;
        let slot = records
            .iter_mut()
            .find(|r| record_id(r) == Some(record.id()))
            .ok_or_else(|| DoubtqError::NotFound(record.id().to_string()))?;

        let previous = std::mem::replace(slot, value);
        if let Err(e) = self.rewrite_file(collection, records) {
            // Keep the cache in step with the file we failed to write
            if let Some(slot) = records.iter_mut().find(|r| record_id(r) == Some(record.id())) {
                *slot = previous;
            }
            return Err(e);
        }
        Ok(())
    }

    fn delete(&self, collection: &str, id: &str) -> Result<()> {
        self.ensure_loaded(collection)?;

        let mut cache = self.write_cache()?;
        let records = cache.get_mut(collection).ok_or_else(|| Self::not_loaded(collection))?;
        let index = records
            .iter()
            .position(|r| record_id(r) == Some(id))
            .ok_or_else(|| DoubtqError::NotFound(id.to_string()))?;

        let removed = records.remove(index);
        if let Err(e) = self.rewrite_file(collection, records) {
            records.insert(index, removed);
            return Err(e);
        }
        Ok(())
    }

    fn query<T: DeserializeOwned>(&self, collection: &str, filters: &[Filter]) -> Result<Vec<T>> {
        self.ensure_loaded(collection)?;

        let cache = self.read_cache()?;
        let records = cache.get(collection).ok_or_else(|| Self::not_loaded(collection))?;
        records
            .iter()
            .filter(|r| filters.iter().all(|f| f.matches(r)))
            .map(|r| serde_json::from_value(r.clone()).map_err(DoubtqError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Note {
        id: String,
        body: String,
        status: String,
    }

    impl HasId for Note {
        fn id(&self) -> &str {
            &self.id
        }
    }

    fn note(id: &str, status: &str) -> Note {
        Note {
            id: id.to_string(),
            body: format!("body of {}", id),
            status: status.to_string(),
        }
    }

    fn create_test_storage() -> (JsonlStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = JsonlStorage::new(temp_dir.path()).unwrap();
        (storage, temp_dir)
    }

    #[test]
    fn test_create_and_get() {
        let (storage, _temp) = create_test_storage();
        storage.create("notes", &note("1", "pending")).unwrap();

        let retrieved: Option<Note> = storage.get("notes", "1").unwrap();
        assert_eq!(retrieved, Some(note("1", "pending")));
    }

    #[test]
    fn test_get_not_found() {
        let (storage, _temp) = create_test_storage();
        let retrieved: Option<Note> = storage.get("notes", "nope").unwrap();
        assert_eq!(retrieved, None);
    }

    #[test]
    fn test_create_duplicate_rejected() {
        let (storage, _temp) = create_test_storage();
        storage.create("notes", &note("1", "pending")).unwrap();
        let result = storage.create("notes", &note("1", "answered"));
        assert!(matches!(result, Err(DoubtqError::Storage(_))));
    }

    #[test]
    fn test_update_replaces_record() {
        let (storage, _temp) = create_test_storage();
        storage.create("notes", &note("1", "pending")).unwrap();
        storage.update("notes", &note("1", "answered")).unwrap();

        let retrieved: Option<Note> = storage.get("notes", "1").unwrap();
        assert_eq!(retrieved.unwrap().status, "answered");
    }

    #[test]
    fn test_update_not_found() {
        let (storage, _temp) = create_test_storage();
        let result = storage.update("notes", &note("1", "answered"));
        assert!(matches!(result, Err(DoubtqError::NotFound(_))));
    }

    #[test]
    fn test_delete() {
        let (storage, _temp) = create_test_storage();
        storage.create("notes", &note("1", "pending")).unwrap();
        storage.delete("notes", "1").unwrap();

        let retrieved: Option<Note> = storage.get("notes", "1").unwrap();
        assert!(retrieved.is_none());
        assert!(matches!(storage.delete("notes", "1"), Err(DoubtqError::NotFound(_))));
    }

    #[test]
    fn test_query_with_filters() {
        let (storage, _temp) = create_test_storage();
        storage.create("notes", &note("1", "pending")).unwrap();
        storage.create("notes", &note("2", "answered")).unwrap();
        storage.create("notes", &note("3", "pending")).unwrap();

        let pending: Vec<Note> = storage.query("notes", &[Filter::eq("status", "pending")]).unwrap();
        let ids: Vec<&str> = pending.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn test_list_keeps_insertion_order() {
        let (storage, _temp) = create_test_storage();
        for id in ["c", "a", "b"] {
            storage.create("notes", &note(id, "pending")).unwrap();
        }
        let all: Vec<Note> = storage.list("notes").unwrap();
        let ids: Vec<&str> = all.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_persists_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        {
            let storage = JsonlStorage::new(temp_dir.path()).unwrap();
            storage.create("notes", &note("1", "pending")).unwrap();
            storage.create("notes", &note("2", "pending")).unwrap();
            storage.update("notes", &note("1", "answered")).unwrap();
            storage.delete("notes", "2").unwrap();
        }

        let storage = JsonlStorage::new(temp_dir.path()).unwrap();
        let all: Vec<Note> = storage.list("notes").unwrap();
        assert_eq!(all, vec![note("1", "answered")]);
    }

    fn dir_entries(storage: &JsonlStorage) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(storage.base_path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_rewrite_leaves_no_temp_files() {
        let (storage, _temp) = create_test_storage();
        storage.create("notes", &note("1", "pending")).unwrap();
        storage.create("notes", &note("2", "pending")).unwrap();
        storage.update("notes", &note("1", "answered")).unwrap();
        storage.delete("notes", "2").unwrap();

        assert_eq!(dir_entries(&storage), vec!["notes.jsonl".to_string()]);
        let content = fs::read_to_string(storage.collection_path("notes")).unwrap();
        assert_eq!(content.lines().count(), 1);
    }

    #[test]
    fn test_failed_rewrite_rolls_back_and_cleans_up() {
        let (storage, _temp) = create_test_storage();
        storage.create("notes", &note("1", "pending")).unwrap();

        // A directory where the collection file should be makes the rename fail
        let path = storage.collection_path("notes");
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), "x").unwrap();

        assert!(storage.update("notes", &note("1", "answered")).is_err());
        assert!(storage.delete("notes", "1").is_err());

        let retrieved: Option<Note> = storage.get("notes", "1").unwrap();
        assert_eq!(retrieved.unwrap().status, "pending");
        assert_eq!(dir_entries(&storage), vec!["notes.jsonl".to_string()]);
    }

    #[test]
    fn test_corrupt_line_is_skipped() {
        let (storage, _temp) = create_test_storage();
        let path = storage.collection_path("notes");
        fs::write(
            &path,
            "{\"id\":\"1\",\"body\":\"b\",\"status\":\"pending\"}\n{broken\n\n{\"id\":\"2\",\"body\":\"b\",\"status\":\"pending\"}\n",
        )
        .unwrap();

        let all: Vec<Note> = storage.list("notes").unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_empty_collection() {
        let (storage, _temp) = create_test_storage();
        let all: Vec<Note> = storage.list("notes").unwrap();
        assert!(all.is_empty());
    }
}
