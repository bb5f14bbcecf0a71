//! Result store: the last successful first page of a feed, with its fingerprint.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::StorageError;
use crate::flickr::Photo;

use super::fingerprint::fingerprint;
use super::storage::KvStorage;

/// Cached first page as read back from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRecord {
  pub photos: Vec<Photo>,
  pub fingerprint: String,
  pub stored_at: DateTime<Utc>,
}

/// Persists one photo list per namespace.
///
/// The cache is an optimization: every storage failure is logged and
/// swallowed, reads degrade to "absent" and change detection fails open.
#[derive(Clone)]
pub struct ResultStore {
  storage: Arc<dyn KvStorage>,
  namespace: String,
  photos_key: String,
  fingerprint_key: String,
}

impl ResultStore {
  /// Create a store for `namespace` (e.g. "recent") on the given backend.
  pub fn new(storage: Arc<dyn KvStorage>, namespace: &str) -> Self {
    Self {
      storage,
      namespace: namespace.to_string(),
      photos_key: format!("{}:photos", namespace),
      fingerprint_key: format!("{}:fingerprint", namespace),
    }
  }

  pub fn namespace(&self) -> &str {
    &self.namespace
  }

  /// Store `photos` and their fingerprint together.
  pub fn put(&self, photos: &[Photo]) {
    match self.try_put(photos) {
      Ok(fp) => debug!(namespace = %self.namespace, count = photos.len(), fingerprint = %fp, "cached photos"),
      Err(e) => warn!(namespace = %self.namespace, error = %e, "failed to cache photos"),
    }
  }

  /// Previously stored photos. Missing, unreadable or corrupt data is `None`.
  pub fn get(&self) -> Option<Vec<Photo>> {
    self.record().map(|record| record.photos)
  }

  /// Previously stored photos with their fingerprint and write time.
  pub fn record(&self) -> Option<CacheRecord> {
    match self.try_record() {
      Ok(record) => record,
      Err(e) => {
        warn!(namespace = %self.namespace, error = %e, "ignoring unreadable cache");
        None
      }
    }
  }

  /// Whether `photos` differ from what was last stored.
  ///
  /// True when nothing is stored and when the stored fingerprint cannot be read.
  pub fn has_changed(&self, photos: &[Photo]) -> bool {
    let current = fingerprint(photos);
    match self.storage.get(&self.fingerprint_key) {
      Ok(Some(stored)) => stored.value != current,
      Ok(None) => true,
      Err(e) => {
        warn!(namespace = %self.namespace, error = %e, "cannot read fingerprint, assuming changed");
        true
      }
    }
  }

  /// Remove both slots.
  pub fn clear(&self) {
    match self
      .storage
      .remove_all(&[self.photos_key.as_str(), self.fingerprint_key.as_str()])
    {
      Ok(()) => debug!(namespace = %self.namespace, "cache cleared"),
      Err(e) => warn!(namespace = %self.namespace, error = %e, "failed to clear cache"),
    }
  }

  fn try_put(&self, photos: &[Photo]) -> Result<String, StorageError> {
    let fp = fingerprint(photos);
    let json = serde_json::to_string(photos)?;
    self
      .storage
      .put_all(&[
        (self.photos_key.as_str(), json.as_str()),
        (self.fingerprint_key.as_str(), fp.as_str()),
      ])?;
    Ok(fp)
  }

  fn try_record(&self) -> Result<Option<CacheRecord>, StorageError> {
    let Some(stored) = self.storage.get(&self.photos_key)? else {
      return Ok(None);
    };

    let photos: Vec<Photo> = serde_json::from_str(&stored.value)?;

    // Both slots are written together; recompute if the second one is gone
    let fp = match self.storage.get(&self.fingerprint_key)? {
      Some(stored_fp) => stored_fp.value,
      None => fingerprint(&photos),
    };

    Ok(Some(CacheRecord {
      photos,
      fingerprint: fp,
      stored_at: stored.stored_at,
    }))
  }
}

impl std::fmt::Debug for ResultStore {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ResultStore")
      .field("namespace", &self.namespace)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::storage::{NoopStorage, SqliteStorage, StoredValue};
  use pretty_assertions::assert_eq;

  /// Backend whose every operation fails
  struct BrokenStorage;

  impl KvStorage for BrokenStorage {
    fn get(&self, _key: &str) -> Result<Option<StoredValue>, StorageError> {
      Err(StorageError::Poisoned)
    }

    fn put_all(&self, _entries: &[(&str, &str)]) -> Result<(), StorageError> {
      Err(StorageError::Poisoned)
    }

    fn remove_all(&self, _keys: &[&str]) -> Result<(), StorageError> {
      Err(StorageError::Poisoned)
    }
  }

  fn photo(id: &str) -> Photo {
    Photo {
      id: id.to_string(),
      title: "Untitled".to_string(),
      url: None,
      owner: "o".to_string(),
      server: "1".to_string(),
      secret: "s".to_string(),
    }
  }

  fn photos(n: usize) -> Vec<Photo> {
    (0..n).map(|i| photo(&format!("p{}", i))).collect()
  }

  fn sqlite_store() -> (Arc<SqliteStorage>, ResultStore) {
    let storage = Arc::new(SqliteStorage::open_in_memory().unwrap());
    let store = ResultStore::new(storage.clone(), "recent");
    (storage, store)
  }

  #[test]
  fn test_round_trip() {
    let (_, store) = sqlite_store();
    let list = photos(20);

    store.put(&list);

    assert_eq!(store.get(), Some(list.clone()));
    let record = store.record().unwrap();
    assert_eq!(record.fingerprint, fingerprint(&list));
  }

  #[test]
  fn test_empty_store() {
    let (_, store) = sqlite_store();
    assert!(store.get().is_none());
    assert!(store.record().is_none());
  }

  #[test]
  fn test_has_changed_without_prior_put() {
    let (_, store) = sqlite_store();
    assert!(store.has_changed(&photos(3)));
  }

  #[test]
  fn test_has_changed_detects_difference() {
    let (_, store) = sqlite_store();
    let list = photos(5);
    store.put(&list);

    assert!(!store.has_changed(&list));

    let mut edited = list.clone();
    edited[2].title = "Sunset".to_string();
    assert!(store.has_changed(&edited));
  }

  #[test]
  fn test_overwrite_replaces_both_slots() {
    let (_, store) = sqlite_store();
    store.put(&photos(5));
    let newer = photos(2);
    store.put(&newer);

    let record = store.record().unwrap();
    assert_eq!(record.photos, newer);
    assert_eq!(record.fingerprint, fingerprint(&newer));
  }

  #[test]
  fn test_corrupt_photos_treated_as_absent() {
    let (storage, store) = sqlite_store();
    storage
      .put_all(&[("recent:photos", "{not json"), ("recent:fingerprint", "v1:00")])
      .unwrap();

    assert!(store.get().is_none());
  }

  #[test]
  fn test_clear() {
    let (_, store) = sqlite_store();
    let list = photos(3);
    store.put(&list);

    store.clear();

    assert!(store.get().is_none());
    assert!(store.has_changed(&list));

    // Clearing an empty store is fine
    store.clear();
  }

  #[test]
  fn test_namespaces_are_separate() {
    let storage: Arc<dyn KvStorage> = Arc::new(SqliteStorage::open_in_memory().unwrap());
    let recent = ResultStore::new(storage.clone(), "recent");
    let other = ResultStore::new(storage, "search");

    recent.put(&photos(2));

    assert!(other.get().is_none());
    assert_eq!(recent.namespace(), "recent");
  }

  #[test]
  fn test_broken_backend_never_fails_caller() {
    let store = ResultStore::new(Arc::new(BrokenStorage), "recent");

    store.put(&photos(2));
    store.clear();
    assert!(store.get().is_none());
    assert!(store.has_changed(&photos(2)));
  }

  #[test]
  fn test_noop_backend_always_changed() {
    let store = ResultStore::new(Arc::new(NoopStorage), "recent");
    let list = photos(2);

    store.put(&list);

    assert!(store.get().is_none());
    assert!(store.has_changed(&list));
  }

  #[test]
  fn test_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.db");
    let list = photos(20);

    {
      let storage = Arc::new(SqliteStorage::open(&path).unwrap());
      ResultStore::new(storage, "recent").put(&list);
    }

    let storage = Arc::new(SqliteStorage::open(&path).unwrap());
    let store = ResultStore::new(storage, "recent");
    assert_eq!(store.get(), Some(list.clone()));
    assert!(!store.has_changed(&list));
  }
}
