//! Cache storage implementation.
//!
//! All entries live in memory and are persisted as one JSON document.
//! Writes only mark the store as updated; the file is rewritten on
//! [`CacheStore::save_file`].

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::entry::CacheEntry;
use crate::error::{GeocodeError, Result};

/// Base name of the persisted cache file.
pub const CACHE_FILE_NAME: &str = "geocode-cache";

/// Location of the cache file under a data directory:
/// `<data_dir>/geo/geocode-cache.json`.
pub fn cache_file_path(data_dir: &Path) -> PathBuf {
    data_dir
        .join("geo")
        .join(format!("{}.json", CACHE_FILE_NAME))
}

/// In-memory expiring key/value store persisted to a single JSON file.
#[derive(Debug)]
pub struct CacheStore {
    /// Path of the backing file.
    path: PathBuf,
    entries: HashMap<String, CacheEntry>,
    /// Set by writes, cleared by a successful save.
    updated: bool,
}

impl CacheStore {
    /// Create an empty store backed by `path`. Nothing is read.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: HashMap::new(),
            updated: false,
        }
    }

    /// Load the store from `path`.
    ///
    /// A missing file gives an empty store. A file that is not a valid
    /// cache document is logged and ignored; it is overwritten on the next
    /// save.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No cache file at {}, starting empty", path.display());
                return Ok(Self::new(path));
            }
            Err(source) => return Err(GeocodeError::Persistence { path, source }),
        };

        if content.trim().is_empty() {
            return Ok(Self::new(path));
        }

        let entries = match serde_json::from_str::<HashMap<String, CacheEntry>>(&content) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(
                    "Ignoring unreadable cache file {}: {}",
                    path.display(),
                    e
                );
                HashMap::new()
            }
        };

        tracing::debug!("Loaded {} cache entries from {}", entries.len(), path.display());

        Ok(Self {
            path,
            entries,
            updated: false,
        })
    }

    /// Get the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up a live entry.
    ///
    /// Fails with [`GeocodeError::CacheMiss`] when absent and
    /// [`GeocodeError::CacheExpired`] when past expiry. A hit does not
    /// extend the expiry.
    pub fn get(&self, key: &str) -> Result<(&serde_json::Value, DateTime<Utc>)> {
        let entry = self
            .entries
            .get(key)
            .ok_or_else(|| GeocodeError::CacheMiss {
                key: key.to_string(),
            })?;

        if entry.is_expired() {
            return Err(GeocodeError::CacheExpired {
                key: key.to_string(),
                expired_at: entry.expires_at,
            });
        }

        Ok((&entry.value, entry.expires_at))
    }

    /// Look up a live entry and deserialize it into `T`.
    ///
    /// A value of the wrong shape fails with [`GeocodeError::CacheCorrupt`].
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<(T, DateTime<Utc>)> {
        let (value, expires_at) = self.get(key)?;
        let typed = T::deserialize(value).map_err(|e| GeocodeError::CacheCorrupt {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok((typed, expires_at))
    }

    /// Store `value` under `key` until `now + ttl`.
    ///
    /// Returns the absolute expiry. A zero TTL, or one whose expiry does not
    /// fit in a timestamp, is rejected with [`GeocodeError::InvalidTtl`].
    pub fn set<T: Serialize + ?Sized>(
        &mut self,
        key: impl Into<String>,
        value: &T,
        ttl: Duration,
    ) -> Result<DateTime<Utc>> {
        if ttl.is_zero() {
            return Err(GeocodeError::InvalidTtl);
        }
        let ttl = chrono::Duration::from_std(ttl).map_err(|_| GeocodeError::InvalidTtl)?;
        let expires_at = Utc::now()
            .checked_add_signed(ttl)
            .ok_or(GeocodeError::InvalidTtl)?;

        let key = key.into();
        let value = serde_json::to_value(value).map_err(|e| GeocodeError::CacheCorrupt {
            key: key.clone(),
            message: e.to_string(),
        })?;

        self.entries.insert(key, CacheEntry::new(value, expires_at));
        self.updated = true;
        Ok(expires_at)
    }

    /// Whether there are writes not yet saved to disk.
    pub fn updated(&self) -> bool {
        self.updated
    }

    /// Flag the store as needing another save and upload.
    pub(crate) fn mark_updated(&mut self) {
        self.updated = true;
    }

    /// Number of entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the store has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries past their expiry.
    pub fn expired_count(&self) -> usize {
        let now = Utc::now();
        self.entries
            .values()
            .filter(|entry| entry.is_expired_at(now))
            .count()
    }

    /// Drop expired entries. Marks the store updated if any were removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = Utc::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now));
        let removed = before - self.entries.len();
        if removed > 0 {
            self.updated = true;
        }
        removed
    }

    /// Write every entry to the backing file.
    ///
    /// Uses the write-to-temp-then-rename pattern so a crash mid-write never
    /// leaves a truncated cache file. The updated flag is cleared only on
    /// success.
    pub fn save_file(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| GeocodeError::Persistence {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let content = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| GeocodeError::Other(e.into()))?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, &content).map_err(|source| GeocodeError::Persistence {
            path: temp_path.clone(),
            source,
        })?;
        fs::rename(&temp_path, &self.path).map_err(|source| GeocodeError::Persistence {
            path: self.path.clone(),
            source,
        })?;

        tracing::debug!(
            "Saved {} cache entries to {}",
            self.entries.len(),
            self.path.display()
        );
        self.updated = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use std::thread;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TestData {
        name: String,
        value: i32,
    }

    const HOUR: Duration = Duration::from_secs(3600);

    fn create_test_store() -> (CacheStore, TempDir) {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::new(cache_file_path(temp.path()));
        (store, temp)
    }

    #[test]
    fn cache_file_path_layout() {
        let path = cache_file_path(Path::new("/data"));
        assert_eq!(path, PathBuf::from("/data/geo/geocode-cache.json"));
    }

    #[test]
    fn set_then_get_returns_value() {
        let (mut store, _temp) = create_test_store();
        let data = TestData {
            name: "irvine".into(),
            value: 92612,
        };

        let expires_at = store.set("92612", &data, HOUR).unwrap();
        let (loaded, loaded_exp): (TestData, _) = store.get_as("92612").unwrap();

        assert_eq!(loaded, data);
        assert_eq!(loaded_exp, expires_at);
        assert!(expires_at > Utc::now());
    }

    #[test]
    fn get_missing_key_is_cache_miss() {
        let (store, _temp) = create_test_store();
        let result = store.get("nope");
        assert!(matches!(result, Err(GeocodeError::CacheMiss { key }) if key == "nope"));
    }

    #[test]
    fn get_after_expiry_is_cache_expired() {
        let (mut store, _temp) = create_test_store();
        store
            .set("short", &json!("stale"), Duration::from_millis(1))
            .unwrap();

        thread::sleep(Duration::from_millis(20));

        assert!(matches!(
            store.get("short"),
            Err(GeocodeError::CacheExpired { .. })
        ));
    }

    #[test]
    fn get_does_not_extend_expiry() {
        let (mut store, _temp) = create_test_store();
        let expires_at = store.set("k", &json!(1), HOUR).unwrap();

        let (_, first) = store.get("k").unwrap();
        thread::sleep(Duration::from_millis(5));
        let (_, second) = store.get("k").unwrap();

        assert_eq!(first, expires_at);
        assert_eq!(second, expires_at);
    }

    #[test]
    fn get_as_wrong_shape_is_cache_corrupt() {
        let (mut store, _temp) = create_test_store();
        store.set("k", &json!("not a struct"), HOUR).unwrap();

        let result = store.get_as::<TestData>("k");
        assert!(matches!(result, Err(GeocodeError::CacheCorrupt { .. })));
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let (mut store, _temp) = create_test_store();
        let result = store.set("k", &json!(1), Duration::ZERO);
        assert!(matches!(result, Err(GeocodeError::InvalidTtl)));
        assert!(!store.updated());
        assert!(store.is_empty());
    }

    #[test]
    fn ttl_past_max_timestamp_is_rejected() {
        let (mut store, _temp) = create_test_store();
        let million_years = Duration::from_secs(1_000_000 * 365 * 24 * 3600);

        let result = store.set("k", &json!(1), million_years);

        assert!(matches!(result, Err(GeocodeError::InvalidTtl)));
        assert!(!store.updated());
        assert!(store.is_empty());
    }

    #[test]
    fn set_marks_updated_and_save_clears_it() {
        let (mut store, _temp) = create_test_store();
        assert!(!store.updated());

        store.set("k", &json!(1), HOUR).unwrap();
        assert!(store.updated());

        store.save_file().unwrap();
        assert!(!store.updated());
    }

    #[test]
    fn save_creates_directory_and_file() {
        let (mut store, temp) = create_test_store();
        store.set("k", &json!({"a": 1}), HOUR).unwrap();
        store.save_file().unwrap();

        let path = temp.path().join("geo").join("geocode-cache.json");
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"expires_at\""));
        assert!(content.contains("\"value\""));
    }

    #[test]
    fn save_and_reopen_round_trips_entries() {
        let (mut store, _temp) = create_test_store();
        store
            .set(
                "a",
                &TestData {
                    name: "a".into(),
                    value: 1,
                },
                HOUR,
            )
            .unwrap();
        store.set("b", &json!([1, 2, 3]), HOUR * 24).unwrap();
        store.set("c", &json!(null), HOUR).unwrap();
        store.save_file().unwrap();

        let reopened = CacheStore::open(store.path()).unwrap();
        assert_eq!(reopened.entries, store.entries);
        assert!(!reopened.updated());
    }

    #[test]
    fn open_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::open(temp.path().join("missing.json")).unwrap();
        assert!(store.is_empty());
        assert!(!store.updated());
    }

    #[test]
    fn open_garbage_file_starts_empty() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cache.json");
        fs::write(&path, "{not json").unwrap();

        let store = CacheStore::open(&path).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn open_directory_is_persistence_error() {
        let temp = TempDir::new().unwrap();
        let result = CacheStore::open(temp.path());
        assert!(matches!(result, Err(GeocodeError::Persistence { .. })));
    }

    #[test]
    fn overwrite_existing_key() {
        let (mut store, _temp) = create_test_store();
        store.set("k", &json!("first"), HOUR).unwrap();
        store.set("k", &json!("second"), HOUR).unwrap();

        let (value, _) = store.get("k").unwrap();
        assert_eq!(value, &json!("second"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn purge_expired_removes_only_expired() {
        let (mut store, _temp) = create_test_store();
        store.set("old", &json!(1), Duration::from_millis(1)).unwrap();
        store.set("new", &json!(2), HOUR).unwrap();
        store.save_file().unwrap();

        thread::sleep(Duration::from_millis(20));
        assert_eq!(store.expired_count(), 1);

        let removed = store.purge_expired();
        assert_eq!(removed, 1);
        assert!(store.updated());
        assert!(store.get("new").is_ok());
        assert!(matches!(store.get("old"), Err(GeocodeError::CacheMiss { .. })));
    }
}
