//! Backup and restore of the cache file through object storage.
//!
//! The local file is restored from the remote copy before the store is
//! opened, and uploaded after it is saved. The remote object is keyed by the
//! bucket, the cache file's base name, and its local directory. Concurrent
//! writers are not coordinated: the last upload wins.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use super::store::CacheStore;
use crate::error::{GeocodeError, Result};
use crate::storage::{CloudFileRequest, ObjectStorage};

/// Moves the cache file between local disk and object storage.
pub struct CacheSync {
    storage: Box<dyn ObjectStorage>,
    bucket: String,
    cache_file: PathBuf,
}

impl CacheSync {
    /// Create a sync adapter for `cache_file` in `bucket`.
    pub fn new(
        storage: Box<dyn ObjectStorage>,
        bucket: impl Into<String>,
        cache_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            storage,
            bucket: bucket.into(),
            cache_file: cache_file.into(),
        }
    }

    /// Get the local cache file path.
    pub fn cache_file(&self) -> &Path {
        &self.cache_file
    }

    /// Build the storage request for the cache file.
    fn request(&self, mod_time: i64) -> Result<CloudFileRequest> {
        let file_name = self
            .cache_file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let directory = self
            .cache_file
            .parent()
            .map(|dir| dir.to_string_lossy().into_owned())
            .unwrap_or_default();

        CloudFileRequest::new(&self.bucket, file_name, directory, mod_time)
    }

    /// Restore the cache file from storage if it does not exist locally.
    ///
    /// Returns the number of bytes downloaded, or `0` when a local copy was
    /// already present. The download goes to a temp file that is renamed
    /// into place, so a failed transfer leaves no partial cache file.
    pub fn download_initial(&self) -> Result<u64> {
        if self.cache_file.exists() {
            tracing::debug!(
                "Cache file {} present, skipping download",
                self.cache_file.display()
            );
            return Ok(0);
        }

        if let Some(parent) = self.cache_file.parent() {
            fs::create_dir_all(parent).map_err(|source| GeocodeError::Persistence {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let request = self.request(0)?;
        let temp_path = self.cache_file.with_extension("json.download");
        let mut file = File::create(&temp_path).map_err(|source| GeocodeError::Persistence {
            path: temp_path.clone(),
            source,
        })?;

        let downloaded = match self.storage.download(&mut file, &request) {
            Ok(n) => n,
            Err(e) => {
                drop(file);
                let _ = fs::remove_file(&temp_path);
                return Err(e);
            }
        };
        drop(file);

        fs::rename(&temp_path, &self.cache_file).map_err(|source| {
            GeocodeError::Persistence {
                path: self.cache_file.clone(),
                source,
            }
        })?;

        tracing::info!(
            "Downloaded cache {} from {} ({} bytes)",
            self.cache_file.display(),
            request.bucket,
            downloaded
        );
        Ok(downloaded)
    }

    /// Save and upload the store if it has unsaved writes.
    ///
    /// Returns `None` when there was nothing to upload, otherwise the number
    /// of bytes uploaded.
    pub fn upload_if_dirty(&self, store: &mut CacheStore) -> Result<Option<u64>> {
        if !store.updated() {
            return Ok(None);
        }

        store.save_file()?;
        match self.upload() {
            Ok(uploaded) => Ok(Some(uploaded)),
            Err(e) => {
                // saved locally but not backed up; retry on the next call
                store.mark_updated();
                Err(e)
            }
        }
    }

    /// Upload the local cache file with its modification time as a version hint.
    pub fn upload(&self) -> Result<u64> {
        let mod_time = file_mod_time(&self.cache_file)?;
        tracing::debug!(
            "Cache file {} mod time {}",
            self.cache_file.display(),
            mod_time
        );

        let request = self.request(mod_time)?;
        let mut file = File::open(&self.cache_file).map_err(|source| GeocodeError::Persistence {
            path: self.cache_file.clone(),
            source,
        })?;

        let uploaded = self.storage.upload(&mut file, &request)?;
        tracing::info!(
            "Uploaded cache {} to {}/{} ({} bytes)",
            self.cache_file.display(),
            request.bucket,
            request.object_key(),
            uploaded
        );
        Ok(uploaded)
    }
}

/// Modification time of `path` in unix seconds.
fn file_mod_time(path: &Path) -> Result<i64> {
    let modified = fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map_err(|source| GeocodeError::Persistence {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::cache_file_path;
    use crate::storage::FsObjectStorage;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        remote_root: PathBuf,
        data_dir: PathBuf,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let remote_root = temp.path().join("remote");
        let data_dir = temp.path().join("data");
        Fixture {
            _temp: temp,
            remote_root,
            data_dir,
        }
    }

    fn sync_for(fx: &Fixture, data_dir: &Path) -> CacheSync {
        CacheSync::new(
            Box::new(FsObjectStorage::new(&fx.remote_root)),
            "geo-bucket",
            cache_file_path(data_dir),
        )
    }

    #[test]
    fn upload_skipped_when_clean() {
        let fx = fixture();
        let sync = sync_for(&fx, &fx.data_dir);
        let mut store = CacheStore::new(sync.cache_file());

        assert_eq!(sync.upload_if_dirty(&mut store).unwrap(), None);
        assert!(!sync.cache_file().exists());
    }

    #[test]
    fn upload_saves_then_uploads() {
        let fx = fixture();
        let sync = sync_for(&fx, &fx.data_dir);
        let mut store = CacheStore::new(sync.cache_file());
        store
            .set("92612", &json!({"latitude": 33.66}), Duration::from_secs(60))
            .unwrap();

        let uploaded = sync.upload_if_dirty(&mut store).unwrap();
        assert!(uploaded.unwrap() > 0);
        assert!(!store.updated());
        assert!(sync.cache_file().exists());

        let storage = FsObjectStorage::new(&fx.remote_root);
        let request = sync.request(0).unwrap();
        assert!(storage.object_path(&request).exists());
    }

    #[test]
    fn download_restores_uploaded_cache() {
        let fx = fixture();
        let uploader = sync_for(&fx, &fx.data_dir);
        let mut store = CacheStore::new(uploader.cache_file());
        store
            .set("k", &json!("v"), Duration::from_secs(60))
            .unwrap();
        uploader.upload_if_dirty(&mut store).unwrap();

        fs::remove_file(uploader.cache_file()).unwrap();

        let downloaded = uploader.download_initial().unwrap();
        assert!(downloaded > 0);

        let restored = CacheStore::open(uploader.cache_file()).unwrap();
        let (value, _) = restored.get("k").unwrap();
        assert_eq!(value, &json!("v"));
    }

    #[test]
    fn download_skipped_when_local_file_exists() {
        let fx = fixture();
        let sync = sync_for(&fx, &fx.data_dir);
        fs::create_dir_all(sync.cache_file().parent().unwrap()).unwrap();
        fs::write(sync.cache_file(), "{}").unwrap();

        assert_eq!(sync.download_initial().unwrap(), 0);
    }

    #[test]
    fn failed_download_leaves_no_partial_file() {
        let fx = fixture();
        let sync = sync_for(&fx, &fx.data_dir);

        let result = sync.download_initial();
        assert!(matches!(result, Err(GeocodeError::Sync { .. })));
        assert!(!sync.cache_file().exists());
        assert!(!sync.cache_file().with_extension("json.download").exists());
        assert!(sync.cache_file().parent().unwrap().exists());
    }

    #[test]
    fn upload_without_bucket_is_config_error() {
        let fx = fixture();
        let sync = CacheSync::new(
            Box::new(FsObjectStorage::new(&fx.remote_root)),
            "",
            cache_file_path(&fx.data_dir),
        );
        let mut store = CacheStore::new(sync.cache_file());
        store.set("k", &json!(1), Duration::from_secs(60)).unwrap();

        let result = sync.upload_if_dirty(&mut store);
        assert!(matches!(
            result,
            Err(GeocodeError::MissingRequiredConfig { .. })
        ));
        assert!(sync.cache_file().exists());
        assert!(store.updated());
    }
}
