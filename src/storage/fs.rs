//! Directory-backed object storage.
//!
//! Objects are stored at `<root>/<bucket>/<object key>`. Useful for a shared
//! network mount and for tests.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use super::{CloudFileRequest, ObjectStorage};
use crate::error::{GeocodeError, Result};

/// Stores objects as files under a root directory.
#[derive(Debug, Clone)]
pub struct FsObjectStorage {
    root: PathBuf,
}

impl FsObjectStorage {
    /// Create a storage rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where an object lives on disk.
    pub fn object_path(&self, request: &CloudFileRequest) -> PathBuf {
        let mut path = self.root.join(&request.bucket);
        for segment in request.object_segments() {
            path.push(segment);
        }
        path
    }
}

impl ObjectStorage for FsObjectStorage {
    fn upload(&self, reader: &mut dyn Read, request: &CloudFileRequest) -> Result<u64> {
        let path = self.object_path(request);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                GeocodeError::sync(format!("creating {}: {}", parent.display(), e))
            })?;
        }

        let temp_path = path.with_extension("upload.tmp");
        let mut file = File::create(&temp_path)
            .map_err(|e| GeocodeError::sync(format!("creating {}: {}", temp_path.display(), e)))?;
        let written = io::copy(reader, &mut file)
            .map_err(|e| GeocodeError::sync(format!("writing {}: {}", temp_path.display(), e)))?;
        drop(file);

        fs::rename(&temp_path, &path)
            .map_err(|e| GeocodeError::sync(format!("renaming to {}: {}", path.display(), e)))?;

        tracing::debug!(
            "Stored {} ({} bytes, mod time {})",
            path.display(),
            written,
            request.mod_time
        );
        Ok(written)
    }

    fn download(&self, writer: &mut dyn Write, request: &CloudFileRequest) -> Result<u64> {
        let path = self.object_path(request);
        let mut file = File::open(&path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                GeocodeError::sync(format!("object {} not found", request.object_key()))
            } else {
                GeocodeError::sync(format!("opening {}: {}", path.display(), e))
            }
        })?;

        io::copy(&mut file, writer)
            .map_err(|e| GeocodeError::sync(format!("reading {}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn request() -> CloudFileRequest {
        CloudFileRequest::new("geo-bucket", "geocode-cache.json", "/srv/data/geo", 1_700_000_000)
            .unwrap()
    }

    #[test]
    fn object_path_is_under_bucket() {
        let storage = FsObjectStorage::new("/remote");
        assert_eq!(
            storage.object_path(&request()),
            PathBuf::from("/remote/geo-bucket/srv/data/geo/geocode-cache.json")
        );
    }

    #[test]
    fn upload_then_download() {
        let temp = TempDir::new().unwrap();
        let storage = FsObjectStorage::new(temp.path());

        let written = storage
            .upload(&mut "{\"k\":1}".as_bytes(), &request())
            .unwrap();
        assert_eq!(written, 7);

        let mut out = Vec::new();
        let read = storage.download(&mut out, &request()).unwrap();
        assert_eq!(read, 7);
        assert_eq!(out, b"{\"k\":1}");
    }

    #[test]
    fn upload_overwrites_previous_object() {
        let temp = TempDir::new().unwrap();
        let storage = FsObjectStorage::new(temp.path());

        storage.upload(&mut "first".as_bytes(), &request()).unwrap();
        storage.upload(&mut "second".as_bytes(), &request()).unwrap();

        let mut out = Vec::new();
        storage.download(&mut out, &request()).unwrap();
        assert_eq!(out, b"second");
    }

    #[test]
    fn download_missing_object_is_sync_error() {
        let temp = TempDir::new().unwrap();
        let storage = FsObjectStorage::new(temp.path());

        let mut out = Vec::new();
        let err = storage.download(&mut out, &request()).unwrap_err();
        assert!(matches!(err, GeocodeError::Sync { .. }));
        assert!(err.to_string().contains("not found"));
    }
}
