//! Remote object storage for the cache file.
//!
//! The service only needs two operations: upload a byte stream and download
//! one. [`ObjectStorage`] is that seam; [`FsObjectStorage`] and
//! [`HttpObjectStorage`] are the bundled backends.

pub mod fs;
pub mod http;

pub use fs::FsObjectStorage;
pub use http::HttpObjectStorage;

use std::io::{Read, Write};
use std::path::{Component, Path};

use crate::error::{GeocodeError, Result};

/// Addresses one object in a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudFileRequest {
    /// Bucket name.
    pub bucket: String,
    /// Object base name (e.g. `geocode-cache.json`).
    pub file_name: String,
    /// Directory the object lives under, usually the local cache directory.
    pub directory: String,
    /// File modification time (unix seconds), sent as a version hint.
    pub mod_time: i64,
}

impl CloudFileRequest {
    /// Create a request. Bucket and file name must be non-empty.
    pub fn new(
        bucket: impl Into<String>,
        file_name: impl Into<String>,
        directory: impl Into<String>,
        mod_time: i64,
    ) -> Result<Self> {
        let bucket = bucket.into();
        let file_name = file_name.into();

        if bucket.is_empty() {
            return Err(GeocodeError::MissingRequiredConfig {
                field: "bucket_name".into(),
            });
        }
        if file_name.is_empty() {
            return Err(GeocodeError::MissingRequiredConfig {
                field: "file_name".into(),
            });
        }

        Ok(Self {
            bucket,
            file_name,
            directory: directory.into(),
            mod_time,
        })
    }

    /// Path segments of the object inside its bucket.
    ///
    /// Root, prefix, `.` and `..` components of the directory are dropped so
    /// an absolute local path maps to a relative object key.
    pub fn object_segments(&self) -> Vec<String> {
        Path::new(&self.directory)
            .components()
            .filter_map(|component| match component {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .chain(std::iter::once(self.file_name.clone()))
            .collect()
    }

    /// Slash-joined object key, e.g. `data/geo/geocode-cache.json`.
    pub fn object_key(&self) -> String {
        self.object_segments().join("/")
    }
}

/// Blob store that can hold the cache file.
pub trait ObjectStorage {
    /// Upload everything from `reader`. Returns bytes written.
    fn upload(&self, reader: &mut dyn Read, request: &CloudFileRequest) -> Result<u64>;

    /// Download the object into `writer`. Returns bytes read.
    fn download(&self, writer: &mut dyn Write, request: &CloudFileRequest) -> Result<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_requires_bucket() {
        let result = CloudFileRequest::new("", "cache.json", "geo", 0);
        assert!(matches!(
            result,
            Err(GeocodeError::MissingRequiredConfig { field }) if field == "bucket_name"
        ));
    }

    #[test]
    fn request_requires_file_name() {
        let result = CloudFileRequest::new("bucket", "", "geo", 0);
        assert!(matches!(
            result,
            Err(GeocodeError::MissingRequiredConfig { field }) if field == "file_name"
        ));
    }

    #[test]
    fn object_key_from_relative_directory() {
        let req = CloudFileRequest::new("b", "geocode-cache.json", "data/geo", 0).unwrap();
        assert_eq!(req.object_key(), "data/geo/geocode-cache.json");
    }

    #[test]
    fn object_key_strips_root_and_parent_components() {
        let req = CloudFileRequest::new("b", "c.json", "/var/../data/./geo", 0).unwrap();
        assert_eq!(req.object_segments(), vec!["var", "data", "geo", "c.json"]);
    }

    #[test]
    fn object_key_with_empty_directory() {
        let req = CloudFileRequest::new("b", "c.json", "", 0).unwrap();
        assert_eq!(req.object_key(), "c.json");
    }
}
