//! Service configuration.
//!
//! [`GeocodeConfig`] is read from an optional YAML file and then overridden
//! by environment variables and command-line flags (the CLI does the
//! layering through clap's `env` support).
//!
//! ```yaml
//! geocoder_key: AIza...
//! data_dir: /var/lib/geocode
//! bucket_name: geo-cache
//! storage_url: https://storage.googleapis.com
//! default_country: USA
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::cache_file_path;
use crate::error::{GeocodeError, Result};
use crate::storage::{FsObjectStorage, HttpObjectStorage, ObjectStorage};

/// Country used when a query does not name one.
pub const DEFAULT_COUNTRY: &str = "USA";

/// Configuration for [`GeocodeService`](crate::service::GeocodeService).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodeConfig {
    /// Provider API key. Required.
    pub geocoder_key: String,

    /// Provider host override.
    pub host: Option<String>,

    /// Geocoding endpoint path override.
    pub path: Option<String>,

    /// Whether results are cached.
    pub cached: bool,

    /// Directory holding `geo/geocode-cache.json`.
    pub data_dir: PathBuf,

    /// Bucket for the remote cache copy.
    pub bucket_name: Option<String>,

    /// Country used when a query does not name one.
    pub default_country: String,

    /// Local directory used as object storage.
    pub storage_dir: Option<PathBuf>,

    /// Base URL of an HTTP object store.
    pub storage_url: Option<String>,

    /// Provider request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GeocodeConfig {
    fn default() -> Self {
        Self {
            geocoder_key: String::new(),
            host: None,
            path: None,
            cached: true,
            data_dir: PathBuf::from("."),
            bucket_name: None,
            default_country: DEFAULT_COUNTRY.to_string(),
            storage_dir: None,
            storage_url: None,
            timeout_secs: 30,
        }
    }
}

impl GeocodeConfig {
    /// Create a config with the given key and defaults for everything else.
    pub fn new(geocoder_key: impl Into<String>) -> Self {
        Self {
            geocoder_key: geocoder_key.into(),
            ..Default::default()
        }
    }

    /// Load a YAML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| GeocodeError::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Self::from_yaml(&content).map_err(|e| match e {
            GeocodeError::ConfigParse { message, .. } => GeocodeError::ConfigParse {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    /// Parse a YAML document. An empty document yields the defaults.
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(content).map_err(|e| GeocodeError::ConfigParse {
            path: PathBuf::new(),
            message: e.to_string(),
        })
    }

    /// Check required fields and reject a zero request timeout.
    pub fn validate(&self) -> Result<()> {
        if self.geocoder_key.trim().is_empty() {
            return Err(GeocodeError::MissingRequiredConfig {
                field: "geocoder_key".into(),
            });
        }

        if (self.storage_dir.is_some() || self.storage_url.is_some())
            && self.bucket_name.as_deref().unwrap_or("").is_empty()
        {
            return Err(GeocodeError::MissingRequiredConfig {
                field: "bucket_name".into(),
            });
        }

        if self.timeout_secs == 0 {
            return Err(GeocodeError::MissingRequiredConfig {
                field: "timeout_secs".into(),
            });
        }

        Ok(())
    }

    /// Path of the persisted cache file.
    pub fn cache_file(&self) -> PathBuf {
        cache_file_path(&self.data_dir)
    }

    /// Provider request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Country to use when `country` is empty.
    pub fn country_or_default<'a>(&'a self, country: &'a str) -> &'a str {
        if country.trim().is_empty() {
            &self.default_country
        } else {
            country
        }
    }

    /// Build the configured object storage backend, if any.
    ///
    /// A storage directory takes precedence over a storage URL.
    pub fn object_storage(&self) -> Result<Option<Box<dyn ObjectStorage>>> {
        if let Some(dir) = &self.storage_dir {
            tracing::debug!("Using directory object storage at {}", dir.display());
            return Ok(Some(Box::new(FsObjectStorage::new(dir))));
        }

        if let Some(url) = &self.storage_url {
            tracing::debug!("Using HTTP object storage at {}", url);
            return Ok(Some(Box::new(HttpObjectStorage::new(url)?)));
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults() {
        let config = GeocodeConfig::default();
        assert!(config.cached);
        assert_eq!(config.default_country, "USA");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(
            config.cache_file(),
            PathBuf::from(".").join("geo").join("geocode-cache.json")
        );
    }

    #[test]
    fn parse_yaml_with_partial_fields() {
        let yaml = r#"
geocoder_key: abc123
bucket_name: geo-cache
cached: false
"#;
        let config = GeocodeConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.geocoder_key, "abc123");
        assert_eq!(config.bucket_name.as_deref(), Some("geo-cache"));
        assert!(!config.cached);
        assert_eq!(config.default_country, "USA");
    }

    #[test]
    fn empty_yaml_is_default() {
        assert_eq!(
            GeocodeConfig::from_yaml("  \n").unwrap(),
            GeocodeConfig::default()
        );
    }

    #[test]
    fn invalid_yaml_reports_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("geocode.yml");
        fs::write(&path, "geocoder_key: [unclosed").unwrap();

        let err = GeocodeConfig::load(&path).unwrap_err();
        match err {
            GeocodeError::ConfigParse { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = GeocodeConfig::load(Path::new("/nonexistent/geocode.yml")).unwrap_err();
        assert!(matches!(err, GeocodeError::ConfigParse { .. }));
    }

    #[test]
    fn validate_requires_key() {
        let err = GeocodeConfig::default().validate().unwrap_err();
        assert!(matches!(
            err,
            GeocodeError::MissingRequiredConfig { ref field } if field == "geocoder_key"
        ));
        assert!(GeocodeConfig::new("k").validate().is_ok());
    }

    #[test]
    fn validate_requires_bucket_with_storage() {
        let config = GeocodeConfig {
            storage_dir: Some(PathBuf::from("/tmp/remote")),
            ..GeocodeConfig::new("k")
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            GeocodeError::MissingRequiredConfig { ref field } if field == "bucket_name"
        ));
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let config = GeocodeConfig {
            timeout_secs: 0,
            ..GeocodeConfig::new("k")
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            GeocodeError::MissingRequiredConfig { ref field } if field == "timeout_secs"
        ));
    }

    #[test]
    fn zero_timeout_from_yaml_fails_validation() {
        let config = GeocodeConfig::from_yaml("geocoder_key: k\ntimeout_secs: 0\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn country_or_default() {
        let config = GeocodeConfig::new("k");
        assert_eq!(config.country_or_default(""), "USA");
        assert_eq!(config.country_or_default("CA"), "CA");
    }

    #[test]
    fn object_storage_none_without_backend() {
        let config = GeocodeConfig::new("k");
        assert!(config.object_storage().unwrap().is_none());
    }

    #[test]
    fn object_storage_prefers_directory() {
        let temp = TempDir::new().unwrap();
        let config = GeocodeConfig {
            storage_dir: Some(temp.path().to_path_buf()),
            storage_url: Some("http://localhost:1".into()),
            bucket_name: Some("b".into()),
            ..GeocodeConfig::new("k")
        };
        assert!(config.object_storage().unwrap().is_some());
    }
}
