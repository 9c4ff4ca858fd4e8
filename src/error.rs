//! Error types for geocoding operations.
//!
//! This module defines [`GeocodeError`], the error type used throughout the
//! crate, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Cache errors (`CacheMiss`, `CacheExpired`, `CacheCorrupt`) are recovered
//!   inside the service by falling through to the provider
//! - Provider errors are always returned to the caller
//! - Persistence and sync errors are only returned from
//!   [`GeocodeService::clear`](crate::service::GeocodeService::clear)

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use thiserror::Error;

/// Core error type for geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// A required configuration value is missing.
    #[error("Missing required configuration: {field}")]
    MissingRequiredConfig { field: String },

    /// The request context was cancelled or its deadline passed.
    #[error("context is nil or done")]
    NilContext,

    /// The geocoding provider call failed (network, auth, decode).
    #[error("Geocoding provider error: {message}")]
    Provider { message: String },

    /// The provider succeeded but returned nothing.
    #[error("no results found")]
    NoResults,

    /// A point has an unset (zero) coordinate.
    #[error("invalid geo lat/lng")]
    InvalidLatLng,

    /// Unrecognized distance unit tag.
    #[error("invalid geo distance unit: {unit}")]
    InvalidUnit { unit: String },

    /// Cache writes need a positive time-to-live.
    #[error("cache TTL must be greater than zero")]
    InvalidTtl,

    /// Key not present in the cache.
    #[error("cache miss for key {key}")]
    CacheMiss { key: String },

    /// Key present but past its expiry.
    #[error("cache entry {key} expired at {expired_at}")]
    CacheExpired {
        key: String,
        expired_at: DateTime<Utc>,
    },

    /// Cached value does not have the expected shape.
    #[error("cache entry {key} is corrupt: {message}")]
    CacheCorrupt { key: String, message: String },

    /// Local cache file could not be read, written, or created.
    #[error("Cache file error at {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Remote object storage upload or download failed.
    #[error("Cache sync failed: {message}")]
    Sync { message: String },

    /// Vincenty's iteration did not converge (nearly antipodal points).
    #[error("distance calculation did not converge")]
    DistanceDidNotConverge,

    /// Failed to parse a configuration file.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GeocodeError {
    /// Build a provider error from anything displayable.
    pub fn provider(message: impl std::fmt::Display) -> Self {
        Self::Provider {
            message: message.to_string(),
        }
    }

    /// Build a sync error from anything displayable.
    pub fn sync(message: impl std::fmt::Display) -> Self {
        Self::Sync {
            message: message.to_string(),
        }
    }

    /// Whether this error belongs to the cache layer and should be
    /// absorbed into a provider fallback.
    pub fn is_cache_error(&self) -> bool {
        matches!(
            self,
            Self::CacheMiss { .. } | Self::CacheExpired { .. } | Self::CacheCorrupt { .. }
        )
    }
}

/// Result type alias for geocoding operations.
pub type Result<T> = std::result::Result<T, GeocodeError>;
