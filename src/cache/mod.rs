//! Geocode result caching.
//!
//! This module provides an in-memory expiring store persisted to a single
//! JSON file, key normalization, and backup/restore of that file through
//! object storage.

pub mod entry;
pub mod key;
pub mod store;
pub mod sync;

pub use entry::CacheEntry;
pub use key::{lat_long_key, normalize, LAT_LONG_SENTINEL_KEY};
pub use store::{cache_file_path, CacheStore, CACHE_FILE_NAME};
pub use sync::CacheSync;

use std::time::Duration;

/// Default time-to-live for cached geocodes: `365 × 24 × 30` hours.
///
/// This is not a calendar year; the constant is kept as is so existing
/// cache files keep their lifetimes.
pub const ONE_YEAR: Duration = Duration::from_secs(365 * 24 * 30 * 60 * 60);
