//! geocode - Cached geocoding, reverse geocoding, distance, and routing.
//!
//! Lookups go through a provider (Google Maps by default) and are cached in
//! a local JSON file that can be backed up to object storage.
//!
//! # Modules
//!
//! - [`cache`] - Expiring key/value store, key normalization, and storage sync
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Configuration loading and validation
//! - [`context`] - Cancellation and deadlines for lookups
//! - [`distance`] - Vincenty distance and unit conversion
//! - [`error`] - Error types and result aliases
//! - [`provider`] - Geocoding provider trait and the Google adapter
//! - [`service`] - The [`GeocodeService`] facade
//! - [`storage`] - Object storage backends for the cache file
//! - [`types`] - Points, addresses, and route legs
//!
//! # Example
//!
//! ```
//! use geocode::cache::{lat_long_key, normalize};
//! use geocode::{distance, DistanceUnit, Point};
//!
//! assert_eq!(normalize("92612 "), "92612");
//! assert_eq!(lat_long_key(33.5, -117.25), "33dot500000:min117dot250000");
//!
//! let irvine = Point::new(33.6846, -117.8265);
//! assert_eq!(distance::distance(&irvine, &irvine, DistanceUnit::Miles).unwrap(), 0.0);
//! ```
//!
//! For service usage with a stub provider, see the integration tests.

pub mod cache;
pub mod cli;
pub mod config;
pub mod context;
pub mod distance;
pub mod error;
pub mod provider;
pub mod service;
pub mod storage;
pub mod types;

pub use config::GeocodeConfig;
pub use context::Context;
pub use distance::DistanceUnit;
pub use error::{GeocodeError, Result};
pub use provider::{GeocodeRequest, GeocodingProvider, GoogleProvider};
pub use service::{CacheStats, GeocodeService};
pub use types::{AddressQuery, DistanceMatrix, LegMetrics, Point, RouteLeg};
