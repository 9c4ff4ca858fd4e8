//! Geocoding facade.
//!
//! [`GeocodeService`] owns the provider, the cache store, and the optional
//! object storage sync. Lookups consult the cache first and fall through to
//! the provider on any cache error; successful provider answers are cached
//! for [`ONE_YEAR`]. Nothing reaches disk or remote storage until
//! [`GeocodeService::clear`] is called.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;

use crate::cache::{lat_long_key, normalize, CacheStore, CacheSync, ONE_YEAR};
use crate::config::GeocodeConfig;
use crate::context::Context;
use crate::distance::{self, DistanceUnit};
use crate::error::{GeocodeError, Result};
use crate::provider::{GeocodeRequest, GeocodingProvider, GoogleProvider};
use crate::storage::ObjectStorage;
use crate::types::{AddressQuery, Point, RouteLeg};

/// Snapshot of the cache for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub path: PathBuf,
    pub entries: usize,
    pub expired: usize,
    pub unsaved: bool,
}

/// Cached geocoding, reverse geocoding, distance, and routing.
pub struct GeocodeService {
    config: GeocodeConfig,
    provider: Box<dyn GeocodingProvider>,
    cache: Option<CacheStore>,
    sync: Option<CacheSync>,
}

impl GeocodeService {
    /// Create a service.
    ///
    /// With caching enabled, the cache file is first restored from
    /// `storage` (when given and no local copy exists) and then loaded.
    /// Restore and load failures are logged and the service starts with an
    /// empty cache.
    pub fn new(
        config: GeocodeConfig,
        provider: Box<dyn GeocodingProvider>,
        storage: Option<Box<dyn ObjectStorage>>,
    ) -> Result<Self> {
        config.validate()?;

        if !config.cached {
            tracing::debug!("Geocode cache disabled");
            return Ok(Self {
                config,
                provider,
                cache: None,
                sync: None,
            });
        }

        let cache_file = config.cache_file();
        let sync = match storage {
            Some(storage) => {
                let bucket = config.bucket_name.clone().unwrap_or_default();
                if bucket.is_empty() {
                    return Err(GeocodeError::MissingRequiredConfig {
                        field: "bucket_name".into(),
                    });
                }
                Some(CacheSync::new(storage, bucket, &cache_file))
            }
            None => None,
        };

        if let Some(sync) = &sync {
            if let Err(e) = sync.download_initial() {
                tracing::warn!("Could not restore geocode cache from storage: {}", e);
            }
        }

        let cache = match CacheStore::open(&cache_file) {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!("Could not load geocode cache: {}", e);
                CacheStore::new(&cache_file)
            }
        };
        tracing::debug!(
            "Loaded {} cached geocodes from {}",
            cache.len(),
            cache_file.display()
        );

        Ok(Self {
            config,
            provider,
            cache: Some(cache),
            sync,
        })
    }

    /// Create a service backed by the Google Maps provider and the storage
    /// backend named in `config`.
    pub fn google(config: GeocodeConfig) -> Result<Self> {
        config.validate()?;

        let mut provider = GoogleProvider::with_timeout(&config.geocoder_key, config.timeout())?;
        if let Some(host) = &config.host {
            provider = provider.with_host(host);
        }
        if let Some(path) = &config.path {
            provider = provider.with_path(path);
        }

        let storage = config.object_storage()?;
        Self::new(config, Box::new(provider), storage)
    }

    /// Get the configuration.
    pub fn config(&self) -> &GeocodeConfig {
        &self.config
    }

    /// Get the cache store, if caching is enabled.
    pub fn cache(&self) -> Option<&CacheStore> {
        self.cache.as_ref()
    }

    /// Geocode a postal code.
    ///
    /// An empty `country_code` uses the configured default country. The
    /// cache key is the normalized postal code alone.
    pub fn geocode(&mut self, ctx: &Context, postal_code: &str, country_code: &str) -> Result<Point> {
        ctx.check()?;

        let key = normalize(postal_code);
        if let Some(point) = self.cached::<Point>(&key) {
            return Ok(point);
        }

        let request = GeocodeRequest::PostalCode {
            postal_code: postal_code.to_string(),
            country: self.config.country_or_default(country_code).to_string(),
        };
        let point = self.first_result(ctx, &request)?;
        self.remember(key, &point);
        Ok(point)
    }

    /// Geocode a structured address.
    ///
    /// Tries free-form text, then the component filter, then the bare postal
    /// code; the first strategy with a result wins. If all fail, the last
    /// error is returned.
    pub fn geocode_address(&mut self, ctx: &Context, address: &AddressQuery) -> Result<Point> {
        ctx.check()?;

        let address = self.with_default_country(address);
        let key = normalize(&address.address_string());
        if let Some(point) = self.cached::<Point>(&key) {
            return Ok(point);
        }

        let mut last_error = GeocodeError::NoResults;
        for request in address_strategies(&address) {
            match self.first_result(ctx, &request) {
                Ok(point) => {
                    self.remember(key, &point);
                    return Ok(point);
                }
                Err(GeocodeError::NilContext) => return Err(GeocodeError::NilContext),
                Err(e) => {
                    tracing::debug!("Geocode strategy {:?} failed: {}", request, e);
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    /// Reverse geocode a coordinate.
    ///
    /// With a non-empty `hint`, the first result whose formatted address
    /// contains it (case-sensitive) is returned; otherwise the first result.
    pub fn geocode_lat_long(
        &mut self,
        ctx: &Context,
        latitude: f64,
        longitude: f64,
        hint: &str,
    ) -> Result<Point> {
        ctx.check()?;

        let mut key = lat_long_key(latitude, longitude);
        if !hint.is_empty() {
            key.push(':');
            key.push_str(&normalize(hint));
        }
        if let Some(point) = self.cached::<Point>(&key) {
            return Ok(point);
        }

        ctx.check()?;
        let results = self.provider.geocode(
            ctx,
            &GeocodeRequest::LatLng {
                latitude,
                longitude,
            },
        )?;

        let point = pick_by_hint(results, hint).ok_or(GeocodeError::NoResults)?;
        self.remember(key, &point);
        Ok(point)
    }

    /// Distance between two points in `unit`.
    pub fn get_distance(&self, ctx: &Context, unit: DistanceUnit, from: &Point, to: &Point) -> Result<f64> {
        ctx.check()?;
        distance::distance(from, to, unit)
    }

    /// Route legs between two addresses.
    pub fn get_route_for_address(
        &self,
        ctx: &Context,
        origin: &AddressQuery,
        destination: &AddressQuery,
    ) -> Result<Vec<RouteLeg>> {
        let origin = self.with_default_country(origin).address_string();
        let destination = self.with_default_country(destination).address_string();
        self.route(ctx, &origin, &destination)
    }

    /// Route legs between two coordinates.
    pub fn get_route_for_lat_long(
        &self,
        ctx: &Context,
        origin: &Point,
        destination: &Point,
    ) -> Result<Vec<RouteLeg>> {
        if !origin.is_valid() || !destination.is_valid() {
            return Err(GeocodeError::InvalidLatLng);
        }
        self.route(ctx, &origin.lat_lng_string(), &destination.lat_lng_string())
    }

    /// One leg per origin/destination pair of addresses, skipping pairs
    /// that render to the same string.
    pub fn get_route_matrix_for_address(
        &self,
        ctx: &Context,
        origins: &[AddressQuery],
        destinations: &[AddressQuery],
    ) -> Result<Vec<RouteLeg>> {
        let origins: Vec<String> = origins
            .iter()
            .map(|a| self.with_default_country(a).address_string())
            .collect();
        let destinations: Vec<String> = destinations
            .iter()
            .map(|a| self.with_default_country(a).address_string())
            .collect();
        self.route_matrix(ctx, &origins, &destinations)
    }

    /// One leg per origin/destination pair of coordinates, skipping pairs
    /// that render to the same `lat,lng` string.
    pub fn get_route_matrix_for_lat_long(
        &self,
        ctx: &Context,
        origins: &[Point],
        destinations: &[Point],
    ) -> Result<Vec<RouteLeg>> {
        let origins: Vec<String> = origins.iter().map(Point::lat_lng_string).collect();
        let destinations: Vec<String> = destinations.iter().map(Point::lat_lng_string).collect();
        self.route_matrix(ctx, &origins, &destinations)
    }

    /// Persist pending cache writes and back them up.
    ///
    /// Saves the cache file and uploads it when the store has unsaved
    /// entries. Without a storage backend the file is only saved locally.
    pub fn clear(&mut self) -> Result<()> {
        let Some(store) = self.cache.as_mut() else {
            return Ok(());
        };

        match &self.sync {
            Some(sync) => {
                sync.upload_if_dirty(store)?;
            }
            None if store.updated() => {
                store.save_file()?;
                tracing::info!("Saved geocode cache to {}", store.path().display());
            }
            None => {}
        }
        Ok(())
    }

    /// Current cache statistics, if caching is enabled.
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|store| CacheStats {
            path: store.path().to_path_buf(),
            entries: store.len(),
            expired: store.expired_count(),
            unsaved: store.updated(),
        })
    }

    /// Drop expired cache entries. Returns how many were removed.
    pub fn purge_expired(&mut self) -> usize {
        self.cache
            .as_mut()
            .map(CacheStore::purge_expired)
            .unwrap_or(0)
    }

    fn with_default_country(&self, address: &AddressQuery) -> AddressQuery {
        let mut address = address.clone();
        if address.country.trim().is_empty() {
            address.country = self.config.default_country.clone();
        }
        address
    }

    fn first_result(&self, ctx: &Context, request: &GeocodeRequest) -> Result<Point> {
        ctx.check()?;
        self.provider
            .geocode(ctx, request)?
            .into_iter()
            .next()
            .ok_or(GeocodeError::NoResults)
    }

    fn route(&self, ctx: &Context, origin: &str, destination: &str) -> Result<Vec<RouteLeg>> {
        ctx.check()?;
        let legs = self.provider.directions(ctx, origin, destination)?;
        if legs.is_empty() {
            return Err(GeocodeError::NoResults);
        }
        Ok(legs)
    }

    fn route_matrix(
        &self,
        ctx: &Context,
        origins: &[String],
        destinations: &[String],
    ) -> Result<Vec<RouteLeg>> {
        ctx.check()?;
        if origins.is_empty() || destinations.is_empty() {
            return Ok(Vec::new());
        }

        let matrix = self.provider.distance_matrix(ctx, origins, destinations)?;
        if matrix.rows.len() != origins.len()
            || matrix.rows.iter().any(|row| row.len() != destinations.len())
        {
            return Err(GeocodeError::provider(format!(
                "distance matrix shape does not match {} origins x {} destinations",
                origins.len(),
                destinations.len()
            )));
        }

        let mut legs = Vec::new();
        for (i, row) in matrix.rows.iter().enumerate() {
            for (j, metrics) in row.iter().enumerate() {
                if origins[i] == destinations[j] {
                    continue;
                }
                legs.push(RouteLeg {
                    start: resolved_or(&matrix.origin_addresses, i, &origins[i]),
                    end: resolved_or(&matrix.destination_addresses, j, &destinations[j]),
                    duration: metrics.duration,
                    distance_meters: metrics.distance_meters,
                });
            }
        }
        Ok(legs)
    }

    fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let store = self.cache.as_ref()?;
        match store.get_as::<T>(key) {
            Ok((value, expires_at)) => {
                tracing::debug!("Cache hit for {} (expires {})", key, expires_at);
                Some(value)
            }
            Err(e @ GeocodeError::CacheCorrupt { .. }) => {
                tracing::warn!("{}", e);
                None
            }
            Err(e) if e.is_cache_error() => {
                tracing::debug!("{}", e);
                None
            }
            Err(e) => {
                tracing::warn!("Cache lookup for {} failed: {}", key, e);
                None
            }
        }
    }

    fn remember<T: Serialize>(&mut self, key: String, value: &T) {
        let Some(store) = self.cache.as_mut() else {
            return;
        };
        match store.set(key.as_str(), value, ONE_YEAR) {
            Ok(expires_at) => tracing::debug!("Cached {} until {}", key, expires_at),
            Err(e) => tracing::warn!("Could not cache {}: {}", key, e),
        }
    }
}

impl Drop for GeocodeService {
    fn drop(&mut self) {
        if let Some(store) = &self.cache {
            if store.updated() {
                tracing::warn!(
                    "Geocode cache {} dropped with unsaved entries; call clear() to persist",
                    store.path().display()
                );
            }
        }
    }
}

/// Provider queries to try for an address, in order.
fn address_strategies(address: &AddressQuery) -> Vec<GeocodeRequest> {
    let mut strategies = vec![
        GeocodeRequest::Address(address.address_string()),
        GeocodeRequest::Components(address.clone()),
    ];
    if !address.postal_code.trim().is_empty() {
        strategies.push(GeocodeRequest::PostalCode {
            postal_code: address.postal_code.clone(),
            country: address.country.clone(),
        });
    }
    strategies
}

/// First point whose formatted address contains `hint`, else the first point.
fn pick_by_hint(results: Vec<Point>, hint: &str) -> Option<Point> {
    if !hint.is_empty() {
        if let Some(index) = results.iter().position(|p| {
            p.formatted_address
                .as_deref()
                .is_some_and(|address| address.contains(hint))
        }) {
            return results.into_iter().nth(index);
        }
    }
    results.into_iter().next()
}

fn resolved_or(resolved: &[String], index: usize, fallback: &str) -> String {
    resolved
        .get(index)
        .filter(|s| !s.is_empty())
        .cloned()
        .unwrap_or_else(|| fallback.to_string())
}
