//! Core data types shared by the provider, cache, and service layers.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::Duration;

/// A resolved geographic location.
///
/// A zero coordinate marks the point as unset, so `(0, 0)` and any point on
/// the equator or the prime meridian are treated as invalid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Provider-formatted address, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_address: Option<String>,
}

impl Point {
    /// Create a point without a formatted address.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            formatted_address: None,
        }
    }

    /// Attach a formatted address.
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.formatted_address = Some(address.into());
        self
    }

    /// Both coordinates are set (non-zero).
    pub fn is_valid(&self) -> bool {
        self.latitude != 0.0 && self.longitude != 0.0
    }

    /// `"lat,lng"` with six decimals, as sent to the provider.
    pub fn lat_lng_string(&self) -> String {
        format!("{:.6},{:.6}", self.latitude, self.longitude)
    }
}

/// A structured postal address. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressQuery {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub country: String,
}

impl AddressQuery {
    /// Compose the address as street, city, state, postal code, country,
    /// space-joined with empty fields skipped.
    pub fn address_string(&self) -> String {
        [
            &self.street,
            &self.city,
            &self.state,
            &self.postal_code,
            &self.country,
        ]
        .into_iter()
        .filter(|part| !part.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
    }
}

/// One leg of a route as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteLeg {
    pub start: String,
    pub end: String,
    #[serde(rename = "duration_secs", with = "duration_secs")]
    pub duration: Duration,
    pub distance_meters: u64,
}

/// Serializes a `Duration` as whole seconds.
mod duration_secs {
    use super::*;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

/// Travel time and distance for one origin/destination cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegMetrics {
    pub duration: Duration,
    pub distance_meters: u64,
}

/// A provider distance matrix: `rows[i][j]` is origin `i` to destination `j`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistanceMatrix {
    pub origin_addresses: Vec<String>,
    pub destination_addresses: Vec<String>,
    pub rows: Vec<Vec<LegMetrics>>,
}
