//! Great-circle distance on the WGS-84 ellipsoid.

use geo::{Point as GeoPoint, VincentyDistance};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{GeocodeError, Result};
use crate::types::Point;

const METERS_PER_MILE: f64 = 1609.344;
const METERS_PER_FOOT: f64 = 0.3048;

/// Unit for [`distance`] results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DistanceUnit {
    #[serde(rename = "KM")]
    Kilometers,
    Miles,
    Meters,
    Feet,
}

impl DistanceUnit {
    /// Convert a length in meters to this unit.
    pub fn from_meters(self, meters: f64) -> f64 {
        match self {
            DistanceUnit::Kilometers => meters / 1000.0,
            DistanceUnit::Miles => meters / METERS_PER_MILE,
            DistanceUnit::Meters => meters,
            DistanceUnit::Feet => meters / METERS_PER_FOOT,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DistanceUnit::Kilometers => "KM",
            DistanceUnit::Miles => "MILES",
            DistanceUnit::Meters => "METERS",
            DistanceUnit::Feet => "FEET",
        }
    }
}

impl fmt::Display for DistanceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceUnit {
    type Err = GeocodeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "KM" | "KILOMETERS" => Ok(DistanceUnit::Kilometers),
            "MILES" | "MI" => Ok(DistanceUnit::Miles),
            "METERS" | "M" => Ok(DistanceUnit::Meters),
            "FEET" | "FT" => Ok(DistanceUnit::Feet),
            _ => Err(GeocodeError::InvalidUnit {
                unit: s.to_string(),
            }),
        }
    }
}

/// Vincenty distance between two points in meters.
pub fn distance_meters(from: &Point, to: &Point) -> Result<f64> {
    let a = GeoPoint::new(from.longitude, from.latitude);
    let b = GeoPoint::new(to.longitude, to.latitude);
    a.vincenty_distance(&b)
        .map_err(|_| GeocodeError::DistanceDidNotConverge)
}

/// Vincenty distance between two points in `unit`.
///
/// Fails with [`GeocodeError::InvalidLatLng`] if either point has a zero
/// coordinate.
pub fn distance(from: &Point, to: &Point, unit: DistanceUnit) -> Result<f64> {
    if !from.is_valid() || !to.is_valid() {
        return Err(GeocodeError::InvalidLatLng);
    }
    Ok(unit.from_meters(distance_meters(from, to)?))
}
