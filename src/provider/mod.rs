//! Geocoding and directions providers.
//!
//! [`GeocodingProvider`] is the seam between the service and a remote maps
//! API. [`GoogleProvider`] implements it against the Google Maps web
//! services; tests substitute their own stub.

pub mod google;

pub use google::GoogleProvider;

use crate::context::Context;
use crate::error::Result;
use crate::types::{AddressQuery, DistanceMatrix, Point, RouteLeg};

/// One geocoding query.
#[derive(Debug, Clone, PartialEq)]
pub enum GeocodeRequest {
    /// Postal code within a country.
    PostalCode {
        postal_code: String,
        country: String,
    },
    /// Free-form address text.
    Address(String),
    /// Structured component filter.
    Components(AddressQuery),
    /// Reverse geocode.
    LatLng { latitude: f64, longitude: f64 },
}

/// A remote geocoding/directions API.
///
/// Implementations return every result the API gives, in the API's order.
/// An empty list means the call succeeded but matched nothing.
pub trait GeocodingProvider {
    /// Resolve a query to zero or more points.
    fn geocode(&self, ctx: &Context, request: &GeocodeRequest) -> Result<Vec<Point>>;

    /// Legs of the route from `origin` to `destination`.
    fn directions(&self, ctx: &Context, origin: &str, destination: &str) -> Result<Vec<RouteLeg>>;

    /// Travel metrics for every origin/destination pair.
    fn distance_matrix(
        &self,
        ctx: &Context,
        origins: &[String],
        destinations: &[String],
    ) -> Result<DistanceMatrix>;
}
