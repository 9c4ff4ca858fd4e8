//! Google Maps web services provider.
//!
//! Uses the geocoding, directions, and distance matrix JSON endpoints over
//! blocking HTTP. The API key is sent as a query parameter and stripped
//! from any error message.

use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use super::{GeocodeRequest, GeocodingProvider};
use crate::context::Context;
use crate::error::{GeocodeError, Result};
use crate::types::{AddressQuery, DistanceMatrix, LegMetrics, Point, RouteLeg};

/// Default API host.
pub const DEFAULT_HOST: &str = "https://maps.googleapis.com";

/// Default geocoding endpoint path.
pub const GEOCODE_PATH: &str = "/maps/api/geocode/json";

const DIRECTIONS_PATH: &str = "/maps/api/directions/json";
const DISTANCE_MATRIX_PATH: &str = "/maps/api/distancematrix/json";

/// Client for the Google Maps web services.
pub struct GoogleProvider {
    client: Client,
    key: String,
    host: String,
    path: String,
    timeout: Duration,
}

impl GoogleProvider {
    /// Create a provider with the default host and a 30-second timeout.
    pub fn new(key: impl Into<String>) -> Result<Self> {
        Self::with_timeout(key, Duration::from_secs(30))
    }

    /// Create a provider with a custom timeout.
    pub fn with_timeout(key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let key = key.into();
        if key.is_empty() {
            return Err(GeocodeError::MissingRequiredConfig {
                field: "geocoder_key".into(),
            });
        }

        let client = Client::builder()
            .user_agent(concat!("geocode/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(GeocodeError::provider)?;

        Ok(Self {
            client,
            key,
            host: DEFAULT_HOST.to_string(),
            path: GEOCODE_PATH.to_string(),
            timeout,
        })
    }

    /// Override the API host (e.g. a proxy or a mock server).
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Override the geocoding endpoint path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.host.trim_end_matches('/'), path)
    }

    /// GET an endpoint and decode its JSON body.
    fn get_json<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        ctx.check()?;

        let url = self.endpoint(path);
        let mut request = self
            .client
            .get(&url)
            .query(params)
            .query(&[("key", self.key.as_str())]);
        if let Some(remaining) = ctx.remaining() {
            request = request.timeout(remaining.min(self.timeout));
        }

        let response = request
            .send()
            .map_err(|e| GeocodeError::provider(e.without_url()))?;

        if !response.status().is_success() {
            return Err(GeocodeError::provider(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        response
            .json::<T>()
            .map_err(|e| GeocodeError::provider(e.without_url()))
    }
}

/// Query parameters for a geocoding request.
fn geocode_params(request: &GeocodeRequest) -> Vec<(&'static str, String)> {
    match request {
        GeocodeRequest::PostalCode {
            postal_code,
            country,
        } => vec![(
            "components",
            format!("country:{}|postal_code:{}", country, postal_code),
        )],
        GeocodeRequest::Address(address) => vec![("address", address.clone())],
        GeocodeRequest::Components(address) => {
            vec![("components", component_filter(address))]
        }
        GeocodeRequest::LatLng {
            latitude,
            longitude,
        } => vec![("latlng", format!("{:.6},{:.6}", latitude, longitude))],
    }
}

/// `name:value|name:value` filter in a fixed component order.
fn component_filter(address: &AddressQuery) -> String {
    [
        ("street_address", &address.street),
        ("locality", &address.city),
        ("administrative_area_level_1", &address.state),
        ("postal_code", &address.postal_code),
        ("country", &address.country),
    ]
    .into_iter()
    .filter(|(_, value)| !value.is_empty())
    .map(|(name, value)| format!("{}:{}", name, value))
    .collect::<Vec<_>>()
    .join("|")
}

/// `true` if results are present, `false` for a successful empty answer.
fn check_status(status: &str, error_message: Option<&str>) -> Result<bool> {
    match status {
        "OK" => Ok(true),
        "ZERO_RESULTS" | "NOT_FOUND" => Ok(false),
        other => Err(GeocodeError::provider(match error_message {
            Some(message) => format!("{}: {}", other, message),
            None => other.to_string(),
        })),
    }
}

impl GeocodingProvider for GoogleProvider {
    fn geocode(&self, ctx: &Context, request: &GeocodeRequest) -> Result<Vec<Point>> {
        let response: GeocodeResponse =
            self.get_json(ctx, &self.path, &geocode_params(request))?;

        if !check_status(&response.status, response.error_message.as_deref())? {
            tracing::debug!("No geocode results for {:?}", request);
            return Ok(Vec::new());
        }

        Ok(response
            .results
            .into_iter()
            .map(|result| Point {
                latitude: result.geometry.location.lat,
                longitude: result.geometry.location.lng,
                formatted_address: Some(result.formatted_address).filter(|a| !a.is_empty()),
            })
            .collect())
    }

    fn directions(&self, ctx: &Context, origin: &str, destination: &str) -> Result<Vec<RouteLeg>> {
        let params = [
            ("origin", origin.to_string()),
            ("destination", destination.to_string()),
        ];
        let response: DirectionsResponse = self.get_json(ctx, DIRECTIONS_PATH, &params)?;

        if !check_status(&response.status, response.error_message.as_deref())? {
            return Ok(Vec::new());
        }

        Ok(response
            .routes
            .into_iter()
            .next()
            .map(|route| {
                route
                    .legs
                    .into_iter()
                    .map(|leg| RouteLeg {
                        start: leg.start_address,
                        end: leg.end_address,
                        duration: Duration::from_secs(leg.duration.value),
                        distance_meters: leg.distance.value,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    fn distance_matrix(
        &self,
        ctx: &Context,
        origins: &[String],
        destinations: &[String],
    ) -> Result<DistanceMatrix> {
        let params = [
            ("origins", origins.join("|")),
            ("destinations", destinations.join("|")),
        ];
        let response: DistanceMatrixResponse =
            self.get_json(ctx, DISTANCE_MATRIX_PATH, &params)?;

        if !check_status(&response.status, response.error_message.as_deref())? {
            return Ok(DistanceMatrix::default());
        }

        let mut rows = Vec::with_capacity(response.rows.len());
        for (i, row) in response.rows.into_iter().enumerate() {
            let mut cells = Vec::with_capacity(row.elements.len());
            for (j, element) in row.elements.into_iter().enumerate() {
                let (Some(duration), Some(distance), "OK") =
                    (element.duration, element.distance, element.status.as_str())
                else {
                    return Err(GeocodeError::provider(format!(
                        "distance matrix element ({}, {}) returned {}",
                        i, j, element.status
                    )));
                };
                cells.push(LegMetrics {
                    duration: Duration::from_secs(duration.value),
                    distance_meters: distance.value,
                });
            }
            rows.push(cells);
        }

        Ok(DistanceMatrix {
            origin_addresses: response.origin_addresses,
            destination_addresses: response.destination_addresses,
            rows,
        })
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeResult>,
    status: String,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    #[serde(default)]
    formatted_address: String,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    routes: Vec<Route>,
    status: String,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Route {
    #[serde(default)]
    legs: Vec<Leg>,
}

#[derive(Debug, Deserialize)]
struct Leg {
    #[serde(default)]
    start_address: String,
    #[serde(default)]
    end_address: String,
    duration: TextValue,
    distance: TextValue,
}

/// `{ "text": "5 mins", "value": 300 }`
#[derive(Debug, Deserialize)]
struct TextValue {
    value: u64,
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixResponse {
    #[serde(default)]
    origin_addresses: Vec<String>,
    #[serde(default)]
    destination_addresses: Vec<String>,
    #[serde(default)]
    rows: Vec<MatrixRow>,
    status: String,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MatrixRow {
    #[serde(default)]
    elements: Vec<MatrixElement>,
}

#[derive(Debug, Deserialize)]
struct MatrixElement {
    status: String,
    #[serde(default)]
    duration: Option<TextValue>,
    #[serde(default)]
    distance: Option<TextValue>,
}
