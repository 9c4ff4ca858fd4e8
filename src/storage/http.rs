//! HTTP object storage.
//!
//! Talks to any blob endpoint that accepts `PUT` and serves `GET` at
//! `<base>/<bucket>/<object key>`, such as a GCS or S3 bucket behind a
//! signing proxy.

use reqwest::blocking::Client;
use std::io::{Read, Write};
use std::time::Duration;
use url::Url;

use super::{CloudFileRequest, ObjectStorage};
use crate::error::{GeocodeError, Result};

/// Header carrying the local file's modification time.
pub const MOD_TIME_HEADER: &str = "x-goog-meta-mod-time";

/// Uploads and downloads objects over HTTP.
pub struct HttpObjectStorage {
    client: Client,
    base_url: Url,
}

impl HttpObjectStorage {
    /// Create a storage client with a 60-second timeout.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(60))
    }

    /// Create a storage client with a custom timeout.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| GeocodeError::sync(format!("invalid storage url {}: {}", base_url, e)))?;
        let client = Client::builder()
            .user_agent(concat!("geocode/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(GeocodeError::sync)?;

        Ok(Self { client, base_url })
    }

    /// Full URL of an object.
    pub fn object_url(&self, request: &CloudFileRequest) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GeocodeError::sync(format!("storage url {} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .push(&request.bucket)
            .extend(request.object_segments());
        Ok(url)
    }
}

impl ObjectStorage for HttpObjectStorage {
    fn upload(&self, reader: &mut dyn Read, request: &CloudFileRequest) -> Result<u64> {
        let url = self.object_url(request)?;

        let mut body = Vec::new();
        reader
            .read_to_end(&mut body)
            .map_err(|e| GeocodeError::sync(format!("reading upload body: {}", e)))?;
        let size = body.len() as u64;

        let response = self
            .client
            .put(url.clone())
            .header(MOD_TIME_HEADER, request.mod_time.to_string())
            .body(body)
            .send()
            .map_err(|e| GeocodeError::sync(format!("uploading to {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(GeocodeError::sync(format!(
                "HTTP {} uploading to {}",
                response.status(),
                url
            )));
        }

        Ok(size)
    }

    fn download(&self, writer: &mut dyn Write, request: &CloudFileRequest) -> Result<u64> {
        let url = self.object_url(request)?;

        let response = self
            .client
            .get(url.clone())
            .header(MOD_TIME_HEADER, request.mod_time.to_string())
            .send()
            .map_err(|e| GeocodeError::sync(format!("downloading {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(GeocodeError::sync(format!(
                "HTTP {} downloading {}",
                response.status(),
                url
            )));
        }

        let bytes = response
            .bytes()
            .map_err(|e| GeocodeError::sync(format!("reading {}: {}", url, e)))?;
        writer
            .write_all(&bytes)
            .map_err(|e| GeocodeError::sync(format!("writing download: {}", e)))?;

        Ok(bytes.len() as u64)
    }
}
