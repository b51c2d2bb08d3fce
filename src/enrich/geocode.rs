//! Geocoding enrichment.
//!
//! Each facility's street + city + province is sent to the geocoding
//! service; the first result supplies latitude/longitude, and its last
//! address component doubles as a postal-code fallback for facilities whose
//! source postal code is empty.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::Facility;

/// Per-facility geocoding failures. Recoverable: the facility keeps unset
/// coordinates and the pass continues.
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("geocode request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("no geocoding results for {0:?}")]
    NoResults(String),

    #[error("unexpected geocoding response shape: {0}")]
    Shape(String),
}

/// First-result coordinates plus the postal-code hint taken from the last
/// address component.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
    pub postal_hint: Option<String>,
}

/// Address-to-coordinates lookup. A trait so tests can substitute a canned
/// implementation for the HTTP service.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn locate(&self, address: &str) -> Result<GeoPoint, GeocodeError>;
}

/// Geocoder backed by the configured JSON endpoint.
pub struct HttpGeocoder {
    http: Client,
    endpoint: String,
    api_key: String,
}

impl HttpGeocoder {
    pub fn new(endpoint: String, api_key: String, timeout: Duration) -> Self {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");
        Self {
            http,
            endpoint,
            api_key,
        }
    }
}

#[async_trait]
impl Geocoder for HttpGeocoder {
    async fn locate(&self, address: &str) -> Result<GeoPoint, GeocodeError> {
        let response: Value = self
            .http
            .get(&self.endpoint)
            .query(&[("address", address), ("key", self.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        parse_geocode_response(address, &response)
    }
}

/// Pull lat/lng and the postal hint out of a geocoding response body.
pub fn parse_geocode_response(address: &str, body: &Value) -> Result<GeoPoint, GeocodeError> {
    let first = body
        .get("results")
        .and_then(|r| r.as_array())
        .and_then(|r| r.first())
        .ok_or_else(|| GeocodeError::NoResults(address.to_string()))?;

    let location = first
        .get("geometry")
        .and_then(|g| g.get("location"))
        .ok_or_else(|| GeocodeError::Shape("missing geometry.location".to_string()))?;
    let lat = location
        .get("lat")
        .and_then(|v| v.as_f64())
        .ok_or_else(|| GeocodeError::Shape("missing geometry.location.lat".to_string()))?;
    let lng = location
        .get("lng")
        .and_then(|v| v.as_f64())
        .ok_or_else(|| GeocodeError::Shape("missing geometry.location.lng".to_string()))?;

    let postal_hint = first
        .get("address_components")
        .and_then(|c| c.as_array())
        .and_then(|c| c.last())
        .and_then(|c| c.get("short_name"))
        .and_then(|v| v.as_str())
        .map(str::to_string);

    Ok(GeoPoint {
        lat,
        lng,
        postal_hint,
    })
}

/// Geocode every facility in place. One failed lookup is logged and counted;
/// the rest of the pass continues. Returns the failure count.
pub async fn enrich_geo(geocoder: &dyn Geocoder, facilities: &mut [Facility]) -> usize {
    let mut failures = 0;
    for facility in facilities.iter_mut() {
        debug!("Geocoding facility: {}", facility.name);
        let address = format!("{} {} {}", facility.street, facility.city, facility.province);
        match geocoder.locate(&address).await {
            Ok(point) => {
                facility.lat = Some(point.lat);
                facility.lng = Some(point.lng);
                if facility.postal_code.is_empty() {
                    if let Some(postal) = point.postal_hint {
                        facility.postal_code = postal;
                    }
                }
            }
            Err(e) => {
                warn!("Geocoding failed for {}: {}", facility.name, e);
                failures += 1;
            }
        }
    }
    failures
}
