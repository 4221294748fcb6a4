//! Geocoding providers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::config::{GeocoderConfig, GeocoderProvider};
use crate::errors::ApiError;

/// One geocoding hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodedAddress {
    pub longitude: f64,
    pub latitude: f64,
    #[serde(default)]
    pub formatted_address: Option<String>,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zipcode: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GeocodingError {
    /// The provider answered but found nothing for the query.
    #[error("no location found for '{query}'")]
    NoMatch { query: String },

    /// The provider could not be reached or returned something unusable.
    #[error("geocoding provider unavailable: {reason}")]
    Unavailable { reason: String },
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Results in provider order; an empty vector means no match.
    async fn geocode(&self, address: &str) -> Result<Vec<GeocodedAddress>, GeocodingError>;
}

/// Upper bound on one provider round-trip.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for MapQuest-compatible `geocoding/v1/address` endpoints.
pub struct MapQuestGeocoder {
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
}

impl MapQuestGeocoder {
    /// # Errors
    ///
    /// Returns a configuration error when `base_url` is not an absolute URL.
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self, ApiError> {
        let mut endpoint = Url::parse(base_url)
            .map_err(|err| ApiError::configuration(format!("invalid geocoder base URL '{base_url}': {err}")))?;
        endpoint
            .path_segments_mut()
            .map_err(|()| ApiError::configuration(format!("invalid geocoder base URL '{base_url}'")))?
            .pop_if_empty()
            .extend(["geocoding", "v1", "address"]);
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| ApiError::configuration(format!("cannot build geocoder HTTP client: {err}")))?;
        Ok(Self {
            client,
            endpoint,
            api_key: api_key.into(),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[derive(Debug, Deserialize)]
struct MapQuestResponse {
    #[serde(default)]
    results: Vec<MapQuestResult>,
}

#[derive(Debug, Deserialize)]
struct MapQuestResult {
    #[serde(default)]
    locations: Vec<MapQuestLocation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MapQuestLocation {
    lat_lng: MapQuestLatLng,
    #[serde(default)]
    street: Option<String>,
    #[serde(default)]
    admin_area5: Option<String>,
    #[serde(default)]
    admin_area3: Option<String>,
    #[serde(default)]
    postal_code: Option<String>,
    #[serde(default)]
    admin_area1: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MapQuestLatLng {
    lat: f64,
    lng: f64,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl From<MapQuestLocation> for GeocodedAddress {
    fn from(location: MapQuestLocation) -> Self {
        let street = non_empty(location.street);
        let city = non_empty(location.admin_area5);
        let state = non_empty(location.admin_area3);
        let zipcode = non_empty(location.postal_code);
        let country = non_empty(location.admin_area1);

        let locality = [state.clone(), zipcode.clone()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        let parts: Vec<String> = [street.clone(), city.clone(), Some(locality), country.clone()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect();

        Self {
            longitude: location.lat_lng.lng,
            latitude: location.lat_lng.lat,
            formatted_address: (!parts.is_empty()).then(|| parts.join(", ")),
            street,
            city,
            state,
            zipcode,
            country,
        }
    }
}

#[async_trait]
impl Geocoder for MapQuestGeocoder {
    async fn geocode(&self, address: &str) -> Result<Vec<GeocodedAddress>, GeocodingError> {
        let unavailable = |reason: String| GeocodingError::Unavailable { reason };

        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[
                ("key", self.api_key.as_str()),
                ("location", address),
                ("maxResults", "1"),
            ])
            .send()
            .await
            .map_err(|err| unavailable(format!("request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(unavailable(format!("provider returned HTTP {status}")));
        }

        let body: MapQuestResponse = response
            .json()
            .await
            .map_err(|err| unavailable(format!("unreadable provider response: {err}")))?;

        Ok(body
            .results
            .into_iter()
            .next()
            .map(|result| result.locations.into_iter().map(Into::into).collect())
            .unwrap_or_default())
    }
}

/// Fixed lookup table, for offline runs and tests.
///
/// Keys are compared case-insensitively with whitespace collapsed.
#[derive(Debug, Clone, Default)]
pub struct StaticGeocoder {
    entries: HashMap<String, GeocodedAddress>,
}

fn normalize(address: &str) -> String {
    address
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl StaticGeocoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_point(self, address: &str, longitude: f64, latitude: f64) -> Self {
        self.with_address(
            GeocodedAddress {
                longitude,
                latitude,
                formatted_address: Some(address.to_string()),
                street: None,
                city: None,
                state: None,
                zipcode: None,
                country: None,
            },
            address,
        )
    }

    #[must_use]
    pub fn with_address(mut self, found: GeocodedAddress, address: &str) -> Self {
        self.entries.insert(normalize(address), found);
        self
    }

    /// Load a JSON object mapping address strings to [`GeocodedAddress`] values.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the file is unreadable or malformed.
    pub fn from_file(path: &Path) -> Result<Self, ApiError> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            ApiError::configuration(format!("cannot read geocoder fixtures {}: {err}", path.display()))
        })?;
        let entries: HashMap<String, GeocodedAddress> = serde_json::from_str(&raw).map_err(|err| {
            ApiError::configuration(format!("invalid geocoder fixtures {}: {err}", path.display()))
        })?;
        Ok(entries
            .into_iter()
            .fold(Self::new(), |geocoder, (address, found)| {
                geocoder.with_address(found, &address)
            }))
    }
}

#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn geocode(&self, address: &str) -> Result<Vec<GeocodedAddress>, GeocodingError> {
        Ok(self
            .entries
            .get(&normalize(address))
            .cloned()
            .into_iter()
            .collect())
    }
}

/// Build the configured provider.
///
/// # Errors
///
/// Returns a configuration error when the provider's settings are incomplete.
pub fn build_geocoder(config: &GeocoderConfig) -> Result<Arc<dyn Geocoder>, ApiError> {
    match config.provider {
        GeocoderProvider::Mapquest => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                ApiError::configuration("the mapquest geocoder needs an API key")
            })?;
            Ok(Arc::new(MapQuestGeocoder::new(&config.base_url, api_key)?))
        }
        GeocoderProvider::Static => {
            let geocoder = match &config.fixtures {
                Some(path) => StaticGeocoder::from_file(path)?,
                None => StaticGeocoder::new(),
            };
            Ok(Arc::new(geocoder))
        }
    }
}
