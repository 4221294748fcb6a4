//! Geospatial resolution: address → coordinates → radius query.
//!
//! Radius queries use center-sphere semantics: a point is inside when the
//! great-circle central angle between it and the center is at most
//! `distance / earth_radius` radians.

pub mod geocoder;

use serde_json::{Value, json};
use std::sync::Arc;

use crate::errors::ApiError;
use crate::store::Document;
use geocoder::{GeocodedAddress, Geocoder, GeocodingError};

/// Mean earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6378.0;

/// Mean earth radius in miles.
pub const EARTH_RADIUS_MILES: f64 = 3963.0;

/// A validated WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

impl GeoPoint {
    /// # Errors
    ///
    /// Returns a validation error when either coordinate is out of range.
    pub fn new(longitude: f64, latitude: f64) -> Result<Self, ApiError> {
        if !(-180.0..=180.0).contains(&longitude) || !(-90.0..=90.0).contains(&latitude) {
            return Err(ApiError::validation(format!(
                "Coordinates out of range: ({longitude}, {latitude})"
            )));
        }
        Ok(Self {
            longitude,
            latitude,
        })
    }

    /// Read a GeoJSON `Point` (`{"type":"Point","coordinates":[lng,lat]}`).
    #[must_use]
    pub fn from_geojson(value: &Value) -> Option<Self> {
        let coordinates = value.get("coordinates")?.as_array()?;
        if coordinates.len() != 2 {
            return None;
        }
        Self::new(coordinates[0].as_f64()?, coordinates[1].as_f64()?).ok()
    }

    /// Great-circle angle between two points, in radians (haversine).
    #[must_use]
    pub fn central_angle(&self, other: &Self) -> f64 {
        let (lat1, lat2) = (self.latitude.to_radians(), other.latitude.to_radians());
        let d_lat = lat2 - lat1;
        let d_lng = (other.longitude - self.longitude).to_radians();
        let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
        2.0 * h.sqrt().min(1.0).asin()
    }
}

/// Everything within `radius_radians` of `center`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusQuery {
    pub center: GeoPoint,
    pub radius_radians: f64,
}

impl RadiusQuery {
    /// # Errors
    ///
    /// Returns a validation error for a negative or non-finite distance.
    pub fn new(center: GeoPoint, distance: f64, earth_radius: f64) -> Result<Self, ApiError> {
        if !distance.is_finite() || distance < 0.0 {
            return Err(ApiError::validation(format!(
                "Distance must be a non-negative number, got {distance}"
            )));
        }
        Ok(Self {
            center,
            radius_radians: distance / earth_radius,
        })
    }

    #[must_use]
    pub fn contains(&self, point: &GeoPoint) -> bool {
        self.center.central_angle(point) <= self.radius_radians
    }

    /// Latitude range (degrees) that can contain matches, for index prefilters.
    #[must_use]
    pub fn latitude_band(&self) -> (f64, f64) {
        let spread = self.radius_radians.to_degrees();
        (
            (self.center.latitude - spread).max(-90.0),
            (self.center.latitude + spread).min(90.0),
        )
    }
}

/// Unit of the distance path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceUnit {
    #[default]
    Kilometers,
    Miles,
}

impl DistanceUnit {
    #[must_use]
    pub const fn earth_radius(self) -> f64 {
        match self {
            Self::Kilometers => EARTH_RADIUS_KM,
            Self::Miles => EARTH_RADIUS_MILES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoConfig {
    /// Unit radius-search distances are given in.
    pub unit: DistanceUnit,
    /// Earth radius in `unit`.
    pub earth_radius: f64,
}

impl GeoConfig {
    /// Earth radius to divide a distance in `unit` by.
    #[must_use]
    pub fn earth_radius_for(&self, unit: DistanceUnit) -> f64 {
        if unit == self.unit {
            self.earth_radius
        } else {
            unit.earth_radius()
        }
    }
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            unit: DistanceUnit::Kilometers,
            earth_radius: EARTH_RADIUS_KM,
        }
    }
}

/// Turns addresses into points and radius queries.
#[derive(Clone)]
pub struct GeoResolver {
    geocoder: Arc<dyn Geocoder>,
    config: GeoConfig,
}

impl GeoResolver {
    pub fn new(geocoder: Arc<dyn Geocoder>, config: GeoConfig) -> Self {
        Self { geocoder, config }
    }

    #[must_use]
    pub fn config(&self) -> GeoConfig {
        self.config
    }

    async fn first_match(&self, address: &str) -> Result<GeocodedAddress, ApiError> {
        let results = self.geocoder.geocode(address).await.inspect_err(|err| {
            tracing::warn!(address = %address, error = %err, "Geocoding failed");
        })?;
        results.into_iter().next().ok_or_else(|| {
            GeocodingError::NoMatch {
                query: address.to_string(),
            }
            .into()
        })
    }

    /// Geocode `address` and build a radius of `distance` (in `unit`) around it.
    ///
    /// # Errors
    ///
    /// Fails with a validation error for a bad distance, `NoMatch` when the
    /// address resolves to nothing and `Unavailable` when the provider fails.
    pub async fn resolve_radius(
        &self,
        address: &str,
        distance: f64,
        unit: DistanceUnit,
    ) -> Result<RadiusQuery, ApiError> {
        // Reject bad distances before spending a provider call.
        if !distance.is_finite() || distance < 0.0 {
            return Err(ApiError::validation(format!(
                "Distance must be a non-negative number, got {distance}"
            )));
        }
        let found = self.first_match(address).await?;
        let center = provider_point(&found)?;
        let query = RadiusQuery::new(center, distance, self.config.earth_radius_for(unit))?;
        tracing::debug!(
            address = %address,
            longitude = center.longitude,
            latitude = center.latitude,
            radius_radians = query.radius_radians,
            "Resolved radius query"
        );
        Ok(query)
    }

    /// Geocode `address` into a stored GeoJSON location.
    ///
    /// # Errors
    ///
    /// Same geocoding failures as [`GeoResolver::resolve_radius`].
    pub async fn locate(&self, address: &str) -> Result<Document, ApiError> {
        let found = self.first_match(address).await?;
        provider_point(&found)?;
        Ok(location_document(&found))
    }
}

/// Coordinates outside the valid ranges are a provider fault, not a bad request.
fn provider_point(found: &GeocodedAddress) -> Result<GeoPoint, GeocodingError> {
    GeoPoint::new(found.longitude, found.latitude).map_err(|_| GeocodingError::Unavailable {
        reason: format!(
            "provider returned out-of-range coordinates ({}, {})",
            found.longitude, found.latitude
        ),
    })
}

fn location_document(found: &GeocodedAddress) -> Document {
    let value = json!({
        "type": "Point",
        "coordinates": [found.longitude, found.latitude],
        "formattedAddress": found.formatted_address,
        "street": found.street,
        "city": found.city,
        "state": found.state,
        "zipcode": found.zipcode,
        "country": found.country,
    });
    match value {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}
