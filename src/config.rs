//! Server configuration.
//!
//! Everything can be given as a command line flag or an environment
//! variable. The typed sub-configurations ([`QueryConfig`], [`GeoConfig`],
//! [`GeocoderConfig`]) are handed to the components that need them.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CAMPDIR_HOST` | 127.0.0.1 | Host to bind |
//! | `CAMPDIR_PORT` | 5000 | Server port |
//! | `CAMPDIR_LOG_LEVEL` | info | Log filter when `RUST_LOG` is unset |
//! | `CAMPDIR_DATABASE_URL` | (unset) | sea-orm URL; in-memory store when unset |
//! | `CAMPDIR_DEFAULT_LIMIT` | 25 | Page size when `limit` is absent |
//! | `CAMPDIR_MAX_LIMIT` | 100 | Upper bound on `limit` |
//! | `CAMPDIR_DISTANCE_UNIT` | km | Unit of radius-search distances |
//! | `CAMPDIR_EARTH_RADIUS` | (unit default) | Earth radius in the distance unit |
//! | `CAMPDIR_GEOCODER` | static | `mapquest` or `static` |
//! | `CAMPDIR_GEOCODER_API_KEY` | (unset) | Provider API key |
//! | `CAMPDIR_GEOCODER_URL` | https://www.mapquestapi.com/ | Provider base URL |
//! | `CAMPDIR_GEOCODER_FIXTURES` | (unset) | JSON lookup table for the static geocoder |

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::filtering::pagination::{DEFAULT_LIMIT, MAX_LIMIT};
use crate::geo::{DistanceUnit, GeoConfig};

/// Pagination limits for list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryConfig {
    pub default_limit: u64,
    pub max_limit: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            max_limit: MAX_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GeocoderProvider {
    /// MapQuest-compatible HTTP API
    Mapquest,
    /// Fixed lookup table
    Static,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DistanceUnitArg {
    #[value(name = "km")]
    Kilometers,
    #[value(name = "mi")]
    Miles,
}

impl From<DistanceUnitArg> for DistanceUnit {
    fn from(arg: DistanceUnitArg) -> Self {
        match arg {
            DistanceUnitArg::Kilometers => Self::Kilometers,
            DistanceUnitArg::Miles => Self::Miles,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeocoderConfig {
    pub provider: GeocoderProvider,
    pub api_key: Option<String>,
    pub base_url: String,
    pub fixtures: Option<PathBuf>,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "campdir")]
#[command(about = "Training program directory API")]
pub struct AppConfig {
    /// Host address to bind to.
    #[arg(long, env = "CAMPDIR_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, env = "CAMPDIR_PORT", default_value = "5000")]
    pub port: u16,

    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long, env = "CAMPDIR_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Database connection string (e.g. `sqlite://campdir.db?mode=rwc`).
    #[arg(long, env = "CAMPDIR_DATABASE_URL")]
    pub database_url: Option<String>,

    /// Page size when a request gives no valid `limit`.
    #[arg(long, env = "CAMPDIR_DEFAULT_LIMIT", default_value_t = DEFAULT_LIMIT)]
    pub default_limit: u64,

    /// Largest page size a request may ask for.
    #[arg(long, env = "CAMPDIR_MAX_LIMIT", default_value_t = MAX_LIMIT)]
    pub max_limit: u64,

    /// Unit of the radius-search distance.
    #[arg(long, env = "CAMPDIR_DISTANCE_UNIT", value_enum, default_value = "km")]
    pub distance_unit: DistanceUnitArg,

    /// Earth radius in the distance unit; defaults to 6378 km / 3963 mi.
    #[arg(long, env = "CAMPDIR_EARTH_RADIUS")]
    pub earth_radius: Option<f64>,

    /// Geocoding provider.
    #[arg(long, env = "CAMPDIR_GEOCODER", value_enum, default_value = "static")]
    pub geocoder: GeocoderProvider,

    /// Geocoding provider API key.
    #[arg(long, env = "CAMPDIR_GEOCODER_API_KEY")]
    pub geocoder_api_key: Option<String>,

    /// Geocoding provider base URL.
    #[arg(long, env = "CAMPDIR_GEOCODER_URL", default_value = "https://www.mapquestapi.com/")]
    pub geocoder_url: String,

    /// JSON file mapping addresses to locations, for the static geocoder.
    #[arg(long, env = "CAMPDIR_GEOCODER_FIXTURES")]
    pub geocoder_fixtures: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            log_level: "info".to_string(),
            database_url: None,
            default_limit: DEFAULT_LIMIT,
            max_limit: MAX_LIMIT,
            distance_unit: DistanceUnitArg::Kilometers,
            earth_radius: None,
            geocoder: GeocoderProvider::Static,
            geocoder_api_key: None,
            geocoder_url: "https://www.mapquestapi.com/".to_string(),
            geocoder_fixtures: None,
        }
    }
}

impl AppConfig {
    /// Returns the socket address to bind to.
    #[must_use]
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    #[must_use]
    pub fn query(&self) -> QueryConfig {
        QueryConfig {
            default_limit: self.default_limit,
            max_limit: self.max_limit,
        }
    }

    #[must_use]
    pub fn geo(&self) -> GeoConfig {
        let unit = DistanceUnit::from(self.distance_unit);
        GeoConfig {
            unit,
            earth_radius: self.earth_radius.unwrap_or(unit.earth_radius()),
        }
    }

    #[must_use]
    pub fn geocoder(&self) -> GeocoderConfig {
        GeocoderConfig {
            provider: self.geocoder,
            api_key: self.geocoder_api_key.clone(),
            base_url: self.geocoder_url.clone(),
            fixtures: self.geocoder_fixtures.clone(),
        }
    }

    /// Validates the configuration and returns errors if any.
    ///
    /// # Errors
    ///
    /// Returns every problem found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.default_limit == 0 {
            errors.push("Default limit cannot be 0".to_string());
        }

        if self.default_limit > self.max_limit {
            errors.push("Default limit cannot exceed max limit".to_string());
        }

        if let Some(radius) = self.earth_radius
            && (!radius.is_finite() || radius <= 0.0)
        {
            errors.push("Earth radius must be a positive number".to_string());
        }

        if url::Url::parse(&self.geocoder_url).is_err() {
            errors.push(format!("Invalid geocoder URL '{}'", self.geocoder_url));
        }

        if self.geocoder == GeocoderProvider::Mapquest && self.geocoder_api_key.is_none() {
            errors.push("The mapquest geocoder needs CAMPDIR_GEOCODER_API_KEY".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// `raw` with any password masked, for logs and error messages.
#[must_use]
pub fn redact_url(raw: &str) -> String {
    let Ok(mut url) = url::Url::parse(raw) else {
        return "<unparseable url>".to_string();
    };
    if url.password().is_some() && url.set_password(Some("***")).is_err() {
        return "<unparseable url>".to_string();
    }
    url.to_string()
}
