//! Configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! - `RECPIPE_DATABASE_URL`: Postgres connection string - **required**
//! - `RECPIPE_GEOCODE_API_KEY`: geocoding API key - **required**
//! - `RECPIPE_CATALOG_URL`: open-data catalog package endpoint
//! - `RECPIPE_GEOCODE_URL`: geocoding JSON endpoint
//! - `RECPIPE_PORTAL_BASE_URL`: city portal base, prefixed onto relative hrefs
//! - `RECPIPE_FACILITY_LIST_URL`: facility-listing page to scrape
//! - `RECPIPE_FACILITY_PAGE_PREFIX`: per-facility detail page URL prefix
//! - `RECPIPE_HTTP_TIMEOUT_SECS`: outbound HTTP timeout - default: "30"
//! - `RECPIPE_CITY_ID`: target-schema city key - default: "2"
//! - `RECPIPE_LANGUAGE_ID`: translation language code - default: "En"
//!
//! A `.env` file in the working directory is honored (loaded in `main` via
//! `dotenvy`).

use std::env;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_CATALOG_URL: &str =
    "https://ckan0.cf.opendata.inter.prod-toronto.ca/api/3/action/package_show?id=da46e4ac-d4ab-4b1c-b139-6362a0a43b3c";
const DEFAULT_GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";
const DEFAULT_PORTAL_BASE_URL: &str = "https://www.toronto.ca";
const DEFAULT_FACILITY_LIST_URL: &str =
    "https://www.toronto.ca/data/parks/prd/facilities/recreationcentres/index.html";
const DEFAULT_FACILITY_PAGE_PREFIX: &str =
    "https://www.toronto.ca/data/parks/prd/facilities/complex/";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CITY_ID: i32 = 2;
const DEFAULT_LANGUAGE_ID: &str = "En";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is absent
    #[error("{0} is not set")]
    MissingVar(&'static str),

    /// Failed to parse a configuration value
    #[error("failed to parse {field}: {error}")]
    ParseError { field: &'static str, error: String },
}

/// Runtime configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string for the target schema
    pub database_url: String,

    /// API key for the geocoding service
    pub geocode_api_key: String,

    /// Catalog package endpoint returning the resource manifest
    pub catalog_url: String,

    /// Geocoding JSON endpoint
    pub geocode_url: String,

    /// Portal base URL; listing-page hrefs are relative to this
    pub portal_base_url: String,

    /// Facility-listing page scraped for phone numbers
    pub facility_list_url: String,

    /// Prefix for per-facility detail pages, completed with the location id
    pub facility_page_prefix: String,

    /// Timeout applied to every outbound HTTP request
    pub http_timeout: Duration,

    /// City key the loaded rows belong to
    pub city_id: i32,

    /// Language code stamped on every translation row
    pub language_id: String,
}

impl Config {
    /// Load configuration from the environment, falling back to the built-in
    /// endpoint defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("RECPIPE_DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("RECPIPE_DATABASE_URL"))?;
        let geocode_api_key = env::var("RECPIPE_GEOCODE_API_KEY")
            .map_err(|_| ConfigError::MissingVar("RECPIPE_GEOCODE_API_KEY"))?;

        let http_timeout_secs = match env::var("RECPIPE_HTTP_TIMEOUT_SECS") {
            Ok(raw) => raw.parse::<u64>().map_err(|e| ConfigError::ParseError {
                field: "RECPIPE_HTTP_TIMEOUT_SECS",
                error: e.to_string(),
            })?,
            Err(_) => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        let city_id = match env::var("RECPIPE_CITY_ID") {
            Ok(raw) => raw.parse::<i32>().map_err(|e| ConfigError::ParseError {
                field: "RECPIPE_CITY_ID",
                error: e.to_string(),
            })?,
            Err(_) => DEFAULT_CITY_ID,
        };

        Ok(Self {
            database_url,
            geocode_api_key,
            catalog_url: env_or("RECPIPE_CATALOG_URL", DEFAULT_CATALOG_URL),
            geocode_url: env_or("RECPIPE_GEOCODE_URL", DEFAULT_GEOCODE_URL),
            portal_base_url: env_or("RECPIPE_PORTAL_BASE_URL", DEFAULT_PORTAL_BASE_URL),
            facility_list_url: env_or("RECPIPE_FACILITY_LIST_URL", DEFAULT_FACILITY_LIST_URL),
            facility_page_prefix: env_or(
                "RECPIPE_FACILITY_PAGE_PREFIX",
                DEFAULT_FACILITY_PAGE_PREFIX,
            ),
            http_timeout: Duration::from_secs(http_timeout_secs),
            city_id,
            language_id: env_or("RECPIPE_LANGUAGE_ID", DEFAULT_LANGUAGE_ID),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
