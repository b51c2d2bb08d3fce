//! Open-data catalog client.
//!
//! The catalog package endpoint returns a manifest whose `result.resources`
//! array lists `{name, url}` pairs. Feeds are selected from that manifest by
//! exact name match against a fixed set; anything else in the manifest is
//! ignored. Three resources are JSON collections, the fourth ("Locations")
//! is CSV.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::model::{LocationRecord, RawDropIn};

/// Expected resource names in the catalog manifest.
pub const DROPIN_RESOURCE: &str = "Drop-in.json";
pub const FACILITIES_RESOURCE: &str = "Facilities.json";
pub const REGISTERED_PROGRAMS_RESOURCE: &str = "Registered Programs.json";
pub const LOCATIONS_RESOURCE: &str = "Locations";

/// Errors raised while fetching or parsing the source feeds. All of these
/// are fatal: later stages cannot run on a partial feed set.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("catalog manifest has unexpected shape: {0}")]
    ManifestShape(String),

    #[error("expected resource {0:?} missing from catalog manifest")]
    MissingResource(&'static str),

    #[error("failed to parse resource {resource:?}: {message}")]
    Parse { resource: String, message: String },
}

/// One `{name, url}` entry from the catalog manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceEntry {
    pub name: String,
    pub url: String,
}

/// The four parsed source feeds.
///
/// `facilities_raw` and `registered_programs` are downloaded alongside the
/// two feeds the pipeline consumes; they are counted in the run summary but
/// no later stage reads them.
#[derive(Debug, Clone)]
pub struct SourceFeeds {
    pub dropins: Vec<RawDropIn>,
    pub facilities_raw: Vec<Value>,
    pub registered_programs: Vec<Value>,
    pub locations: Vec<LocationRecord>,
}

/// HTTP client for the open-data catalog.
pub struct CatalogClient {
    http: Client,
    catalog_url: String,
}

impl CatalogClient {
    pub fn new(catalog_url: String, timeout: Duration) -> Self {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");
        Self { http, catalog_url }
    }

    /// Fetch the manifest and download all four expected feeds.
    pub async fn fetch_feeds(&self) -> Result<SourceFeeds, FetchError> {
        info!("Requesting resource manifest from {}", self.catalog_url);
        let manifest = self.get_json(&self.catalog_url).await?;
        let resources = parse_manifest(&manifest)?;
        debug!("Manifest lists {} resources", resources.len());

        let dropins_url = find_resource(&resources, DROPIN_RESOURCE)?;
        let facilities_url = find_resource(&resources, FACILITIES_RESOURCE)?;
        let programs_url = find_resource(&resources, REGISTERED_PROGRAMS_RESOURCE)?;
        let locations_url = find_resource(&resources, LOCATIONS_RESOURCE)?;

        info!("Getting source file: {}", DROPIN_RESOURCE);
        let dropins = parse_json_feed(DROPIN_RESOURCE, self.get_json(&dropins_url).await?)?;

        info!("Getting source file: {}", FACILITIES_RESOURCE);
        let facilities_raw =
            parse_json_feed(FACILITIES_RESOURCE, self.get_json(&facilities_url).await?)?;

        info!("Getting source file: {}", REGISTERED_PROGRAMS_RESOURCE);
        let registered_programs = parse_json_feed(
            REGISTERED_PROGRAMS_RESOURCE,
            self.get_json(&programs_url).await?,
        )?;

        info!("Getting source file: {}", LOCATIONS_RESOURCE);
        let csv_bytes = self.get_bytes(&locations_url).await?;
        let locations = parse_locations_csv(&csv_bytes)?;

        Ok(SourceFeeds {
            dropins,
            facilities_raw,
            registered_programs,
            locations,
        })
    }

    async fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;
        response.json().await.map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;
        let bytes = response
            .bytes()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;
        Ok(bytes.to_vec())
    }
}

/// Extract the `{name, url}` entries from a catalog manifest body. Entries
/// missing either field are skipped.
pub fn parse_manifest(manifest: &Value) -> Result<Vec<ResourceEntry>, FetchError> {
    let resources = manifest
        .get("result")
        .and_then(|r| r.get("resources"))
        .and_then(|r| r.as_array())
        .ok_or_else(|| FetchError::ManifestShape("missing result.resources array".to_string()))?;

    let entries = resources
        .iter()
        .filter_map(|entry| {
            let name = entry.get("name")?.as_str()?;
            let url = entry.get("url")?.as_str()?;
            Some(ResourceEntry {
                name: name.to_string(),
                url: url.to_string(),
            })
        })
        .collect();
    Ok(entries)
}

fn find_resource(resources: &[ResourceEntry], name: &'static str) -> Result<String, FetchError> {
    resources
        .iter()
        .find(|r| r.name == name)
        .map(|r| r.url.clone())
        .ok_or(FetchError::MissingResource(name))
}

fn parse_json_feed<T: serde::de::DeserializeOwned>(
    resource: &str,
    body: Value,
) -> Result<Vec<T>, FetchError> {
    serde_json::from_value(body).map_err(|e| FetchError::Parse {
        resource: resource.to_string(),
        message: e.to_string(),
    })
}

/// Parse the tabular location feed. Columns outside the expected set are
/// ignored; empty cells deserialize as empty strings.
pub fn parse_locations_csv(bytes: &[u8]) -> Result<Vec<LocationRecord>, FetchError> {
    let mut reader = csv::Reader::from_reader(bytes);
    let mut records = Vec::new();
    for row in reader.deserialize() {
        let record: LocationRecord = row.map_err(|e| FetchError::Parse {
            resource: LOCATIONS_RESOURCE.to_string(),
            message: e.to_string(),
        })?;
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manifest_fixture() -> Value {
        json!({
            "result": {
                "resources": [
                    {"name": "Drop-in.json", "url": "https://data.example/dropin"},
                    {"name": "Facilities.json", "url": "https://data.example/facilities"},
                    {"name": "Registered Programs.json", "url": "https://data.example/programs"},
                    {"name": "Locations", "url": "https://data.example/locations"},
                    {"name": "Unrelated Extract", "url": "https://data.example/other"},
                    {"name": "Broken entry"}
                ]
            }
        })
    }

    #[test]
    fn test_parse_manifest_collects_named_entries() {
        let entries = parse_manifest(&manifest_fixture()).unwrap();
        // the malformed entry is skipped, everything else is kept
        assert_eq!(entries.len(), 5);
        assert_eq!(
            find_resource(&entries, DROPIN_RESOURCE).unwrap(),
            "https://data.example/dropin"
        );
    }

    #[test]
    fn test_unexpected_resource_names_are_ignored() {
        let entries = parse_manifest(&manifest_fixture()).unwrap();
        for name in [
            DROPIN_RESOURCE,
            FACILITIES_RESOURCE,
            REGISTERED_PROGRAMS_RESOURCE,
            LOCATIONS_RESOURCE,
        ] {
            assert!(find_resource(&entries, name).is_ok());
        }
        // the extra entry resolves to nothing the pipeline asks for
        assert!(entries.iter().any(|e| e.name == "Unrelated Extract"));
    }

    #[test]
    fn test_missing_expected_resource_is_an_error() {
        let manifest = json!({
            "result": {
                "resources": [
                    {"name": "Facilities.json", "url": "https://data.example/facilities"}
                ]
            }
        });
        let entries = parse_manifest(&manifest).unwrap();
        let err = find_resource(&entries, DROPIN_RESOURCE).unwrap_err();
        assert!(matches!(err, FetchError::MissingResource(DROPIN_RESOURCE)));
    }

    #[test]
    fn test_manifest_shape_error() {
        let err = parse_manifest(&json!({"result": {}})).unwrap_err();
        assert!(matches!(err, FetchError::ManifestShape(_)));
    }

    #[test]
    fn test_locations_csv_empty_cells_become_empty_strings() {
        let csv = "Location ID,Location Name,District,Street No,Street No Suffix,Street Name,Street Type,Postal Code\n\
                   101,Norwood Community Centre,North York,123,,Norwood,Ave,M2N 5P9\n\
                   205,Riverdale Pool,East York,9,A,Broadview,Ave,\n";
        let records = parse_locations_csv(csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].street_no_suffix, "");
        assert_eq!(records[1].postal_code, "");
        assert_eq!(records[1].street_no_suffix, "A");
    }

    #[test]
    fn test_locations_csv_ignores_extra_columns() {
        let csv = "_id,Location ID,Location Name,District,Street No,Street No Suffix,Street Name,Street Type,Postal Code,Intersection\n\
                   1,101,Norwood Community Centre,North York,123,,Norwood,Ave,M2N 5P9,Yonge & Sheppard\n";
        let records = parse_locations_csv(csv.as_bytes()).unwrap();
        assert_eq!(records[0].location_id, 101);
        assert_eq!(records[0].name, "Norwood Community Centre");
    }

    #[test]
    fn test_dropin_feed_parses() {
        let body = json!([{
            "Location ID": 101,
            "Course Title": "Swim: Lane",
            "Age Min": 18,
            "Age Max": null,
            "Start Date Time": "2023-01-05T09:00:00",
            "End Hour": 10,
            "End Min": 30,
            "Category": "Swimming"
        }]);
        let dropins: Vec<RawDropIn> = parse_json_feed(DROPIN_RESOURCE, body).unwrap();
        assert_eq!(dropins[0].location_id, 101);
        assert_eq!(dropins[0].age_min, Some(18));
        assert_eq!(dropins[0].age_max, None);
        assert_eq!(dropins[0].end_hour, 10);
    }
}
