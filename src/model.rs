//! Core data types passed between pipeline stages.

use chrono::NaiveDateTime;
use serde::Deserialize;

/// One raw drop-in schedule record as published in the open-data feed.
#[derive(Debug, Clone, Deserialize)]
pub struct RawDropIn {
    #[serde(rename = "Location ID")]
    pub location_id: i64,

    #[serde(rename = "Course Title")]
    pub course_title: String,

    #[serde(rename = "Age Min", default)]
    pub age_min: Option<i32>,

    #[serde(rename = "Age Max", default)]
    pub age_max: Option<i32>,

    /// ISO-8601 local timestamp, e.g. `2023-01-05T09:00:00`.
    #[serde(rename = "Start Date Time")]
    pub start_date_time: String,

    #[serde(rename = "End Hour")]
    pub end_hour: u32,

    #[serde(rename = "End Min")]
    pub end_min: u32,

    #[serde(rename = "Category")]
    pub category: String,
}

/// One row of the tabular location feed. Every text column defaults to the
/// empty string so absent cells never surface as missing-value markers.
#[derive(Debug, Clone, Deserialize)]
pub struct LocationRecord {
    #[serde(rename = "Location ID")]
    pub location_id: i64,

    #[serde(rename = "Location Name", default)]
    pub name: String,

    #[serde(rename = "District", default)]
    pub district: String,

    #[serde(rename = "Street No", default)]
    pub street_no: String,

    #[serde(rename = "Street No Suffix", default)]
    pub street_no_suffix: String,

    #[serde(rename = "Street Name", default)]
    pub street_name: String,

    #[serde(rename = "Street Type", default)]
    pub street_type: String,

    #[serde(rename = "Postal Code", default)]
    pub postal_code: String,
}

/// A normalized drop-in session, flattened from [`RawDropIn`].
///
/// `type_name` is the middle level of the category > type > activity
/// hierarchy, derived from the course title. The availability list is kept
/// sorted by (category, type_name, course_title, location_id); the loader's
/// grouping logic depends on that order.
#[derive(Debug, Clone, PartialEq)]
pub struct Availability {
    pub location_id: i64,
    pub course_title: String,
    pub type_name: String,
    pub age_min: Option<i32>,
    pub age_max: Option<i32>,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub category: String,
}

/// A physical recreation location referenced by at least one availability.
///
/// `phone`, `url`, `lat` and `lng` stay unset until the enrichment stages
/// fill them in; a failed lookup leaves them unset rather than aborting the
/// batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Facility {
    pub location_id: i64,
    pub name: String,
    pub city: String,
    pub street: String,
    pub province: String,
    pub postal_code: String,
    pub phone: Option<String>,
    pub url: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}
