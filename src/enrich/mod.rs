//! Facility enrichment: geocoding and contact-detail scraping.
//!
//! Both passes mutate the resolved facility list in place and isolate
//! failures per item: a failed lookup leaves that facility's fields unset
//! and the pass continues.

pub mod contact;
pub mod geocode;

pub use contact::{enrich_contacts, ContactError, HttpPageFetcher, PageFetcher};
pub use geocode::{enrich_geo, GeoPoint, GeocodeError, Geocoder, HttpGeocoder};
