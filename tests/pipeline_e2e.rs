//! End-to-end pipeline test over fixture feeds: extract, resolve, enrich
//! with canned network clients, and load into the in-memory store.

use std::collections::HashMap;

use async_trait::async_trait;
use recpipe::catalog::{parse_locations_csv, SourceFeeds};
use recpipe::db::{MemoryStore, Store};
use recpipe::enrich::{
    enrich_contacts, enrich_geo, ContactError, GeoPoint, GeocodeError, Geocoder, PageFetcher,
};
use recpipe::extract::build_availabilities;
use recpipe::load::{load, LoadError};
use recpipe::model::RawDropIn;
use recpipe::pipeline::phases::{ContactPhase, ExtractPhase, GeocodePhase, LoadPhase, ResolvePhase};
use recpipe::pipeline::{EtlContext, EtlPhase, Pipeline};
use recpipe::resolve::resolve_facilities;

const DROPINS_JSON: &str = include_str!("fixtures/dropins.json");
const LOCATIONS_CSV: &str = include_str!("fixtures/locations.csv");
const LISTING_HTML: &str = include_str!("fixtures/listing.html");
const DETAIL_HTML: &str = include_str!("fixtures/detail.html");

const LIST_URL: &str = "https://city.example/recreation/index.html";
const PORTAL_BASE: &str = "https://city.example";
const PAGE_PREFIX: &str = "https://city.example/complex/";

/// Geocoder that returns fixed coordinates and hands Riverdale Pool the
/// postal hint its empty source postal code needs.
struct FixtureGeocoder;

#[async_trait]
impl Geocoder for FixtureGeocoder {
    async fn locate(&self, address: &str) -> Result<GeoPoint, GeocodeError> {
        let postal_hint = if address.starts_with("9A Broadview Ave") {
            Some("M4K 1A1".to_string())
        } else {
            None
        };
        Ok(GeoPoint {
            lat: 43.7,
            lng: -79.4,
            postal_hint,
        })
    }
}

struct FixtureFetcher {
    pages: HashMap<String, String>,
}

impl FixtureFetcher {
    fn new() -> Self {
        Self {
            pages: HashMap::from([
                (LIST_URL.to_string(), LISTING_HTML.to_string()),
                (
                    format!("{}309/index.html", PAGE_PREFIX),
                    DETAIL_HTML.to_string(),
                ),
            ]),
        }
    }
}

#[async_trait]
impl PageFetcher for FixtureFetcher {
    async fn fetch(&self, url: &str) -> Result<String, ContactError> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| ContactError::Request {
                url: url.to_string(),
                message: "no fixture for url".to_string(),
            })
    }
}

fn fixture_dropins() -> Vec<RawDropIn> {
    serde_json::from_str(DROPINS_JSON).unwrap()
}

#[tokio::test]
async fn full_run_produces_expected_row_counts() {
    let dropins = fixture_dropins();
    let locations = parse_locations_csv(LOCATIONS_CSV.as_bytes()).unwrap();

    let availabilities = build_availabilities(&dropins).unwrap();
    assert_eq!(availabilities.len(), 7);

    let (mut facilities, report) = resolve_facilities(&availabilities, &locations);
    // 3 referenced locations resolve; the unreferenced 400 produces nothing
    assert_eq!(facilities.len(), 3);
    assert!(report.unmatched.is_empty());

    let geocode_failures = enrich_geo(&FixtureGeocoder, &mut facilities).await;
    assert_eq!(geocode_failures, 0);

    let contact_failures = enrich_contacts(
        &FixtureFetcher::new(),
        &mut facilities,
        LIST_URL,
        PORTAL_BASE,
        PAGE_PREFIX,
    )
    .await;
    assert_eq!(contact_failures, 0);

    let mut store = MemoryStore::new();
    let summary = load(&mut store, &availabilities, &facilities, 2, "En")
        .await
        .unwrap();

    // 3 facilities, 3 categories (Aquatics, Fitness, Sports), 4 types
    // (Swim, Yoga, Hockey, Open Gym), 5 activities, 7 availabilities
    assert_eq!(summary.facilities, 3);
    assert_eq!(summary.addresses, 3);
    assert_eq!(summary.location_origins, 3);
    assert_eq!(summary.categories, 3);
    assert_eq!(summary.types, 4);
    assert_eq!(summary.activities, 5);
    assert_eq!(summary.facility_activities, 5);
    assert_eq!(summary.availabilities, 7);
    assert_eq!(summary.translations, 2 * 3 + 3 + 4 + 5);
    assert_eq!(summary.language_translations, summary.translations);
    assert!(store.committed);

    // every availability row references a real facility and activity
    for row in &store.availabilities {
        assert!(store.facilities.iter().any(|f| f.id == row.facility_id));
        assert!(store.activities.iter().any(|a| a.id == row.activity_id));
    }
}

#[tokio::test]
async fn enrichment_fills_contacts_and_postal_fallback() {
    let dropins = fixture_dropins();
    let locations = parse_locations_csv(LOCATIONS_CSV.as_bytes()).unwrap();
    let availabilities = build_availabilities(&dropins).unwrap();
    let (mut facilities, _) = resolve_facilities(&availabilities, &locations);

    enrich_geo(&FixtureGeocoder, &mut facilities).await;
    enrich_contacts(
        &FixtureFetcher::new(),
        &mut facilities,
        LIST_URL,
        PORTAL_BASE,
        PAGE_PREFIX,
    )
    .await;

    let norwood = facilities.iter().find(|f| f.location_id == 101).unwrap();
    assert_eq!(norwood.phone.as_deref(), Some("416-555-0101"));
    assert_eq!(
        norwood.url.as_deref(),
        Some("https://city.example/explore-enjoy/parks-recreation/norwood-cc")
    );

    // empty source postal code was filled from the geocoder hint
    let riverdale = facilities.iter().find(|f| f.location_id == 205).unwrap();
    assert_eq!(riverdale.postal_code, "M4K 1A1");
    assert_eq!(riverdale.phone.as_deref(), Some("416-555-0202"));

    // Elm Arena is not on the listing page: detail-page fallback
    let elm = facilities.iter().find(|f| f.location_id == 309).unwrap();
    assert_eq!(elm.phone.as_deref(), Some("416-555-0303"));
    assert_eq!(
        elm.url.as_deref(),
        Some("https://city.example/complex/309/index.html")
    );

    // and the stripped postal code lands in the address row
    let mut store = MemoryStore::new();
    load(&mut store, &availabilities, &facilities, 2, "En")
        .await
        .unwrap();
    assert!(store
        .addresses
        .iter()
        .any(|a| a.postal_code == "M4K1A1" && a.city == "East York"));
}

#[tokio::test]
async fn missing_location_is_detected_and_fails_the_load() {
    let mut dropins = fixture_dropins();
    dropins.push(RawDropIn {
        location_id: 999,
        course_title: "Ghost Program".to_string(),
        age_min: None,
        age_max: None,
        start_date_time: "2023-01-05T09:00:00".to_string(),
        end_hour: 10,
        end_min: 0,
        category: "Sports".to_string(),
    });
    let locations = parse_locations_csv(LOCATIONS_CSV.as_bytes()).unwrap();

    let availabilities = build_availabilities(&dropins).unwrap();
    let (mut facilities, report) = resolve_facilities(&availabilities, &locations);
    assert_eq!(report.unmatched, vec![999]);
    // its availabilities stay in the stream
    assert_eq!(availabilities.len(), 8);

    enrich_geo(&FixtureGeocoder, &mut facilities).await;

    let mut store = MemoryStore::new();
    let err = load(&mut store, &availabilities, &facilities, 2, "En")
        .await
        .unwrap_err();
    assert!(matches!(err, LoadError::UnknownFacility(999)));
    assert!(!store.committed);
    assert!(store.availabilities.is_empty());
}

/// Feeds the fixture files into the context the way the fetch phase would.
struct StubFetchPhase;

#[async_trait]
impl EtlPhase for StubFetchPhase {
    async fn execute(&mut self, context: &mut EtlContext) -> anyhow::Result<()> {
        context.feeds = Some(SourceFeeds {
            dropins: fixture_dropins(),
            facilities_raw: Vec::new(),
            registered_programs: Vec::new(),
            locations: parse_locations_csv(LOCATIONS_CSV.as_bytes())?,
        });
        Ok(())
    }
}

#[tokio::test]
async fn orchestrated_pipeline_runs_phases_in_order() {
    let store: Box<dyn Store> = Box::new(MemoryStore::new());
    let pipeline = Pipeline::with_phases(vec![
        (Box::new(StubFetchPhase), "FetchPhase"),
        (Box::new(ExtractPhase), "ExtractPhase"),
        (Box::new(ResolvePhase), "ResolvePhase"),
        (
            Box::new(GeocodePhase {
                geocoder: Box::new(FixtureGeocoder),
            }),
            "GeocodePhase",
        ),
        (
            Box::new(ContactPhase {
                fetcher: Box::new(FixtureFetcher::new()),
                facility_list_url: LIST_URL.to_string(),
                portal_base_url: PORTAL_BASE.to_string(),
                facility_page_prefix: PAGE_PREFIX.to_string(),
            }),
            "ContactPhase",
        ),
        (
            Box::new(LoadPhase {
                store,
                city_id: 2,
                language_id: "En".to_string(),
            }),
            "LoadPhase",
        ),
    ]);

    let context = pipeline.execute().await.unwrap();
    let summary = context.load_summary.unwrap();
    assert_eq!(summary.facilities, 3);
    assert_eq!(summary.availabilities, 7);
    assert_eq!(context.geocode_failures, 0);
    assert_eq!(context.contact_failures, 0);
    assert!(context.resolve_report.unwrap().unmatched.is_empty());
}
