//! Contact-detail enrichment from the city portal.
//!
//! One pass over the facility-listing page collects {name, phone, url} for
//! every listed facility; each resolved facility is then matched by exact
//! name. Facilities missing from the listing fall back to their own detail
//! page, whose first location list item may carry a "Phone: N" entry.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::model::Facility;

/// Page retrieval failures. Recoverable per item: a failed fetch leaves the
/// facility's phone unset and the pass continues.
#[derive(Debug, Error)]
pub enum ContactError {
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },
}

/// One row scraped from the facility-listing table.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactEntry {
    pub name: String,
    pub phone: String,
    pub url: String,
}

/// Fetches a page body by URL. A trait so tests can serve fixture HTML.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, ContactError>;
}

/// Page fetcher backed by plain HTTP.
pub struct HttpPageFetcher {
    http: Client,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration) -> Self {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");
        Self { http }
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<String, ContactError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ContactError::Request {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        response.text().await.map_err(|e| ContactError::Request {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

/// Parse the facility-listing page: one table inside the `pfrListing`
/// container, name in the row's header-cell anchor, phone in the data cell
/// tagged `data-info="Phone"`. Relative hrefs are joined onto the portal
/// base URL.
pub fn parse_listing(html: &str, portal_base_url: &str) -> Vec<ContactEntry> {
    let document = Html::parse_document(html);
    let row_selector = Selector::parse("div.pfrListing table tbody tr").unwrap();
    let name_selector = Selector::parse(r#"th[data-info="Name"] a"#).unwrap();
    let phone_selector = Selector::parse(r#"td[data-info="Phone"]"#).unwrap();

    let mut entries = Vec::new();
    for row in document.select(&row_selector) {
        let Some(anchor) = row.select(&name_selector).next() else {
            continue;
        };
        let Some(phone_cell) = row.select(&phone_selector).next() else {
            continue;
        };
        let name = anchor.text().collect::<String>().trim().to_string();
        let href = anchor.value().attr("href").unwrap_or_default();
        let phone = phone_cell.text().collect::<String>().trim().to_string();
        entries.push(ContactEntry {
            name,
            phone,
            url: format!("{}{}", portal_base_url, href),
        });
    }
    entries
}

/// Parse a facility detail page: the first list item beneath the
/// `pfr_complex_loc` container is phone information only if it carries the
/// literal label "Phone"; the number is the trimmed remainder after the
/// first `:`.
pub fn parse_detail_phone(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("div#pfr_complex_loc ul li").unwrap();
    let item = document.select(&selector).next()?;
    let text = item.text().collect::<String>();
    let text = text.trim();
    if !text.contains("Phone") {
        return None;
    }
    text.splitn(2, ':')
        .nth(1)
        .map(|number| number.trim().to_string())
}

/// Copy phone/url onto each facility, from the listing where the name
/// matches exactly, otherwise from the facility's own detail page. Returns
/// the number of failed page fetches.
pub async fn enrich_contacts(
    fetcher: &dyn PageFetcher,
    facilities: &mut [Facility],
    facility_list_url: &str,
    portal_base_url: &str,
    facility_page_prefix: &str,
) -> usize {
    info!("Getting recreation listing from {}", facility_list_url);
    let listing = match fetcher.fetch(facility_list_url).await {
        Ok(html) => parse_listing(&html, portal_base_url),
        Err(e) => {
            warn!("Could not fetch facility listing: {}", e);
            Vec::new()
        }
    };
    debug!("Listing page yielded {} entries", listing.len());

    let mut failures = 0;
    for facility in facilities.iter_mut() {
        // exact, case-sensitive match only
        if let Some(entry) = listing.iter().find(|e| e.name == facility.name) {
            facility.phone = Some(entry.phone.clone());
            facility.url = Some(entry.url.clone());
            continue;
        }

        let url = format!("{}{}/index.html", facility_page_prefix, facility.location_id);
        facility.url = Some(url.clone());
        match fetcher.fetch(&url).await {
            Ok(html) => {
                if let Some(phone) = parse_detail_phone(&html) {
                    facility.phone = Some(phone);
                }
            }
            Err(e) => {
                warn!("Could not fetch detail page for {}: {}", facility.name, e);
                failures += 1;
            }
        }
    }
    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::PROVINCE;
    use std::collections::HashMap;

    const LISTING_HTML: &str = r#"
        <html><body>
        <div class="pfrListing">
          <table>
            <tbody>
              <tr>
                <th data-info="Name"><a href="/norwood-cc">Norwood Community Centre</a></th>
                <td data-info="Phone">416-555-0101</td>
              </tr>
              <tr>
                <th data-info="Name"><a href="/riverdale-pool">Riverdale Pool</a></th>
                <td data-info="Phone">416-555-0202</td>
              </tr>
            </tbody>
          </table>
        </div>
        </body></html>"#;

    const DETAIL_HTML: &str = r#"
        <html><body>
        <div id="pfr_complex_loc">
          <ul>
            <li>Phone: 416-555-0303</li>
            <li>Accessibility: ramp</li>
          </ul>
        </div>
        </body></html>"#;

    fn facility(location_id: i64, name: &str) -> Facility {
        Facility {
            location_id,
            name: name.to_string(),
            city: "North York".to_string(),
            street: "123 Norwood Ave".to_string(),
            province: PROVINCE.to_string(),
            postal_code: "M2N 5P9".to_string(),
            phone: None,
            url: None,
            lat: None,
            lng: None,
        }
    }

    struct FixtureFetcher {
        pages: HashMap<String, String>,
    }

    #[async_trait]
    impl PageFetcher for FixtureFetcher {
        async fn fetch(&self, url: &str) -> Result<String, ContactError> {
            self.pages.get(url).cloned().ok_or_else(|| ContactError::Request {
                url: url.to_string(),
                message: "no fixture for url".to_string(),
            })
        }
    }

    #[test]
    fn test_parse_listing_extracts_rows() {
        let entries = parse_listing(LISTING_HTML, "https://city.example");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "Norwood Community Centre");
        assert_eq!(entries[0].phone, "416-555-0101");
        assert_eq!(entries[0].url, "https://city.example/norwood-cc");
    }

    #[test]
    fn test_parse_listing_without_container_is_empty() {
        assert!(parse_listing("<html><body></body></html>", "https://city.example").is_empty());
    }

    #[test]
    fn test_parse_detail_phone() {
        assert_eq!(
            parse_detail_phone(DETAIL_HTML).as_deref(),
            Some("416-555-0303")
        );
    }

    #[test]
    fn test_parse_detail_first_item_without_phone_label() {
        let html = r#"<div id="pfr_complex_loc"><ul><li>Address: 9 Elm St</li></ul></div>"#;
        assert_eq!(parse_detail_phone(html), None);
    }

    #[test]
    fn test_parse_detail_phone_keeps_remainder_after_first_colon() {
        let html = r#"<div id="pfr_complex_loc"><ul><li>Phone: 416-555-0303 ext: 12</li></ul></div>"#;
        assert_eq!(
            parse_detail_phone(html).as_deref(),
            Some("416-555-0303 ext: 12")
        );
    }

    #[tokio::test]
    async fn test_listing_match_is_exact_and_case_sensitive() {
        let fetcher = FixtureFetcher {
            pages: HashMap::from([(
                "https://city.example/list".to_string(),
                LISTING_HTML.to_string(),
            )]),
        };
        let mut facilities = vec![facility(101, "Norwood Community Centre")];
        enrich_contacts(
            &fetcher,
            &mut facilities,
            "https://city.example/list",
            "https://city.example",
            "https://city.example/complex/",
        )
        .await;
        assert_eq!(facilities[0].phone.as_deref(), Some("416-555-0101"));
        assert_eq!(
            facilities[0].url.as_deref(),
            Some("https://city.example/norwood-cc")
        );
    }

    #[tokio::test]
    async fn test_unlisted_facility_falls_back_to_detail_page() {
        let fetcher = FixtureFetcher {
            pages: HashMap::from([
                (
                    "https://city.example/list".to_string(),
                    LISTING_HTML.to_string(),
                ),
                (
                    "https://city.example/complex/309/index.html".to_string(),
                    DETAIL_HTML.to_string(),
                ),
            ]),
        };
        let mut facilities = vec![facility(309, "Elm Arena")];
        enrich_contacts(
            &fetcher,
            &mut facilities,
            "https://city.example/list",
            "https://city.example",
            "https://city.example/complex/",
        )
        .await;
        assert_eq!(facilities[0].phone.as_deref(), Some("416-555-0303"));
        assert_eq!(
            facilities[0].url.as_deref(),
            Some("https://city.example/complex/309/index.html")
        );
    }

    #[tokio::test]
    async fn test_facility_found_nowhere_keeps_prefix_url_only() {
        let fetcher = FixtureFetcher {
            pages: HashMap::from([(
                "https://city.example/list".to_string(),
                LISTING_HTML.to_string(),
            )]),
        };
        let mut facilities = vec![facility(400, "Unknown Hall")];
        let failures = enrich_contacts(
            &fetcher,
            &mut facilities,
            "https://city.example/list",
            "https://city.example",
            "https://city.example/complex/",
        )
        .await;
        assert_eq!(failures, 1);
        assert_eq!(facilities[0].phone, None);
        assert_eq!(
            facilities[0].url.as_deref(),
            Some("https://city.example/complex/400/index.html")
        );
    }
}
