//! The six pipeline phases.
//!
//! Each phase is a thin wrapper that pulls its inputs out of the context,
//! calls into the stage module, and stores the result back. Network and
//! database clients are owned by the phase that uses them.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tracing::{info, warn};

use super::context::EtlContext;
use super::phase_trait::EtlPhase;
use crate::catalog::CatalogClient;
use crate::db::Store;
use crate::enrich::{enrich_contacts, enrich_geo, Geocoder, PageFetcher};
use crate::extract::build_availabilities;
use crate::load;
use crate::resolve::resolve_facilities;

/// Downloads and parses the four source feeds.
pub struct FetchPhase {
    pub client: CatalogClient,
}

#[async_trait]
impl EtlPhase for FetchPhase {
    async fn execute(&mut self, context: &mut EtlContext) -> Result<()> {
        let feeds = self.client.fetch_feeds().await?;
        info!(
            "Fetched {} drop-in records, {} facility records, {} registered programs, {} location rows",
            feeds.dropins.len(),
            feeds.facilities_raw.len(),
            feeds.registered_programs.len(),
            feeds.locations.len()
        );
        context.feeds = Some(feeds);
        Ok(())
    }
}

/// Flattens drop-in records into the sorted availability list.
pub struct ExtractPhase;

#[async_trait]
impl EtlPhase for ExtractPhase {
    async fn execute(&mut self, context: &mut EtlContext) -> Result<()> {
        let feeds = context
            .feeds
            .as_ref()
            .ok_or_else(|| anyhow!("fetch phase has not run"))?;
        context.availabilities = build_availabilities(&feeds.dropins)?;
        info!("Extracted {} availabilities", context.availabilities.len());
        Ok(())
    }
}

/// Derives the deduplicated facility list from the location table.
pub struct ResolvePhase;

#[async_trait]
impl EtlPhase for ResolvePhase {
    async fn execute(&mut self, context: &mut EtlContext) -> Result<()> {
        let feeds = context
            .feeds
            .as_ref()
            .ok_or_else(|| anyhow!("fetch phase has not run"))?;
        let (facilities, report) = resolve_facilities(&context.availabilities, &feeds.locations);
        info!("Resolved {} facilities", facilities.len());
        if !report.unmatched.is_empty() {
            warn!(
                "{} location ids have no location row: {:?}",
                report.unmatched.len(),
                report.unmatched
            );
        }
        context.facilities = facilities;
        context.resolve_report = Some(report);
        Ok(())
    }
}

/// Adds coordinates and the postal-code fallback to each facility.
pub struct GeocodePhase {
    pub geocoder: Box<dyn Geocoder>,
}

#[async_trait]
impl EtlPhase for GeocodePhase {
    async fn execute(&mut self, context: &mut EtlContext) -> Result<()> {
        info!("Start getting coordinates for facilities...");
        context.geocode_failures = enrich_geo(self.geocoder.as_ref(), &mut context.facilities).await;
        if context.geocode_failures > 0 {
            warn!(
                "{} of {} facilities left without coordinates",
                context.geocode_failures,
                context.facilities.len()
            );
        }
        Ok(())
    }
}

/// Adds phone numbers and detail-page URLs to each facility.
pub struct ContactPhase {
    pub fetcher: Box<dyn PageFetcher>,
    pub facility_list_url: String,
    pub portal_base_url: String,
    pub facility_page_prefix: String,
}

#[async_trait]
impl EtlPhase for ContactPhase {
    async fn execute(&mut self, context: &mut EtlContext) -> Result<()> {
        info!("Start getting phone numbers and urls for facilities...");
        context.contact_failures = enrich_contacts(
            self.fetcher.as_ref(),
            &mut context.facilities,
            &self.facility_list_url,
            &self.portal_base_url,
            &self.facility_page_prefix,
        )
        .await;
        Ok(())
    }
}

/// Writes everything into the target schema in one transaction.
pub struct LoadPhase {
    pub store: Box<dyn Store>,
    pub city_id: i32,
    pub language_id: String,
}

#[async_trait]
impl EtlPhase for LoadPhase {
    async fn execute(&mut self, context: &mut EtlContext) -> Result<()> {
        let summary = load::load(
            self.store.as_mut(),
            &context.availabilities,
            &context.facilities,
            self.city_id,
            &self.language_id,
        )
        .await?;
        context.load_summary = Some(summary);
        Ok(())
    }
}
