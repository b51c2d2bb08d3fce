//! Runs the phases in dependency order.

use std::time::Instant;

use anyhow::{Context as _, Result};
use tracing::{debug, info};

use super::context::EtlContext;
use super::phase_trait::EtlPhase;
use super::phases::{
    ContactPhase, ExtractPhase, FetchPhase, GeocodePhase, LoadPhase, ResolvePhase,
};
use crate::catalog::CatalogClient;
use crate::config::Config;
use crate::db::PostgresStore;
use crate::enrich::{HttpGeocoder, HttpPageFetcher};

pub struct Pipeline {
    phases: Vec<(Box<dyn EtlPhase>, &'static str)>,
}

impl Pipeline {
    /// Wire the phases up from configuration. Connecting to the database
    /// happens here so a bad connection string fails before any network
    /// fetch.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let store = PostgresStore::connect(&config.database_url)
            .await
            .context("Failed to connect to the target database")?;

        let phases: Vec<(Box<dyn EtlPhase>, &'static str)> = vec![
            (
                Box::new(FetchPhase {
                    client: CatalogClient::new(config.catalog_url.clone(), config.http_timeout),
                }),
                "FetchPhase",
            ),
            (Box::new(ExtractPhase), "ExtractPhase"),
            (Box::new(ResolvePhase), "ResolvePhase"),
            (
                Box::new(GeocodePhase {
                    geocoder: Box::new(HttpGeocoder::new(
                        config.geocode_url.clone(),
                        config.geocode_api_key.clone(),
                        config.http_timeout,
                    )),
                }),
                "GeocodePhase",
            ),
            (
                Box::new(ContactPhase {
                    fetcher: Box::new(HttpPageFetcher::new(config.http_timeout)),
                    facility_list_url: config.facility_list_url.clone(),
                    portal_base_url: config.portal_base_url.clone(),
                    facility_page_prefix: config.facility_page_prefix.clone(),
                }),
                "ContactPhase",
            ),
            (
                Box::new(LoadPhase {
                    store: Box::new(store),
                    city_id: config.city_id,
                    language_id: config.language_id.clone(),
                }),
                "LoadPhase",
            ),
        ];

        Ok(Self { phases })
    }

    /// Build a pipeline from pre-constructed phases. Used by tests to swap
    /// in fixture-backed clients.
    pub fn with_phases(phases: Vec<(Box<dyn EtlPhase>, &'static str)>) -> Self {
        Self { phases }
    }

    pub async fn execute(mut self) -> Result<EtlContext> {
        let start = Instant::now();
        info!("Starting recreation data pipeline");

        let mut context = EtlContext::default();
        for (phase, phase_name) in &mut self.phases {
            info!("Phase: {}", phase_name);
            let phase_start = Instant::now();
            phase
                .execute(&mut context)
                .await
                .with_context(|| format!("Phase {} failed", phase_name))?;
            debug!(
                "Phase {} complete in {:?}",
                phase_name,
                phase_start.elapsed()
            );
        }

        info!("Pipeline complete in {:?}", start.elapsed());
        Ok(context)
    }
}
