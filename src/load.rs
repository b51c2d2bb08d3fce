//! Transactional load of the normalized entities into the target schema.
//!
//! Facilities are inserted once up front, keyed by location id. The
//! availability stream is then walked in its sorted order with one sentinel
//! per hierarchy level; a level's row is minted only when its value changes
//! between consecutive availabilities.
//!
//! Precondition: the availability list is sorted by (category, type_name,
//! course_title, location_id) as produced by [`crate::extract`]. The
//! change-detection below relies on that order to keep each category's,
//! type's and activity's rows contiguous; feeding an unsorted list would
//! mint duplicate hierarchy rows.

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::db::{Store, StoreError};
use crate::model::{Availability, Facility};

/// Country every loaded address belongs to.
pub const COUNTRY: &str = "Canada";

/// Load failures. Fatal: the transaction is rolled back and the run exits
/// non-zero.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("availability references location id {0} with no resolved facility")]
    UnknownFacility(i64),
}

/// Per-table row counts for one load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadSummary {
    pub translations: usize,
    pub language_translations: usize,
    pub addresses: usize,
    pub facilities: usize,
    pub location_origins: usize,
    pub categories: usize,
    pub types: usize,
    pub activities: usize,
    pub facility_activities: usize,
    pub availabilities: usize,
}

impl LoadSummary {
    fn log(&self) {
        info!("Inserted into translation {} rows", self.translations);
        info!(
            "Inserted into language_translation {} rows",
            self.language_translations
        );
        info!("Inserted into address {} rows", self.addresses);
        info!("Inserted into facility {} rows", self.facilities);
        info!(
            "Inserted into reference_facility_locationorigin {} rows",
            self.location_origins
        );
        info!("Inserted into category {} rows", self.categories);
        info!("Inserted into type {} rows", self.types);
        info!("Inserted into activity {} rows", self.activities);
        info!(
            "Inserted into facility_activity {} rows",
            self.facility_activities
        );
        info!("Inserted into availability {} rows", self.availabilities);
    }
}

/// Run the whole load in one transaction. Commits only after every row is
/// inserted; any failure rolls back explicitly before the error propagates.
pub async fn load(
    store: &mut dyn Store,
    availabilities: &[Availability],
    facilities: &[Facility],
    city_id: i32,
    language_id: &str,
) -> Result<LoadSummary, LoadError> {
    store.begin().await?;
    match load_all(store, availabilities, facilities, city_id, language_id).await {
        Ok(summary) => {
            store.commit().await?;
            summary.log();
            Ok(summary)
        }
        Err(e) => {
            if let Err(rollback_err) = store.rollback().await {
                warn!("rollback failed: {}", rollback_err);
            }
            Err(e)
        }
    }
}

async fn load_all(
    store: &mut dyn Store,
    availabilities: &[Availability],
    facilities: &[Facility],
    city_id: i32,
    language_id: &str,
) -> Result<LoadSummary, LoadError> {
    let mut summary = LoadSummary::default();

    // facilities first, once each, keyed by their source location id
    let mut facility_ids: HashMap<i64, i64> = HashMap::with_capacity(facilities.len());
    for facility in facilities {
        let facility_id =
            insert_facility(store, facility, city_id, language_id, &mut summary).await?;
        facility_ids.insert(facility.location_id, facility_id);
    }

    // change-detection over the sorted availability stream; None never
    // matches real data, so the first row mints every level
    let mut last_category: Option<&str> = None;
    let mut last_type: Option<&str> = None;
    let mut last_activity: Option<&str> = None;
    let mut category_id: i64 = 0;
    let mut type_id: i64 = 0;
    let mut activity_id: i64 = 0;

    for availability in availabilities {
        let facility_id = *facility_ids
            .get(&availability.location_id)
            .ok_or(LoadError::UnknownFacility(availability.location_id))?;

        if last_category != Some(availability.category.as_str()) {
            let translation_id =
                insert_translated(store, language_id, &availability.category, &mut summary).await?;
            category_id = store.insert_category(city_id, translation_id).await?;
            summary.categories += 1;
            debug!(
                "Inserted a new Category: {} ({})",
                category_id, availability.category
            );
            last_category = Some(availability.category.as_str());
        }

        if last_type != Some(availability.type_name.as_str()) {
            let translation_id =
                insert_translated(store, language_id, &availability.type_name, &mut summary)
                    .await?;
            type_id = store.insert_type(category_id, translation_id).await?;
            summary.types += 1;
            debug!(
                "Inserted a new Type: {} ({})",
                type_id, availability.type_name
            );
            last_type = Some(availability.type_name.as_str());
        }

        if last_activity != Some(availability.course_title.as_str()) {
            let translation_id =
                insert_translated(store, language_id, &availability.course_title, &mut summary)
                    .await?;
            activity_id = store.insert_activity(type_id, translation_id).await?;
            summary.activities += 1;
            store
                .insert_facility_activity(facility_id, activity_id)
                .await?;
            summary.facility_activities += 1;
            debug!(
                "Inserted a new Activity: {} ({})",
                activity_id, availability.course_title
            );
            last_activity = Some(availability.course_title.as_str());
        }

        store
            .insert_availability(
                facility_id,
                activity_id,
                availability.start_time,
                availability.end_time,
                availability.age_min,
                availability.age_max,
            )
            .await?;
        summary.availabilities += 1;
    }

    Ok(summary)
}

/// Translation + LanguageTranslation pair for one display string; returns
/// the translation id the entity row should reference.
async fn insert_translated(
    store: &mut dyn Store,
    language_id: &str,
    description: &str,
    summary: &mut LoadSummary,
) -> Result<i64, LoadError> {
    let translation_id = store.insert_translation().await?;
    summary.translations += 1;
    store
        .insert_language_translation(translation_id, language_id, description)
        .await?;
    summary.language_translations += 1;
    Ok(translation_id)
}

async fn insert_facility(
    store: &mut dyn Store,
    facility: &Facility,
    city_id: i32,
    language_id: &str,
    summary: &mut LoadSummary,
) -> Result<i64, LoadError> {
    let street_translation_id =
        insert_translated(store, language_id, &facility.street, summary).await?;
    let address_id = store
        .insert_address(
            street_translation_id,
            &facility.city,
            &facility.province,
            &facility.postal_code.replace(' ', ""),
            COUNTRY,
            facility.lat,
            facility.lng,
        )
        .await?;
    summary.addresses += 1;

    let title_translation_id =
        insert_translated(store, language_id, &facility.name, summary).await?;
    let facility_id = store
        .insert_facility(
            facility.phone.as_deref(),
            address_id,
            title_translation_id,
            facility.url.as_deref(),
            city_id,
        )
        .await?;
    summary.facilities += 1;

    store
        .insert_location_origin(facility_id, facility.location_id)
        .await?;
    summary.location_origins += 1;

    debug!(
        "Inserted a new Facility: {} ({})",
        facility_id, facility.name
    );
    Ok(facility_id)
}
