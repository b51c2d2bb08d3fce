//! In-memory [`Store`] used by loader and pipeline tests.
//!
//! Rows are plain structs with public fields so tests can assert on exactly
//! what the loader wrote. `fail_after` injects a failure on the Nth insert
//! to exercise the rollback path.

use async_trait::async_trait;
use chrono::NaiveDateTime;

use super::{Store, StoreError};

#[derive(Debug, Clone, PartialEq)]
pub struct LanguageTranslationRow {
    pub translation_id: i64,
    pub language_id: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AddressRow {
    pub id: i64,
    pub street_translation_id: i64,
    pub city: String,
    pub province: String,
    pub postal_code: String,
    pub country: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FacilityRow {
    pub id: i64,
    pub phone: Option<String>,
    pub address_id: i64,
    pub title_translation_id: i64,
    pub url: Option<String>,
    pub city_id: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryRow {
    pub id: i64,
    pub city_id: i32,
    pub title_translation_id: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeRow {
    pub id: i64,
    pub category_id: i64,
    pub title_translation_id: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityRow {
    pub id: i64,
    pub type_id: i64,
    pub title_translation_id: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AvailabilityRow {
    pub facility_id: i64,
    pub activity_id: i64,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub min_age: Option<i32>,
    pub max_age: Option<i32>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    next_id: i64,
    inserts: usize,
    fail_after: Option<usize>,

    pub in_transaction: bool,
    pub committed: bool,

    pub translations: Vec<i64>,
    pub language_translations: Vec<LanguageTranslationRow>,
    pub addresses: Vec<AddressRow>,
    pub facilities: Vec<FacilityRow>,
    pub location_origins: Vec<(i64, i64)>,
    pub categories: Vec<CategoryRow>,
    pub types: Vec<TypeRow>,
    pub activities: Vec<ActivityRow>,
    pub facility_activities: Vec<(i64, i64)>,
    pub availabilities: Vec<AvailabilityRow>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every insert after the first `n` have succeeded.
    pub fn fail_after(n: usize) -> Self {
        Self {
            fail_after: Some(n),
            ..Self::default()
        }
    }

    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn check_insert(&mut self) -> Result<(), StoreError> {
        if let Some(limit) = self.fail_after {
            if self.inserts >= limit {
                return Err(StoreError::Other("injected insert failure".to_string()));
            }
        }
        self.inserts += 1;
        Ok(())
    }

    fn clear_rows(&mut self) {
        self.translations.clear();
        self.language_translations.clear();
        self.addresses.clear();
        self.facilities.clear();
        self.location_origins.clear();
        self.categories.clear();
        self.types.clear();
        self.activities.clear();
        self.facility_activities.clear();
        self.availabilities.clear();
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&mut self) -> Result<(), StoreError> {
        self.in_transaction = true;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        self.in_transaction = false;
        self.committed = true;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        // a single transaction spans the whole load, so rolling back
        // discards every row inserted so far
        self.in_transaction = false;
        self.clear_rows();
        Ok(())
    }

    async fn insert_translation(&mut self) -> Result<i64, StoreError> {
        self.check_insert()?;
        let id = self.next_id();
        self.translations.push(id);
        Ok(id)
    }

    async fn insert_language_translation(
        &mut self,
        translation_id: i64,
        language_id: &str,
        description: &str,
    ) -> Result<(), StoreError> {
        self.check_insert()?;
        self.language_translations.push(LanguageTranslationRow {
            translation_id,
            language_id: language_id.to_string(),
            description: description.to_string(),
        });
        Ok(())
    }

    async fn insert_address(
        &mut self,
        street_translation_id: i64,
        city: &str,
        province: &str,
        postal_code: &str,
        country: &str,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<i64, StoreError> {
        self.check_insert()?;
        let id = self.next_id();
        self.addresses.push(AddressRow {
            id,
            street_translation_id,
            city: city.to_string(),
            province: province.to_string(),
            postal_code: postal_code.to_string(),
            country: country.to_string(),
            latitude,
            longitude,
        });
        Ok(id)
    }

    async fn insert_facility(
        &mut self,
        phone: Option<&str>,
        address_id: i64,
        title_translation_id: i64,
        url: Option<&str>,
        city_id: i32,
    ) -> Result<i64, StoreError> {
        self.check_insert()?;
        let id = self.next_id();
        self.facilities.push(FacilityRow {
            id,
            phone: phone.map(str::to_string),
            address_id,
            title_translation_id,
            url: url.map(str::to_string),
            city_id,
        });
        Ok(id)
    }

    async fn insert_location_origin(
        &mut self,
        facility_id: i64,
        location_id: i64,
    ) -> Result<(), StoreError> {
        self.check_insert()?;
        self.location_origins.push((facility_id, location_id));
        Ok(())
    }

    async fn insert_category(
        &mut self,
        city_id: i32,
        title_translation_id: i64,
    ) -> Result<i64, StoreError> {
        self.check_insert()?;
        let id = self.next_id();
        self.categories.push(CategoryRow {
            id,
            city_id,
            title_translation_id,
        });
        Ok(id)
    }

    async fn insert_type(
        &mut self,
        category_id: i64,
        title_translation_id: i64,
    ) -> Result<i64, StoreError> {
        self.check_insert()?;
        let id = self.next_id();
        self.types.push(TypeRow {
            id,
            category_id,
            title_translation_id,
        });
        Ok(id)
    }

    async fn insert_activity(
        &mut self,
        type_id: i64,
        title_translation_id: i64,
    ) -> Result<i64, StoreError> {
        self.check_insert()?;
        let id = self.next_id();
        self.activities.push(ActivityRow {
            id,
            type_id,
            title_translation_id,
        });
        Ok(id)
    }

    async fn insert_facility_activity(
        &mut self,
        facility_id: i64,
        activity_id: i64,
    ) -> Result<(), StoreError> {
        self.check_insert()?;
        self.facility_activities.push((facility_id, activity_id));
        Ok(())
    }

    async fn insert_availability(
        &mut self,
        facility_id: i64,
        activity_id: i64,
        start_time: NaiveDateTime,
        end_time: NaiveDateTime,
        min_age: Option<i32>,
        max_age: Option<i32>,
    ) -> Result<(), StoreError> {
        self.check_insert()?;
        self.availabilities.push(AvailabilityRow {
            facility_id,
            activity_id,
            start_time,
            end_time,
            min_age,
            max_age,
        });
        Ok(())
    }
}
