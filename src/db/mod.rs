//! Storage layer for the target relational schema.
//!
//! [`Store`] is the seam between the loader and the database: one method per
//! insert the loader performs, plus explicit transaction control. The
//! Postgres implementation executes the real inserts; [`MemoryStore`] backs
//! the loader tests without a running database.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use thiserror::Error;

/// Persistence failures. Fatal: the loader rolls back and the run exits
/// non-zero.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error("{0}")]
    Other(String),
}

/// Insert surface of the target schema. Surrogate ids are returned by the
/// methods that create referenced rows.
#[async_trait]
pub trait Store: Send {
    async fn begin(&mut self) -> Result<(), StoreError>;
    async fn commit(&mut self) -> Result<(), StoreError>;
    async fn rollback(&mut self) -> Result<(), StoreError>;

    async fn insert_translation(&mut self) -> Result<i64, StoreError>;

    async fn insert_language_translation(
        &mut self,
        translation_id: i64,
        language_id: &str,
        description: &str,
    ) -> Result<(), StoreError>;

    #[allow(clippy::too_many_arguments)]
    async fn insert_address(
        &mut self,
        street_translation_id: i64,
        city: &str,
        province: &str,
        postal_code: &str,
        country: &str,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<i64, StoreError>;

    async fn insert_facility(
        &mut self,
        phone: Option<&str>,
        address_id: i64,
        title_translation_id: i64,
        url: Option<&str>,
        city_id: i32,
    ) -> Result<i64, StoreError>;

    async fn insert_location_origin(
        &mut self,
        facility_id: i64,
        location_id: i64,
    ) -> Result<(), StoreError>;

    async fn insert_category(
        &mut self,
        city_id: i32,
        title_translation_id: i64,
    ) -> Result<i64, StoreError>;

    async fn insert_type(
        &mut self,
        category_id: i64,
        title_translation_id: i64,
    ) -> Result<i64, StoreError>;

    async fn insert_activity(
        &mut self,
        type_id: i64,
        title_translation_id: i64,
    ) -> Result<i64, StoreError>;

    async fn insert_facility_activity(
        &mut self,
        facility_id: i64,
        activity_id: i64,
    ) -> Result<(), StoreError>;

    #[allow(clippy::too_many_arguments)]
    async fn insert_availability(
        &mut self,
        facility_id: i64,
        activity_id: i64,
        start_time: NaiveDateTime,
        end_time: NaiveDateTime,
        min_age: Option<i32>,
        max_age: Option<i32>,
    ) -> Result<(), StoreError>;
}
