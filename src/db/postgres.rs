//! Postgres-backed [`Store`].
//!
//! One connection, held for the whole load. Transaction control is issued
//! as plain statements so the borrow of the client stays with the store
//! across the loader's calls.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tokio_postgres::NoTls;
use tracing::{error, info};

use super::{Store, StoreError};

pub struct PostgresStore {
    client: tokio_postgres::Client,
}

impl PostgresStore {
    /// Connect and spawn the connection driver task.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        info!("Connecting to database...");
        let (client, connection) = tokio_postgres::connect(database_url, NoTls).await?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("database connection error: {}", e);
            }
        });
        Ok(Self { client })
    }

    async fn insert_returning_id(
        &mut self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<i64, StoreError> {
        let row = self.client.query_one(sql, params).await?;
        Ok(row.get(0))
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn begin(&mut self) -> Result<(), StoreError> {
        self.client.batch_execute("BEGIN").await?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        self.client.batch_execute("COMMIT").await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        self.client.batch_execute("ROLLBACK").await?;
        Ok(())
    }

    async fn insert_translation(&mut self) -> Result<i64, StoreError> {
        self.insert_returning_id("INSERT INTO translation DEFAULT VALUES RETURNING id", &[])
            .await
    }

    async fn insert_language_translation(
        &mut self,
        translation_id: i64,
        language_id: &str,
        description: &str,
    ) -> Result<(), StoreError> {
        self.client
            .execute(
                "INSERT INTO language_translation (translation_id, language_id, description) \
                 VALUES ($1, $2, $3)",
                &[&translation_id, &language_id, &description],
            )
            .await?;
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
        self.insert_returning_id(
            "INSERT INTO address \
             (street_translation_id, city, province, postal_code, country, latitude, longitude) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
            &[
                &street_translation_id,
                &city,
                &province,
                &postal_code,
                &country,
                &latitude,
                &longitude,
            ],
        )
        .await
    }

    async fn insert_facility(
        &mut self,
        phone: Option<&str>,
        address_id: i64,
        title_translation_id: i64,
        url: Option<&str>,
        city_id: i32,
    ) -> Result<i64, StoreError> {
        self.insert_returning_id(
            "INSERT INTO facility (phone, address_id, title_translation_id, url, city_id) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
            &[&phone, &address_id, &title_translation_id, &url, &city_id],
        )
        .await
    }

    async fn insert_location_origin(
        &mut self,
        facility_id: i64,
        location_id: i64,
    ) -> Result<(), StoreError> {
        self.client
            .execute(
                "INSERT INTO reference_facility_locationorigin (facility_id, location_id) \
                 VALUES ($1, $2)",
                &[&facility_id, &location_id],
            )
            .await?;
        Ok(())
    }

    async fn insert_category(
        &mut self,
        city_id: i32,
        title_translation_id: i64,
    ) -> Result<i64, StoreError> {
        self.insert_returning_id(
            "INSERT INTO category (city_id, title_translation_id) VALUES ($1, $2) RETURNING id",
            &[&city_id, &title_translation_id],
        )
        .await
    }

    async fn insert_type(
        &mut self,
        category_id: i64,
        title_translation_id: i64,
    ) -> Result<i64, StoreError> {
        self.insert_returning_id(
            "INSERT INTO type (category_id, title_translation_id) VALUES ($1, $2) RETURNING id",
            &[&category_id, &title_translation_id],
        )
        .await
    }

    async fn insert_activity(
        &mut self,
        type_id: i64,
        title_translation_id: i64,
    ) -> Result<i64, StoreError> {
        self.insert_returning_id(
            "INSERT INTO activity (type_id, title_translation_id) VALUES ($1, $2) RETURNING id",
            &[&type_id, &title_translation_id],
        )
        .await
    }

    async fn insert_facility_activity(
        &mut self,
        facility_id: i64,
        activity_id: i64,
    ) -> Result<(), StoreError> {
        self.client
            .execute(
                "INSERT INTO facility_activity (facility_id, activity_id) VALUES ($1, $2)",
                &[&facility_id, &activity_id],
            )
            .await?;
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
        self.client
            .execute(
                "INSERT INTO availability \
                 (facility_id, activity_id, start_time, end_time, min_age, max_age) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
                &[
                    &facility_id,
                    &activity_id,
                    &start_time,
                    &end_time,
                    &min_age,
                    &max_age,
                ],
            )
            .await?;
        Ok(())
    }
}
