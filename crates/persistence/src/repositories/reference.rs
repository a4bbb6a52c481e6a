//! Status and device type reference tables.

use sqlx::PgPool;

use crate::entities::{DeviceTypeEntity, StatusEntity};
use crate::metrics::QueryTimer;

/// Repository for the status table.
#[derive(Clone)]
pub struct StatusRepository {
    pool: PgPool,
}

impl StatusRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_id_by_description(&self, description: &str) -> Result<Option<i32>, sqlx::Error> {
        let timer = QueryTimer::new("find_status_id");
        let result: Result<Option<(i32,)>, sqlx::Error> =
            sqlx::query_as("SELECT id FROM status WHERE description = $1")
                .bind(description)
                .fetch_optional(&self.pool)
                .await;
        timer.record();
        Ok(result?.map(|(id,)| id))
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<StatusEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_status_by_id");
        let result = sqlx::query_as::<_, StatusEntity>(
            "SELECT id, description FROM status WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }
}

/// Repository for the devicetype table.
#[derive(Clone)]
pub struct DeviceTypeRepository {
    pool: PgPool,
}

impl DeviceTypeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_id_by_description(&self, description: &str) -> Result<Option<i32>, sqlx::Error> {
        let timer = QueryTimer::new("find_device_type_id");
        let result: Result<Option<(i32,)>, sqlx::Error> =
            sqlx::query_as("SELECT id FROM devicetype WHERE description = $1")
                .bind(description)
                .fetch_optional(&self.pool)
                .await;
        timer.record();
        Ok(result?.map(|(id,)| id))
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<DeviceTypeEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_device_type_by_id");
        let result = sqlx::query_as::<_, DeviceTypeEntity>(
            "SELECT id, description FROM devicetype WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn list(&self) -> Result<Vec<DeviceTypeEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_device_types");
        let result = sqlx::query_as::<_, DeviceTypeEntity>(
            "SELECT id, description FROM devicetype ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }
}
