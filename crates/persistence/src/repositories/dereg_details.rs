//! De-registration request repository.

use domain::models::DeRegRequest;
use domain::services::DeRegRequestStore;
use domain::DeRegError;
use sqlx::PgPool;

use crate::entities::DeRegDetailsEntity;
use crate::metrics::QueryTimer;

/// Repository for the deregdetails table.
#[derive(Clone)]
pub struct DeRegDetailsRepository {
    pool: PgPool,
}

impl DeRegDetailsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn exists(&self, id: i64) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("dereg_details_exists");
        let result: Result<(bool,), sqlx::Error> =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM deregdetails WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await;
        timer.record();
        Ok(result?.0)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<DeRegDetailsEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_dereg_details");
        let result = sqlx::query_as::<_, DeRegDetailsEntity>(
            r#"
            SELECT id, user_id, tracking_id, processing_status, report_status,
                   created_at, updated_at
            FROM deregdetails
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }
}

#[async_trait::async_trait]
impl DeRegRequestStore for DeRegDetailsRepository {
    async fn exists(&self, dereg_id: i64) -> Result<bool, DeRegError> {
        Ok(DeRegDetailsRepository::exists(self, dereg_id).await?)
    }

    async fn find_by_id(&self, dereg_id: i64) -> Result<Option<DeRegRequest>, DeRegError> {
        Ok(DeRegDetailsRepository::find_by_id(self, dereg_id)
            .await?
            .map(Into::into))
    }
}
