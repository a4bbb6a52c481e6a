//! Read-only access to the master registry of approved identifiers.

use std::collections::HashSet;

use domain::services::RegistryLookup;
use domain::DeRegError;
use shared::validation::normalize_imei;
use sqlx::PgPool;

use crate::metrics::QueryTimer;

/// Repository for the approved_imeis table.
#[derive(Clone)]
pub struct RegistryRepository {
    pool: PgPool,
}

impl RegistryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Normalized identifiers among `normalized` that are currently registered.
    ///
    /// A row counts when it is not removed and its status is not `unknown`.
    pub async fn registered(&self, normalized: &[String]) -> Result<HashSet<String>, sqlx::Error> {
        let timer = QueryTimer::new("find_registered_imeis");
        let result: Result<Vec<(String,)>, sqlx::Error> = sqlx::query_as(
            r#"
            SELECT imei_norm
            FROM approved_imeis
            WHERE imei_norm = ANY($1)
              AND removed = FALSE
              AND status <> 'unknown'
            "#,
        )
        .bind(normalized)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result?.into_iter().map(|(imei,)| imei).collect())
    }
}

#[async_trait::async_trait]
impl RegistryLookup for RegistryRepository {
    async fn find_unregistered(&self, identifiers: &[String]) -> Result<Vec<String>, DeRegError> {
        if identifiers.is_empty() {
            return Ok(Vec::new());
        }
        let normalized: Vec<String> = identifiers.iter().map(|i| normalize_imei(i)).collect();
        let registered = self.registered(&normalized).await?;

        Ok(identifiers
            .iter()
            .zip(&normalized)
            .filter(|(_, norm)| !registered.contains(*norm))
            .map(|(imei, _)| imei.clone())
            .collect())
    }
}
