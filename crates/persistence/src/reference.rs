//! Read-through caches over the status and device type tables.
//!
//! Reference tables change rarely, so lookups are memoized in bounded LRU
//! caches. Misses are not cached. [`ReferenceData::invalidate`] drops
//! everything after an administrative change.

use std::sync::Arc;

use domain::models::{DeviceType, Status};
use domain::services::{DeviceTypeLookup, StatusLookup};
use domain::DeRegError;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::cache::ReferenceCache;
use crate::repositories::{DeviceTypeRepository, StatusRepository};

/// Cached status lookups.
pub struct StatusCache {
    repo: StatusRepository,
    ids: ReferenceCache<Status, i32>,
    names: ReferenceCache<i32, Status>,
}

impl StatusCache {
    pub fn new(repo: StatusRepository, capacity: usize) -> Self {
        Self {
            repo,
            ids: ReferenceCache::new("status_id", capacity),
            names: ReferenceCache::new("status_name", capacity),
        }
    }

    pub fn invalidate(&self) {
        self.ids.invalidate();
        self.names.invalidate();
    }
}

#[async_trait::async_trait]
impl StatusLookup for StatusCache {
    async fn status_id(&self, status: Status) -> Result<i32, DeRegError> {
        if let Some(id) = self.ids.get(&status) {
            return Ok(id);
        }
        let id = self
            .repo
            .find_id_by_description(status.as_str())
            .await?
            .ok_or_else(|| {
                DeRegError::Persistence(format!("status '{}' is missing from reference data", status))
            })?;
        self.ids.insert(status, id);
        Ok(id)
    }

    async fn status_by_id(&self, id: i32) -> Result<Option<Status>, DeRegError> {
        if let Some(status) = self.names.get(&id) {
            return Ok(Some(status));
        }
        let Some(entity) = self.repo.find_by_id(id).await? else {
            return Ok(None);
        };
        match entity.description.parse::<Status>() {
            Ok(status) => {
                self.names.insert(id, status);
                Ok(Some(status))
            }
            Err(e) => {
                warn!(status_id = id, error = %e, "Unrecognized status in reference data");
                Ok(None)
            }
        }
    }
}

/// Cached device type lookups.
pub struct DeviceTypeCache {
    repo: DeviceTypeRepository,
    ids: ReferenceCache<String, i32>,
    descriptions: ReferenceCache<i32, String>,
}

impl DeviceTypeCache {
    pub fn new(repo: DeviceTypeRepository, capacity: usize) -> Self {
        Self {
            repo,
            ids: ReferenceCache::new("device_type_id", capacity),
            descriptions: ReferenceCache::new("device_type_description", capacity),
        }
    }

    pub async fn device_type_by_id(&self, id: i32) -> Result<Option<String>, DeRegError> {
        if let Some(description) = self.descriptions.get(&id) {
            return Ok(Some(description));
        }
        let Some(entity) = self.repo.find_by_id(id).await? else {
            return Ok(None);
        };
        self.descriptions.insert(id, entity.description.clone());
        Ok(Some(entity.description))
    }

    /// Full listing, always read from the table.
    pub async fn list(&self) -> Result<Vec<DeviceType>, DeRegError> {
        Ok(self.repo.list().await?.into_iter().map(Into::into).collect())
    }

    pub fn invalidate(&self) {
        self.ids.invalidate();
        self.descriptions.invalidate();
    }
}

#[async_trait::async_trait]
impl DeviceTypeLookup for DeviceTypeCache {
    async fn device_type_id(&self, description: &str) -> Result<Option<i32>, DeRegError> {
        let key = description.to_string();
        if let Some(id) = self.ids.get(&key) {
            return Ok(Some(id));
        }
        let id = self.repo.find_id_by_description(description).await?;
        if let Some(id) = id {
            self.ids.insert(key, id);
        }
        Ok(id)
    }
}

/// Both reference caches, shared through application state.
#[derive(Clone)]
pub struct ReferenceData {
    pub statuses: Arc<StatusCache>,
    pub device_types: Arc<DeviceTypeCache>,
}

impl ReferenceData {
    pub fn new(pool: PgPool, capacity: usize) -> Self {
        Self {
            statuses: Arc::new(StatusCache::new(StatusRepository::new(pool.clone()), capacity)),
            device_types: Arc::new(DeviceTypeCache::new(
                DeviceTypeRepository::new(pool),
                capacity,
            )),
        }
    }

    pub fn invalidate(&self) {
        self.statuses.invalidate();
        self.device_types.invalidate();
        info!("Reference data caches invalidated");
    }
}
