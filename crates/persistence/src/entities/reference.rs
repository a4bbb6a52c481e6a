//! Reference data entities.

use domain::models::DeviceType;
use sqlx::FromRow;

/// Database row mapping for the status table.
#[derive(Debug, Clone, FromRow)]
pub struct StatusEntity {
    pub id: i32,
    pub description: String,
}

/// Database row mapping for the devicetype table.
#[derive(Debug, Clone, FromRow)]
pub struct DeviceTypeEntity {
    pub id: i32,
    pub description: String,
}

impl From<DeviceTypeEntity> for DeviceType {
    fn from(entity: DeviceTypeEntity) -> Self {
        Self {
            id: entity.id,
            description: entity.description,
        }
    }
}
