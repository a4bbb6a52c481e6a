//! De-registration request, device and identifier entities.

use chrono::{DateTime, Utc};
use domain::models::{DeRegDevice, DeRegRequest, Identifier};
use sqlx::FromRow;

/// Database row mapping for the deregdetails table.
#[derive(Debug, Clone, FromRow)]
pub struct DeRegDetailsEntity {
    pub id: i64,
    pub user_id: String,
    pub tracking_id: String,
    pub processing_status: Option<i32>,
    pub report_status: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DeRegDetailsEntity> for DeRegRequest {
    fn from(entity: DeRegDetailsEntity) -> Self {
        Self {
            id: entity.id,
            user_id: entity.user_id,
            tracking_id: entity.tracking_id,
            processing_status: entity.processing_status,
            report_status: entity.report_status,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// A dereg_device row joined with its device type description.
#[derive(Debug, Clone, FromRow)]
pub struct DeRegDeviceEntity {
    pub id: i64,
    pub dereg_id: i64,
    pub tac: String,
    pub brand_name: String,
    pub model_name: String,
    pub model_num: String,
    pub operating_system: String,
    pub device_type: String,
    pub technology: String,
    pub device_count: i32,
    pub created_at: DateTime<Utc>,
}

impl DeRegDeviceEntity {
    pub fn into_domain(self, imeis: Vec<Identifier>) -> DeRegDevice {
        DeRegDevice {
            id: self.id,
            dereg_id: self.dereg_id,
            tac: self.tac,
            brand_name: self.brand_name,
            model_name: self.model_name,
            model_num: self.model_num,
            operating_system: self.operating_system,
            device_type: self.device_type,
            technology: self.technology,
            count: self.device_count,
            imeis,
            created_at: self.created_at,
        }
    }
}

/// One row of the live device read: a device joined with one of its
/// identifiers, or with none when it has no identifier rows.
#[derive(Debug, Clone, FromRow)]
pub struct LiveDeviceRow {
    #[sqlx(flatten)]
    pub device: DeRegDeviceEntity,
    pub imei: Option<String>,
    pub norm_imei: Option<String>,
}

/// Folds rows ordered by device id into devices with their identifiers.
pub fn group_live_devices(rows: Vec<LiveDeviceRow>) -> Vec<DeRegDevice> {
    let mut grouped: Vec<(DeRegDeviceEntity, Vec<Identifier>)> = Vec::new();

    for row in rows {
        let identifier = match (row.imei, row.norm_imei) {
            (Some(imei), Some(norm_imei)) => Some(Identifier {
                imei,
                norm_imei,
                tac: row.device.tac.clone(),
            }),
            _ => None,
        };

        match grouped.last_mut() {
            Some((device, imeis)) if device.id == row.device.id => imeis.extend(identifier),
            _ => grouped.push((row.device, identifier.into_iter().collect())),
        }
    }

    grouped
        .into_iter()
        .map(|(device, imeis)| device.into_domain(imeis))
        .collect()
}
