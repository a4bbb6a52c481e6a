//! De-registration device and identifier repository.
//!
//! Devices are stored in generations. Writing a new generation inserts the
//! new devices and identifiers, deletes the previous generation's
//! identifiers and marks its devices superseded, all in one transaction.
//! Live devices and their identifiers are read in one statement, so a reader
//! sees either the old generation or the new one in full.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use domain::models::{CuratedSubmission, DeRegDevice, DeRegRequest, Identifier};
use domain::services::{DeviceStore, IdentifierTacMap};
use domain::DeRegError;
use shared::validation::normalize_imei;
use sqlx::{PgConnection, PgPool};
use tracing::debug;

use crate::entities::{group_live_devices, DeRegDeviceEntity, LiveDeviceRow};
use crate::metrics::QueryTimer;

/// Repository for the dereg_device and dereg_imei tables.
#[derive(Clone)]
pub struct DeRegDeviceRepository {
    pool: PgPool,
}

impl DeRegDeviceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Live devices of a request, each with its identifiers, in insertion order.
    pub async fn find_live_by_request(&self, dereg_id: i64) -> Result<Vec<DeRegDevice>, sqlx::Error> {
        let timer = QueryTimer::new("find_live_dereg_devices");
        let rows = sqlx::query_as::<_, LiveDeviceRow>(
            r#"
            SELECT d.id, d.dereg_id, d.tac, d.brand_name, d.model_name, d.model_num,
                   d.operating_system, t.description AS device_type, d.technology,
                   d.device_count, d.created_at, i.imei, i.norm_imei
            FROM dereg_device d
            JOIN devicetype t ON t.id = d.device_type
            LEFT JOIN dereg_imei i ON i.device_id = d.id
            WHERE d.dereg_id = $1 AND d.superseded_at IS NULL
            ORDER BY d.id, i.id
            "#,
        )
        .bind(dereg_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();

        Ok(group_live_devices(rows?))
    }

    /// Writes a new device generation for `request` in a single transaction.
    ///
    /// The request row is locked first so concurrent submissions for the same
    /// request serialize. `processing_status` is applied when given.
    pub async fn replace_generation(
        &self,
        request: &DeRegRequest,
        submission: &CuratedSubmission,
        identifiers: &IdentifierTacMap,
        processing_status: Option<i32>,
    ) -> Result<Vec<DeRegDevice>, sqlx::Error> {
        let timer = QueryTimer::new("replace_dereg_devices");
        let mut tx = self.pool.begin().await?;

        let locked: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM deregdetails WHERE id = $1 FOR UPDATE")
                .bind(request.id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(sqlx::Error::RowNotFound);
        }

        let old_device_ids: Vec<i64> = sqlx::query_as::<_, (i64,)>(
            "SELECT id FROM dereg_device WHERE dereg_id = $1 AND superseded_at IS NULL",
        )
        .bind(request.id)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(|(id,)| id)
        .collect();

        let created = bulk_create(&mut *tx, request.id, submission).await?;
        let device_id_tac_map: HashMap<&str, i64> =
            created.iter().map(|d| (d.tac.as_str(), d.id)).collect();

        sqlx::query(
            r#"
            UPDATE deregdetails
            SET processing_status = COALESCE($2, processing_status),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(request.id)
        .bind(processing_status)
        .execute(&mut *tx)
        .await?;

        let stored =
            bulk_insert_identifiers(&mut *tx, &device_id_tac_map, identifiers, &old_device_ids)
                .await?;

        tx.commit().await?;
        timer.record();

        debug!(
            dereg_id = request.id,
            superseded = old_device_ids.len(),
            created = created.len(),
            "Device generation replaced"
        );

        let mut by_device: HashMap<i64, Vec<Identifier>> = HashMap::new();
        for (device_id, identifier) in stored {
            by_device.entry(device_id).or_default().push(identifier);
        }
        Ok(created
            .into_iter()
            .map(|device| {
                let imeis = by_device.remove(&device.id).unwrap_or_default();
                device.into_domain(imeis)
            })
            .collect())
    }
}

/// Inserts the submitted devices in one statement, resolving device types
/// by description. Returned entities follow submission order.
async fn bulk_create(
    conn: &mut PgConnection,
    dereg_id: i64,
    submission: &CuratedSubmission,
) -> Result<Vec<DeRegDeviceEntity>, sqlx::Error> {
    let devices = &submission.devices;
    let tacs: Vec<&str> = devices.iter().map(|d| d.tac.as_str()).collect();
    let brand_names: Vec<&str> = devices.iter().map(|d| d.brand_name.as_str()).collect();
    let model_names: Vec<&str> = devices.iter().map(|d| d.model_name.as_str()).collect();
    let model_nums: Vec<&str> = devices.iter().map(|d| d.model_num.as_str()).collect();
    let operating_systems: Vec<&str> =
        devices.iter().map(|d| d.operating_system.as_str()).collect();
    let device_types: Vec<&str> = devices.iter().map(|d| d.device_type.as_str()).collect();
    let technologies: Vec<&str> = devices.iter().map(|d| d.technology.as_str()).collect();
    let counts: Vec<i32> = devices.iter().map(|d| d.count as i32).collect();

    let rows: Vec<(i64, String, DateTime<Utc>)> = sqlx::query_as(
        r#"
        INSERT INTO dereg_device (
            dereg_id, tac, brand_name, model_name, model_num, operating_system,
            device_type, technology, device_count
        )
        SELECT $1, u.tac, u.brand_name, u.model_name, u.model_num, u.operating_system,
               t.id, u.technology, u.device_count
        FROM UNNEST(
            $2::text[], $3::text[], $4::text[], $5::text[], $6::text[],
            $7::text[], $8::text[], $9::int[]
        ) WITH ORDINALITY AS u(
            tac, brand_name, model_name, model_num, operating_system,
            device_type, technology, device_count, ord
        )
        LEFT JOIN devicetype t ON t.description = u.device_type
        ORDER BY u.ord
        RETURNING id, tac, created_at
        "#,
    )
    .bind(dereg_id)
    .bind(&tacs)
    .bind(&brand_names)
    .bind(&model_names)
    .bind(&model_nums)
    .bind(&operating_systems)
    .bind(&device_types)
    .bind(&technologies)
    .bind(&counts)
    .fetch_all(&mut *conn)
    .await?;

    // TACs are unique within a curated submission.
    let mut inserted: HashMap<String, (i64, DateTime<Utc>)> = rows
        .into_iter()
        .map(|(id, tac, created_at)| (tac, (id, created_at)))
        .collect();

    let mut created = Vec::with_capacity(devices.len());
    for device in devices {
        let Some((id, created_at)) = inserted.remove(&device.tac) else {
            return Err(sqlx::Error::RowNotFound);
        };
        created.push(DeRegDeviceEntity {
            id,
            dereg_id,
            tac: device.tac.clone(),
            brand_name: device.brand_name.clone(),
            model_name: device.model_name.clone(),
            model_num: device.model_num.clone(),
            operating_system: device.operating_system.clone(),
            device_type: device.device_type.clone(),
            technology: device.technology.clone(),
            device_count: device.count as i32,
            created_at,
        });
    }

    Ok(created)
}

/// Links each identifier to the new device of its TAC, then retires the
/// previous generation. Returns the stored identifiers keyed by device id.
async fn bulk_insert_identifiers(
    conn: &mut PgConnection,
    device_id_tac_map: &HashMap<&str, i64>,
    identifiers: &IdentifierTacMap,
    old_device_ids: &[i64],
) -> Result<Vec<(i64, Identifier)>, sqlx::Error> {
    let mut device_ids = Vec::with_capacity(identifiers.len());
    let mut imeis = Vec::with_capacity(identifiers.len());
    let mut norm_imeis = Vec::with_capacity(identifiers.len());
    let mut stored = Vec::with_capacity(identifiers.len());

    for (imei, tac) in identifiers {
        let Some(&device_id) = device_id_tac_map.get(tac.as_str()) else {
            continue;
        };
        let norm_imei = normalize_imei(imei);
        device_ids.push(device_id);
        imeis.push(imei.clone());
        norm_imeis.push(norm_imei.clone());
        stored.push((
            device_id,
            Identifier {
                imei: imei.clone(),
                norm_imei,
                tac: tac.clone(),
            },
        ));
    }

    if !device_ids.is_empty() {
        sqlx::query(
            r#"
            INSERT INTO dereg_imei (device_id, imei, norm_imei)
            SELECT * FROM UNNEST($1::bigint[], $2::text[], $3::text[])
            "#,
        )
        .bind(&device_ids)
        .bind(&imeis)
        .bind(&norm_imeis)
        .execute(&mut *conn)
        .await?;
    }

    if !old_device_ids.is_empty() {
        sqlx::query("DELETE FROM dereg_imei WHERE device_id = ANY($1)")
            .bind(old_device_ids)
            .execute(&mut *conn)
            .await?;

        sqlx::query("UPDATE dereg_device SET superseded_at = NOW() WHERE id = ANY($1)")
            .bind(old_device_ids)
            .execute(&mut *conn)
            .await?;
    }

    Ok(stored)
}

#[async_trait::async_trait]
impl DeviceStore for DeRegDeviceRepository {
    async fn devices_for_request(&self, dereg_id: i64) -> Result<Vec<DeRegDevice>, DeRegError> {
        Ok(self.find_live_by_request(dereg_id).await?)
    }

    async fn replace_devices(
        &self,
        request: &DeRegRequest,
        submission: &CuratedSubmission,
        identifiers: &IdentifierTacMap,
        processing_status: Option<i32>,
    ) -> Result<Vec<DeRegDevice>, DeRegError> {
        Ok(self
            .replace_generation(request, submission, identifiers, processing_status)
            .await?)
    }
}
