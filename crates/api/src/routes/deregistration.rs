//! De-registration device endpoint handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use domain::models::{DeRegDevice, DeRegDevicesPayload, DevicesOutcome};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::Submission;
use crate::middleware::metrics::{
    record_devices_created, record_submission_rejected, record_update_skipped,
};

/// List the live devices of a request.
///
/// GET /api/v1/deregistration/:dereg_id/devices
pub async fn get_devices(
    State(state): State<AppState>,
    Path(dereg_id): Path<String>,
) -> Result<Json<Vec<DeRegDevice>>, ApiError> {
    let devices = state.devices.fetch_devices(&dereg_id).await?;
    Ok(Json(devices))
}

/// Enter the devices of a request.
///
/// POST /api/v1/deregistration/devices
pub async fn create_devices(
    State(state): State<AppState>,
    Submission(payload): Submission<DeRegDevicesPayload>,
) -> Result<Json<DevicesOutcome>, ApiError> {
    let outcome = state
        .devices
        .create_devices(payload)
        .await
        .map_err(rejected)?;
    record_devices_created(outcome.devices.len());
    Ok(Json(outcome))
}

/// Resubmit the devices of a request.
///
/// PUT /api/v1/deregistration/devices
pub async fn update_devices(
    State(state): State<AppState>,
    Submission(payload): Submission<DeRegDevicesPayload>,
) -> Result<Json<DevicesOutcome>, ApiError> {
    let outcome = state
        .devices
        .update_devices(payload)
        .await
        .map_err(rejected)?;
    if outcome.devices.is_empty() {
        record_update_skipped();
    } else {
        record_devices_created(outcome.devices.len());
    }
    Ok(Json(outcome))
}

fn rejected(err: domain::DeRegError) -> ApiError {
    let err = ApiError::from(err);
    record_submission_rejected(err.reason());
    err
}
