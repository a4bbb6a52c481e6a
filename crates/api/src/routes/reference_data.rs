//! Reference data endpoint handlers.

use axum::{extract::State, http::StatusCode, Json};
use domain::models::DeviceType;

use crate::app::AppState;
use crate::error::ApiError;

/// GET /api/v1/device-types
pub async fn list_device_types(
    State(state): State<AppState>,
) -> Result<Json<Vec<DeviceType>>, ApiError> {
    Ok(Json(state.reference.device_types.list().await?))
}

/// Drop cached statuses and device types after a reference table change.
///
/// POST /api/v1/reference-data/invalidate
pub async fn invalidate(State(state): State<AppState>) -> StatusCode {
    state.reference.invalidate();
    StatusCode::NO_CONTENT
}
