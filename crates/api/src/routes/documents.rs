//! De-registration document endpoint handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use domain::models::{DeRegDocumentView, DeRegDocumentsPayload};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::Submission;

/// GET /api/v1/deregistration/:dereg_id/documents
pub async fn get_documents(
    State(state): State<AppState>,
    Path(dereg_id): Path<String>,
) -> Result<Json<Vec<DeRegDocumentView>>, ApiError> {
    Ok(Json(state.documents.list_documents(&dereg_id).await?))
}

/// Attach or replace document files by label.
///
/// PUT /api/v1/deregistration/documents
pub async fn update_documents(
    State(state): State<AppState>,
    Submission(payload): Submission<DeRegDocumentsPayload>,
) -> Result<Json<Vec<DeRegDocumentView>>, ApiError> {
    Ok(Json(state.documents.update_documents(payload).await?))
}
