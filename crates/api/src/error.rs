use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::{DeRegError, FieldErrors};
use serde::Serialize;
use thiserror::Error;

/// Message returned for any failure whose detail stays in the logs.
pub const INTERNAL_ERROR_MESSAGE: &str = "Failed to retrieve response, please try later";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {} invalid field(s)", .0.len())]
    Validation(Vec<ValidationDetail>),

    #[error("Not registered: {0:?}")]
    NotRegistered(Vec<String>),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<ValidationDetail>>,
}

#[derive(Debug, Serialize)]
struct NotRegisteredBody {
    not_registered_imeis: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationDetail {
    pub field: String,
    pub message: String,
}

impl ApiError {
    /// Label used for the rejected-submission counter.
    pub fn reason(&self) -> &'static str {
        match self {
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::Validation(_) => "validation",
            ApiError::NotRegistered(_) => "not_registered",
            ApiError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::Validation(details) => {
                let message = if details.len() == 1 {
                    details[0].message.clone()
                } else {
                    format!("{} validation errors", details.len())
                };
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "validation_error",
                    message,
                    Some(details),
                )
            }
            ApiError::NotRegistered(imeis) => {
                let body = NotRegisteredBody {
                    not_registered_imeis: imeis,
                };
                return (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response();
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    INTERNAL_ERROR_MESSAGE.to_string(),
                    None,
                )
            }
        };

        let body = ErrorBody {
            error: error_code.into(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<FieldErrors> for ApiError {
    fn from(errors: FieldErrors) -> Self {
        ApiError::Validation(
            errors
                .iter()
                .map(|(field, message)| ValidationDetail {
                    field: field.to_string(),
                    message: message.to_string(),
                })
                .collect(),
        )
    }
}

impl From<DeRegError> for ApiError {
    fn from(err: DeRegError) -> Self {
        match err {
            DeRegError::NotFound => ApiError::NotFound(err.to_string()),
            DeRegError::PermissionDenied => ApiError::Forbidden(err.to_string()),
            DeRegError::Validation(errors) => errors.into(),
            DeRegError::NotRegistered(imeis) => ApiError::NotRegistered(imeis),
            DeRegError::Persistence(detail) => ApiError::Internal(detail),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Internal(format!("Database error: {}", err))
    }
}
