//! Body extractor accepting JSON or form-encoded submissions.
//!
//! The extractor never rejects. A body that cannot be read becomes a payload
//! carrying whatever request id it held plus its parse errors, so the service
//! resolves the request before reporting them.

use std::convert::Infallible;

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::header::CONTENT_TYPE,
    Form,
};
use domain::models::{DeRegDevicesPayload, DeRegDocumentsPayload};
use domain::services::curation;
use domain::FieldErrors;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Payloads that can be assembled from flat form fields and that can carry
/// the errors of a body read only in part.
pub trait SubmissionBody: DeserializeOwned + Sized {
    fn from_fields(fields: &[(String, String)]) -> Self;

    fn unreadable(body: Option<&Value>, errors: FieldErrors) -> Self;
}

impl SubmissionBody for DeRegDevicesPayload {
    fn from_fields(fields: &[(String, String)]) -> Self {
        curation::payload_from_fields(fields)
    }

    fn unreadable(body: Option<&Value>, errors: FieldErrors) -> Self {
        DeRegDevicesPayload::unreadable(body, errors)
    }
}

impl SubmissionBody for DeRegDocumentsPayload {
    /// `files` arrives either as one JSON object or as `files[<label>]` keys.
    fn from_fields(fields: &[(String, String)]) -> Self {
        let mut errors = FieldErrors::new();
        let mut payload = DeRegDocumentsPayload::default();
        let mut files: IndexMap<String, String> = IndexMap::new();

        for (key, value) in fields {
            match key.as_str() {
                "dereg_id" | "dereg_details" => payload.dereg_id = value.clone(),
                "user_id" => payload.user_id = value.clone(),
                "files" => match serde_json::from_str::<IndexMap<String, String>>(value) {
                    Ok(parsed) => files.extend(parsed),
                    Err(_) => errors.add("files", "files must be a JSON object of label to file name"),
                },
                _ => {
                    if let Some(label) = key
                        .strip_prefix("files[")
                        .and_then(|rest| rest.strip_suffix(']'))
                    {
                        files.insert(label.to_string(), value.clone());
                    }
                }
            }
        }

        payload.files = files;
        payload.parse_errors = errors;
        payload
    }

    fn unreadable(body: Option<&Value>, errors: FieldErrors) -> Self {
        DeRegDocumentsPayload::unreadable(body, errors)
    }
}

/// Typed submission decoded from a JSON body or from form fields,
/// chosen by `Content-Type`. A missing content type is read as JSON.
#[derive(Debug, Clone)]
pub struct Submission<T>(pub T);

fn body_error(message: impl Into<String>) -> FieldErrors {
    let mut errors = FieldErrors::new();
    errors.add("body", message);
    errors
}

/// Reads a JSON body, falling back to its readable ids when the typed
/// shape does not match.
fn from_json<T: SubmissionBody>(body: &[u8]) -> T {
    let value: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(e) => {
            debug!(error = %e, "Submission body is not JSON");
            return T::unreadable(None, body_error(format!("Request body is not valid JSON: {}", e)));
        }
    };

    match serde_json::from_value::<T>(value.clone()) {
        Ok(payload) => payload,
        Err(e) => {
            debug!(error = %e, "Submission body does not match the expected shape");
            T::unreadable(Some(&value), body_error(e.to_string()))
        }
    }
}

#[axum::async_trait]
impl<S, T> FromRequest<S> for Submission<T>
where
    S: Send + Sync,
    T: SubmissionBody + Send,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_ascii_lowercase().starts_with(FORM_CONTENT_TYPE))
            .unwrap_or(false);

        if is_form {
            let payload = match Form::<Vec<(String, String)>>::from_request(req, state).await {
                Ok(Form(fields)) => T::from_fields(&fields),
                Err(e) => T::unreadable(None, body_error(e.body_text())),
            };
            return Ok(Submission(payload));
        }

        let payload = match Bytes::from_request(req, state).await {
            Ok(body) => from_json(&body),
            Err(e) => T::unreadable(None, body_error(e.body_text())),
        };
        Ok(Submission(payload))
    }
}
