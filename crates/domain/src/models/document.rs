//! Supporting document models for de-registration requests.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::FieldErrors;
use crate::models::deregistration::scalar_field;

/// Document type reference entry (e.g. "shipment document").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Document {
    pub id: i32,
    pub label: String,
    pub required: bool,
}

/// A stored document row joined with its reference entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedDocument {
    pub id: i64,
    pub dereg_id: i64,
    pub document_id: i32,
    pub filename: String,
    pub label: String,
    pub required: bool,
}

/// Document metadata returned to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DeRegDocumentView {
    pub id: i64,
    pub dereg_details: i64,
    pub document_id: i32,
    pub filename: String,
    pub label: String,
    pub required: bool,
    pub link: String,
}

/// Request to attach or replace documents. `files` maps label to file name.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DeRegDocumentsPayload {
    #[serde(default, alias = "dereg_details", deserialize_with = "id_string")]
    pub dereg_id: String,

    #[serde(default)]
    pub user_id: String,

    #[serde(default)]
    pub files: IndexMap<String, String>,

    /// Problems met while reading the body, reported after the request is
    /// resolved.
    #[serde(skip)]
    pub parse_errors: FieldErrors,
}

impl DeRegDocumentsPayload {
    pub fn unreadable(body: Option<&serde_json::Value>, parse_errors: FieldErrors) -> Self {
        Self {
            dereg_id: body
                .and_then(|b| scalar_field(b, &["dereg_id", "dereg_details"]))
                .unwrap_or_default(),
            user_id: body
                .and_then(|b| scalar_field(b, &["user_id"]))
                .unwrap_or_default(),
            files: IndexMap::new(),
            parse_errors,
        }
    }
}

/// Builds the storage link of an uploaded document.
pub fn document_link(upload_directory: &str, tracking_id: &str, filename: &str) -> String {
    format!(
        "{}/{}/{}",
        upload_directory.trim_end_matches('/'),
        tracking_id,
        filename
    )
}

impl AttachedDocument {
    pub fn into_view(self, upload_directory: &str, tracking_id: &str) -> DeRegDocumentView {
        let link = document_link(upload_directory, tracking_id, &self.filename);
        DeRegDocumentView {
            id: self.id,
            dereg_details: self.dereg_id,
            document_id: self.document_id,
            filename: self.filename,
            label: self.label,
            required: self.required,
            link,
        }
    }
}

fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => Ok(String::new()),
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "dereg_id must be a string or number, found {}",
            other
        ))),
    }
}
