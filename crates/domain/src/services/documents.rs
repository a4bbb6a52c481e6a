//! Supporting documents attached to de-registration requests.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;

use crate::error::{DeRegError, FieldErrors};
use crate::models::{
    AttachedDocument, DeRegDocumentView, DeRegDocumentsPayload, DeRegRequest, Document,
};
use crate::services::deregistration::DeRegRequestStore;

/// Document persistence.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Reference document types applicable to de-registration.
    async fn dereg_documents(&self) -> Result<Vec<Document>, DeRegError>;

    async fn attached_documents(
        &self,
        dereg_id: i64,
    ) -> Result<Vec<AttachedDocument>, DeRegError>;

    /// Attaches each file under its document type, replacing any file
    /// previously attached under the same type. Returns all attachments.
    async fn replace_documents(
        &self,
        dereg_id: i64,
        files: &[(Document, String)],
    ) -> Result<Vec<AttachedDocument>, DeRegError>;
}

/// Settings read by the document service.
#[derive(Debug, Clone)]
pub struct DocumentSettings {
    pub upload_directory: String,
    pub allowed_formats: Vec<String>,
}

pub struct DeRegDocumentService {
    requests: Arc<dyn DeRegRequestStore>,
    documents: Arc<dyn DocumentStore>,
    settings: DocumentSettings,
}

impl DeRegDocumentService {
    pub fn new(
        requests: Arc<dyn DeRegRequestStore>,
        documents: Arc<dyn DocumentStore>,
        settings: DocumentSettings,
    ) -> Self {
        Self {
            requests,
            documents,
            settings,
        }
    }

    pub async fn list_documents(
        &self,
        raw_dereg_id: &str,
    ) -> Result<Vec<DeRegDocumentView>, DeRegError> {
        let request = self.load_request(raw_dereg_id).await?;
        let attached = self.documents.attached_documents(request.id).await?;
        Ok(self.views(attached, &request))
    }

    pub async fn update_documents(
        &self,
        payload: DeRegDocumentsPayload,
    ) -> Result<Vec<DeRegDocumentView>, DeRegError> {
        let request = self.load_request(&payload.dereg_id).await?;
        if payload.user_id.trim() != request.user_id {
            return Err(DeRegError::PermissionDenied);
        }
        if !payload.parse_errors.is_empty() {
            return Err(DeRegError::Validation(payload.parse_errors));
        }

        let known = self.documents.dereg_documents().await?;
        let files = self.check_files(&payload, &known)?;

        let attached = self.documents.replace_documents(request.id, &files).await?;
        info!(
            dereg_id = request.id,
            files = files.len(),
            "De-registration documents updated"
        );
        Ok(self.views(attached, &request))
    }

    async fn load_request(&self, raw_dereg_id: &str) -> Result<DeRegRequest, DeRegError> {
        let dereg_id =
            shared::validation::parse_numeric_id(raw_dereg_id).ok_or(DeRegError::NotFound)?;
        self.requests
            .find_by_id(dereg_id)
            .await?
            .ok_or(DeRegError::NotFound)
    }

    fn check_files(
        &self,
        payload: &DeRegDocumentsPayload,
        known: &[Document],
    ) -> Result<Vec<(Document, String)>, DeRegError> {
        let mut errors = FieldErrors::new();
        let mut seen = HashSet::new();
        let mut files = Vec::with_capacity(payload.files.len());

        if payload.files.is_empty() {
            errors.add("files", "At least one document is required");
        }

        for (label, filename) in &payload.files {
            let filename = filename.trim();
            let allowed = shared::validation::file_extension(filename)
                .map(|ext| self.settings.allowed_formats.iter().any(|f| f.eq_ignore_ascii_case(&ext)))
                .unwrap_or(false);
            if !allowed {
                errors.add(
                    "document_format",
                    format!("File {} format is not allowed", filename),
                );
            }
            if !seen.insert(filename.to_string()) {
                errors.add(
                    "filename",
                    format!("File name {} is used more than once", filename),
                );
            }
            match known.iter().find(|d| d.label == label.trim()) {
                Some(document) => files.push((document.clone(), filename.to_string())),
                None => errors.add("label", format!("Document {} is not recognized", label)),
            }
        }

        errors.into_result()?;
        Ok(files)
    }

    fn views(
        &self,
        attached: Vec<AttachedDocument>,
        request: &DeRegRequest,
    ) -> Vec<DeRegDocumentView> {
        attached
            .into_iter()
            .map(|doc| doc.into_view(&self.settings.upload_directory, &request.tracking_id))
            .collect()
    }
}
