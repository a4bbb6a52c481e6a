//! Document entities.

use domain::models::{AttachedDocument, Document};
use sqlx::FromRow;

/// Database row mapping for the documents table.
#[derive(Debug, Clone, FromRow)]
pub struct DocumentEntity {
    pub id: i32,
    pub label: String,
    pub required: bool,
}

impl From<DocumentEntity> for Document {
    fn from(entity: DocumentEntity) -> Self {
        Self {
            id: entity.id,
            label: entity.label,
            required: entity.required,
        }
    }
}

/// A dereg_document row joined with its document type.
#[derive(Debug, Clone, FromRow)]
pub struct DeRegDocumentEntity {
    pub id: i64,
    pub dereg_id: i64,
    pub document_id: i32,
    pub filename: String,
    pub label: String,
    pub required: bool,
}

impl From<DeRegDocumentEntity> for AttachedDocument {
    fn from(entity: DeRegDocumentEntity) -> Self {
        Self {
            id: entity.id,
            dereg_id: entity.dereg_id,
            document_id: entity.document_id,
            filename: entity.filename,
            label: entity.label,
            required: entity.required,
        }
    }
}
