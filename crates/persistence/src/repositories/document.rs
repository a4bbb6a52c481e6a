//! Document repository.

use domain::models::{AttachedDocument, Document};
use domain::services::DocumentStore;
use domain::DeRegError;
use sqlx::PgPool;

use crate::entities::{DeRegDocumentEntity, DocumentEntity};
use crate::metrics::QueryTimer;

/// Value of `documents.type` for de-registration documents.
pub const DEREGISTRATION_DOCUMENT_TYPE: i32 = 2;

/// Repository for the documents and dereg_document tables.
#[derive(Clone)]
pub struct DocumentRepository {
    pool: PgPool,
}

impl DocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_dereg_documents(&self) -> Result<Vec<DocumentEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_dereg_documents");
        let result = sqlx::query_as::<_, DocumentEntity>(
            "SELECT id, label, required FROM documents WHERE type = $1 ORDER BY id",
        )
        .bind(DEREGISTRATION_DOCUMENT_TYPE)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_attached(&self, dereg_id: i64) -> Result<Vec<DeRegDocumentEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_dereg_documents");
        let result = sqlx::query_as::<_, DeRegDocumentEntity>(
            r#"
            SELECT dd.id, dd.dereg_id, dd.document_id, dd.filename, d.label, d.required
            FROM dereg_document dd
            JOIN documents d ON d.id = dd.document_id
            WHERE dd.dereg_id = $1
            ORDER BY dd.document_id
            "#,
        )
        .bind(dereg_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Upserts one file per document type and returns the request's attachments.
    pub async fn upsert_attachments(
        &self,
        dereg_id: i64,
        files: &[(Document, String)],
    ) -> Result<Vec<DeRegDocumentEntity>, sqlx::Error> {
        let timer = QueryTimer::new("upsert_dereg_documents");
        let mut tx = self.pool.begin().await?;

        for (document, filename) in files {
            sqlx::query(
                r#"
                INSERT INTO dereg_document (dereg_id, document_id, filename)
                VALUES ($1, $2, $3)
                ON CONFLICT (dereg_id, document_id) DO UPDATE SET
                    filename = EXCLUDED.filename,
                    created_at = NOW()
                "#,
            )
            .bind(dereg_id)
            .bind(document.id)
            .bind(filename)
            .execute(&mut *tx)
            .await?;
        }

        let attached = sqlx::query_as::<_, DeRegDocumentEntity>(
            r#"
            SELECT dd.id, dd.dereg_id, dd.document_id, dd.filename, d.label, d.required
            FROM dereg_document dd
            JOIN documents d ON d.id = dd.document_id
            WHERE dd.dereg_id = $1
            ORDER BY dd.document_id
            "#,
        )
        .bind(dereg_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();
        Ok(attached)
    }
}

#[async_trait::async_trait]
impl DocumentStore for DocumentRepository {
    async fn dereg_documents(&self) -> Result<Vec<Document>, DeRegError> {
        Ok(self
            .list_dereg_documents()
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    async fn attached_documents(&self, dereg_id: i64) -> Result<Vec<AttachedDocument>, DeRegError> {
        Ok(self
            .find_attached(dereg_id)
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    async fn replace_documents(
        &self,
        dereg_id: i64,
        files: &[(Document, String)],
    ) -> Result<Vec<AttachedDocument>, DeRegError> {
        Ok(self
            .upsert_attachments(dereg_id, files)
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
    }
}
