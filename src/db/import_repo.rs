// src/db/import_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::import::{ImportBatch, ImportCounters, ImportErrorEntry, ImportErrorKind, ImportSource, ImportStatus},
};

#[derive(Clone)]
pub struct ImportRepository {
    pool: PgPool,
}

impl ImportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_batch(
        &self,
        tenant_id: Uuid,
        source: ImportSource,
        created_by: Option<Uuid>,
    ) -> Result<ImportBatch, AppError> {
        let batch = sqlx::query_as::<_, ImportBatch>(
            "INSERT INTO import_batches (tenant_id, source, created_by) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(tenant_id)
        .bind(source)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(batch)
    }

    pub async fn mark_processing(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE import_batches SET status = 'processing', started_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Grava os contadores e o estado final do lote.
    pub async fn finish(&self, id: Uuid, status: ImportStatus, counters: &ImportCounters) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE import_batches SET
                status = $2,
                total_xml_records = $3,
                total_xls_records = $4,
                total_properties_created = $5,
                total_properties_matched_existing = $6,
                total_owners_created = $7,
                total_errors = $8,
                completed_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(counters.total_xml_records)
        .bind(counters.total_xls_records)
        .bind(counters.total_properties_created)
        .bind(counters.total_properties_matched_existing)
        .bind(counters.total_owners_created)
        .bind(counters.total_errors)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn add_error(
        &self,
        batch_id: Uuid,
        kind: ImportErrorKind,
        message: &str,
        record_ref: Option<&str>,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO import_errors (batch_id, error_type, error_message, record_ref) VALUES ($1, $2, $3, $4)",
        )
        .bind(batch_id)
        .bind(kind.as_str())
        .bind(message)
        .bind(record_ref)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn find(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<ImportBatch>, AppError> {
        let batch = sqlx::query_as::<_, ImportBatch>(
            "SELECT * FROM import_batches WHERE tenant_id = $1 AND id = $2",
        )
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(batch)
    }

    pub async fn list(&self, tenant_id: Uuid, limit: i64, offset: i64) -> Result<Vec<ImportBatch>, AppError> {
        let batches = sqlx::query_as::<_, ImportBatch>(
            "SELECT * FROM import_batches WHERE tenant_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(tenant_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(batches)
    }

    pub async fn errors(&self, batch_id: Uuid) -> Result<Vec<ImportErrorEntry>, AppError> {
        let errors = sqlx::query_as::<_, ImportErrorEntry>(
            r#"
            SELECT error_type, error_message, record_ref, created_at
            FROM import_errors
            WHERE batch_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(errors)
    }
}
