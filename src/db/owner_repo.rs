// src/db/owner_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::owner::{NewOwner, Owner, OwnerStatus},
};

#[derive(Clone)]
pub struct OwnerRepository {
    pool: PgPool,
}

impl OwnerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn create<'e, E>(&self, executor: E, tenant_id: Uuid, owner: &NewOwner) -> Result<Owner, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let created = sqlx::query_as::<_, Owner>(
            r#"
            INSERT INTO owners (
                tenant_id, name, email, phone, document, document_type, owner_status,
                consent_given, consent_text, consent_date, consent_origin
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, CASE WHEN $8 THEN NOW() END, $10)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(&owner.name)
        .bind(&owner.email)
        .bind(&owner.phone)
        .bind(&owner.document)
        .bind(owner.document_type)
        .bind(owner.completeness())
        .bind(owner.consent_given)
        .bind(&owner.consent_text)
        .bind(owner.consent_origin)
        .fetch_one(executor)
        .await?;
        Ok(created)
    }

    pub async fn find(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Owner>, AppError> {
        let owner = sqlx::query_as::<_, Owner>("SELECT * FROM owners WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(owner)
    }

    pub async fn exists_in_tenant(&self, tenant_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM owners WHERE tenant_id = $1 AND id = $2)")
                .bind(tenant_id)
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    pub async fn list(
        &self,
        tenant_id: Uuid,
        status: Option<OwnerStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Owner>, AppError> {
        let owners = sqlx::query_as::<_, Owner>(
            r#"
            SELECT * FROM owners
            WHERE tenant_id = $1
              AND is_anonymized = FALSE
              AND ($2::owner_status IS NULL OR owner_status = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(tenant_id)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(owners)
    }

    /// Grava o cadastro já mesclado; o status é recalculado a partir dele.
    pub async fn update(&self, tenant_id: Uuid, id: Uuid, owner: &NewOwner) -> Result<Option<Owner>, AppError> {
        let updated = sqlx::query_as::<_, Owner>(
            r#"
            UPDATE owners SET
                name = $3, email = $4, phone = $5, document = $6, document_type = $7,
                owner_status = $8,
                consent_given = $9,
                consent_text = $10,
                consent_origin = $11,
                consent_date = CASE WHEN $9 THEN COALESCE(consent_date, NOW()) ELSE consent_date END,
                consent_revoked = CASE WHEN $9 THEN FALSE ELSE consent_revoked END,
                revoked_at = CASE WHEN $9 THEN NULL ELSE revoked_at END,
                updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2 AND is_anonymized = FALSE
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .bind(&owner.name)
        .bind(&owner.email)
        .bind(&owner.phone)
        .bind(&owner.document)
        .bind(owner.document_type)
        .bind(owner.completeness())
        .bind(owner.consent_given)
        .bind(&owner.consent_text)
        .bind(owner.consent_origin)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    pub async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM owners WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn revoke_consent(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        status: OwnerStatus,
    ) -> Result<Option<Owner>, AppError> {
        let owner = sqlx::query_as::<_, Owner>(
            r#"
            UPDATE owners SET
                consent_given = FALSE, consent_revoked = TRUE, revoked_at = NOW(),
                owner_status = $3, updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2 AND is_anonymized = FALSE
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;
        Ok(owner)
    }

    pub async fn anonymize(&self, tenant_id: Uuid, id: Uuid, reason: &str) -> Result<Option<Owner>, AppError> {
        let owner = sqlx::query_as::<_, Owner>(
            r#"
            UPDATE owners SET
                name = 'ANONYMIZED', email = NULL, phone = NULL, document = NULL,
                is_anonymized = TRUE, anonymized_at = NOW(), anonymization_reason = $3,
                updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .bind(reason)
        .fetch_optional(&self.pool)
        .await?;
        Ok(owner)
    }
}
