// src/db/owner_confirmation_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::owner_confirmation::{ConfirmationAction, OwnerConfirmationToken},
};

/// Dados de um novo link; o token em si nunca chega aqui.
pub struct NewConfirmation<'a> {
    pub tenant_id: Uuid,
    pub property_id: Uuid,
    pub owner_id: Option<Uuid>,
    pub token_hash: &'a str,
    pub expires_at: DateTime<Utc>,
    pub created_by: Uuid,
    pub delivery_hint: Option<&'a str>,
}

#[derive(Clone)]
pub struct OwnerConfirmationRepository {
    pool: PgPool,
}

impl OwnerConfirmationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn create(&self, new: &NewConfirmation<'_>) -> Result<OwnerConfirmationToken, AppError> {
        let token = sqlx::query_as::<_, OwnerConfirmationToken>(
            r#"
            INSERT INTO owner_confirmation_tokens
                (tenant_id, property_id, owner_id, token_hash, expires_at, created_by, delivery_hint)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(new.tenant_id)
        .bind(new.property_id)
        .bind(new.owner_id)
        .bind(new.token_hash)
        .bind(new.expires_at)
        .bind(new.created_by)
        .bind(new.delivery_hint)
        .fetch_one(&self.pool)
        .await?;
        Ok(token)
    }

    pub async fn find_by_hash(&self, token_hash: &str) -> Result<Option<OwnerConfirmationToken>, AppError> {
        let token = sqlx::query_as::<_, OwnerConfirmationToken>(
            "SELECT * FROM owner_confirmation_tokens WHERE token_hash = $1",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(token)
    }

    /// Marca o link como usado. Falso se outro pedido chegou antes ou se já expirou.
    pub async fn consume<'e, E>(&self, executor: E, id: Uuid, action: ConfirmationAction) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE owner_confirmation_tokens SET used_at = NOW(), last_action = $2
            WHERE id = $1 AND used_at IS NULL AND expires_at > NOW()
            "#,
        )
        .bind(id)
        .bind(action)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
