// src/db/invitation_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        invitation::{Invitation, InvitationStatus},
        user::UserRole,
    },
};

#[derive(Clone)]
pub struct InvitationRepository {
    pool: PgPool,
}

impl InvitationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        tenant_id: Uuid,
        email: &str,
        name: &str,
        role: UserRole,
        creci: Option<&str>,
        token: &str,
        invited_by: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<Invitation, AppError> {
        let invitation = sqlx::query_as::<_, Invitation>(
            r#"
            INSERT INTO user_invitations (tenant_id, email, name, role, creci, token, invited_by, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(email)
        .bind(name)
        .bind(role)
        .bind(creci)
        .bind(token)
        .bind(invited_by)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(invitation)
    }

    pub async fn find_by_token(&self, token: &str) -> Result<Option<Invitation>, AppError> {
        let invitation = sqlx::query_as::<_, Invitation>("SELECT * FROM user_invitations WHERE token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(invitation)
    }

    pub async fn find_in_tenant(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Invitation>, AppError> {
        let invitation = sqlx::query_as::<_, Invitation>(
            "SELECT * FROM user_invitations WHERE tenant_id = $1 AND id = $2",
        )
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(invitation)
    }

    /// Existe convite pendente e ainda no prazo para este e-mail?
    pub async fn pending_exists(&self, tenant_id: Uuid, email: &str) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM user_invitations
                WHERE tenant_id = $1 AND email = $2 AND status = 'pending' AND expires_at > NOW()
            )
            "#,
        )
        .bind(tenant_id)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn list(&self, tenant_id: Uuid, status: Option<InvitationStatus>) -> Result<Vec<Invitation>, AppError> {
        let invitations = sqlx::query_as::<_, Invitation>(
            r#"
            SELECT * FROM user_invitations
            WHERE tenant_id = $1 AND ($2::invitation_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(tenant_id)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(invitations)
    }

    /// Encerra um convite pendente (`expired` ou `cancelled`). `false` se ele já saiu de `pending`.
    pub async fn close_pending<'e, E>(&self, executor: E, id: Uuid, status: InvitationStatus) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE user_invitations SET status = $2, updated_at = NOW() WHERE id = $1 AND status = 'pending'",
        )
        .bind(id)
        .bind(status)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Marca como aceito, apenas se ainda estiver pendente.
    pub async fn mark_accepted<'e, E>(&self, executor: E, id: Uuid, user_id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE user_invitations
            SET status = 'accepted', accepted_at = NOW(), user_id = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(user_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
