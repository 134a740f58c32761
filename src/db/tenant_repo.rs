// src/db/tenant_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{map_unique_violation, AppError},
    models::tenancy::{Tenant, TenantChanges, TenantOrder},
};

#[derive(Clone)]
pub struct TenantRepository {
    pool: PgPool,
}

impl TenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn create<'e, E>(&self, executor: E, t: &TenantChanges) -> Result<Tenant, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let slug = t.slug.clone().unwrap_or_default();
        sqlx::query_as::<_, Tenant>(
            r#"
            INSERT INTO tenants (
                name, slug, tenant_type, document, document_type, business_type, creci,
                email, phone, street, number, complement, neighborhood, city, state, zip_code,
                country, settings, is_platform_admin, subscription_plan, subscription_status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                    COALESCE($17, 'BR'), COALESCE($18, '{}'::jsonb), $19, $20, $21)
            RETURNING *
            "#,
        )
        .bind(t.name.as_deref().unwrap_or_default())
        .bind(&slug)
        .bind(t.tenant_type)
        .bind(&t.document)
        .bind(t.document_type)
        .bind(t.business_type)
        .bind(&t.creci)
        .bind(&t.email)
        .bind(&t.phone)
        .bind(&t.address.street)
        .bind(&t.address.number)
        .bind(&t.address.complement)
        .bind(&t.address.neighborhood)
        .bind(&t.address.city)
        .bind(&t.address.state)
        .bind(&t.address.zip_code)
        .bind(&t.address.country)
        .bind(&t.settings)
        .bind(t.is_platform_admin)
        .bind(&t.subscription_plan)
        .bind(&t.subscription_status)
        .fetch_one(executor)
        .await
        .map_err(|e| match map_unique_violation(e) {
            AppError::SlugAlreadyExists(_) => AppError::SlugAlreadyExists(slug.clone()),
            other => other,
        })
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Tenant>, AppError> {
        let tenant = sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tenant)
    }

    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<Tenant>, AppError> {
        let tenant = sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tenant)
    }

    pub async fn find_platform_tenant(&self) -> Result<Option<Tenant>, AppError> {
        let tenant = sqlx::query_as::<_, Tenant>(
            "SELECT * FROM tenants WHERE is_platform_admin = TRUE ORDER BY created_at LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(tenant)
    }

    pub async fn slug_exists<'e, E>(&self, executor: E, slug: &str) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tenants WHERE slug = $1)")
            .bind(slug)
            .fetch_one(executor)
            .await?;
        Ok(exists)
    }

    /// Atualização parcial: campos `None` mantêm o valor atual.
    pub async fn update<'e, E>(&self, executor: E, id: Uuid, t: &TenantChanges) -> Result<Option<Tenant>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let slug = t.slug.clone().unwrap_or_default();
        sqlx::query_as::<_, Tenant>(
            r#"
            UPDATE tenants SET
                name = COALESCE($2, name),
                slug = COALESCE($3, slug),
                document = COALESCE($4, document),
                document_type = COALESCE($5, document_type),
                business_type = COALESCE($6, business_type),
                creci = COALESCE($7, creci),
                email = COALESCE($8, email),
                phone = COALESCE($9, phone),
                street = COALESCE($10, street),
                number = COALESCE($11, number),
                complement = COALESCE($12, complement),
                neighborhood = COALESCE($13, neighborhood),
                city = COALESCE($14, city),
                state = COALESCE($15, state),
                zip_code = COALESCE($16, zip_code),
                country = COALESCE($17, country),
                settings = COALESCE($18, settings),
                subscription_plan = COALESCE($19, subscription_plan),
                subscription_status = COALESCE($20, subscription_status),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&t.name)
        .bind(&t.slug)
        .bind(&t.document)
        .bind(t.document_type)
        .bind(t.business_type)
        .bind(&t.creci)
        .bind(&t.email)
        .bind(&t.phone)
        .bind(&t.address.street)
        .bind(&t.address.number)
        .bind(&t.address.complement)
        .bind(&t.address.neighborhood)
        .bind(&t.address.city)
        .bind(&t.address.state)
        .bind(&t.address.zip_code)
        .bind(&t.address.country)
        .bind(&t.settings)
        .bind(&t.subscription_plan)
        .bind(&t.subscription_status)
        .fetch_optional(executor)
        .await
        .map_err(|e| match map_unique_violation(e) {
            AppError::SlugAlreadyExists(_) => AppError::SlugAlreadyExists(slug.clone()),
            other => other,
        })
    }

    pub async fn set_active(&self, id: Uuid, active: bool) -> Result<Option<Tenant>, AppError> {
        let tenant = sqlx::query_as::<_, Tenant>(
            "UPDATE tenants SET is_active = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(active)
        .fetch_optional(&self.pool)
        .await?;
        Ok(tenant)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM tenants WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list(
        &self,
        limit: i64,
        offset: i64,
        order: TenantOrder,
        active_only: bool,
    ) -> Result<Vec<Tenant>, AppError> {
        // A coluna de ordenação vem de um enum fechado, nunca do cliente.
        let sql = format!(
            "SELECT * FROM tenants WHERE ($1 = FALSE OR is_active = TRUE) ORDER BY {} LIMIT $2 OFFSET $3",
            order.column()
        );
        let tenants = sqlx::query_as::<_, Tenant>(&sql)
            .bind(active_only)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(tenants)
    }
}
