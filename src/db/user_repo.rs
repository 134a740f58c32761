// src/db/user_repo.rs

use sqlx::{Executor, FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::{map_unique_violation, AppError},
    models::user::{NewUser, UpdateUserPayload, User, UserRole},
};

/// Usuário junto com os flags do tenant dele (usado na autenticação).
#[derive(Debug, Clone, FromRow)]
pub struct UserSession {
    #[sqlx(flatten)]
    pub user: User,
    pub is_platform_admin: bool,
    pub tenant_active: bool,
}

const SESSION_SELECT: &str = r#"
    SELECT u.*, t.is_platform_admin, t.is_active AS tenant_active
    FROM users u
    JOIN tenants t ON t.id = u.tenant_id
"#;

// O repositório de usuários, responsável por todas as interações com a tabela 'users'
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn find_session(&self, id: Uuid) -> Result<Option<UserSession>, AppError> {
        let sql = format!("{} WHERE u.id = $1", SESSION_SELECT);
        let session = sqlx::query_as::<_, UserSession>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(session)
    }

    pub async fn find_session_by_email(&self, email: &str) -> Result<Option<UserSession>, AppError> {
        let sql = format!("{} WHERE u.email = $1", SESSION_SELECT);
        let session = sqlx::query_as::<_, UserSession>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(session)
    }

    pub async fn find_by_email<'e, E>(&self, executor: E, email: &str) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(executor)
            .await?;
        Ok(user)
    }

    pub async fn find_in_tenant(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn exists_in_tenant(&self, tenant_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE tenant_id = $1 AND id = $2)")
                .bind(tenant_id)
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    pub async fn email_exists_in_tenant(&self, tenant_id: Uuid, email: &str) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE tenant_id = $1 AND email = $2)",
        )
        .bind(tenant_id)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Cria o usuário. E-mail duplicado vira `EmailAlreadyExists`.
    pub async fn create<'e, E>(&self, executor: E, new_user: &NewUser) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (
                tenant_id, name, email, password_hash, phone, document, document_type,
                creci, role, permissions
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(new_user.tenant_id)
        .bind(&new_user.name)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&new_user.phone)
        .bind(&new_user.document)
        .bind(new_user.document_type)
        .bind(&new_user.creci)
        .bind(new_user.role)
        .bind(&new_user.permissions)
        .fetch_one(executor)
        .await
        .map_err(map_unique_violation)
    }

    pub async fn list(
        &self,
        tenant_id: Uuid,
        roles: Option<&[UserRole]>,
        is_active: Option<bool>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<User>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM users WHERE tenant_id = ");
        qb.push_bind(tenant_id);

        if let Some(roles) = roles {
            qb.push(" AND role = ANY(").push_bind(roles.to_vec()).push(")");
        }
        if let Some(active) = is_active {
            qb.push(" AND is_active = ").push_bind(active);
        }

        qb.push(" ORDER BY name LIMIT ").push_bind(limit);
        qb.push(" OFFSET ").push_bind(offset);

        let users = qb.build_query_as::<User>().fetch_all(&self.pool).await?;
        Ok(users)
    }

    /// `changes.permissions`, quando presente, substitui o conjunto inteiro.
    pub async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        changes: &UpdateUserPayload,
        creci: Option<String>,
        phone: Option<String>,
        document: Option<String>,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                name = COALESCE($3, name),
                phone = COALESCE($4, phone),
                document = COALESCE($5, document),
                document_type = COALESCE($6, document_type),
                creci = COALESCE($7, creci),
                role = COALESCE($8, role),
                permissions = COALESCE($9, permissions),
                photo_url = COALESCE($10, photo_url),
                bio = COALESCE($11, bio),
                specialties = COALESCE($12, specialties),
                languages = COALESCE($13, languages),
                experience_years = COALESCE($14, experience_years),
                company = COALESCE($15, company),
                website = COALESCE($16, website),
                social_media = COALESCE($17, social_media),
                updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .bind(&changes.name)
        .bind(phone)
        .bind(document)
        .bind(changes.document_type)
        .bind(creci)
        .bind(changes.role)
        .bind(&changes.permissions)
        .bind(&changes.photo_url)
        .bind(&changes.bio)
        .bind(&changes.specialties)
        .bind(&changes.languages)
        .bind(changes.experience_years)
        .bind(&changes.company)
        .bind(&changes.website)
        .bind(&changes.social_media)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn set_active(&self, tenant_id: Uuid, id: Uuid, active: bool) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET is_active = $3, updated_at = NOW() WHERE tenant_id = $1 AND id = $2 RETURNING *",
        )
        .bind(tenant_id)
        .bind(id)
        .bind(active)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Corretor ativo de um tenant ativo (perfil público).
    pub async fn find_public_broker(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT u.* FROM users u
            JOIN tenants t ON t.id = u.tenant_id
            WHERE u.id = $1
              AND u.is_active = TRUE
              AND u.role IN ('broker', 'broker_admin')
              AND t.is_active = TRUE
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }
}
