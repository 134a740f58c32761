// src/db/activity_repo.rs

use chrono::Utc;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::activity::{ActivityLog, NewActivity},
};

#[derive(Clone)]
pub struct ActivityRepository {
    pool: PgPool,
}

impl ActivityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// O hash é calculado com o mesmo instante gravado em `created_at`.
    pub async fn insert(&self, event: &NewActivity) -> Result<ActivityLog, AppError> {
        let now = Utc::now();
        let log = sqlx::query_as::<_, ActivityLog>(
            r#"
            INSERT INTO activity_logs (tenant_id, event_type, actor_type, actor_id, metadata, event_hash, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(event.tenant_id)
        .bind(event.event_type)
        .bind(event.actor_type)
        .bind(event.actor_id)
        .bind(&event.metadata)
        .bind(event.hash_at(now))
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(log)
    }

    pub async fn list(
        &self,
        tenant_id: Uuid,
        event_type: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ActivityLog>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM activity_logs WHERE tenant_id = ");
        qb.push_bind(tenant_id);
        if let Some(event_type) = event_type {
            qb.push(" AND event_type = ").push_bind(event_type.to_string());
        }
        qb.push(" ORDER BY created_at DESC LIMIT ").push_bind(limit);
        qb.push(" OFFSET ").push_bind(offset);

        let logs = qb.build_query_as::<ActivityLog>().fetch_all(&self.pool).await?;
        Ok(logs)
    }
}
