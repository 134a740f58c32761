// src/db/lead_repo.rs

use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::lead::{Lead, LeadListQuery, LeadStatus, NewLead, ANONYMIZED_NAME},
};

#[derive(Clone)]
pub struct LeadRepository {
    pool: PgPool,
}

impl LeadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Todo lead nasce com consentimento registrado agora.
    pub async fn create(&self, lead: &NewLead) -> Result<Lead, AppError> {
        let created = sqlx::query_as::<_, Lead>(
            r#"
            INSERT INTO leads (
                tenant_id, property_id, broker_id, name, email, phone, message, channel,
                utm_source, utm_campaign, utm_medium, referrer,
                consent_given, consent_text, consent_date, consent_ip
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, TRUE, $13, NOW(), $14)
            RETURNING *
            "#,
        )
        .bind(lead.tenant_id)
        .bind(lead.property_id)
        .bind(lead.broker_id)
        .bind(&lead.name)
        .bind(&lead.email)
        .bind(&lead.phone)
        .bind(&lead.message)
        .bind(lead.channel)
        .bind(&lead.utm_source)
        .bind(&lead.utm_campaign)
        .bind(&lead.utm_medium)
        .bind(&lead.referrer)
        .bind(&lead.consent_text)
        .bind(&lead.consent_ip)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    pub async fn find(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Lead>, AppError> {
        let lead = sqlx::query_as::<_, Lead>("SELECT * FROM leads WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(lead)
    }

    pub async fn list(
        &self,
        tenant_id: Uuid,
        filters: &LeadListQuery,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Lead>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM leads WHERE tenant_id = ");
        qb.push_bind(tenant_id);

        if let Some(status) = filters.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(channel) = filters.channel {
            qb.push(" AND channel = ").push_bind(channel);
        }
        if let Some(property_id) = filters.property_id {
            qb.push(" AND property_id = ").push_bind(property_id);
        }

        qb.push(" ORDER BY created_at DESC LIMIT ").push_bind(limit);
        qb.push(" OFFSET ").push_bind(offset);

        let leads = qb.build_query_as::<Lead>().fetch_all(&self.pool).await?;
        Ok(leads)
    }

    /// Só grava se o lead ainda estiver em `from`; `None` quando outra requisição mudou antes.
    pub async fn update_status(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        from: LeadStatus,
        to: LeadStatus,
    ) -> Result<Option<Lead>, AppError> {
        let lead = sqlx::query_as::<_, Lead>(
            r#"
            UPDATE leads SET status = $4, updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2 AND status = $3
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await?;
        Ok(lead)
    }

    pub async fn revoke_consent(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Lead>, AppError> {
        let lead = sqlx::query_as::<_, Lead>(
            r#"
            UPDATE leads SET
                consent_revoked = TRUE,
                revoked_at = COALESCE(revoked_at, NOW()),
                updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(lead)
    }

    pub async fn anonymize(&self, tenant_id: Uuid, id: Uuid, reason: &str) -> Result<Option<Lead>, AppError> {
        let lead = sqlx::query_as::<_, Lead>(
            r#"
            UPDATE leads SET
                name = $3, email = NULL, phone = NULL, message = NULL, consent_ip = NULL,
                is_anonymized = TRUE, anonymized_at = NOW(), anonymization_reason = $4,
                updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .bind(ANONYMIZED_NAME)
        .bind(reason)
        .fetch_optional(&self.pool)
        .await?;
        Ok(lead)
    }

    /// Leads com consentimento revogado que ainda guardam dados pessoais.
    pub async fn pending_anonymization(&self, tenant_id: Uuid) -> Result<Vec<Lead>, AppError> {
        let leads = sqlx::query_as::<_, Lead>(
            r#"
            SELECT * FROM leads
            WHERE tenant_id = $1 AND consent_revoked = TRUE AND is_anonymized = FALSE
            ORDER BY revoked_at
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(leads)
    }
}
