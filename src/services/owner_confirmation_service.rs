// src/services/owner_confirmation_service.rs

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{
        owner_confirmation_repo::NewConfirmation, OwnerConfirmationRepository, OwnerRepository,
        PropertyRepository,
    },
    models::{
        activity::NewActivity,
        invitation::generate_token,
        owner_confirmation::{
            confirmation_expiry_from, confirmation_url, hash_token, ConfirmationCheck, ConfirmationLink,
            ConfirmationPage, CreateConfirmationPayload, OwnerConfirmationToken, SubmitConfirmationPayload,
        },
    },
    services::activity_service::{events, ActivityService},
};

/// Converte o estado do link no erro correspondente.
pub fn ensure_usable(token: &OwnerConfirmationToken) -> Result<(), AppError> {
    match token.check(Utc::now()) {
        ConfirmationCheck::Valid => Ok(()),
        ConfirmationCheck::Used => Err(AppError::ConfirmationUsed),
        ConfirmationCheck::Expired => Err(AppError::ConfirmationExpired),
    }
}

#[derive(Clone)]
pub struct OwnerConfirmationService {
    repo: OwnerConfirmationRepository,
    property_repo: PropertyRepository,
    owner_repo: OwnerRepository,
    activity: ActivityService,
    public_site_url: String,
}

impl OwnerConfirmationService {
    pub fn new(
        repo: OwnerConfirmationRepository,
        property_repo: PropertyRepository,
        owner_repo: OwnerRepository,
        activity: ActivityService,
        public_site_url: String,
    ) -> Self {
        Self { repo, property_repo, owner_repo, activity, public_site_url }
    }

    /// Gera o link para o proprietário do imóvel confirmar os dados.
    pub async fn create_link(
        &self,
        tenant_id: Uuid,
        property_id: Uuid,
        payload: CreateConfirmationPayload,
        actor_id: Uuid,
    ) -> Result<ConfirmationLink, AppError> {
        let property = self
            .property_repo
            .find(tenant_id, property_id)
            .await?
            .ok_or(AppError::PropertyNotFound)?;

        let token = generate_token();
        let token_hash = hash_token(&token);
        let delivery_hint = payload.delivery_hint.as_deref().map(str::trim).filter(|h| !h.is_empty());
        let created = self
            .repo
            .create(&NewConfirmation {
                tenant_id,
                property_id,
                owner_id: property.owner_id,
                token_hash: &token_hash,
                expires_at: confirmation_expiry_from(Utc::now()),
                created_by: actor_id,
                delivery_hint,
            })
            .await?;

        tracing::info!(%tenant_id, %property_id, confirmation_id = %created.id, "Link de confirmação gerado");
        self.activity
            .record(NewActivity::by_user(
                tenant_id,
                events::OWNER_CONFIRMATION_CREATED,
                actor_id,
                json!({ "property_id": property_id, "confirmation_id": created.id, "delivery_hint": delivery_hint }),
            ))
            .await;

        Ok(ConfirmationLink {
            id: created.id,
            property_id,
            confirmation_url: confirmation_url(&self.public_site_url, &token),
            token,
            expires_at: created.expires_at,
        })
    }

    async fn usable_token(&self, token: &str) -> Result<OwnerConfirmationToken, AppError> {
        let confirmation = self
            .repo
            .find_by_hash(&hash_token(token))
            .await?
            .ok_or(AppError::ConfirmationNotFound)?;
        ensure_usable(&confirmation)?;
        Ok(confirmation)
    }

    async fn owner_name(&self, confirmation: &OwnerConfirmationToken) -> Result<Option<String>, AppError> {
        let Some(owner_id) = confirmation.owner_id else {
            return Ok(None);
        };
        let owner = self.owner_repo.find(confirmation.tenant_id, owner_id).await?;
        Ok(owner.filter(|o| !o.is_anonymized).and_then(|o| o.name))
    }

    /// Página pública do link.
    pub async fn page(&self, token: &str) -> Result<ConfirmationPage, AppError> {
        let confirmation = self.usable_token(token).await?;
        let property = self
            .property_repo
            .find(confirmation.tenant_id, confirmation.property_id)
            .await?
            .ok_or(AppError::ConfirmationNotFound)?;
        let owner_name = self.owner_name(&confirmation).await?;
        Ok(ConfirmationPage::new(property, owner_name.as_deref(), confirmation.expires_at))
    }

    /// Consome o link e aplica a resposta no imóvel, na mesma transação.
    pub async fn submit(&self, token: &str, payload: SubmitConfirmationPayload) -> Result<ConfirmationPage, AppError> {
        let confirmation = self.usable_token(token).await?;
        let tenant_id = confirmation.tenant_id;
        let current = self
            .property_repo
            .find(tenant_id, confirmation.property_id)
            .await?
            .ok_or(AppError::ConfirmationNotFound)?;
        let decision = payload
            .decision(current.transaction_type)
            .map_err(AppError::InvalidInput)?;

        let mut tx = self.repo.pool().begin().await?;
        if !self.repo.consume(&mut *tx, confirmation.id, payload.action).await? {
            // Outro envio chegou antes (ou o link expirou agora)
            return Err(AppError::ConfirmationUsed);
        }
        let property = self
            .property_repo
            .apply_owner_decision(&mut *tx, tenant_id, confirmation.property_id, &decision)
            .await?
            .ok_or(AppError::ConfirmationNotFound)?;
        tx.commit().await?;

        tracing::info!(
            %tenant_id,
            property_id = %property.id,
            action = ?payload.action,
            "Proprietário respondeu ao link de confirmação"
        );
        self.activity
            .record(NewActivity::by_owner(
                tenant_id,
                events::OWNER_CONFIRMED,
                confirmation.owner_id,
                json!({
                    "property_id": property.id,
                    "confirmation_id": confirmation.id,
                    "action": payload.action,
                    "price_amount": payload.price_amount,
                    "previous_status": current.status,
                }),
            ))
            .await;

        let owner_name = self.owner_name(&confirmation).await?;
        Ok(ConfirmationPage::new(property, owner_name.as_deref(), confirmation.expires_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn confirmation(used: bool, expires_in: Duration) -> OwnerConfirmationToken {
        let now = Utc::now();
        OwnerConfirmationToken {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            property_id: Uuid::new_v4(),
            owner_id: None,
            token_hash: hash_token("x"),
            expires_at: now + expires_in,
            created_by: None,
            used_at: used.then_some(now),
            last_action: None,
            delivery_hint: None,
            created_at: now,
        }
    }

    #[test]
    fn only_fresh_unused_links_are_usable() {
        assert!(ensure_usable(&confirmation(false, Duration::hours(1))).is_ok());
        assert!(matches!(
            ensure_usable(&confirmation(false, Duration::hours(-1))),
            Err(AppError::ConfirmationExpired)
        ));
        assert!(matches!(
            ensure_usable(&confirmation(true, Duration::hours(1))),
            Err(AppError::ConfirmationUsed)
        ));
    }
}
