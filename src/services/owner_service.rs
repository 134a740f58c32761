// src/services/owner_service.rs

use serde_json::json;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        pagination::Pagination,
        validators::{normalize_cnpj, normalize_cpf, normalize_email, normalize_phone_br, only_digits},
    },
    db::OwnerRepository,
    models::{
        activity::NewActivity,
        owner::{ConsentOrigin, CreateOwnerPayload, NewOwner, Owner, OwnerListQuery, OwnerStatus, UpdateOwnerPayload},
        tenancy::DocumentType,
    },
    services::activity_service::{events, ActivityService},
};

pub const DEFAULT_ANONYMIZATION_REASON: &str = "user_request";

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// O tipo do documento sai da quantidade de dígitos (11 = CPF, 14 = CNPJ).
pub fn normalize_owner_document(document: &str) -> Result<(String, DocumentType), AppError> {
    match only_digits(document).len() {
        11 => Ok((normalize_cpf(document)?, DocumentType::Cpf)),
        14 => Ok((normalize_cnpj(document)?, DocumentType::Cnpj)),
        _ => Err(AppError::InvalidInput(format!("Documento inválido: {}", document.trim()))),
    }
}

/// Valida e normaliza o cadastro manual.
pub fn new_owner_from_payload(payload: CreateOwnerPayload) -> Result<NewOwner, AppError> {
    let (document, document_type) = match non_empty(payload.document.as_deref()) {
        Some(d) => {
            let (doc, kind) = normalize_owner_document(d)?;
            (Some(doc), Some(kind))
        }
        None => (None, None),
    };

    Ok(NewOwner {
        name: non_empty(Some(&payload.name)).map(str::to_string),
        email: non_empty(payload.email.as_deref()).map(normalize_email).transpose()?,
        phone: non_empty(payload.phone.as_deref()).map(normalize_phone_br).transpose()?,
        document,
        document_type,
        consent_given: payload.consent_given,
        consent_text: non_empty(payload.consent_text.as_deref()).map(str::to_string),
        consent_origin: Some(payload.consent_origin.unwrap_or(ConsentOrigin::ManualEntry)),
    })
}

/// Mescla a atualização parcial com o cadastro atual, normalizando o que chegou.
pub fn merge_owner_update(current: &Owner, payload: UpdateOwnerPayload) -> Result<NewOwner, AppError> {
    let mut merged = current.to_new_owner();

    if let Some(name) = non_empty(payload.name.as_deref()) {
        merged.name = Some(name.to_string());
    }
    if let Some(email) = non_empty(payload.email.as_deref()) {
        merged.email = Some(normalize_email(email)?);
    }
    if let Some(phone) = non_empty(payload.phone.as_deref()) {
        merged.phone = Some(normalize_phone_br(phone)?);
    }
    if let Some(document) = non_empty(payload.document.as_deref()) {
        let (doc, kind) = normalize_owner_document(document)?;
        merged.document = Some(doc);
        merged.document_type = Some(kind);
    }
    if let Some(consent_given) = payload.consent_given {
        merged.consent_given = consent_given;
    }
    if let Some(text) = non_empty(payload.consent_text.as_deref()) {
        merged.consent_text = Some(text.to_string());
    }
    if payload.consent_origin.is_some() {
        merged.consent_origin = payload.consent_origin;
    }
    Ok(merged)
}

#[derive(Clone)]
pub struct OwnerService {
    owner_repo: OwnerRepository,
    activity: ActivityService,
}

impl OwnerService {
    pub fn new(owner_repo: OwnerRepository, activity: ActivityService) -> Self {
        Self { owner_repo, activity }
    }

    pub async fn create(&self, tenant_id: Uuid, payload: CreateOwnerPayload, actor_id: Uuid) -> Result<Owner, AppError> {
        let new_owner = new_owner_from_payload(payload)?;
        let owner = self.owner_repo.create(self.owner_repo.pool(), tenant_id, &new_owner).await?;

        self.activity
            .record(NewActivity::by_user(
                tenant_id,
                events::OWNER_CREATED,
                actor_id,
                json!({ "owner_id": owner.id, "owner_status": owner.owner_status }),
            ))
            .await;
        Ok(owner)
    }

    /// Proprietários anonimizados respondem 410.
    pub async fn get(&self, tenant_id: Uuid, id: Uuid) -> Result<Owner, AppError> {
        let owner = self
            .owner_repo
            .find(tenant_id, id)
            .await?
            .ok_or(AppError::OwnerNotFound)?;
        if owner.is_anonymized {
            return Err(AppError::OwnerAnonymized);
        }
        Ok(owner)
    }

    pub async fn list(&self, tenant_id: Uuid, query: &OwnerListQuery) -> Result<Vec<Owner>, AppError> {
        let pagination = Pagination { limit: query.limit, offset: query.offset };
        self.owner_repo
            .list(tenant_id, query.owner_status, pagination.limit(), pagination.offset())
            .await
    }

    /// Proprietários que saem de `incomplete` geram `owner_enriched`.
    pub async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        payload: UpdateOwnerPayload,
        actor_id: Uuid,
    ) -> Result<Owner, AppError> {
        let current = self.get(tenant_id, id).await?;
        let merged = merge_owner_update(&current, payload)?;

        let owner = self
            .owner_repo
            .update(tenant_id, id, &merged)
            .await?
            .ok_or(AppError::OwnerAnonymized)?;

        let event = if current.owner_status == OwnerStatus::Incomplete {
            events::OWNER_ENRICHED
        } else {
            events::OWNER_UPDATED
        };
        self.activity
            .record(NewActivity::by_user(
                tenant_id,
                event,
                actor_id,
                json!({
                    "owner_id": id,
                    "previous_status": current.owner_status,
                    "owner_status": owner.owner_status,
                }),
            ))
            .await;
        Ok(owner)
    }

    /// Imóveis do proprietário excluído ficam sem proprietário.
    pub async fn delete(&self, tenant_id: Uuid, id: Uuid, actor_id: Uuid) -> Result<(), AppError> {
        if !self.owner_repo.delete(tenant_id, id).await? {
            return Err(AppError::OwnerNotFound);
        }
        tracing::info!(%tenant_id, owner_id = %id, "Proprietário excluído");
        self.activity
            .record(NewActivity::by_user(tenant_id, events::OWNER_DELETED, actor_id, json!({ "owner_id": id })))
            .await;
        Ok(())
    }

    /// A revogação é do proprietário; quem a registrou vai no metadata.
    pub async fn revoke_consent(&self, tenant_id: Uuid, id: Uuid, actor_id: Uuid) -> Result<Owner, AppError> {
        let current = self.get(tenant_id, id).await?;
        let status = NewOwner { consent_given: false, ..current.to_new_owner() }.completeness();

        let owner = self
            .owner_repo
            .revoke_consent(tenant_id, id, status)
            .await?
            .ok_or(AppError::OwnerAnonymized)?;

        tracing::info!(%tenant_id, owner_id = %id, "Consentimento do proprietário revogado");
        self.activity
            .record(NewActivity::by_owner(
                tenant_id,
                events::OWNER_CONSENT_REVOKED,
                Some(id),
                json!({ "owner_id": id, "recorded_by": actor_id }),
            ))
            .await;
        Ok(owner)
    }

    pub async fn anonymize(&self, tenant_id: Uuid, id: Uuid, reason: Option<&str>, actor_id: Uuid) -> Result<Owner, AppError> {
        // Garante 404/410 antes de tocar no registro.
        self.get(tenant_id, id).await?;

        let reason = non_empty(reason).unwrap_or(DEFAULT_ANONYMIZATION_REASON);
        let owner = self
            .owner_repo
            .anonymize(tenant_id, id, reason)
            .await?
            .ok_or(AppError::OwnerNotFound)?;

        tracing::info!(%tenant_id, owner_id = %id, reason, "Proprietário anonimizado");
        self.activity
            .record(NewActivity::by_user(
                tenant_id,
                events::OWNER_ANONYMIZED,
                actor_id,
                json!({ "owner_id": id, "reason": reason }),
            ))
            .await;
        Ok(owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn payload() -> CreateOwnerPayload {
        CreateOwnerPayload {
            name: "José da Silva".into(),
            email: None,
            phone: None,
            document: None,
            consent_given: false,
            consent_text: None,
            consent_origin: None,
        }
    }

    #[test]
    fn manual_entry_is_the_default_origin() {
        let owner = new_owner_from_payload(payload()).expect("owner");
        assert_eq!(owner.consent_origin, Some(ConsentOrigin::ManualEntry));
        assert_eq!(owner.completeness(), OwnerStatus::Partial);
    }

    #[test]
    fn document_kind_comes_from_length() {
        assert_eq!(
            normalize_owner_document("529.982.247-25").expect("cpf"),
            ("52998224725".to_string(), DocumentType::Cpf)
        );
        assert_eq!(
            normalize_owner_document("11.222.333/0001-81").expect("cnpj").1,
            DocumentType::Cnpj
        );
        assert!(normalize_owner_document("123").is_err());
    }

    #[test]
    fn complete_owner_with_consent_is_verified() {
        let mut p = payload();
        p.email = Some("JOSE@Example.com".into());
        p.phone = Some("(11) 98765-4321".into());
        p.document = Some("529.982.247-25".into());
        p.consent_given = true;
        let owner = new_owner_from_payload(p).expect("owner");
        assert_eq!(owner.email.as_deref(), Some("jose@example.com"));
        assert_eq!(owner.completeness(), OwnerStatus::Verified);
    }

    fn stored(name: Option<&str>, status: OwnerStatus) -> Owner {
        let now = Utc::now();
        Owner {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            name: name.map(str::to_string),
            email: None,
            phone: None,
            document: None,
            document_type: None,
            owner_status: status,
            consent_given: false,
            consent_text: None,
            consent_date: None,
            consent_origin: Some(ConsentOrigin::XlsImport),
            is_anonymized: false,
            anonymized_at: None,
            anonymization_reason: None,
            consent_revoked: false,
            revoked_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn update_keeps_missing_fields_and_normalizes_new_ones() {
        let current = stored(Some("José"), OwnerStatus::Partial);
        let payload = UpdateOwnerPayload {
            phone: Some("(11) 98765-4321".into()),
            document: Some("529.982.247-25".into()),
            email: Some("  ".into()),
            ..Default::default()
        };
        let merged = merge_owner_update(&current, payload).expect("merge");
        assert_eq!(merged.name.as_deref(), Some("José"));
        assert_eq!(merged.document.as_deref(), Some("52998224725"));
        assert_eq!(merged.document_type, Some(DocumentType::Cpf));
        assert!(merged.email.is_none());
        assert_eq!(merged.consent_origin, Some(ConsentOrigin::XlsImport));
        assert_eq!(merged.completeness(), OwnerStatus::Partial);
    }

    #[test]
    fn enriching_an_imported_owner_can_verify_it() {
        let current = stored(None, OwnerStatus::Incomplete);
        let payload = UpdateOwnerPayload {
            name: Some("Maria".into()),
            email: Some("Maria@Example.com".into()),
            phone: Some("11987654321".into()),
            document: Some("11.222.333/0001-81".into()),
            consent_given: Some(true),
            ..Default::default()
        };
        let merged = merge_owner_update(&current, payload).expect("merge");
        assert_eq!(merged.email.as_deref(), Some("maria@example.com"));
        assert_eq!(merged.completeness(), OwnerStatus::Verified);
    }

    #[test]
    fn invalid_document_is_rejected_on_update() {
        let current = stored(Some("José"), OwnerStatus::Partial);
        let payload = UpdateOwnerPayload { document: Some("123".into()), ..Default::default() };
        assert!(matches!(merge_owner_update(&current, payload), Err(AppError::InvalidInput(_))));
    }
}
