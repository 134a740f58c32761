// src/services/tenancy_service.rs

use serde_json::json;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        pagination::Pagination,
        slug::{generate_slug, normalize_slug},
        validators::{normalize_cnpj, normalize_cpf, normalize_creci, normalize_email, normalize_phone_br},
    },
    db::TenantRepository,
    models::{
        activity::NewActivity,
        tenancy::{
            AddressPayload, CreateTenantPayload, DocumentType, PublicTenant, Tenant, TenantChanges, TenantListQuery,
            TenantOrder, UpdateTenantPayload,
        },
    },
    services::activity_service::{events, ActivityService},
};

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn normalize_document(document: Option<String>, document_type: Option<DocumentType>) -> Result<Option<String>, AppError> {
    match (non_empty(document), document_type) {
        (None, _) => Ok(None),
        (Some(d), Some(DocumentType::Cpf)) => normalize_cpf(&d).map(Some),
        (Some(d), Some(DocumentType::Cnpj)) => normalize_cnpj(&d).map(Some),
        (Some(_), None) => Err(AppError::InvalidInput("document_type é obrigatório junto com document".into())),
    }
}

fn normalize_address(address: AddressPayload) -> AddressPayload {
    AddressPayload {
        street: non_empty(address.street),
        number: non_empty(address.number),
        complement: non_empty(address.complement),
        neighborhood: non_empty(address.neighborhood),
        city: non_empty(address.city),
        state: non_empty(address.state).map(|s| s.to_uppercase()),
        zip_code: non_empty(address.zip_code),
        country: non_empty(address.country).map(|c| c.to_uppercase()),
    }
}

/// Valida e normaliza o payload de criação.
pub fn changes_from_create(payload: CreateTenantPayload) -> Result<TenantChanges, AppError> {
    let slug = match non_empty(payload.slug) {
        Some(s) => normalize_slug(&s),
        None => generate_slug(&payload.name),
    };
    if slug.is_empty() {
        return Err(AppError::InvalidInput("Não foi possível gerar um slug válido".into()));
    }

    let document_type = payload.document_type;
    Ok(TenantChanges {
        name: Some(payload.name.trim().to_string()),
        slug: Some(slug),
        tenant_type: payload.tenant_type,
        document: normalize_document(payload.document, document_type)?,
        document_type,
        business_type: payload.business_type,
        creci: non_empty(payload.creci).map(|c| normalize_creci(&c)).transpose()?,
        email: non_empty(payload.email).map(|e| normalize_email(&e)).transpose()?,
        phone: non_empty(payload.phone).map(|p| normalize_phone_br(&p)).transpose()?,
        address: normalize_address(payload.address),
        settings: payload.settings,
        is_platform_admin: payload.is_platform_admin,
        subscription_plan: non_empty(payload.subscription_plan),
        subscription_status: non_empty(payload.subscription_status),
    })
}

/// Valida e normaliza uma atualização parcial.
pub fn changes_from_update(payload: UpdateTenantPayload, current: &Tenant) -> Result<TenantChanges, AppError> {
    let slug = match non_empty(payload.slug) {
        Some(s) => {
            let s = normalize_slug(&s);
            if s.is_empty() {
                return Err(AppError::InvalidInput("Slug inválido".into()));
            }
            Some(s)
        }
        None => None,
    };

    // Um documento novo é validado contra o tipo novo (ou o atual).
    let document_type = payload.document_type.or(current.document_type);
    Ok(TenantChanges {
        name: non_empty(payload.name),
        slug,
        tenant_type: None,
        document: normalize_document(payload.document, document_type)?,
        document_type: payload.document_type,
        business_type: payload.business_type,
        creci: non_empty(payload.creci).map(|c| normalize_creci(&c)).transpose()?,
        email: non_empty(payload.email).map(|e| normalize_email(&e)).transpose()?,
        phone: non_empty(payload.phone).map(|p| normalize_phone_br(&p)).transpose()?,
        address: normalize_address(payload.address.unwrap_or_default()),
        settings: payload.settings,
        is_platform_admin: current.is_platform_admin,
        subscription_plan: non_empty(payload.subscription_plan),
        subscription_status: non_empty(payload.subscription_status),
    })
}

#[derive(Clone)]
pub struct TenancyService {
    tenant_repo: TenantRepository,
    activity: ActivityService,
}

impl TenancyService {
    pub fn new(tenant_repo: TenantRepository, activity: ActivityService) -> Self {
        Self { tenant_repo, activity }
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<Tenant>, AppError> {
        self.tenant_repo.find_by_id(id).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Tenant, AppError> {
        self.tenant_repo.find_by_id(id).await?.ok_or(AppError::TenantNotFound)
    }

    /// Vitrine pública: tenants inativos não aparecem.
    pub async fn get_public_by_slug(&self, slug: &str) -> Result<PublicTenant, AppError> {
        self.tenant_repo
            .find_by_slug(&normalize_slug(slug))
            .await?
            .filter(|t| t.is_active)
            .map(PublicTenant::from)
            .ok_or(AppError::TenantNotFound)
    }

    pub async fn list(&self, query: &TenantListQuery) -> Result<Vec<Tenant>, AppError> {
        let pagination = Pagination { limit: query.limit, offset: query.offset };
        self.tenant_repo
            .list(
                pagination.limit(),
                pagination.offset(),
                TenantOrder::parse(query.order_by.as_deref()),
                query.active_only,
            )
            .await
    }

    pub async fn create(&self, payload: CreateTenantPayload, actor_id: Uuid) -> Result<Tenant, AppError> {
        let changes = changes_from_create(payload)?;
        let slug = changes.slug.clone().unwrap_or_default();

        if self.tenant_repo.slug_exists(self.tenant_repo.pool(), &slug).await? {
            return Err(AppError::SlugAlreadyExists(slug));
        }

        let tenant = self.tenant_repo.create(self.tenant_repo.pool(), &changes).await?;
        tracing::info!(tenant_id = %tenant.id, slug = %tenant.slug, "Tenant criado");
        self.activity
            .record(NewActivity::by_user(
                tenant.id,
                events::TENANT_CREATED,
                actor_id,
                json!({ "slug": tenant.slug, "name": tenant.name }),
            ))
            .await;
        Ok(tenant)
    }

    pub async fn update(&self, id: Uuid, payload: UpdateTenantPayload, actor_id: Uuid) -> Result<Tenant, AppError> {
        let current = self.get(id).await?;
        let changes = changes_from_update(payload, &current)?;

        if let Some(slug) = changes.slug.as_deref().filter(|s| *s != current.slug) {
            if self.tenant_repo.slug_exists(self.tenant_repo.pool(), slug).await? {
                return Err(AppError::SlugAlreadyExists(slug.to_string()));
            }
        }

        let tenant = self
            .tenant_repo
            .update(self.tenant_repo.pool(), id, &changes)
            .await?
            .ok_or(AppError::TenantNotFound)?;

        self.activity
            .record(NewActivity::by_user(tenant.id, events::TENANT_UPDATED, actor_id, json!({ "slug": tenant.slug })))
            .await;
        Ok(tenant)
    }

    /// Atualização feita pelo próprio tenant: slug, flags e assinatura ficam de fora.
    pub async fn update_own(&self, id: Uuid, mut payload: UpdateTenantPayload, actor_id: Uuid) -> Result<Tenant, AppError> {
        payload.slug = None;
        payload.subscription_plan = None;
        payload.subscription_status = None;
        self.update(id, payload, actor_id).await
    }

    pub async fn delete(&self, id: Uuid, actor: Uuid) -> Result<(), AppError> {
        let tenant = self.get(id).await?;
        if tenant.is_platform_admin {
            return Err(AppError::PlatformTenantProtected);
        }

        self.tenant_repo.delete(id).await?;
        tracing::warn!(tenant_id = %id, slug = %tenant.slug, "Tenant excluído");

        // A trilha do tenant excluído some junto; o registro vai para o tenant da plataforma.
        if let Some(platform) = self.tenant_repo.find_platform_tenant().await? {
            self.activity
                .record(NewActivity::by_user(
                    platform.id,
                    events::TENANT_DELETED,
                    actor,
                    json!({ "tenant_id": id, "slug": tenant.slug, "name": tenant.name }),
                ))
                .await;
        }
        Ok(())
    }

    pub async fn set_active(&self, id: Uuid, active: bool, actor_id: Uuid) -> Result<Tenant, AppError> {
        let current = self.get(id).await?;
        if !active && current.is_platform_admin {
            return Err(AppError::PlatformTenantProtected);
        }

        let tenant = self
            .tenant_repo
            .set_active(id, active)
            .await?
            .ok_or(AppError::TenantNotFound)?;

        let event = if active { events::TENANT_ACTIVATED } else { events::TENANT_DEACTIVATED };
        self.activity
            .record(NewActivity::by_user(tenant.id, event, actor_id, json!({})))
            .await;
        Ok(tenant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(name: &str) -> CreateTenantPayload {
        CreateTenantPayload {
            name: name.into(),
            slug: None,
            tenant_type: None,
            document: None,
            document_type: None,
            business_type: None,
            creci: None,
            email: None,
            phone: None,
            address: AddressPayload::default(),
            settings: None,
            is_platform_admin: false,
            subscription_plan: None,
            subscription_status: None,
        }
    }

    #[test]
    fn slug_is_generated_from_name() {
        let changes = changes_from_create(create("Imobiliária São José")).expect("changes");
        assert_eq!(changes.slug.as_deref(), Some("imobiliaria-sao-jose"));
    }

    #[test]
    fn explicit_slug_is_normalized() {
        let mut payload = create("Qualquer");
        payload.slug = Some("  Minha--Loja ".into());
        assert_eq!(changes_from_create(payload).expect("changes").slug.as_deref(), Some("minha-loja"));
    }

    #[test]
    fn empty_slug_is_rejected() {
        assert!(changes_from_create(create("!!!")).is_err());
    }

    #[test]
    fn document_follows_its_type() {
        let mut payload = create("Loja");
        payload.document = Some("11.222.333/0001-81".into());
        payload.document_type = Some(DocumentType::Cnpj);
        assert_eq!(changes_from_create(payload.clone()).expect("ok").document.as_deref(), Some("11222333000181"));

        payload.document_type = Some(DocumentType::Cpf);
        assert!(changes_from_create(payload).is_err());
    }

    #[test]
    fn contact_fields_are_normalized() {
        let mut payload = create("Loja");
        payload.email = Some(" Contato@Loja.COM ".into());
        payload.phone = Some("(21) 3333-4444".into());
        payload.creci = Some("1234-j/rj".into());
        let changes = changes_from_create(payload).expect("changes");
        assert_eq!(changes.email.as_deref(), Some("contato@loja.com"));
        assert_eq!(changes.phone.as_deref(), Some("2133334444"));
        assert_eq!(changes.creci.as_deref(), Some("1234-J/RJ"));
    }
}
