// src/services/lead_service.rs

use reqwest::Url;
use serde_json::json;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        pagination::Pagination,
        validators::{normalize_email, only_digits},
    },
    db::{LeadRepository, PropertyRepository, TenantRepository, UserRepository},
    models::{
        activity::NewActivity,
        lead::{
            CreateLeadPayload, Lead, LeadChannel, LeadListQuery, LeadStatus, NewLead, PublicFormLeadPayload,
            PublicLeadResponse, PublicWhatsAppLeadPayload, UtmParams, WhatsAppLeadResponse, FORM_LEAD_SUCCESS_MESSAGE,
            WHATSAPP_CONSENT_TEXT, WHATSAPP_DEFAULT_NAME, WHATSAPP_DEFAULT_PHONE,
        },
        property::Property,
    },
    services::{
        activity_service::{events, ActivityService},
        owner_service::DEFAULT_ANONYMIZATION_REASON,
    },
};

const WHATSAPP_BASE: &str = "https://wa.me/";
const FORM_CONSENT_TEXT: &str = "Consentimento registrado no formulário do imóvel.";

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Número para o wa.me: só dígitos, com DDI 55 quando vier no formato nacional.
pub fn whatsapp_digits(phone: &str) -> Option<String> {
    let digits = only_digits(phone);
    match digits.len() {
        0 => None,
        10 | 11 => Some(format!("55{}", digits)),
        _ => Some(digits),
    }
}

pub fn whatsapp_message(property_ref: &str, lead_id: Uuid) -> String {
    format!(
        "Olá! Tenho interesse no imóvel {}. (Protocolo: {})",
        property_ref, lead_id
    )
}

/// `https://wa.me/<dígitos>?text=<mensagem>`; sem telefone, `https://wa.me/?text=...`.
pub fn whatsapp_url(phone: Option<&str>, message: &str) -> Result<String, AppError> {
    let base = match phone.and_then(whatsapp_digits) {
        Some(digits) => format!("{}{}", WHATSAPP_BASE, digits),
        None => WHATSAPP_BASE.to_string(),
    };
    let url = Url::parse_with_params(&base, &[("text", message)])
        .map_err(|e| anyhow::anyhow!("URL do WhatsApp inválida: {}", e))?;
    Ok(url.to_string())
}

/// Regras do formulário público, checadas antes de qualquer acesso ao banco.
pub fn check_public_form(payload: &PublicFormLeadPayload) -> Result<(), AppError> {
    if !payload.consent_given {
        return Err(AppError::ConsentRequired);
    }
    if payload.name.trim().is_empty() {
        return Err(AppError::InvalidInput("name é obrigatório".into()));
    }
    if non_empty(payload.email.as_deref()).is_none() && non_empty(payload.phone.as_deref()).is_none() {
        return Err(AppError::InvalidInput("Informe e-mail ou telefone".into()));
    }
    Ok(())
}

/// Mudança de status no funil. `Ok(false)` quando nada muda.
pub fn check_transition(from: LeadStatus, to: LeadStatus) -> Result<bool, AppError> {
    if from == to {
        return Ok(false);
    }
    if !from.can_transition_to(to) {
        return Err(AppError::InvalidStatusTransition {
            from: from.as_str().to_string(),
            to: to.as_str().to_string(),
        });
    }
    Ok(true)
}

fn new_lead(property: &Property, broker_id: Option<Uuid>, channel: LeadChannel, utm: UtmParams) -> NewLead {
    NewLead {
        tenant_id: property.tenant_id,
        property_id: property.id,
        broker_id: broker_id.or(property.broker_id),
        name: String::new(),
        email: None,
        phone: None,
        message: None,
        channel,
        utm_source: non_empty(utm.utm_source.as_deref()),
        utm_campaign: non_empty(utm.utm_campaign.as_deref()),
        utm_medium: non_empty(utm.utm_medium.as_deref()),
        referrer: non_empty(utm.referrer.as_deref()),
        consent_text: None,
        consent_ip: None,
    }
}

#[derive(Clone)]
pub struct LeadService {
    lead_repo: LeadRepository,
    property_repo: PropertyRepository,
    user_repo: UserRepository,
    tenant_repo: TenantRepository,
    activity: ActivityService,
}

impl LeadService {
    pub fn new(
        lead_repo: LeadRepository,
        property_repo: PropertyRepository,
        user_repo: UserRepository,
        tenant_repo: TenantRepository,
        activity: ActivityService,
    ) -> Self {
        Self { lead_repo, property_repo, user_repo, tenant_repo, activity }
    }

    /// Cadastro manual feito no painel.
    pub async fn create(&self, tenant_id: Uuid, payload: CreateLeadPayload, actor_id: Uuid) -> Result<Lead, AppError> {
        if !payload.consent_given {
            return Err(AppError::ConsentRequired);
        }
        let property = self
            .property_repo
            .find(tenant_id, payload.property_id)
            .await?
            .ok_or(AppError::PropertyNotFound)?;
        if let Some(broker_id) = payload.broker_id {
            if !self.user_repo.exists_in_tenant(tenant_id, broker_id).await? {
                return Err(AppError::UserNotFound);
            }
        }

        let mut lead = new_lead(&property, payload.broker_id, payload.channel, payload.utm);
        lead.name = payload.name.trim().to_string();
        lead.email = non_empty(payload.email.as_deref()).map(|e| normalize_email(&e)).transpose()?;
        lead.phone = non_empty(payload.phone.as_deref());
        lead.message = non_empty(payload.message.as_deref());
        lead.consent_text = non_empty(payload.consent_text.as_deref());

        let lead = self.lead_repo.create(&lead).await?;
        self.activity
            .record(NewActivity::by_user(
                tenant_id,
                events::LEAD_CREATED,
                actor_id,
                json!({ "lead_id": lead.id, "property_id": lead.property_id, "channel": lead.channel }),
            ))
            .await;
        Ok(lead)
    }

    pub async fn list(&self, tenant_id: Uuid, query: &LeadListQuery) -> Result<Vec<Lead>, AppError> {
        let pagination = Pagination { limit: query.limit, offset: query.offset };
        self.lead_repo
            .list(tenant_id, query, pagination.limit(), pagination.offset())
            .await
    }

    pub async fn get(&self, tenant_id: Uuid, id: Uuid) -> Result<Lead, AppError> {
        self.lead_repo.find(tenant_id, id).await?.ok_or(AppError::LeadNotFound)
    }

    pub async fn update_status(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        status: LeadStatus,
        actor_id: Uuid,
    ) -> Result<Lead, AppError> {
        let current = self.get(tenant_id, id).await?;
        if !check_transition(current.status, status)? {
            return Ok(current);
        }

        let lead = self
            .lead_repo
            .update_status(tenant_id, id, current.status, status)
            .await?
            .ok_or(AppError::ConcurrentUpdate)?;

        self.activity
            .record(NewActivity::by_user(
                tenant_id,
                events::LEAD_STATUS_CHANGED,
                actor_id,
                json!({ "lead_id": id, "from": current.status, "to": status }),
            ))
            .await;
        Ok(lead)
    }

    pub async fn revoke_consent(&self, tenant_id: Uuid, id: Uuid, actor_id: Uuid) -> Result<Lead, AppError> {
        let lead = self
            .lead_repo
            .revoke_consent(tenant_id, id)
            .await?
            .ok_or(AppError::LeadNotFound)?;
        self.activity
            .record(NewActivity::by_user(tenant_id, events::LEAD_CONSENT_REVOKED, actor_id, json!({ "lead_id": id })))
            .await;
        Ok(lead)
    }

    pub async fn anonymize(&self, tenant_id: Uuid, id: Uuid, reason: Option<&str>, actor_id: Uuid) -> Result<Lead, AppError> {
        let reason = non_empty(reason).unwrap_or_else(|| DEFAULT_ANONYMIZATION_REASON.to_string());
        let lead = self
            .lead_repo
            .anonymize(tenant_id, id, &reason)
            .await?
            .ok_or(AppError::LeadNotFound)?;

        tracing::info!(%tenant_id, lead_id = %id, reason = %reason, "Lead anonimizado");
        self.activity
            .record(NewActivity::by_user(
                tenant_id,
                events::LEAD_ANONYMIZED,
                actor_id,
                json!({ "lead_id": id, "reason": reason }),
            ))
            .await;
        Ok(lead)
    }

    pub async fn pending_anonymization(&self, tenant_id: Uuid) -> Result<Vec<Lead>, AppError> {
        self.lead_repo.pending_anonymization(tenant_id).await
    }

    // ---
    // Leads públicos
    // ---

    async fn listed_property(&self, property_id: Uuid) -> Result<Property, AppError> {
        self.property_repo
            .find_public(property_id)
            .await?
            .ok_or(AppError::PublicPropertyNotFound)
    }

    pub async fn public_form(
        &self,
        property_id: Uuid,
        payload: PublicFormLeadPayload,
        client_ip: Option<String>,
    ) -> Result<PublicLeadResponse, AppError> {
        check_public_form(&payload)?;
        let property = self.listed_property(property_id).await?;

        let mut lead = new_lead(&property, None, LeadChannel::Form, payload.utm);
        lead.name = payload.name.trim().to_string();
        lead.email = non_empty(payload.email.as_deref()).map(|e| normalize_email(&e)).transpose()?;
        lead.phone = non_empty(payload.phone.as_deref());
        lead.message = non_empty(payload.message.as_deref());
        lead.consent_text = non_empty(payload.consent_text.as_deref()).or_else(|| Some(FORM_CONSENT_TEXT.into()));
        lead.consent_ip = client_ip;

        let lead = self.lead_repo.create(&lead).await?;
        tracing::info!(tenant_id = %lead.tenant_id, lead_id = %lead.id, "Lead recebido pelo formulário");
        self.activity
            .record(NewActivity::by_system(
                lead.tenant_id,
                events::LEAD_CREATED,
                json!({ "lead_id": lead.id, "property_id": property.id, "channel": lead.channel }),
            ))
            .await;

        Ok(PublicLeadResponse {
            success: true,
            lead_id: lead.id,
            message: FORM_LEAD_SUCCESS_MESSAGE.into(),
        })
    }

    pub async fn public_whatsapp(
        &self,
        property_id: Uuid,
        payload: PublicWhatsAppLeadPayload,
        client_ip: Option<String>,
    ) -> Result<WhatsAppLeadResponse, AppError> {
        let property = self.listed_property(property_id).await?;

        let mut lead = new_lead(&property, None, LeadChannel::Whatsapp, payload.utm);
        lead.name = non_empty(payload.name.as_deref()).unwrap_or_else(|| WHATSAPP_DEFAULT_NAME.into());
        lead.phone = non_empty(payload.phone.as_deref()).or_else(|| Some(WHATSAPP_DEFAULT_PHONE.into()));
        lead.consent_text = Some(WHATSAPP_CONSENT_TEXT.into());
        lead.consent_ip = client_ip;

        let lead = self.lead_repo.create(&lead).await?;
        self.activity
            .record(NewActivity::by_system(
                lead.tenant_id,
                events::LEAD_CREATED,
                json!({ "lead_id": lead.id, "property_id": property.id, "channel": lead.channel }),
            ))
            .await;

        let phone = self.contact_phone(&property).await?;
        let url = whatsapp_url(phone.as_deref(), &whatsapp_message(property.display_reference(), lead.id))?;
        Ok(WhatsAppLeadResponse {
            success: true,
            lead_id: lead.id,
            whatsapp_url: url,
            message: FORM_LEAD_SUCCESS_MESSAGE.into(),
        })
    }

    // Telefone do corretor do imóvel, senão o do tenant.
    async fn contact_phone(&self, property: &Property) -> Result<Option<String>, AppError> {
        if let Some(broker_id) = property.broker_id {
            let broker = self.user_repo.find_in_tenant(property.tenant_id, broker_id).await?;
            if let Some(phone) = broker.and_then(|b| b.phone).filter(|p| !p.trim().is_empty()) {
                return Ok(Some(phone));
            }
        }
        let tenant = self.tenant_repo.find_by_id(property.tenant_id).await?;
        Ok(tenant.and_then(|t| t.phone).filter(|p| !p.trim().is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(consent: bool) -> PublicFormLeadPayload {
        PublicFormLeadPayload {
            name: "Ana".into(),
            email: Some("ana@example.com".into()),
            phone: None,
            message: None,
            consent_given: consent,
            consent_text: None,
            utm: UtmParams::default(),
        }
    }

    #[test]
    fn form_requires_consent() {
        assert!(matches!(check_public_form(&form(false)), Err(AppError::ConsentRequired)));
        assert!(check_public_form(&form(true)).is_ok());
    }

    #[test]
    fn form_requires_some_contact() {
        let mut payload = form(true);
        payload.email = Some("  ".into());
        assert!(check_public_form(&payload).is_err());
        payload.phone = Some("11987654321".into());
        assert!(check_public_form(&payload).is_ok());
    }

    #[test]
    fn same_status_is_a_no_op() {
        assert_eq!(check_transition(LeadStatus::Qualified, LeadStatus::Qualified).expect("ok"), false);
        assert_eq!(check_transition(LeadStatus::New, LeadStatus::Qualified).expect("ok"), true);
        assert!(matches!(
            check_transition(LeadStatus::Negotiating, LeadStatus::New),
            Err(AppError::InvalidStatusTransition { .. })
        ));
    }

    #[test]
    fn whatsapp_url_uses_broker_digits() {
        let url = whatsapp_url(Some("(11) 98765-4321"), "Olá").expect("url");
        assert_eq!(url, "https://wa.me/5511987654321?text=Ol%C3%A1");

        let url = whatsapp_url(Some("+55 21 3333-4444"), "oi").expect("url");
        assert!(url.starts_with("https://wa.me/552133334444?text="));
    }

    #[test]
    fn whatsapp_url_without_phone() {
        let url = whatsapp_url(None, "Tenho interesse").expect("url");
        assert!(url.starts_with("https://wa.me/?text="));
        assert!(url.contains("Tenho+interesse"));
    }

    #[test]
    fn message_mentions_reference_and_protocol() {
        let id = Uuid::nil();
        let msg = whatsapp_message("AP-123", id);
        assert!(msg.contains("AP-123"));
        assert!(msg.contains(&id.to_string()));
    }
}
