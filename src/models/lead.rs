// src/models/lead.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

pub const ANONYMIZED_NAME: &str = "ANONYMIZED";
pub const WHATSAPP_DEFAULT_NAME: &str = "Lead via WhatsApp";
pub const WHATSAPP_DEFAULT_PHONE: &str = "WhatsApp";
pub const WHATSAPP_CONSENT_TEXT: &str = "Concordo com a Política de Privacidade e autorizo o uso dos meus dados para contato sobre este imóvel.";
pub const FORM_LEAD_SUCCESS_MESSAGE: &str = "Lead criado com sucesso. O corretor entrará em contato em breve.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "lead_channel", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LeadChannel {
    Whatsapp,
    Form,
    Phone,
    Email,
    Chat,
    Referral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "lead_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    Negotiating,
    Converted,
    Lost,
}

impl LeadStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Qualified => "qualified",
            LeadStatus::Negotiating => "negotiating",
            LeadStatus::Converted => "converted",
            LeadStatus::Lost => "lost",
        }
    }

    // Posição no funil; `lost` fica fora da sequência.
    fn rank(self) -> Option<u8> {
        match self {
            LeadStatus::New => Some(0),
            LeadStatus::Contacted => Some(1),
            LeadStatus::Qualified => Some(2),
            LeadStatus::Negotiating => Some(3),
            LeadStatus::Converted => Some(4),
            LeadStatus::Lost => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, LeadStatus::Converted | LeadStatus::Lost)
    }

    /// Funil: avança (podendo pular etapas), `lost` a partir de qualquer etapa aberta,
    /// nunca volta e nunca sai de um estado terminal. Repetir o estado atual é permitido.
    pub fn can_transition_to(self, next: LeadStatus) -> bool {
        if self == next {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        match (self.rank(), next.rank()) {
            (_, None) => true,
            (Some(from), Some(to)) => to > from,
            (None, Some(_)) => false,
        }
    }
}

// ---
// Lead (interessado num imóvel) com os campos de LGPD
// ---
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Lead {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub property_id: Uuid,
    pub broker_id: Option<Uuid>,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub message: Option<String>,
    pub channel: LeadChannel,
    pub utm_source: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_medium: Option<String>,
    pub referrer: Option<String>,
    pub status: LeadStatus,
    pub consent_given: bool,
    pub consent_text: Option<String>,
    pub consent_date: Option<DateTime<Utc>>,
    pub consent_ip: Option<String>,
    pub consent_revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    pub is_anonymized: bool,
    pub anonymized_at: Option<DateTime<Utc>>,
    pub anonymization_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Dados de um lead novo, já resolvidos pelo serviço.
#[derive(Debug, Clone)]
pub struct NewLead {
    pub tenant_id: Uuid,
    pub property_id: Uuid,
    pub broker_id: Option<Uuid>,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub message: Option<String>,
    pub channel: LeadChannel,
    pub utm_source: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_medium: Option<String>,
    pub referrer: Option<String>,
    pub consent_text: Option<String>,
    pub consent_ip: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct UtmParams {
    pub utm_source: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_medium: Option<String>,
    pub referrer: Option<String>,
}

// ---
// Payloads
// ---

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateLeadPayload {
    pub property_id: Uuid,
    #[validate(length(min = 1, max = 255, message = "required"))]
    pub name: String,
    #[validate(email(message = "invalid_email"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub message: Option<String>,
    pub channel: LeadChannel,
    pub broker_id: Option<Uuid>,
    #[serde(default)]
    pub consent_given: bool,
    pub consent_text: Option<String>,
    #[serde(flatten)]
    pub utm: UtmParams,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct PublicFormLeadPayload {
    #[validate(length(min = 1, max = 255, message = "required"))]
    pub name: String,
    #[validate(email(message = "invalid_email"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    #[validate(length(max = 5000, message = "too_long"))]
    pub message: Option<String>,
    #[serde(default)]
    pub consent_given: bool,
    pub consent_text: Option<String>,
    #[serde(flatten)]
    pub utm: UtmParams,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct PublicWhatsAppLeadPayload {
    #[validate(length(max = 255, message = "too_long"))]
    pub name: Option<String>,
    pub phone: Option<String>,
    #[serde(flatten)]
    pub utm: UtmParams,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LeadStatusPayload {
    pub status: LeadStatus,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PublicLeadResponse {
    pub success: bool,
    pub lead_id: Uuid,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WhatsAppLeadResponse {
    pub success: bool,
    pub lead_id: Uuid,
    pub whatsapp_url: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LeadListQuery {
    pub status: Option<LeadStatus>,
    pub channel: Option<LeadChannel>,
    pub property_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::LeadStatus::*;

    #[test]
    fn funnel_moves_forward() {
        assert!(New.can_transition_to(Contacted));
        assert!(Contacted.can_transition_to(Qualified));
        assert!(Qualified.can_transition_to(Negotiating));
        assert!(Negotiating.can_transition_to(Converted));
    }

    #[test]
    fn funnel_may_skip_stages() {
        assert!(New.can_transition_to(Negotiating));
        assert!(Contacted.can_transition_to(Converted));
    }

    #[test]
    fn funnel_never_moves_back() {
        assert!(!Qualified.can_transition_to(New));
        assert!(!Negotiating.can_transition_to(Contacted));
    }

    #[test]
    fn lost_from_any_open_stage() {
        for s in [New, Contacted, Qualified, Negotiating] {
            assert!(s.can_transition_to(Lost), "{:?} -> lost", s);
        }
    }

    #[test]
    fn terminal_states_are_final() {
        assert!(!Converted.can_transition_to(Lost));
        assert!(!Lost.can_transition_to(New));
        assert!(!Lost.can_transition_to(Converted));
        assert!(Converted.can_transition_to(Converted));
    }
}
