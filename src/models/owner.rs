// src/models/owner.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::models::tenancy::DocumentType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "owner_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OwnerStatus {
    Incomplete,
    Partial,
    Verified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "consent_origin", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConsentOrigin {
    Broker,
    SelfService,
    XlsImport,
    ManualEntry,
}

// ---
// Owner (proprietário). Pode nascer incompleto, por exemplo via importação.
// ---
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Owner {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub document: Option<String>,
    pub document_type: Option<DocumentType>,
    pub owner_status: OwnerStatus,
    pub consent_given: bool,
    pub consent_text: Option<String>,
    pub consent_date: Option<DateTime<Utc>>,
    pub consent_origin: Option<ConsentOrigin>,
    pub is_anonymized: bool,
    pub anonymized_at: Option<DateTime<Utc>>,
    pub anonymization_reason: Option<String>,
    pub consent_revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Owner {
    /// Dados atuais no formato usado para recalcular a completude.
    pub fn to_new_owner(&self) -> NewOwner {
        NewOwner {
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            document: self.document.clone(),
            document_type: self.document_type,
            consent_given: self.consent_given,
            consent_text: self.consent_text.clone(),
            consent_origin: self.consent_origin,
        }
    }
}

/// Dados normalizados de um novo proprietário.
#[derive(Debug, Clone, Default)]
pub struct NewOwner {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub document: Option<String>,
    pub document_type: Option<DocumentType>,
    pub consent_given: bool,
    pub consent_text: Option<String>,
    pub consent_origin: Option<ConsentOrigin>,
}

impl NewOwner {
    /// Conta nome, e-mail, telefone, documento e consentimento:
    /// nenhum preenchido => incomplete, todos => verified, senão partial.
    pub fn completeness(&self) -> OwnerStatus {
        let filled = [
            self.name.is_some(),
            self.email.is_some(),
            self.phone.is_some(),
            self.document.is_some(),
            self.consent_given,
        ]
        .iter()
        .filter(|f| **f)
        .count();

        match filled {
            0 => OwnerStatus::Incomplete,
            5 => OwnerStatus::Verified,
            _ => OwnerStatus::Partial,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateOwnerPayload {
    #[validate(length(min = 1, max = 255, message = "required"))]
    pub name: String,
    #[validate(email(message = "invalid_email"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub document: Option<String>,
    #[serde(default)]
    pub consent_given: bool,
    pub consent_text: Option<String>,
    pub consent_origin: Option<ConsentOrigin>,
}

/// Atualização parcial: campos ausentes ficam como estão.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateOwnerPayload {
    #[validate(length(min = 1, max = 255, message = "required"))]
    pub name: Option<String>,
    #[validate(email(message = "invalid_email"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub document: Option<String>,
    pub consent_given: Option<bool>,
    pub consent_text: Option<String>,
    pub consent_origin: Option<ConsentOrigin>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AnonymizePayload {
    /// retention_policy | user_request
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OwnerListQuery {
    pub owner_status: Option<OwnerStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_owner_is_incomplete() {
        assert_eq!(NewOwner::default().completeness(), OwnerStatus::Incomplete);
    }

    #[test]
    fn some_fields_make_partial() {
        let owner = NewOwner {
            name: Some("José".into()),
            phone: Some("11987654321".into()),
            ..Default::default()
        };
        assert_eq!(owner.completeness(), OwnerStatus::Partial);
    }

    #[test]
    fn all_fields_with_consent_verified() {
        let owner = NewOwner {
            name: Some("José".into()),
            email: Some("jose@example.com".into()),
            phone: Some("11987654321".into()),
            document: Some("52998224725".into()),
            consent_given: true,
            ..Default::default()
        };
        assert_eq!(owner.completeness(), OwnerStatus::Verified);
    }

    #[test]
    fn stored_owner_keeps_its_completeness() {
        let now = Utc::now();
        let owner = Owner {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            name: Some("José".into()),
            email: None,
            phone: None,
            document: None,
            document_type: None,
            owner_status: OwnerStatus::Partial,
            consent_given: false,
            consent_text: None,
            consent_date: None,
            consent_origin: None,
            is_anonymized: false,
            anonymized_at: None,
            anonymization_reason: None,
            consent_revoked: false,
            revoked_at: None,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(owner.to_new_owner().completeness(), OwnerStatus::Partial);
    }

    #[test]
    fn without_consent_never_verified() {
        let owner = NewOwner {
            name: Some("José".into()),
            email: Some("jose@example.com".into()),
            phone: Some("11987654321".into()),
            document: Some("52998224725".into()),
            consent_given: false,
            ..Default::default()
        };
        assert_eq!(owner.completeness(), OwnerStatus::Partial);
    }
}
