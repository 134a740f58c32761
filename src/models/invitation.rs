// src/models/invitation.rs

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::models::user::UserRole;

pub const INVITATION_TTL_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "invitation_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Expired,
    Cancelled,
}

impl InvitationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Expired => "expired",
            InvitationStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Invitation {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub creci: Option<String>,
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub token: String,
    pub status: InvitationStatus,
    pub invited_by: Option<Uuid>,
    pub expires_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Resultado da checagem de um token de convite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvitationCheck {
    Valid,
    Expired,
    NotPending(InvitationStatus),
}

impl Invitation {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Um convite pendente com prazo vencido conta como expirado.
    pub fn check(&self, now: DateTime<Utc>) -> InvitationCheck {
        match self.status {
            InvitationStatus::Pending if self.is_expired_at(now) => InvitationCheck::Expired,
            InvitationStatus::Pending => InvitationCheck::Valid,
            InvitationStatus::Expired => InvitationCheck::Expired,
            other => InvitationCheck::NotPending(other),
        }
    }
}

pub fn expiry_from(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::days(INVITATION_TTL_DAYS)
}

/// Gera o token do convite: 32 bytes aleatórios em hexadecimal.
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

// ---
// Payloads / respostas
// ---

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct InviteUserPayload {
    #[validate(email(message = "invalid_email"))]
    pub email: String,
    #[validate(length(min = 1, max = 200, message = "required"))]
    pub name: String,
    pub role: UserRole,
    pub creci: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AcceptInvitationPayload {
    #[validate(length(min = 8, message = "password_min_8"))]
    pub password: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VerifyInvitationResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invitation: Option<Invitation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AcceptInvitationResponse {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub token: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InvitationList {
    pub invitations: Vec<Invitation>,
    pub count: usize,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct InvitationListQuery {
    pub status: Option<InvitationStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invitation(status: InvitationStatus, expires_in: Duration) -> Invitation {
        let now = Utc::now();
        Invitation {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            email: "novo@example.com".into(),
            name: "Novo".into(),
            role: UserRole::Broker,
            creci: Some("12345-F".into()),
            token: generate_token(),
            status,
            invited_by: None,
            expires_at: now + expires_in,
            accepted_at: None,
            user_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn token_is_64_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_token());
    }

    #[test]
    fn pending_and_in_time_is_valid() {
        let inv = invitation(InvitationStatus::Pending, Duration::days(1));
        assert_eq!(inv.check(Utc::now()), InvitationCheck::Valid);
    }

    #[test]
    fn pending_past_deadline_is_expired() {
        let inv = invitation(InvitationStatus::Pending, Duration::seconds(-1));
        assert_eq!(inv.check(Utc::now()), InvitationCheck::Expired);
    }

    #[test]
    fn accepted_or_cancelled_is_not_pending() {
        let inv = invitation(InvitationStatus::Accepted, Duration::days(1));
        assert_eq!(inv.check(Utc::now()), InvitationCheck::NotPending(InvitationStatus::Accepted));
        let inv = invitation(InvitationStatus::Cancelled, Duration::days(1));
        assert_eq!(inv.check(Utc::now()), InvitationCheck::NotPending(InvitationStatus::Cancelled));
    }

    #[test]
    fn expiry_is_seven_days() {
        let now = Utc::now();
        assert_eq!(expiry_from(now) - now, Duration::days(7));
    }

    #[test]
    fn token_is_not_serialized() {
        let inv = invitation(InvitationStatus::Pending, Duration::days(1));
        let json = serde_json::to_value(&inv).unwrap();
        assert!(json.get("token").is_none());
    }
}
