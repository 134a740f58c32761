// src/models/activity.rs

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "actor_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActorType {
    User,
    System,
    Owner,
}

impl ActorType {
    pub fn as_str(self) -> &'static str {
        match self {
            ActorType::User => "user",
            ActorType::System => "system",
            ActorType::Owner => "owner",
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct ActivityLog {
    pub id: Uuid,
    pub tenant_id: Uuid,
    #[schema(example = "lead_created")]
    pub event_type: String,
    pub actor_type: ActorType,
    pub actor_id: Option<Uuid>,
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
    pub event_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Evento a registrar.
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub tenant_id: Uuid,
    pub event_type: &'static str,
    pub actor_type: ActorType,
    pub actor_id: Option<Uuid>,
    pub metadata: serde_json::Value,
}

impl NewActivity {
    pub fn by_user(tenant_id: Uuid, event_type: &'static str, user_id: Uuid, metadata: serde_json::Value) -> Self {
        Self { tenant_id, event_type, actor_type: ActorType::User, actor_id: Some(user_id), metadata }
    }

    /// Ação do próprio proprietário (link de confirmação, revogação de consentimento).
    pub fn by_owner(tenant_id: Uuid, event_type: &'static str, owner_id: Option<Uuid>, metadata: serde_json::Value) -> Self {
        Self { tenant_id, event_type, actor_type: ActorType::Owner, actor_id: owner_id, metadata }
    }

    pub fn by_system(tenant_id: Uuid, event_type: &'static str, metadata: serde_json::Value) -> Self {
        Self { tenant_id, event_type, actor_type: ActorType::System, actor_id: None, metadata }
    }

    /// SHA-256 de `tenant|evento|ator|id_ator|timestamp|metadata`.
    pub fn hash_at(&self, at: DateTime<Utc>) -> String {
        let actor_id = self.actor_id.map(|id| id.to_string()).unwrap_or_default();
        let payload = format!(
            "{}|{}|{}|{}|{}|{}",
            self.tenant_id,
            self.event_type,
            self.actor_type.as_str(),
            actor_id,
            at.to_rfc3339_opts(SecondsFormat::Micros, true),
            self.metadata
        );
        hex::encode(Sha256::digest(payload.as_bytes()))
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ActivityListQuery {
    pub event_type: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hash_is_stable_and_hex() {
        let at = Utc::now();
        let tenant = Uuid::new_v4();
        let event = NewActivity::by_system(tenant, "lead_created", json!({"lead_id": "x"}));
        let h1 = event.hash_at(at);
        assert_eq!(h1.len(), 64);
        assert_eq!(h1, event.hash_at(at));
    }

    #[test]
    fn hash_changes_with_content() {
        let at = Utc::now();
        let tenant = Uuid::new_v4();
        let a = NewActivity::by_system(tenant, "lead_created", json!({}));
        let b = NewActivity::by_system(tenant, "lead_updated", json!({}));
        assert_ne!(a.hash_at(at), b.hash_at(at));
    }
}
