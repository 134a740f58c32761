// src/models/user.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::models::tenancy::DocumentType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Manager,
    Broker,
    BrokerAdmin,
}

impl UserRole {
    pub fn is_broker(self) -> bool {
        matches!(self, UserRole::Broker | UserRole::BrokerAdmin)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Manager => "manager",
            UserRole::Broker => "broker",
            UserRole::BrokerAdmin => "broker_admin",
        }
    }
}

// ---
// Catálogo de permissões
// ---
pub mod permissions {
    use super::UserRole;

    pub const PROPERTIES_VIEW_ALL: &str = "properties.view_all";
    pub const PROPERTIES_CREATE: &str = "properties.create";
    pub const PROPERTIES_EDIT_ALL: &str = "properties.edit_all";
    pub const PROPERTIES_DELETE: &str = "properties.delete";
    pub const BROKERS_VIEW: &str = "brokers.view";
    pub const BROKERS_CREATE: &str = "brokers.create";
    pub const BROKERS_EDIT: &str = "brokers.edit";
    pub const USERS_VIEW: &str = "users.view";
    pub const USERS_CREATE: &str = "users.create";
    pub const USERS_EDIT: &str = "users.edit";
    pub const SETTINGS_VIEW: &str = "settings.view";
    pub const SETTINGS_EDIT: &str = "settings.edit";
    pub const LEADS_VIEW: &str = "leads.view";
    pub const LEADS_EDIT: &str = "leads.edit";
    pub const IMPORTS_RUN: &str = "imports.run";

    pub const ALL: [&str; 15] = [
        PROPERTIES_VIEW_ALL,
        PROPERTIES_CREATE,
        PROPERTIES_EDIT_ALL,
        PROPERTIES_DELETE,
        BROKERS_VIEW,
        BROKERS_CREATE,
        BROKERS_EDIT,
        USERS_VIEW,
        USERS_CREATE,
        USERS_EDIT,
        SETTINGS_VIEW,
        SETTINGS_EDIT,
        LEADS_VIEW,
        LEADS_EDIT,
        IMPORTS_RUN,
    ];

    pub fn is_known(slug: &str) -> bool {
        ALL.contains(&slug)
    }

    pub fn defaults_for(role: UserRole) -> Vec<String> {
        let slugs: Vec<&str> = match role {
            UserRole::Admin | UserRole::BrokerAdmin => ALL.to_vec(),
            UserRole::Manager => ALL
                .iter()
                .copied()
                .filter(|p| *p != SETTINGS_EDIT && *p != USERS_CREATE)
                .collect(),
            UserRole::Broker => vec![PROPERTIES_CREATE, BROKERS_VIEW, LEADS_VIEW, LEADS_EDIT],
        };
        slugs.into_iter().map(String::from).collect()
    }
}

// ---
// User (corretor, gestor ou administrador de um tenant)
// ---
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub tenant_id: Uuid,
    #[schema(example = "Maria Souza")]
    pub name: String,
    #[schema(example = "maria@imobiliaria.com.br")]
    pub email: String,

    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub password_hash: String,

    pub phone: Option<String>,
    pub document: Option<String>,
    pub document_type: Option<DocumentType>,
    #[schema(example = "12345-F")]
    pub creci: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub permissions: Vec<String>,

    // Perfil público do corretor
    pub photo_url: Option<String>,
    pub bio: Option<String>,
    pub specialties: Vec<String>,
    pub languages: Vec<String>,
    pub experience_years: Option<i32>,
    pub company: Option<String>,
    pub website: Option<String>,
    #[schema(value_type = Object)]
    pub social_media: serde_json::Value,

    // Estatísticas
    pub total_sales: i32,
    pub total_listings: i32,
    pub average_price: Option<Decimal>,
    pub rating: Option<Decimal>,
    pub review_count: i32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Administradores têm todas as permissões.
    pub fn has_permission(&self, slug: &str) -> bool {
        self.role == UserRole::Admin || self.permissions.iter().any(|p| p == slug)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BrokerStats {
    pub total_sales: i32,
    pub total_listings: i32,
    pub average_price: Option<Decimal>,
    pub rating: Option<Decimal>,
    pub review_count: i32,
}

/// Perfil público do corretor (sem dados internos).
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BrokerPublicProfile {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub creci: Option<String>,
    pub photo_url: Option<String>,
    pub bio: Option<String>,
    pub specialties: Vec<String>,
    pub languages: Vec<String>,
    pub experience_years: Option<i32>,
    pub company: Option<String>,
    pub website: Option<String>,
    #[schema(value_type = Object)]
    pub social_media: serde_json::Value,
    pub stats: BrokerStats,
}

impl From<User> for BrokerPublicProfile {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            tenant_id: u.tenant_id,
            name: u.name,
            email: u.email,
            phone: u.phone,
            creci: u.creci,
            photo_url: u.photo_url,
            bio: u.bio,
            specialties: u.specialties,
            languages: u.languages,
            experience_years: u.experience_years,
            company: u.company,
            website: u.website,
            social_media: u.social_media,
            stats: BrokerStats {
                total_sales: u.total_sales,
                total_listings: u.total_listings,
                average_price: u.average_price,
                rating: u.rating,
                review_count: u.review_count,
            },
        }
    }
}

// ---
// Payloads
// ---

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateUserPayload {
    #[validate(length(min = 1, max = 200, message = "required"))]
    pub name: String,
    #[validate(email(message = "invalid_email"))]
    pub email: String,
    #[validate(length(min = 8, message = "password_min_8"))]
    pub password: String,
    pub role: UserRole,
    pub phone: Option<String>,
    pub document: Option<String>,
    pub document_type: Option<DocumentType>,
    pub creci: Option<String>,
    /// Padrão por cargo quando ausente
    pub permissions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUserPayload {
    #[validate(length(min = 1, max = 200, message = "required"))]
    pub name: Option<String>,
    pub phone: Option<String>,
    pub document: Option<String>,
    pub document_type: Option<DocumentType>,
    pub creci: Option<String>,
    pub role: Option<UserRole>,
    /// Substitui o conjunto inteiro
    pub permissions: Option<Vec<String>>,
    #[validate(url(message = "invalid_url"))]
    pub photo_url: Option<String>,
    pub bio: Option<String>,
    pub specialties: Option<Vec<String>>,
    pub languages: Option<Vec<String>>,
    pub experience_years: Option<i32>,
    pub company: Option<String>,
    #[validate(url(message = "invalid_url"))]
    pub website: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub social_media: Option<serde_json::Value>,
}

/// Dados prontos para inserção (senha já com hash).
#[derive(Debug, Clone)]
pub struct NewUser {
    pub tenant_id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub document: Option<String>,
    pub document_type: Option<DocumentType>,
    pub creci: Option<String>,
    pub role: UserRole,
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserListQuery {
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: UserRole, perms: &[&str]) -> User {
        User {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            name: "Teste".into(),
            email: "t@example.com".into(),
            password_hash: String::new(),
            phone: None,
            document: None,
            document_type: None,
            creci: None,
            role,
            is_active: true,
            permissions: perms.iter().map(|p| p.to_string()).collect(),
            photo_url: None,
            bio: None,
            specialties: vec![],
            languages: vec![],
            experience_years: None,
            company: None,
            website: None,
            social_media: serde_json::json!({}),
            total_sales: 0,
            total_listings: 0,
            average_price: None,
            rating: None,
            review_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn admin_has_every_permission() {
        let admin = user(UserRole::Admin, &[]);
        assert!(admin.has_permission(permissions::SETTINGS_EDIT));
        assert!(admin.has_permission("anything.else"));
    }

    #[test]
    fn other_roles_need_explicit_grant() {
        let broker = user(UserRole::Broker, &[permissions::LEADS_VIEW]);
        assert!(broker.has_permission(permissions::LEADS_VIEW));
        assert!(!broker.has_permission(permissions::PROPERTIES_DELETE));
    }

    #[test]
    fn default_permissions_by_role() {
        assert_eq!(permissions::defaults_for(UserRole::BrokerAdmin).len(), permissions::ALL.len());
        let manager = permissions::defaults_for(UserRole::Manager);
        assert!(!manager.contains(&permissions::SETTINGS_EDIT.to_string()));
        assert!(!manager.contains(&permissions::USERS_CREATE.to_string()));
        assert!(manager.contains(&permissions::USERS_EDIT.to_string()));
        let broker = permissions::defaults_for(UserRole::Broker);
        assert_eq!(broker.len(), 4);
    }

    #[test]
    fn password_hash_never_serialized() {
        let mut u = user(UserRole::Broker, &[]);
        u.password_hash = "secret-hash".into();
        let json = serde_json::to_string(&u).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(!json.contains("password_hash"));
    }
}
