// src/models/auth.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::validators::{validate_password_strength, validate_phone},
    models::{
        tenancy::{BusinessType, Tenant, TenantType},
        user::{User, UserRole},
    },
};

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,       // ID do usuário
    pub tenant_id: Uuid,
    pub role: UserRole,
    pub exp: usize,
    pub iat: usize,
}

// ---
// Cadastro (signup): cria o tenant e o primeiro usuário
// ---
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SignupPayload {
    pub tenant_type: TenantType,
    #[validate(length(min = 1, max = 255, message = "required"))]
    #[schema(example = "Imobiliária Central")]
    pub tenant_name: String,
    /// CPF (pf) ou CNPJ (pj)
    #[validate(length(min = 11, message = "required"))]
    pub document: String,
    pub business_type: Option<BusinessType>,
    #[schema(example = "12345-J")]
    pub tenant_creci: Option<String>,

    #[validate(length(min = 1, max = 200, message = "required"))]
    pub name: String,
    #[validate(email(message = "invalid_email"))]
    pub email: String,
    #[validate(custom(function = "validate_password_strength"))]
    pub password: String,
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
    #[serde(default)]
    pub is_user_broker: bool,
    #[schema(example = "54321-F")]
    pub user_creci: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SignupUser {
    pub uid: Uuid,
    pub email: String,
    pub name: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SignupResponse {
    pub tenant_id: Uuid,
    pub broker_id: Uuid,
    pub token: String,
    pub user: SignupUser,
}

// ---
// Login
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginPayload {
    #[validate(email(message = "invalid_email"))]
    pub email: String,
    #[validate(length(min = 1, message = "required"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BrokerSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
}

impl From<&User> for BrokerSummary {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            name: u.name.clone(),
            email: u.email.clone(),
            role: u.role,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub tenant_id: Uuid,
    pub is_platform_admin: bool,
    pub broker: BrokerSummary,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    pub user: User,
    pub tenant: Tenant,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> SignupPayload {
        SignupPayload {
            tenant_type: TenantType::Pf,
            tenant_name: "João Corretor".into(),
            document: "529.982.247-25".into(),
            business_type: None,
            tenant_creci: Some("12345-F".into()),
            name: "João".into(),
            email: "joao@example.com".into(),
            password: "Senha1".into(),
            phone: "(11) 98765-4321".into(),
            is_user_broker: true,
            user_creci: None,
        }
    }

    #[test]
    fn valid_signup_passes() {
        assert!(payload().validate().is_ok());
    }

    #[test]
    fn weak_password_fails() {
        let mut p = payload();
        p.password = "senhafraca".into();
        let errors = p.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password"));
    }

    #[test]
    fn bad_phone_fails() {
        let mut p = payload();
        p.phone = "123".into();
        assert!(p.validate().is_err());
    }
}
