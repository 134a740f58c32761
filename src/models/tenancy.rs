// src/models/tenancy.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "tenant_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TenantType {
    /// Pessoa física (corretor autônomo)
    Pf,
    /// Pessoa jurídica
    Pj,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "document_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Cpf,
    Cnpj,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "business_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BusinessType {
    CorretorAutonomo,
    Imobiliaria,
    Incorporadora,
    Construtora,
    Loteadora,
}

// ---
// Tenant (a conta: imobiliária, corretor autônomo, incorporadora...)
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Tenant {
    pub id: Uuid,
    #[schema(example = "Imobiliária Central")]
    pub name: String,
    #[schema(example = "imobiliaria-central")]
    pub slug: String,
    pub tenant_type: Option<TenantType>,
    pub document: Option<String>,
    pub document_type: Option<DocumentType>,
    pub business_type: Option<BusinessType>,
    #[schema(example = "12345-J")]
    pub creci: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub street: Option<String>,
    pub number: Option<String>,
    pub complement: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: String,
    #[schema(value_type = Object)]
    pub settings: serde_json::Value,
    pub is_active: bool,
    pub is_platform_admin: bool,
    pub subscription_plan: Option<String>,
    pub subscription_status: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Dados públicos do tenant (site de anúncios).
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PublicTenant {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub creci: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

impl From<Tenant> for PublicTenant {
    fn from(t: Tenant) -> Self {
        Self {
            id: t.id,
            name: t.name,
            slug: t.slug,
            creci: t.creci,
            email: t.email,
            phone: t.phone,
            city: t.city,
            state: t.state,
        }
    }
}

// ---
// Endereço (compartilhado pelos payloads)
// ---
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct AddressPayload {
    pub street: Option<String>,
    pub number: Option<String>,
    pub complement: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    #[validate(length(equal = 2, message = "invalid_value"))]
    pub state: Option<String>,
    pub zip_code: Option<String>,
    #[validate(length(equal = 2, message = "invalid_value"))]
    pub country: Option<String>,
}

// ---
// Payloads
// ---

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateTenantPayload {
    #[validate(length(min = 1, max = 255, message = "required"))]
    #[schema(example = "Imobiliária Central")]
    pub name: String,
    /// Gerado a partir do nome quando ausente
    pub slug: Option<String>,
    pub tenant_type: Option<TenantType>,
    pub document: Option<String>,
    pub document_type: Option<DocumentType>,
    pub business_type: Option<BusinessType>,
    pub creci: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub address: AddressPayload,
    #[schema(value_type = Option<Object>)]
    pub settings: Option<serde_json::Value>,
    #[serde(default)]
    pub is_platform_admin: bool,
    pub subscription_plan: Option<String>,
    pub subscription_status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateTenantPayload {
    #[validate(length(min = 1, max = 255, message = "required"))]
    pub name: Option<String>,
    pub slug: Option<String>,
    pub document: Option<String>,
    pub document_type: Option<DocumentType>,
    pub business_type: Option<BusinessType>,
    pub creci: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[validate(nested)]
    pub address: Option<AddressPayload>,
    #[schema(value_type = Option<Object>)]
    pub settings: Option<serde_json::Value>,
    pub subscription_plan: Option<String>,
    pub subscription_status: Option<String>,
}

/// Campos já validados e normalizados, prontos para o repositório.
#[derive(Debug, Clone, Default)]
pub struct TenantChanges {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub tenant_type: Option<TenantType>,
    pub document: Option<String>,
    pub document_type: Option<DocumentType>,
    pub business_type: Option<BusinessType>,
    pub creci: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: AddressPayload,
    pub settings: Option<serde_json::Value>,
    pub is_platform_admin: bool,
    pub subscription_plan: Option<String>,
    pub subscription_status: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TenantOrder {
    Name,
    Slug,
    #[default]
    CreatedAt,
}

impl TenantOrder {
    pub fn column(self) -> &'static str {
        match self {
            TenantOrder::Name => "name",
            TenantOrder::Slug => "slug",
            TenantOrder::CreatedAt => "created_at",
        }
    }

    /// Valores desconhecidos caem para `created_at`.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("name") => TenantOrder::Name,
            Some("slug") => TenantOrder::Slug,
            _ => TenantOrder::CreatedAt,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TenantListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    /// name | slug | created_at
    pub order_by: Option<String>,
    #[serde(default)]
    pub active_only: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_order_falls_back_to_created_at() {
        assert_eq!(TenantOrder::parse(Some("name")), TenantOrder::Name);
        assert_eq!(TenantOrder::parse(Some("id; DROP TABLE")), TenantOrder::CreatedAt);
        assert_eq!(TenantOrder::parse(None).column(), "created_at");
    }

    #[test]
    fn enums_use_snake_case_on_the_wire() {
        let json = serde_json::to_string(&BusinessType::CorretorAutonomo).unwrap();
        assert_eq!(json, "\"corretor_autonomo\"");
        let parsed: TenantType = serde_json::from_str("\"pj\"").unwrap();
        assert_eq!(parsed, TenantType::Pj);
    }
}
