// src/handlers/leads.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError},
        pagination::{Page, Pagination},
    },
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rate_limit::ClientIp,
        rbac::{PermLeadsEdit, PermLeadsView, RequirePermission},
        tenancy::TenantContext,
    },
    models::{
        lead::{
            CreateLeadPayload, Lead, LeadListQuery, LeadStatusPayload, PublicFormLeadPayload, PublicLeadResponse,
            PublicWhatsAppLeadPayload, WhatsAppLeadResponse,
        },
        owner::AnonymizePayload,
    },
};

// =============================================================================
//  ÁREA 1: ADMIN DO TENANT
// =============================================================================

// GET /api/v1/admin/{tenant_id}/leads
#[utoipa::path(
    get,
    path = "/api/v1/admin/{tenant_id}/leads",
    tag = "Leads",
    params(("tenant_id" = Uuid, Path, description = "ID do tenant"), LeadListQuery),
    responses(
        (status = 200, description = "Leads do tenant", body = Page<Lead>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_leads(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermLeadsView>,
    tenant: TenantContext,
    Query(query): Query<LeadListQuery>,
) -> Result<Json<Page<Lead>>, ApiError> {
    let leads = app_state
        .lead_service
        .list(tenant.id(), &query)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let pagination = Pagination { limit: query.limit, offset: query.offset };
    Ok(Json(Page::new(leads, &pagination)))
}

// POST /api/v1/admin/{tenant_id}/leads
#[utoipa::path(
    post,
    path = "/api/v1/admin/{tenant_id}/leads",
    tag = "Leads",
    params(("tenant_id" = Uuid, Path, description = "ID do tenant")),
    request_body = CreateLeadPayload,
    responses(
        (status = 201, description = "Lead criado", body = Lead),
        (status = 400, description = "Dados inválidos ou sem consentimento"),
        (status = 404, description = "Imóvel não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_lead(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermLeadsEdit>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<CreateLeadPayload>,
) -> Result<impl IntoResponse, ApiError> {
    if !payload.consent_given {
        return Err(AppError::ConsentRequired.to_api_error(&locale, &app_state.i18n_store));
    }
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let lead = app_state
        .lead_service
        .create(tenant.id(), payload, user.id())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(lead)))
}

// GET /api/v1/admin/{tenant_id}/leads/pending-anonymization
#[utoipa::path(
    get,
    path = "/api/v1/admin/{tenant_id}/leads/pending-anonymization",
    tag = "Leads",
    params(("tenant_id" = Uuid, Path, description = "ID do tenant")),
    responses(
        (status = 200, description = "Leads com consentimento revogado e ainda não anonimizados", body = Vec<Lead>)
    ),
    security(("api_jwt" = []))
)]
pub async fn pending_anonymization(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermLeadsView>,
    tenant: TenantContext,
) -> Result<Json<Vec<Lead>>, ApiError> {
    let leads = app_state
        .lead_service
        .pending_anonymization(tenant.id())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(leads))
}

// GET /api/v1/admin/{tenant_id}/leads/{id}
#[utoipa::path(
    get,
    path = "/api/v1/admin/{tenant_id}/leads/{id}",
    tag = "Leads",
    params(
        ("tenant_id" = Uuid, Path, description = "ID do tenant"),
        ("id" = Uuid, Path, description = "ID do lead")
    ),
    responses(
        (status = 200, description = "Lead", body = Lead),
        (status = 404, description = "Lead não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_lead(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermLeadsView>,
    tenant: TenantContext,
    Path((_tenant_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Lead>, ApiError> {
    let lead = app_state
        .lead_service
        .get(tenant.id(), id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(lead))
}

// PUT /api/v1/admin/{tenant_id}/leads/{id}/status
#[utoipa::path(
    put,
    path = "/api/v1/admin/{tenant_id}/leads/{id}/status",
    tag = "Leads",
    params(
        ("tenant_id" = Uuid, Path, description = "ID do tenant"),
        ("id" = Uuid, Path, description = "ID do lead")
    ),
    request_body = LeadStatusPayload,
    responses(
        (status = 200, description = "Status atualizado", body = Lead),
        (status = 400, description = "Transição inválida no funil"),
        (status = 404, description = "Lead não encontrado"),
        (status = 409, description = "Status alterado por outra requisição")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_lead_status(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermLeadsEdit>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path((_tenant_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<LeadStatusPayload>,
) -> Result<Json<Lead>, ApiError> {
    let lead = app_state
        .lead_service
        .update_status(tenant.id(), id, payload.status, user.id())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(lead))
}

// POST /api/v1/admin/{tenant_id}/leads/{id}/revoke-consent
#[utoipa::path(
    post,
    path = "/api/v1/admin/{tenant_id}/leads/{id}/revoke-consent",
    tag = "Leads",
    params(
        ("tenant_id" = Uuid, Path, description = "ID do tenant"),
        ("id" = Uuid, Path, description = "ID do lead")
    ),
    responses(
        (status = 200, description = "Consentimento revogado", body = Lead),
        (status = 404, description = "Lead não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn revoke_consent(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermLeadsEdit>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path((_tenant_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Lead>, ApiError> {
    let lead = app_state
        .lead_service
        .revoke_consent(tenant.id(), id, user.id())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(lead))
}

// POST /api/v1/admin/{tenant_id}/leads/{id}/anonymize
#[utoipa::path(
    post,
    path = "/api/v1/admin/{tenant_id}/leads/{id}/anonymize",
    tag = "Leads",
    params(
        ("tenant_id" = Uuid, Path, description = "ID do tenant"),
        ("id" = Uuid, Path, description = "ID do lead")
    ),
    request_body = AnonymizePayload,
    responses(
        (status = 200, description = "Lead anonimizado", body = Lead),
        (status = 404, description = "Lead não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn anonymize_lead(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermLeadsEdit>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path((_tenant_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<AnonymizePayload>,
) -> Result<Json<Lead>, ApiError> {
    let lead = app_state
        .lead_service
        .anonymize(tenant.id(), id, payload.reason.as_deref(), user.id())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(lead))
}

// =============================================================================
//  ÁREA 2: CAPTAÇÃO PÚBLICA
// =============================================================================

// POST /api/v1/public/properties/{id}/leads/form
#[utoipa::path(
    post,
    path = "/api/v1/public/properties/{id}/leads/form",
    tag = "Public",
    params(("id" = Uuid, Path, description = "ID do imóvel")),
    request_body = PublicFormLeadPayload,
    responses(
        (status = 201, description = "Lead registrado", body = PublicLeadResponse),
        (status = 400, description = "Sem consentimento ou sem contato"),
        (status = 404, description = "Public property not found"),
        (status = 429, description = "Muitas requisições")
    )
)]
pub async fn public_form_lead(
    State(app_state): State<AppState>,
    locale: Locale,
    client_ip: ClientIp,
    Path(property_id): Path<Uuid>,
    Json(payload): Json<PublicFormLeadPayload>,
) -> Result<impl IntoResponse, ApiError> {
    // Consentimento vem antes de qualquer outra validação.
    if !payload.consent_given {
        return Err(AppError::ConsentRequired.to_api_error(&locale, &app_state.i18n_store));
    }
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let response = app_state
        .lead_service
        .public_form(property_id, payload, client_ip.to_string_opt())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(response)))
}

// POST /api/v1/public/properties/{id}/leads/whatsapp
#[utoipa::path(
    post,
    path = "/api/v1/public/properties/{id}/leads/whatsapp",
    tag = "Public",
    params(("id" = Uuid, Path, description = "ID do imóvel")),
    request_body = PublicWhatsAppLeadPayload,
    responses(
        (status = 201, description = "Lead registrado com link do WhatsApp", body = WhatsAppLeadResponse),
        (status = 404, description = "Public property not found"),
        (status = 429, description = "Muitas requisições")
    )
)]
pub async fn public_whatsapp_lead(
    State(app_state): State<AppState>,
    locale: Locale,
    client_ip: ClientIp,
    Path(property_id): Path<Uuid>,
    Json(payload): Json<PublicWhatsAppLeadPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let response = app_state
        .lead_service
        .public_whatsapp(property_id, payload, client_ip.to_string_opt())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(response)))
}
