// src/handlers/tenants.rs

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
        rbac::{PermSettingsEdit, PermSettingsView, RequirePermission},
        tenancy::TenantContext,
    },
    models::tenancy::{CreateTenantPayload, PublicTenant, Tenant, TenantListQuery, UpdateTenantPayload},
};

// =============================================================================
//  PLATAFORMA: GESTÃO DE TENANTS
// =============================================================================

// GET /api/v1/platform/tenants
#[utoipa::path(
    get,
    path = "/api/v1/platform/tenants",
    tag = "Platform",
    params(TenantListQuery),
    responses(
        (status = 200, description = "Lista de tenants", body = Page<Tenant>),
        (status = 403, description = "Somente administradores da plataforma")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_tenants(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<TenantListQuery>,
) -> Result<Json<Page<Tenant>>, ApiError> {
    let tenants = app_state
        .tenancy_service
        .list(&query)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let pagination = Pagination { limit: query.limit, offset: query.offset };
    Ok(Json(Page::new(tenants, &pagination)))
}

// POST /api/v1/platform/tenants
#[utoipa::path(
    post,
    path = "/api/v1/platform/tenants",
    tag = "Platform",
    request_body = CreateTenantPayload,
    responses(
        (status = 201, description = "Tenant criado", body = Tenant),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "Slug já em uso")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_tenant(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Json(payload): Json<CreateTenantPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let tenant = app_state
        .tenancy_service
        .create(payload, user.id())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(tenant)))
}

// GET /api/v1/platform/tenants/{id}
#[utoipa::path(
    get,
    path = "/api/v1/platform/tenants/{id}",
    tag = "Platform",
    params(("id" = Uuid, Path, description = "ID do tenant")),
    responses(
        (status = 200, description = "Tenant", body = Tenant),
        (status = 404, description = "Tenant não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_tenant(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
) -> Result<Json<Tenant>, ApiError> {
    let tenant = app_state
        .tenancy_service
        .get(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(tenant))
}

// PUT /api/v1/platform/tenants/{id}
#[utoipa::path(
    put,
    path = "/api/v1/platform/tenants/{id}",
    tag = "Platform",
    params(("id" = Uuid, Path, description = "ID do tenant")),
    request_body = UpdateTenantPayload,
    responses(
        (status = 200, description = "Tenant atualizado", body = Tenant),
        (status = 404, description = "Tenant não encontrado"),
        (status = 409, description = "Slug já em uso")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_tenant(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTenantPayload>,
) -> Result<Json<Tenant>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let tenant = app_state
        .tenancy_service
        .update(id, payload, user.id())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(tenant))
}

// DELETE /api/v1/platform/tenants/{id}
#[utoipa::path(
    delete,
    path = "/api/v1/platform/tenants/{id}",
    tag = "Platform",
    params(("id" = Uuid, Path, description = "ID do tenant")),
    responses(
        (status = 204, description = "Tenant excluído com todos os dados"),
        (status = 403, description = "O tenant da plataforma não pode ser excluído"),
        (status = 404, description = "Tenant não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_tenant(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    app_state
        .tenancy_service
        .delete(id, user.id())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// POST /api/v1/platform/tenants/{id}/activate
#[utoipa::path(
    post,
    path = "/api/v1/platform/tenants/{id}/activate",
    tag = "Platform",
    params(("id" = Uuid, Path, description = "ID do tenant")),
    responses(
        (status = 200, description = "Tenant ativado", body = Tenant),
        (status = 404, description = "Tenant não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn activate_tenant(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Tenant>, ApiError> {
    let tenant = app_state
        .tenancy_service
        .set_active(id, true, user.id())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(tenant))
}

// POST /api/v1/platform/tenants/{id}/deactivate
#[utoipa::path(
    post,
    path = "/api/v1/platform/tenants/{id}/deactivate",
    tag = "Platform",
    params(("id" = Uuid, Path, description = "ID do tenant")),
    responses(
        (status = 200, description = "Tenant desativado", body = Tenant),
        (status = 403, description = "O tenant da plataforma não pode ser desativado"),
        (status = 404, description = "Tenant não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn deactivate_tenant(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Tenant>, ApiError> {
    let tenant = app_state
        .tenancy_service
        .set_active(id, false, user.id())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(tenant))
}

// =============================================================================
//  ADMIN DO TENANT: O PRÓPRIO TENANT
// =============================================================================

// GET /api/v1/admin/{tenant_id}/tenant
#[utoipa::path(
    get,
    path = "/api/v1/admin/{tenant_id}/tenant",
    tag = "Tenant",
    params(("tenant_id" = Uuid, Path, description = "ID do tenant")),
    responses(
        (status = 200, description = "Dados do tenant", body = Tenant),
        (status = 403, description = "Sem acesso ao tenant")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_own_tenant(
    _perm: RequirePermission<PermSettingsView>,
    tenant: TenantContext,
) -> Json<Tenant> {
    Json(tenant.0)
}

// PUT /api/v1/admin/{tenant_id}/tenant
#[utoipa::path(
    put,
    path = "/api/v1/admin/{tenant_id}/tenant",
    tag = "Tenant",
    params(("tenant_id" = Uuid, Path, description = "ID do tenant")),
    request_body = UpdateTenantPayload,
    responses(
        (status = 200, description = "Tenant atualizado (slug e assinatura são ignorados)", body = Tenant),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_own_tenant(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermSettingsEdit>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<UpdateTenantPayload>,
) -> Result<Json<Tenant>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let updated = app_state
        .tenancy_service
        .update_own(tenant.id(), payload, user.id())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(updated))
}

// =============================================================================
//  PÚBLICO
// =============================================================================

// GET /api/v1/public/tenants/{slug}
#[utoipa::path(
    get,
    path = "/api/v1/public/tenants/{slug}",
    tag = "Public",
    params(("slug" = String, Path, description = "Slug do tenant")),
    responses(
        (status = 200, description = "Perfil público do tenant", body = PublicTenant),
        (status = 404, description = "Tenant não encontrado ou inativo")
    )
)]
pub async fn get_public_tenant(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(slug): Path<String>,
) -> Result<Json<PublicTenant>, ApiError> {
    let tenant = app_state
        .tenancy_service
        .get_public_by_slug(&slug)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(tenant))
}
