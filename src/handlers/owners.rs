// src/handlers/owners.rs

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
        rbac::{PermPropertiesCreate, PermPropertiesDelete, PermPropertiesEditAll, PermPropertiesViewAll, RequirePermission},
        tenancy::TenantContext,
    },
    models::owner::{AnonymizePayload, CreateOwnerPayload, Owner, OwnerListQuery, UpdateOwnerPayload},
};

// GET /api/v1/admin/{tenant_id}/owners
#[utoipa::path(
    get,
    path = "/api/v1/admin/{tenant_id}/owners",
    tag = "Owners",
    params(("tenant_id" = Uuid, Path, description = "ID do tenant"), OwnerListQuery),
    responses(
        (status = 200, description = "Proprietários do tenant", body = Page<Owner>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_owners(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermPropertiesViewAll>,
    tenant: TenantContext,
    Query(query): Query<OwnerListQuery>,
) -> Result<Json<Page<Owner>>, ApiError> {
    let owners = app_state
        .owner_service
        .list(tenant.id(), &query)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let pagination = Pagination { limit: query.limit, offset: query.offset };
    Ok(Json(Page::new(owners, &pagination)))
}

// POST /api/v1/admin/{tenant_id}/owners
#[utoipa::path(
    post,
    path = "/api/v1/admin/{tenant_id}/owners",
    tag = "Owners",
    params(("tenant_id" = Uuid, Path, description = "ID do tenant")),
    request_body = CreateOwnerPayload,
    responses(
        (status = 201, description = "Proprietário criado", body = Owner),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_owner(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermPropertiesCreate>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<CreateOwnerPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let owner = app_state
        .owner_service
        .create(tenant.id(), payload, user.id())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(owner)))
}

// GET /api/v1/admin/{tenant_id}/owners/{id}
#[utoipa::path(
    get,
    path = "/api/v1/admin/{tenant_id}/owners/{id}",
    tag = "Owners",
    params(
        ("tenant_id" = Uuid, Path, description = "ID do tenant"),
        ("id" = Uuid, Path, description = "ID do proprietário")
    ),
    responses(
        (status = 200, description = "Proprietário", body = Owner),
        (status = 404, description = "Proprietário não encontrado"),
        (status = 410, description = "Dados anonimizados")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_owner(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermPropertiesViewAll>,
    tenant: TenantContext,
    Path((_tenant_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Owner>, ApiError> {
    let owner = app_state
        .owner_service
        .get(tenant.id(), id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(owner))
}

// PUT /api/v1/admin/{tenant_id}/owners/{id}
#[utoipa::path(
    put,
    path = "/api/v1/admin/{tenant_id}/owners/{id}",
    tag = "Owners",
    params(
        ("tenant_id" = Uuid, Path, description = "ID do tenant"),
        ("id" = Uuid, Path, description = "ID do proprietário")
    ),
    request_body = UpdateOwnerPayload,
    responses(
        (status = 200, description = "Proprietário atualizado", body = Owner),
        (status = 400, description = "Dados inválidos"),
        (status = 404, description = "Proprietário não encontrado"),
        (status = 410, description = "Dados anonimizados")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_owner(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermPropertiesEditAll>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path((_tenant_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateOwnerPayload>,
) -> Result<Json<Owner>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let owner = app_state
        .owner_service
        .update(tenant.id(), id, payload, user.id())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(owner))
}

// DELETE /api/v1/admin/{tenant_id}/owners/{id}
#[utoipa::path(
    delete,
    path = "/api/v1/admin/{tenant_id}/owners/{id}",
    tag = "Owners",
    params(
        ("tenant_id" = Uuid, Path, description = "ID do tenant"),
        ("id" = Uuid, Path, description = "ID do proprietário")
    ),
    responses(
        (status = 204, description = "Proprietário excluído"),
        (status = 404, description = "Proprietário não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_owner(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermPropertiesDelete>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path((_tenant_id, id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    app_state
        .owner_service
        .delete(tenant.id(), id, user.id())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// POST /api/v1/admin/{tenant_id}/owners/{id}/revoke-consent
#[utoipa::path(
    post,
    path = "/api/v1/admin/{tenant_id}/owners/{id}/revoke-consent",
    tag = "Owners",
    params(
        ("tenant_id" = Uuid, Path, description = "ID do tenant"),
        ("id" = Uuid, Path, description = "ID do proprietário")
    ),
    responses(
        (status = 200, description = "Consentimento revogado", body = Owner),
        (status = 404, description = "Proprietário não encontrado"),
        (status = 410, description = "Dados anonimizados")
    ),
    security(("api_jwt" = []))
)]
pub async fn revoke_owner_consent(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermPropertiesEditAll>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path((_tenant_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Owner>, ApiError> {
    let owner = app_state
        .owner_service
        .revoke_consent(tenant.id(), id, user.id())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(owner))
}

// POST /api/v1/admin/{tenant_id}/owners/{id}/anonymize
#[utoipa::path(
    post,
    path = "/api/v1/admin/{tenant_id}/owners/{id}/anonymize",
    tag = "Owners",
    params(
        ("tenant_id" = Uuid, Path, description = "ID do tenant"),
        ("id" = Uuid, Path, description = "ID do proprietário")
    ),
    request_body = AnonymizePayload,
    responses(
        (status = 200, description = "Proprietário anonimizado", body = Owner),
        (status = 404, description = "Proprietário não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn anonymize_owner(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermPropertiesEditAll>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path((_tenant_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<AnonymizePayload>,
) -> Result<Json<Owner>, ApiError> {
    let owner = app_state
        .owner_service
        .anonymize(tenant.id(), id, payload.reason.as_deref(), user.id())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(owner))
}
