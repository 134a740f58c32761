// src/handlers/properties.rs

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
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
        rbac::{PermPropertiesCreate, PermPropertiesDelete, PermPropertiesEditAll, RequirePermission},
        tenancy::TenantContext,
    },
    models::property::{
        CreatePropertyPayload, Property, PropertyListQuery, PropertyStatusPayload, PropertyVisibilityPayload,
        PublicProperty, PublicPropertyQuery, UpdatePropertyPayload,
    },
};

// =============================================================================
//  ÁREA 1: ADMIN DO TENANT
// =============================================================================

// GET /api/v1/admin/{tenant_id}/properties
#[utoipa::path(
    get,
    path = "/api/v1/admin/{tenant_id}/properties",
    tag = "Properties",
    params(("tenant_id" = Uuid, Path, description = "ID do tenant"), PropertyListQuery),
    responses(
        (status = 200, description = "Imóveis do tenant", body = Page<Property>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_properties(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Query(query): Query<PropertyListQuery>,
) -> Result<Json<Page<Property>>, ApiError> {
    let properties = app_state
        .property_service
        .list(tenant.id(), &query)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let pagination = Pagination { limit: query.limit, offset: query.offset };
    Ok(Json(Page::new(properties, &pagination)))
}

// POST /api/v1/admin/{tenant_id}/properties
#[utoipa::path(
    post,
    path = "/api/v1/admin/{tenant_id}/properties",
    tag = "Properties",
    params(("tenant_id" = Uuid, Path, description = "ID do tenant")),
    request_body = CreatePropertyPayload,
    responses(
        (status = 201, description = "Imóvel criado", body = Property),
        (status = 400, description = "Dados inválidos"),
        (status = 404, description = "Proprietário ou corretor fora do tenant"),
        (status = 409, description = "Slug ocupado por um cadastro simultâneo")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_property(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermPropertiesCreate>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<CreatePropertyPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let property = app_state
        .property_service
        .create(tenant.id(), payload, user.id())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(property)))
}

// GET /api/v1/admin/{tenant_id}/properties/{id}
#[utoipa::path(
    get,
    path = "/api/v1/admin/{tenant_id}/properties/{id}",
    tag = "Properties",
    params(
        ("tenant_id" = Uuid, Path, description = "ID do tenant"),
        ("id" = Uuid, Path, description = "ID do imóvel")
    ),
    responses(
        (status = 200, description = "Imóvel", body = Property),
        (status = 404, description = "Imóvel não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_property(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path((_tenant_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Property>, ApiError> {
    let property = app_state
        .property_service
        .get(tenant.id(), id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(property))
}

// PUT /api/v1/admin/{tenant_id}/properties/{id}
#[utoipa::path(
    put,
    path = "/api/v1/admin/{tenant_id}/properties/{id}",
    tag = "Properties",
    params(
        ("tenant_id" = Uuid, Path, description = "ID do tenant"),
        ("id" = Uuid, Path, description = "ID do imóvel")
    ),
    request_body = UpdatePropertyPayload,
    responses(
        (status = 200, description = "Imóvel atualizado", body = Property),
        (status = 400, description = "Dados inválidos"),
        (status = 404, description = "Imóvel, proprietário ou corretor não encontrado no tenant")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_property(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermPropertiesEditAll>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path((_tenant_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdatePropertyPayload>,
) -> Result<Json<Property>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let property = app_state
        .property_service
        .update(tenant.id(), id, payload, user.id())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(property))
}

// DELETE /api/v1/admin/{tenant_id}/properties/{id}
#[utoipa::path(
    delete,
    path = "/api/v1/admin/{tenant_id}/properties/{id}",
    tag = "Properties",
    params(
        ("tenant_id" = Uuid, Path, description = "ID do tenant"),
        ("id" = Uuid, Path, description = "ID do imóvel")
    ),
    responses(
        (status = 204, description = "Imóvel excluído"),
        (status = 404, description = "Imóvel não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_property(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermPropertiesDelete>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path((_tenant_id, id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    app_state
        .property_service
        .delete(tenant.id(), id, user.id())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// PATCH /api/v1/admin/{tenant_id}/properties/{id}/status
#[utoipa::path(
    patch,
    path = "/api/v1/admin/{tenant_id}/properties/{id}/status",
    tag = "Properties",
    params(
        ("tenant_id" = Uuid, Path, description = "ID do tenant"),
        ("id" = Uuid, Path, description = "ID do imóvel")
    ),
    request_body = PropertyStatusPayload,
    responses(
        (status = 200, description = "Status alterado", body = Property),
        (status = 404, description = "Imóvel não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn set_property_status(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermPropertiesEditAll>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path((_tenant_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<PropertyStatusPayload>,
) -> Result<Json<Property>, ApiError> {
    let property = app_state
        .property_service
        .set_status(tenant.id(), id, payload.status, user.id())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(property))
}

// PATCH /api/v1/admin/{tenant_id}/properties/{id}/visibility
#[utoipa::path(
    patch,
    path = "/api/v1/admin/{tenant_id}/properties/{id}/visibility",
    tag = "Properties",
    params(
        ("tenant_id" = Uuid, Path, description = "ID do tenant"),
        ("id" = Uuid, Path, description = "ID do imóvel")
    ),
    request_body = PropertyVisibilityPayload,
    responses(
        (status = 200, description = "Visibilidade alterada", body = Property),
        (status = 404, description = "Imóvel não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn set_property_visibility(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermPropertiesEditAll>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path((_tenant_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<PropertyVisibilityPayload>,
) -> Result<Json<Property>, ApiError> {
    let property = app_state
        .property_service
        .set_visibility(tenant.id(), id, payload.visibility, user.id())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(property))
}

// GET /api/v1/admin/{tenant_id}/properties/{id}/brochure
#[utoipa::path(
    get,
    path = "/api/v1/admin/{tenant_id}/properties/{id}/brochure",
    tag = "Properties",
    params(
        ("tenant_id" = Uuid, Path, description = "ID do tenant"),
        ("id" = Uuid, Path, description = "ID do imóvel")
    ),
    responses(
        (status = 200, description = "Ficha do imóvel em PDF", content_type = "application/pdf"),
        (status = 404, description = "Imóvel não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn property_brochure(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path((_tenant_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Response, ApiError> {
    let property = app_state
        .property_service
        .get(tenant.id(), id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let pdf_bytes = app_state
        .document_service
        .property_brochure(tenant.id(), &property)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    // O navegador baixa (ou exibe) o PDF
    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"imovel_{}.pdf\"", property.slug),
        ),
    ];

    Ok((headers, pdf_bytes).into_response())
}

// =============================================================================
//  ÁREA 2: VITRINE PÚBLICA
// =============================================================================

// GET /api/v1/public/properties
#[utoipa::path(
    get,
    path = "/api/v1/public/properties",
    tag = "Public",
    params(PublicPropertyQuery),
    responses(
        (status = 200, description = "Imóveis públicos disponíveis", body = Page<PublicProperty>)
    )
)]
pub async fn list_public_properties(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<PublicPropertyQuery>,
) -> Result<Json<Page<PublicProperty>>, ApiError> {
    let properties = app_state
        .property_service
        .list_public(&query)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let pagination = Pagination { limit: query.limit, offset: query.offset };
    Ok(Json(Page::new(properties, &pagination)))
}

// GET /api/v1/public/properties/{id}
#[utoipa::path(
    get,
    path = "/api/v1/public/properties/{id}",
    tag = "Public",
    params(("id" = Uuid, Path, description = "ID do imóvel")),
    responses(
        (status = 200, description = "Imóvel público", body = PublicProperty),
        (status = 404, description = "Public property not found")
    )
)]
pub async fn get_public_property(
    State(app_state): State<AppState>,
    locale: Locale,
    viewer: Option<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<PublicProperty>, ApiError> {
    let property = app_state
        .property_service
        .get_public(id, viewer.as_ref())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(property))
}
