// src/handlers/confirmations.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermPropertiesEditAll, RequirePermission},
        tenancy::TenantContext,
    },
    models::owner_confirmation::{
        ConfirmationLink, ConfirmationPage, CreateConfirmationPayload, SubmitConfirmationPayload,
    },
};

// POST /api/v1/admin/{tenant_id}/properties/{id}/confirmation-links
#[utoipa::path(
    post,
    path = "/api/v1/admin/{tenant_id}/properties/{id}/confirmation-links",
    tag = "Owner confirmation",
    params(
        ("tenant_id" = Uuid, Path, description = "ID do tenant"),
        ("id" = Uuid, Path, description = "ID do imóvel")
    ),
    request_body = CreateConfirmationPayload,
    responses(
        (status = 201, description = "Link gerado; o token só aparece nesta resposta", body = ConfirmationLink),
        (status = 404, description = "Imóvel não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_confirmation_link(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermPropertiesEditAll>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path((_tenant_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<CreateConfirmationPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let link = app_state
        .owner_confirmation_service
        .create_link(tenant.id(), id, payload, user.id())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(link)))
}

// GET /api/v1/owner-confirmations/{token}
#[utoipa::path(
    get,
    path = "/api/v1/owner-confirmations/{token}",
    tag = "Owner confirmation",
    params(("token" = String, Path, description = "Token do link de confirmação")),
    responses(
        (status = 200, description = "Dados do imóvel a confirmar", body = ConfirmationPage),
        (status = 404, description = "Link não encontrado"),
        (status = 409, description = "Link já utilizado"),
        (status = 410, description = "Link expirado")
    )
)]
pub async fn get_confirmation(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(token): Path<String>,
) -> Result<Json<ConfirmationPage>, ApiError> {
    let page = app_state
        .owner_confirmation_service
        .page(&token)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(page))
}

// POST /api/v1/owner-confirmations/{token}/submit
#[utoipa::path(
    post,
    path = "/api/v1/owner-confirmations/{token}/submit",
    tag = "Owner confirmation",
    params(("token" = String, Path, description = "Token do link de confirmação")),
    request_body = SubmitConfirmationPayload,
    responses(
        (status = 200, description = "Resposta registrada", body = ConfirmationPage),
        (status = 400, description = "Preço ausente ou inválido"),
        (status = 404, description = "Link não encontrado"),
        (status = 409, description = "Link já utilizado"),
        (status = 410, description = "Link expirado")
    )
)]
pub async fn submit_confirmation(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(token): Path<String>,
    Json(payload): Json<SubmitConfirmationPayload>,
) -> Result<Json<ConfirmationPage>, ApiError> {
    let page = app_state
        .owner_confirmation_service
        .submit(&token, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(page))
}
