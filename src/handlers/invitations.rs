// src/handlers/invitations.rs

use axum::{
    extract::{Path, Query, State},
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
        rbac::{PermUsersCreate, PermUsersView, RequirePermission},
        tenancy::TenantContext,
    },
    models::invitation::{
        AcceptInvitationPayload, AcceptInvitationResponse, Invitation, InvitationList, InvitationListQuery,
        InviteUserPayload, VerifyInvitationResponse,
    },
};

// POST /api/v1/admin/{tenant_id}/users/invite
#[utoipa::path(
    post,
    path = "/api/v1/admin/{tenant_id}/users/invite",
    tag = "Invitations",
    params(("tenant_id" = Uuid, Path, description = "ID do tenant")),
    request_body = InviteUserPayload,
    responses(
        (status = 201, description = "Convite criado e enviado", body = Invitation),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "Usuário já existe ou convite pendente")
    ),
    security(("api_jwt" = []))
)]
pub async fn invite_user(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermUsersCreate>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<InviteUserPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let invitation = app_state
        .invitation_service
        .invite(tenant.id(), payload, user.id())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(invitation)))
}

// GET /api/v1/admin/{tenant_id}/users/invitations
#[utoipa::path(
    get,
    path = "/api/v1/admin/{tenant_id}/users/invitations",
    tag = "Invitations",
    params(("tenant_id" = Uuid, Path, description = "ID do tenant"), InvitationListQuery),
    responses(
        (status = 200, description = "Convites do tenant", body = InvitationList)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_invitations(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermUsersView>,
    tenant: TenantContext,
    Query(query): Query<InvitationListQuery>,
) -> Result<Json<InvitationList>, ApiError> {
    let list = app_state
        .invitation_service
        .list(tenant.id(), query.status)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(list))
}

// DELETE /api/v1/admin/{tenant_id}/users/invitations/{id}
#[utoipa::path(
    delete,
    path = "/api/v1/admin/{tenant_id}/users/invitations/{id}",
    tag = "Invitations",
    params(
        ("tenant_id" = Uuid, Path, description = "ID do tenant"),
        ("id" = Uuid, Path, description = "ID do convite")
    ),
    responses(
        (status = 204, description = "Convite cancelado"),
        (status = 400, description = "Convite não está pendente"),
        (status = 404, description = "Convite não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn cancel_invitation(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermUsersCreate>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path((_tenant_id, id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    app_state
        .invitation_service
        .cancel(tenant.id(), id, user.id())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// GET /api/v1/invitations/{token}/verify
#[utoipa::path(
    get,
    path = "/api/v1/invitations/{token}/verify",
    tag = "Invitations",
    params(("token" = String, Path, description = "Token do convite")),
    responses(
        (status = 200, description = "Situação do convite", body = VerifyInvitationResponse)
    )
)]
pub async fn verify_invitation(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(token): Path<String>,
) -> Result<Json<VerifyInvitationResponse>, ApiError> {
    let response = app_state
        .invitation_service
        .verify(&token)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(response))
}

// POST /api/v1/invitations/{token}/accept
#[utoipa::path(
    post,
    path = "/api/v1/invitations/{token}/accept",
    tag = "Invitations",
    params(("token" = String, Path, description = "Token do convite")),
    request_body = AcceptInvitationPayload,
    responses(
        (status = 201, description = "Conta criada a partir do convite", body = AcceptInvitationResponse),
        (status = 400, description = "Convite expirado ou não pendente"),
        (status = 404, description = "Token desconhecido")
    )
)]
pub async fn accept_invitation(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(token): Path<String>,
    Json(payload): Json<AcceptInvitationPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let response = app_state
        .invitation_service
        .accept(&token, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(response)))
}
