// src/handlers/users.rs

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
        rbac::{PermBrokersView, PermUsersCreate, PermUsersEdit, PermUsersView, RequirePermission},
        tenancy::TenantContext,
    },
    models::user::{BrokerPublicProfile, CreateUserPayload, UpdateUserPayload, User, UserListQuery},
};

// GET /api/v1/admin/{tenant_id}/users
#[utoipa::path(
    get,
    path = "/api/v1/admin/{tenant_id}/users",
    tag = "Users",
    params(("tenant_id" = Uuid, Path, description = "ID do tenant"), UserListQuery),
    responses(
        (status = 200, description = "Usuários do tenant", body = Page<User>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_users(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermUsersView>,
    tenant: TenantContext,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Page<User>>, ApiError> {
    let users = app_state
        .user_service
        .list(tenant.id(), &query)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let pagination = Pagination { limit: query.limit, offset: query.offset };
    Ok(Json(Page::new(users, &pagination)))
}

// POST /api/v1/admin/{tenant_id}/users
#[utoipa::path(
    post,
    path = "/api/v1/admin/{tenant_id}/users",
    tag = "Users",
    params(("tenant_id" = Uuid, Path, description = "ID do tenant")),
    request_body = CreateUserPayload,
    responses(
        (status = 201, description = "Usuário criado", body = User),
        (status = 400, description = "Dados inválidos"),
        (status = 403, description = "Cargo ou permissões acima do seu"),
        (status = 409, description = "E-mail já cadastrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_user(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermUsersCreate>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<CreateUserPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let created = app_state
        .user_service
        .create(tenant.id(), payload, &user.user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(created)))
}

// GET /api/v1/admin/{tenant_id}/users/{id}
#[utoipa::path(
    get,
    path = "/api/v1/admin/{tenant_id}/users/{id}",
    tag = "Users",
    params(
        ("tenant_id" = Uuid, Path, description = "ID do tenant"),
        ("id" = Uuid, Path, description = "ID do usuário")
    ),
    responses(
        (status = 200, description = "Usuário", body = User),
        (status = 404, description = "Usuário não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_user(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermUsersView>,
    tenant: TenantContext,
    Path((_tenant_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<User>, ApiError> {
    let found = app_state
        .user_service
        .get(tenant.id(), id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(found))
}

// PUT /api/v1/admin/{tenant_id}/users/{id}
#[utoipa::path(
    put,
    path = "/api/v1/admin/{tenant_id}/users/{id}",
    tag = "Users",
    params(
        ("tenant_id" = Uuid, Path, description = "ID do tenant"),
        ("id" = Uuid, Path, description = "ID do usuário")
    ),
    request_body = UpdateUserPayload,
    responses(
        (status = 200, description = "Usuário atualizado", body = User),
        (status = 400, description = "Dados inválidos"),
        (status = 403, description = "Alteração do próprio acesso ou acima do seu"),
        (status = 404, description = "Usuário não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_user(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermUsersEdit>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path((_tenant_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateUserPayload>,
) -> Result<Json<User>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let updated = app_state
        .user_service
        .update(tenant.id(), id, payload, &user.user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(updated))
}

// POST /api/v1/admin/{tenant_id}/users/{id}/activate
#[utoipa::path(
    post,
    path = "/api/v1/admin/{tenant_id}/users/{id}/activate",
    tag = "Users",
    params(
        ("tenant_id" = Uuid, Path, description = "ID do tenant"),
        ("id" = Uuid, Path, description = "ID do usuário")
    ),
    responses(
        (status = 200, description = "Usuário ativado", body = User),
        (status = 404, description = "Usuário não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn activate_user(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermUsersEdit>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path((_tenant_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<User>, ApiError> {
    let updated = app_state
        .user_service
        .set_active(tenant.id(), id, true, user.id())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(updated))
}

// POST /api/v1/admin/{tenant_id}/users/{id}/deactivate
#[utoipa::path(
    post,
    path = "/api/v1/admin/{tenant_id}/users/{id}/deactivate",
    tag = "Users",
    params(
        ("tenant_id" = Uuid, Path, description = "ID do tenant"),
        ("id" = Uuid, Path, description = "ID do usuário")
    ),
    responses(
        (status = 200, description = "Usuário desativado", body = User),
        (status = 400, description = "Não é possível desativar a própria conta"),
        (status = 404, description = "Usuário não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn deactivate_user(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermUsersEdit>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path((_tenant_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<User>, ApiError> {
    let updated = app_state
        .user_service
        .set_active(tenant.id(), id, false, user.id())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(updated))
}

// GET /api/v1/admin/{tenant_id}/brokers
#[utoipa::path(
    get,
    path = "/api/v1/admin/{tenant_id}/brokers",
    tag = "Users",
    params(("tenant_id" = Uuid, Path, description = "ID do tenant"), Pagination),
    responses(
        (status = 200, description = "Corretores ativos do tenant", body = Page<User>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_brokers(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermBrokersView>,
    tenant: TenantContext,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Page<User>>, ApiError> {
    let brokers = app_state
        .user_service
        .list_brokers(tenant.id(), &pagination)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(Page::new(brokers, &pagination)))
}

// GET /api/v1/public/brokers/{id}
#[utoipa::path(
    get,
    path = "/api/v1/public/brokers/{id}",
    tag = "Public",
    params(("id" = Uuid, Path, description = "ID do corretor")),
    responses(
        (status = 200, description = "Perfil público do corretor", body = BrokerPublicProfile),
        (status = 404, description = "Corretor não encontrado")
    )
)]
pub async fn get_public_broker(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
) -> Result<Json<BrokerPublicProfile>, ApiError> {
    let profile = app_state
        .user_service
        .public_broker(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(profile))
}
