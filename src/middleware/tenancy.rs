// src/middleware/tenancy.rs

use axum::{
    body::Body,
    extract::{FromRequestParts, RawPathParams, State},
    http::{request::Parts, Request},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::tenancy::Tenant,
};

const TENANT_ID_PARAM: &str = "tenant_id";

// O tenant da rota, já validado pelo `tenant_guard`.
#[derive(Debug, Clone)]
pub struct TenantContext(pub Tenant);

impl TenantContext {
    pub fn id(&self) -> Uuid {
        self.0.id
    }
}

/// Resolve o `{tenant_id}` da rota e confere o acesso do usuário.
/// Precisa rodar depois do `auth_guard`.
pub async fn tenant_guard(
    State(app_state): State<AppState>,
    params: Result<RawPathParams, axum::extract::rejection::RawPathParamsRejection>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let locale = Locale::from_headers(request.headers(), &app_state.i18n_store);
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let raw_id = params
        .ok()
        .and_then(|p| {
            p.iter()
                .find(|(name, _)| *name == TENANT_ID_PARAM)
                .map(|(_, value)| value.to_string())
        })
        .ok_or_else(|| to_api(AppError::InvalidInput("tenant_id é obrigatório".into())))?;

    let tenant_id = Uuid::parse_str(&raw_id)
        .map_err(|_| to_api(AppError::InvalidInput(format!("tenant_id inválido: {}", raw_id))))?;

    let tenant = app_state
        .tenancy_service
        .find(tenant_id)
        .await
        .map_err(to_api)?
        .ok_or_else(|| to_api(AppError::TenantNotFound))?;

    if !tenant.is_active {
        return Err(to_api(AppError::TenantInactive));
    }

    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| to_api(AppError::MissingAuthHeader))?;

    if !user.can_access_tenant(tenant.id) {
        tracing::warn!(user_id = %user.id(), %tenant_id, "Acesso negado ao tenant");
        return Err(to_api(AppError::TenantAccessDenied));
    }

    request.extensions_mut().insert(TenantContext(tenant));
    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantContext>()
            .cloned()
            .ok_or(AppError::TenantNotFound)
    }
}
