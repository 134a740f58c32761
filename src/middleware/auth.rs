// src/middleware/auth.rs

use axum::{
    body::Body,
    extract::{FromRequestParts, OptionalFromRequestParts, State},
    http::{header, request::Parts, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::user::User,
};

/// Usuário autenticado, guardado nas extensions da requisição.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: User,
    /// O tenant do usuário é o tenant da plataforma?
    pub is_platform_admin: bool,
}

impl AuthenticatedUser {
    pub fn id(&self) -> Uuid {
        self.user.id
    }

    pub fn tenant_id(&self) -> Uuid {
        self.user.tenant_id
    }

    pub fn can_access_tenant(&self, tenant_id: Uuid) -> bool {
        self.is_platform_admin || self.user.tenant_id == tenant_id
    }
}

// Lê o token do cabeçalho. `Ok(None)` quando o cabeçalho não existe.
fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, AppError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| AppError::InvalidAuthHeader)?;
    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(Some(token.trim())),
        _ => Err(AppError::InvalidAuthHeader),
    }
}

async fn authenticate(app_state: &AppState, token: &str) -> Result<AuthenticatedUser, AppError> {
    let claims = app_state.auth_service.validate_token(token)?;
    let session = app_state.auth_service.load_session(claims.sub).await?;

    if !session.user.is_active {
        return Err(AppError::AccountInactive);
    }

    Ok(AuthenticatedUser {
        user: session.user,
        is_platform_admin: session.is_platform_admin,
    })
}

// O middleware em si
pub async fn auth_guard(
    State(app_state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let locale = Locale::from_headers(request.headers(), &app_state.i18n_store);
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let token = bearer_token(request.headers())
        .map_err(to_api)?
        .ok_or(AppError::MissingAuthHeader)
        .map_err(to_api)?
        .to_string();

    let user = authenticate(&app_state, &token).await.map_err(to_api)?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Igual ao `auth_guard`, mas sem cabeçalho a requisição segue anônima.
pub async fn optional_auth(
    State(app_state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let locale = Locale::from_headers(request.headers(), &app_state.i18n_store);
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let token = bearer_token(request.headers()).map_err(to_api)?.map(str::to_string);
    if let Some(token) = token {
        let user = authenticate(&app_state, &token).await.map_err(to_api)?;
        request.extensions_mut().insert(user);
    }
    Ok(next.run(request).await)
}

/// Rotas `/platform`: somente usuários do tenant da plataforma.
pub async fn platform_admin_guard(
    State(app_state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let allowed = request
        .extensions()
        .get::<AuthenticatedUser>()
        .map(|u| u.is_platform_admin)
        .unwrap_or(false);

    if !allowed {
        let locale = Locale::from_headers(request.headers(), &app_state.i18n_store);
        return Err(AppError::PermissionDenied("platform_admin".into())
            .to_api_error(&locale, &app_state.i18n_store));
    }
    Ok(next.run(request).await)
}

// Extrator para obter o usuário autenticado diretamente nos handlers
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AppError::MissingAuthHeader)
    }
}

// Rotas com `optional_auth`: `Option<AuthenticatedUser>` é `None` para anônimos.
impl<S> OptionalFromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<AuthenticatedUser>().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn with_auth(value: &'static str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
        h
    }

    #[test]
    fn missing_header_is_none() {
        assert!(matches!(bearer_token(&HeaderMap::new()), Ok(None)));
    }

    #[test]
    fn bearer_prefix_is_required() {
        assert!(matches!(bearer_token(&with_auth("Token abc")), Err(AppError::InvalidAuthHeader)));
        assert!(matches!(bearer_token(&with_auth("Bearer ")), Err(AppError::InvalidAuthHeader)));
        assert!(matches!(bearer_token(&with_auth("Bearer abc.def")), Ok(Some("abc.def"))));
    }
}
