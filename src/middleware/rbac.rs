// src/middleware/rbac.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::marker::PhantomData;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::user::permissions,
};

/// 1. O Trait que define o que é uma Permissão
pub trait PermissionDef: Send + Sync + 'static {
    fn slug() -> &'static str;
}

/// 2. O Extractor (Guardião)
pub struct RequirePermission<T>(pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequirePermission<T>
where
    T: PermissionDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let locale = Locale::from_headers(&parts.headers, &app_state.i18n_store);

        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .ok_or_else(|| AppError::MissingAuthHeader.to_api_error(&locale, &app_state.i18n_store))?;

        let required_perm = T::slug();

        // Usuários da plataforma passam por qualquer checagem.
        if user.is_platform_admin || user.user.has_permission(required_perm) {
            return Ok(RequirePermission(PhantomData));
        }

        tracing::warn!(user_id = %user.id(), permission = required_perm, "Permissão negada");
        Err(AppError::PermissionDenied(required_perm.to_string()).to_api_error(&locale, &app_state.i18n_store))
    }
}

// ---
// DEFINIÇÃO DAS PERMISSÕES (TIPOS)
// ---

macro_rules! permission {
    ($name:ident, $slug:expr) => {
        pub struct $name;
        impl PermissionDef for $name {
            fn slug() -> &'static str {
                $slug
            }
        }
    };
}

permission!(PermPropertiesViewAll, permissions::PROPERTIES_VIEW_ALL);
permission!(PermPropertiesCreate, permissions::PROPERTIES_CREATE);
permission!(PermPropertiesEditAll, permissions::PROPERTIES_EDIT_ALL);
permission!(PermPropertiesDelete, permissions::PROPERTIES_DELETE);
permission!(PermBrokersView, permissions::BROKERS_VIEW);
permission!(PermUsersView, permissions::USERS_VIEW);
permission!(PermUsersCreate, permissions::USERS_CREATE);
permission!(PermUsersEdit, permissions::USERS_EDIT);
permission!(PermSettingsView, permissions::SETTINGS_VIEW);
permission!(PermSettingsEdit, permissions::SETTINGS_EDIT);
permission!(PermLeadsView, permissions::LEADS_VIEW);
permission!(PermLeadsEdit, permissions::LEADS_EDIT);
permission!(PermImportsRun, permissions::IMPORTS_RUN);
