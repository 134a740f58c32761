// src/routes.rs

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    config::AppState,
    docs::ApiDoc,
    handlers,
    middleware::{
        auth::{auth_guard, optional_auth, platform_admin_guard},
        http::{cors, request_context, security_headers},
        rate_limit::{rate_limit, strict_rate_limit},
        tenancy::tenant_guard,
    },
};

/// Monta o roteador completo da API sobre o estado compartilhado.
pub fn build_router(app_state: AppState) -> Router {
    // Escritas públicas: limite mais rígido
    let strict_routes = Router::new()
        .route("/api/v1/auth/signup", post(handlers::auth::signup))
        .route("/api/v1/auth/login", post(handlers::auth::login))
        .route(
            "/api/v1/invitations/{token}/accept",
            post(handlers::invitations::accept_invitation),
        )
        .route(
            "/api/v1/public/properties/{id}/leads/form",
            post(handlers::leads::public_form_lead),
        )
        .route(
            "/api/v1/public/properties/{id}/leads/whatsapp",
            post(handlers::leads::public_whatsapp_lead),
        )
        .route(
            "/api/v1/owner-confirmations/{token}/submit",
            post(handlers::confirmations::submit_confirmation),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            strict_rate_limit,
        ));

    let public_routes = Router::new()
        .route("/api/health", get(handlers::health::health))
        .route(
            "/api/v1/invitations/{token}/verify",
            get(handlers::invitations::verify_invitation),
        )
        .route(
            "/api/v1/owner-confirmations/{token}",
            get(handlers::confirmations::get_confirmation),
        )
        .route("/api/v1/public/tenants/{slug}", get(handlers::tenants::get_public_tenant))
        .route(
            "/api/v1/public/properties",
            get(handlers::properties::list_public_properties),
        )
        .route("/api/v1/public/brokers/{id}", get(handlers::users::get_public_broker));

    // Membros do tenant enxergam o próprio imóvel antes de publicado
    let public_preview_routes = Router::new()
        .route(
            "/api/v1/public/properties/{id}",
            get(handlers::properties::get_public_property),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            optional_auth,
        ));

    let session_routes = Router::new()
        .route("/refresh", post(handlers::auth::refresh))
        .route("/me", get(handlers::auth::me))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let platform_routes = Router::new()
        .route(
            "/tenants",
            get(handlers::tenants::list_tenants).post(handlers::tenants::create_tenant),
        )
        .route(
            "/tenants/{id}",
            get(handlers::tenants::get_tenant)
                .put(handlers::tenants::update_tenant)
                .delete(handlers::tenants::delete_tenant),
        )
        .route("/tenants/{id}/activate", post(handlers::tenants::activate_tenant))
        .route("/tenants/{id}/deactivate", post(handlers::tenants::deactivate_tenant))
        // A ordem importa: a última camada roda primeiro (auth antes do guard da plataforma)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            platform_admin_guard,
        ))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let import_body_limit = app_state.config.import_body_limit();

    let admin_routes = Router::new()
        // Tenant
        .route(
            "/tenant",
            get(handlers::tenants::get_own_tenant).put(handlers::tenants::update_own_tenant),
        )
        // Usuários e corretores
        .route(
            "/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route("/users/invite", post(handlers::invitations::invite_user))
        .route("/users/invitations", get(handlers::invitations::list_invitations))
        .route(
            "/users/invitations/{id}",
            delete(handlers::invitations::cancel_invitation),
        )
        .route(
            "/users/{id}",
            get(handlers::users::get_user).put(handlers::users::update_user),
        )
        .route("/users/{id}/activate", post(handlers::users::activate_user))
        .route("/users/{id}/deactivate", post(handlers::users::deactivate_user))
        .route("/brokers", get(handlers::users::list_brokers))
        // Proprietários
        .route(
            "/owners",
            get(handlers::owners::list_owners).post(handlers::owners::create_owner),
        )
        .route(
            "/owners/{id}",
            get(handlers::owners::get_owner)
                .put(handlers::owners::update_owner)
                .delete(handlers::owners::delete_owner),
        )
        .route("/owners/{id}/revoke-consent", post(handlers::owners::revoke_owner_consent))
        .route("/owners/{id}/anonymize", post(handlers::owners::anonymize_owner))
        // Imóveis
        .route(
            "/properties",
            get(handlers::properties::list_properties).post(handlers::properties::create_property),
        )
        .route(
            "/properties/{id}",
            get(handlers::properties::get_property)
                .put(handlers::properties::update_property)
                .delete(handlers::properties::delete_property),
        )
        .route(
            "/properties/{id}/status",
            patch(handlers::properties::set_property_status),
        )
        .route(
            "/properties/{id}/visibility",
            patch(handlers::properties::set_property_visibility),
        )
        .route(
            "/properties/{id}/brochure",
            get(handlers::properties::property_brochure),
        )
        .route(
            "/properties/{id}/confirmation-links",
            post(handlers::confirmations::create_confirmation_link),
        )
        // Leads
        .route(
            "/leads",
            get(handlers::leads::list_leads).post(handlers::leads::create_lead),
        )
        .route(
            "/leads/pending-anonymization",
            get(handlers::leads::pending_anonymization),
        )
        .route("/leads/{id}", get(handlers::leads::get_lead))
        .route("/leads/{id}/status", put(handlers::leads::update_lead_status))
        .route("/leads/{id}/revoke-consent", post(handlers::leads::revoke_consent))
        .route("/leads/{id}/anonymize", post(handlers::leads::anonymize_lead))
        // Importação
        .route(
            "/import/properties",
            post(handlers::imports::upload_import).layer(DefaultBodyLimit::max(import_body_limit)),
        )
        .route("/import/batches", get(handlers::imports::list_batches))
        .route("/import/batches/{id}", get(handlers::imports::get_batch))
        .route("/import/batches/{id}/errors", get(handlers::imports::batch_errors))
        // Auditoria
        .route("/activity-logs", get(handlers::activity::list_activity))
        // route_layer: os guards só rodam em rotas encontradas, já com o {tenant_id} extraído
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            tenant_guard,
        ))
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    Router::new()
        .merge(strict_routes)
        .merge(public_routes)
        .merge(public_preview_routes)
        .nest("/api/v1/auth", session_routes)
        .nest("/api/v1/platform", platform_routes)
        .nest("/api/v1/admin/{tenant_id}", admin_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            rate_limit,
        ))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), cors))
        .layer(axum_middleware::from_fn(security_headers))
        .layer(axum_middleware::from_fn(request_context))
        .with_state(app_state)
}
