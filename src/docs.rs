// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    info(title = "imob-backend", description = "API multi-tenant para imobiliárias e corretores"),
    paths(
        // --- Health ---
        handlers::health::health,

        // --- Auth ---
        handlers::auth::signup,
        handlers::auth::login,
        handlers::auth::refresh,
        handlers::auth::me,

        // --- Platform ---
        handlers::tenants::list_tenants,
        handlers::tenants::create_tenant,
        handlers::tenants::get_tenant,
        handlers::tenants::update_tenant,
        handlers::tenants::delete_tenant,
        handlers::tenants::activate_tenant,
        handlers::tenants::deactivate_tenant,

        // --- Tenant ---
        handlers::tenants::get_own_tenant,
        handlers::tenants::update_own_tenant,

        // --- Users ---
        handlers::users::list_users,
        handlers::users::create_user,
        handlers::users::get_user,
        handlers::users::update_user,
        handlers::users::activate_user,
        handlers::users::deactivate_user,
        handlers::users::list_brokers,

        // --- Invitations ---
        handlers::invitations::invite_user,
        handlers::invitations::list_invitations,
        handlers::invitations::cancel_invitation,
        handlers::invitations::verify_invitation,
        handlers::invitations::accept_invitation,

        // --- Owners ---
        handlers::owners::list_owners,
        handlers::owners::create_owner,
        handlers::owners::get_owner,
        handlers::owners::update_owner,
        handlers::owners::delete_owner,
        handlers::owners::revoke_owner_consent,
        handlers::owners::anonymize_owner,
        handlers::confirmations::create_confirmation_link,
        handlers::confirmations::get_confirmation,
        handlers::confirmations::submit_confirmation,

        // --- Properties ---
        handlers::properties::list_properties,
        handlers::properties::create_property,
        handlers::properties::get_property,
        handlers::properties::update_property,
        handlers::properties::delete_property,
        handlers::properties::set_property_status,
        handlers::properties::set_property_visibility,
        handlers::properties::property_brochure,

        // --- Leads ---
        handlers::leads::list_leads,
        handlers::leads::create_lead,
        handlers::leads::pending_anonymization,
        handlers::leads::get_lead,
        handlers::leads::update_lead_status,
        handlers::leads::revoke_consent,
        handlers::leads::anonymize_lead,

        // --- Imports ---
        handlers::imports::upload_import,
        handlers::imports::list_batches,
        handlers::imports::get_batch,
        handlers::imports::batch_errors,

        // --- Activity ---
        handlers::activity::list_activity,

        // --- Public ---
        handlers::tenants::get_public_tenant,
        handlers::properties::list_public_properties,
        handlers::properties::get_public_property,
        handlers::leads::public_form_lead,
        handlers::leads::public_whatsapp_lead,
        handlers::users::get_public_broker,
    ),
    components(
        schemas(
            handlers::health::HealthResponse,
            handlers::imports::ImportUploadForm,

            // --- Auth ---
            models::auth::SignupPayload,
            models::auth::SignupUser,
            models::auth::SignupResponse,
            models::auth::LoginPayload,
            models::auth::BrokerSummary,
            models::auth::LoginResponse,
            models::auth::TokenResponse,
            models::auth::MeResponse,

            // --- Tenancy ---
            models::tenancy::TenantType,
            models::tenancy::DocumentType,
            models::tenancy::BusinessType,
            models::tenancy::Tenant,
            models::tenancy::PublicTenant,
            models::tenancy::AddressPayload,
            models::tenancy::CreateTenantPayload,
            models::tenancy::UpdateTenantPayload,
            models::tenancy::TenantOrder,

            // --- Users ---
            models::user::UserRole,
            models::user::User,
            models::user::BrokerStats,
            models::user::BrokerPublicProfile,
            models::user::CreateUserPayload,
            models::user::UpdateUserPayload,

            // --- Invitations ---
            models::invitation::InvitationStatus,
            models::invitation::Invitation,
            models::invitation::InviteUserPayload,
            models::invitation::AcceptInvitationPayload,
            models::invitation::VerifyInvitationResponse,
            models::invitation::AcceptInvitationResponse,
            models::invitation::InvitationList,

            // --- Owners ---
            models::owner::OwnerStatus,
            models::owner::ConsentOrigin,
            models::owner::Owner,
            models::owner::CreateOwnerPayload,
            models::owner::AnonymizePayload,
            models::owner::UpdateOwnerPayload,
            models::owner_confirmation::ConfirmationAction,
            models::owner_confirmation::CreateConfirmationPayload,
            models::owner_confirmation::ConfirmationLink,
            models::owner_confirmation::SubmitConfirmationPayload,
            models::owner_confirmation::ConfirmationPage,

            // --- Properties ---
            models::property::PropertyType,
            models::property::PropertyStatus,
            models::property::Visibility,
            models::property::TransactionType,
            models::property::PropertyImage,
            models::property::Property,
            models::property::PublicProperty,
            models::property::CreatePropertyPayload,
            models::property::UpdatePropertyPayload,
            models::property::ClearableField,
            models::property::PropertyStatusPayload,
            models::property::PropertyVisibilityPayload,

            // --- Leads ---
            models::lead::LeadChannel,
            models::lead::LeadStatus,
            models::lead::Lead,
            models::lead::UtmParams,
            models::lead::CreateLeadPayload,
            models::lead::PublicFormLeadPayload,
            models::lead::PublicWhatsAppLeadPayload,
            models::lead::LeadStatusPayload,
            models::lead::PublicLeadResponse,
            models::lead::WhatsAppLeadResponse,

            // --- Imports ---
            models::import::ImportSource,
            models::import::ImportStatus,
            models::import::ImportBatch,
            models::import::ImportErrorEntry,
            models::import::ImportErrorList,
            models::import::ImportStarted,

            // --- Activity ---
            models::activity::ActorType,
            models::activity::ActivityLog,
        )
    ),
    tags(
        (name = "Health", description = "Situação do serviço"),
        (name = "Auth", description = "Cadastro, login e sessão"),
        (name = "Platform", description = "Administração da plataforma (todos os tenants)"),
        (name = "Tenant", description = "Dados do próprio tenant"),
        (name = "Users", description = "Usuários e corretores do tenant"),
        (name = "Invitations", description = "Convites de novos usuários"),
        (name = "Owners", description = "Proprietários de imóveis"),
        (name = "Owner confirmation", description = "Links para o proprietário confirmar o imóvel"),
        (name = "Properties", description = "Cadastro de imóveis"),
        (name = "Leads", description = "Funil de leads e LGPD"),
        (name = "Imports", description = "Importação de feed XML e planilha de proprietários"),
        (name = "Activity", description = "Trilha de auditoria"),
        (name = "Public", description = "Vitrine pública e captação de leads")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_declares_bearer_scheme_and_admin_paths() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("api_jwt"));
        assert!(doc.paths.paths.contains_key("/api/v1/admin/{tenant_id}/import/properties"));
        assert!(doc.paths.paths.contains_key("/api/v1/public/properties/{id}/leads/form"));
    }
}
