// src/common/error.rs

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use thiserror::Error;

use crate::{common::i18n::I18nStore, middleware::i18n::Locale};

// Nosso tipo de erro de domínio. Cada variante tem um `code` estável,
// usado como chave de tradução e devolvido ao cliente.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("{0}")]
    InvalidInput(String),

    #[error("consent_given must be true (LGPD compliance)")]
    ConsentRequired,

    #[error("Transição de status inválida: {from} -> {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("Invitation has expired")]
    InvitationExpired,

    #[error("Invitation is {0}")]
    InvitationNotPending(String),

    #[error("Pelo menos um arquivo (XML ou XLS) deve ser fornecido")]
    ImportFilesRequired,

    #[error("Não é possível alterar o tenant da plataforma")]
    PlatformTenantProtected,

    #[error("Você não pode desativar a sua própria conta")]
    CannotDeactivateSelf,

    #[error("Você não pode alterar o seu próprio cargo ou permissões")]
    CannotChangeOwnAccess,

    #[error("Não é possível conceder acesso acima do seu")]
    AccessEscalation,

    // --- 401 ---
    #[error("missing authorization header")]
    MissingAuthHeader,

    #[error("invalid authorization header format. Expected: Bearer <token>")]
    InvalidAuthHeader,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    // --- 403 ---
    #[error("Account is inactive")]
    AccountInactive,

    #[error("tenant is not active")]
    TenantInactive,

    #[error("Acesso negado a este tenant")]
    TenantAccessDenied,

    #[error("Permissão necessária: {0}")]
    PermissionDenied(String),

    // --- 404 ---
    #[error("tenant not found")]
    TenantNotFound,

    #[error("Usuário não encontrado")]
    UserNotFound,

    #[error("Imóvel não encontrado")]
    PropertyNotFound,

    #[error("Public property not found")]
    PublicPropertyNotFound,

    #[error("Lead não encontrado")]
    LeadNotFound,

    #[error("Invalid invitation token")]
    InvitationNotFound,

    #[error("Link de confirmação não encontrado")]
    ConfirmationNotFound,

    #[error("Link de confirmação expirado")]
    ConfirmationExpired,

    #[error("Link de confirmação já utilizado")]
    ConfirmationUsed,

    #[error("Proprietário não encontrado")]
    OwnerNotFound,

    #[error("Lote de importação não encontrado")]
    ImportBatchNotFound,

    // --- 409 ---
    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Slug já está em uso: {0}")]
    SlugAlreadyExists(String),

    #[error("Já existe um convite pendente para este e-mail")]
    PendingInvitationExists,

    #[error("Já existe um usuário com este e-mail neste tenant")]
    UserAlreadyInTenant,

    #[error("Violação de unicidade: {0}")]
    UniqueConstraintViolation(String),

    #[error("O registro foi alterado por outra requisição")]
    ConcurrentUpdate,

    // --- 410 ---
    #[error("Os dados do proprietário foram anonimizados")]
    OwnerAnonymized,

    // --- 429 ---
    #[error("Muitas requisições. Tente novamente em instantes.")]
    RateLimited,

    // --- 500 ---
    #[error("Fonte não encontrada: {0}")]
    FontNotFound(String),

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::InvalidInput(_)
            | AppError::ConsentRequired
            | AppError::InvalidStatusTransition { .. }
            | AppError::InvitationExpired
            | AppError::InvitationNotPending(_)
            | AppError::ImportFilesRequired
            | AppError::CannotDeactivateSelf => StatusCode::BAD_REQUEST,

            AppError::MissingAuthHeader
            | AppError::InvalidAuthHeader
            | AppError::InvalidToken
            | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,

            AppError::AccountInactive
            | AppError::TenantInactive
            | AppError::TenantAccessDenied
            | AppError::PermissionDenied(_)
            | AppError::PlatformTenantProtected
            | AppError::CannotChangeOwnAccess
            | AppError::AccessEscalation => StatusCode::FORBIDDEN,

            AppError::TenantNotFound
            | AppError::UserNotFound
            | AppError::PropertyNotFound
            | AppError::PublicPropertyNotFound
            | AppError::LeadNotFound
            | AppError::InvitationNotFound
            | AppError::OwnerNotFound
            | AppError::ConfirmationNotFound
            | AppError::ImportBatchNotFound => StatusCode::NOT_FOUND,

            AppError::EmailAlreadyExists
            | AppError::SlugAlreadyExists(_)
            | AppError::PendingInvitationExists
            | AppError::UserAlreadyInTenant
            | AppError::UniqueConstraintViolation(_)
            | AppError::ConcurrentUpdate
            | AppError::ConfirmationUsed => StatusCode::CONFLICT,

            AppError::OwnerAnonymized | AppError::ConfirmationExpired => StatusCode::GONE,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,

            AppError::FontNotFound(_)
            | AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Chave estável do erro (também usada como chave de tradução).
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "validation_failed",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::ConsentRequired => "consent_required",
            AppError::InvalidStatusTransition { .. } => "invalid_status_transition",
            AppError::InvitationExpired => "invitation_expired",
            AppError::InvitationNotPending(_) => "invitation_not_pending",
            AppError::ImportFilesRequired => "import_files_required",
            AppError::PlatformTenantProtected => "platform_tenant_protected",
            AppError::CannotDeactivateSelf => "cannot_deactivate_self",
            AppError::CannotChangeOwnAccess => "cannot_change_own_access",
            AppError::AccessEscalation => "access_escalation",
            AppError::MissingAuthHeader => "missing_authorization_header",
            AppError::InvalidAuthHeader => "invalid_authorization_header",
            AppError::InvalidToken => "invalid_token",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::AccountInactive => "account_inactive",
            AppError::TenantInactive => "tenant_inactive",
            AppError::TenantAccessDenied => "tenant_access_denied",
            AppError::PermissionDenied(_) => "permission_denied",
            AppError::TenantNotFound => "tenant_not_found",
            AppError::UserNotFound => "user_not_found",
            AppError::PropertyNotFound => "property_not_found",
            AppError::PublicPropertyNotFound => "public_property_not_found",
            AppError::LeadNotFound => "lead_not_found",
            AppError::InvitationNotFound => "invitation_not_found",
            AppError::OwnerNotFound => "owner_not_found",
            AppError::ConfirmationNotFound => "confirmation_not_found",
            AppError::ConfirmationExpired => "confirmation_expired",
            AppError::ConfirmationUsed => "confirmation_used",
            AppError::ImportBatchNotFound => "import_batch_not_found",
            AppError::EmailAlreadyExists => "email_already_exists",
            AppError::SlugAlreadyExists(_) => "slug_already_exists",
            AppError::PendingInvitationExists => "pending_invitation_exists",
            AppError::UserAlreadyInTenant => "user_already_in_tenant",
            AppError::UniqueConstraintViolation(_) => "unique_violation",
            AppError::ConcurrentUpdate => "concurrent_update",
            AppError::OwnerAnonymized => "owner_anonymized",
            AppError::RateLimited => "rate_limited",
            AppError::FontNotFound(_)
            | AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => "internal_error",
        }
    }

    /// Converte o erro de domínio na resposta da API, já traduzida.
    pub fn to_api_error(&self, locale: &Locale, i18n: &I18nStore) -> ApiError {
        let status = self.status();
        let code = self.code();

        if status.is_server_error() {
            tracing::error!("Erro Interno do Servidor: {:?}", self);
        }

        // Variantes com parâmetros usam a mensagem formatada; as demais são traduzidas.
        let error = match self {
            AppError::InvalidInput(msg) => msg.clone(),
            AppError::InvalidStatusTransition { .. }
            | AppError::InvitationNotPending(_)
            | AppError::PermissionDenied(_)
            | AppError::SlugAlreadyExists(_) => i18n
                .translate(&locale.0, code)
                .map(|m| format!("{} ({})", m, self.detail_param().unwrap_or_default()))
                .unwrap_or_else(|| self.to_string()),
            _ => i18n
                .translate(&locale.0, code)
                .map(str::to_string)
                .unwrap_or_else(|| self.to_string()),
        };

        let details = match self {
            AppError::ValidationError(errors) => Some(validation_details(errors, locale, i18n)),
            _ => None,
        };

        ApiError { status, code, error, details }
    }

    fn detail_param(&self) -> Option<String> {
        match self {
            AppError::InvalidStatusTransition { from, to } => Some(format!("{} -> {}", from, to)),
            AppError::InvitationNotPending(status) => Some(status.clone()),
            AppError::PermissionDenied(perm) => Some(perm.clone()),
            AppError::SlugAlreadyExists(slug) => Some(slug.clone()),
            _ => None,
        }
    }
}

// Monta `{campo: [mensagens]}` a partir dos erros do validator.
fn validation_details(
    errors: &validator::ValidationErrors,
    locale: &Locale,
    i18n: &I18nStore,
) -> Value {
    let mut details: HashMap<String, Vec<String>> = HashMap::new();
    for (field, field_errors) in errors.field_errors() {
        let messages = field_errors
            .iter()
            .map(|e| {
                let key = e.message.as_deref().unwrap_or(e.code.as_ref());
                i18n.translate(&locale.0, &format!("validation.{}", key))
                    .map(str::to_string)
                    .unwrap_or_else(|| key.to_string())
            })
            .collect();
        details.insert(field.to_string(), messages);
    }
    json!(details)
}

// ---
// Resposta de erro da API
// ---
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub error: String,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "success": false,
            "error": self.error,
            "code": self.code,
        });
        if let Some(details) = self.details {
            body["details"] = details;
        }

        let mut response = (self.status, Json(body)).into_response();
        if self.status == StatusCode::TOO_MANY_REQUESTS {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
        }
        response
    }
}

// Fallback sem tradução (usado onde não há locale à mão).
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default(), &I18nStore::default())
            .into_response()
    }
}

/// Mapeia violações de unicidade do Postgres para erros de domínio.
pub fn map_unique_violation(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            if let Some(constraint) = db_err.constraint() {
                return match constraint {
                    "users_email_key" => AppError::EmailAlreadyExists,
                    "tenants_slug_key" | "properties_tenant_slug_key" => AppError::SlugAlreadyExists(String::new()),
                    _ => AppError::UniqueConstraintViolation(constraint.to_string()),
                };
            }
        }
    }
    e.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Payload {
        #[validate(email(message = "invalid_email"))]
        email: String,
    }

    fn pt() -> Locale {
        Locale("pt".to_string())
    }

    #[test]
    fn status_codes_follow_error_family() {
        assert_eq!(AppError::ConsentRequired.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::MissingAuthHeader.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::TenantInactive.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::PublicPropertyNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::EmailAlreadyExists.status(), StatusCode::CONFLICT);
        assert_eq!(AppError::OwnerAnonymized.status(), StatusCode::GONE);
        assert_eq!(AppError::RateLimited.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn validation_errors_carry_field_details() {
        let errors = Payload { email: "nope".into() }.validate().unwrap_err();
        let api = AppError::from(errors).to_api_error(&pt(), &I18nStore::default());

        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        let details = api.details.expect("details");
        assert!(details.get("email").is_some());
    }

    #[test]
    fn english_locale_translates_messages() {
        let store = I18nStore::default();
        let api = AppError::InvalidCredentials.to_api_error(&Locale("en".into()), &store);
        assert_eq!(api.error, "Invalid email or password.");
    }

    #[test]
    fn invalid_input_keeps_its_message() {
        let api = AppError::InvalidInput("CRECI inválido".into()).to_api_error(&pt(), &I18nStore::default());
        assert_eq!(api.error, "CRECI inválido");
        assert_eq!(api.code, "invalid_input");
    }

    #[test]
    fn property_slug_violation_is_a_conflict() {
        let err = AppError::SlugAlreadyExists(String::new());
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "slug_already_exists");
    }

    #[test]
    fn confirmation_link_errors_are_distinct() {
        assert_eq!(AppError::ConfirmationNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::ConfirmationExpired.status(), StatusCode::GONE);
        assert_eq!(AppError::ConfirmationUsed.status(), StatusCode::CONFLICT);
        assert_eq!(AppError::ConcurrentUpdate.status(), StatusCode::CONFLICT);
        assert_eq!(AppError::AccessEscalation.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn new_codes_are_translated() {
        let store = I18nStore::default();
        for err in [
            AppError::ConcurrentUpdate,
            AppError::CannotChangeOwnAccess,
            AppError::AccessEscalation,
            AppError::ConfirmationNotFound,
            AppError::ConfirmationExpired,
            AppError::ConfirmationUsed,
        ] {
            assert!(store.translate("pt", err.code()).is_some(), "{}", err.code());
            assert!(store.translate("en", err.code()).is_some(), "{}", err.code());
        }
    }

    #[test]
    fn rate_limited_response_sets_retry_after() {
        let response = AppError::RateLimited.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "1");
    }
}
