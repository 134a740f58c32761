// src/config.rs

use std::{
    env,
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::Duration,
};

use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;

use crate::{
    common::i18n::I18nStore,
    db::{
        ActivityRepository, ImportRepository, InvitationRepository, LeadRepository, OwnerConfirmationRepository,
        OwnerRepository, PropertyRepository, TenantRepository, UserRepository,
    },
    middleware::rate_limit::RateLimiter,
    services::{
        activity_service::ActivityService, auth::AuthService, document_service::DocumentService,
        import_service::ImportService, invitation_service::InvitationService, lead_service::LeadService,
        mailer::{LogMailer, Mailer},
        owner_confirmation_service::OwnerConfirmationService, owner_service::OwnerService,
        property_service::PropertyService, tenancy_service::TenancyService,
        user_service::UserService,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Test => "test",
            Self::Production => "production",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} deve ser definida")]
    Missing(&'static str),

    #[error("{name} inválido: '{value}'")]
    Invalid { name: &'static str, value: String },

    #[error("HOST deve ser um endereço IPv4 ou IPv6")]
    InvalidHost(#[from] std::net::AddrParseError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub rps: u32,
    pub burst: u32,
}

/// Configuração carregada do ambiente (ver `.env.example`).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub allowed_origins: Vec<String>,
    pub log_level: String,
    pub rate_limit: RateLimitConfig,
    pub strict_rate_limit: RateLimitConfig,
    pub import_max_upload_mb: usize,
    pub public_site_url: String,
    pub admin_app_url: String,
    pub mail_from: String,
    pub fonts_dir: String,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Monta a configuração a partir de uma fonte qualquer de variáveis.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let allowed_origins = get(
            "ALLOWED_ORIGINS",
            "http://localhost:3000,http://localhost:3001,http://localhost:3002",
        )
        .split(',')
        .map(|o| o.trim().trim_end_matches('/').to_string())
        .filter(|o| !o.is_empty())
        .collect();

        Ok(Self {
            environment: AppEnvironment::parse(&get("ENVIRONMENT", "development")),
            host: get("HOST", "0.0.0.0"),
            port: parse_var(&lookup, "PORT", 8080)?,
            database_url: required("DATABASE_URL")?,
            db_max_connections: parse_var(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            jwt_secret: required("JWT_SECRET")?,
            jwt_ttl_hours: parse_var(&lookup, "JWT_TTL_HOURS", 168)?,
            allowed_origins,
            log_level: get("LOG_LEVEL", "info"),
            rate_limit: RateLimitConfig {
                rps: parse_var(&lookup, "RATE_LIMIT_RPS", 10)?,
                burst: parse_var(&lookup, "RATE_LIMIT_BURST", 20)?,
            },
            strict_rate_limit: RateLimitConfig {
                rps: parse_var(&lookup, "STRICT_RATE_LIMIT_RPS", 2)?,
                burst: parse_var(&lookup, "STRICT_RATE_LIMIT_BURST", 5)?,
            },
            import_max_upload_mb: parse_var(&lookup, "IMPORT_MAX_UPLOAD_MB", 20)?,
            public_site_url: get("PUBLIC_SITE_URL", "http://localhost:3000")
                .trim_end_matches('/')
                .to_string(),
            admin_app_url: get("ADMIN_APP_URL", "http://localhost:3002")
                .trim_end_matches('/')
                .to_string(),
            mail_from: get("MAIL_FROM", "no-reply@localhost"),
            fonts_dir: get("FONTS_DIR", "./fonts"),
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }
        let ip: IpAddr = self.host.parse()?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn import_body_limit(&self) -> usize {
        self.import_max_upload_mb * 1024 * 1024
    }

    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|o| o == "*")
    }
}

fn parse_var<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}

pub async fn connect_pool(config: &AppConfig) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&config.database_url)
        .await?;
    tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");
    Ok(pool)
}

// ---
// Estado compartilhado
// ---
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<AppConfig>,
    pub i18n_store: I18nStore,

    pub auth_service: AuthService,
    pub tenancy_service: TenancyService,
    pub user_service: UserService,
    pub invitation_service: InvitationService,
    pub owner_service: OwnerService,
    pub owner_confirmation_service: OwnerConfirmationService,
    pub property_service: PropertyService,
    pub lead_service: LeadService,
    pub import_service: ImportService,
    pub activity_service: ActivityService,
    pub document_service: DocumentService,

    pub rate_limiter: RateLimiter,
    pub strict_rate_limiter: RateLimiter,
}

impl AppState {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let pool = connect_pool(&config).await?;
        Self::from_pool(pool, config)
    }

    /// Monta o gráfico de dependências sobre um pool já criado.
    pub fn from_pool(db_pool: PgPool, config: AppConfig) -> anyhow::Result<Self> {
        let i18n_store = I18nStore::load()?;

        let user_repo = UserRepository::new(db_pool.clone());
        let tenant_repo = TenantRepository::new(db_pool.clone());
        let invitation_repo = InvitationRepository::new(db_pool.clone());
        let owner_repo = OwnerRepository::new(db_pool.clone());
        let property_repo = PropertyRepository::new(db_pool.clone());
        let lead_repo = LeadRepository::new(db_pool.clone());
        let import_repo = ImportRepository::new(db_pool.clone());
        let activity_repo = ActivityRepository::new(db_pool.clone());

        let mailer: Arc<dyn Mailer> = Arc::new(LogMailer::new(config.mail_from.clone()));
        let activity_service = ActivityService::new(activity_repo);

        let auth_service = AuthService::new(
            db_pool.clone(),
            user_repo.clone(),
            tenant_repo.clone(),
            activity_service.clone(),
            config.jwt_secret.clone(),
            config.jwt_ttl_hours,
        );
        let tenancy_service = TenancyService::new(tenant_repo.clone(), activity_service.clone());
        let user_service = UserService::new(user_repo.clone(), activity_service.clone());
        let invitation_service = InvitationService::new(
            db_pool.clone(),
            invitation_repo,
            user_repo.clone(),
            auth_service.clone(),
            mailer,
            activity_service.clone(),
            config.admin_app_url.clone(),
        );
        let owner_service = OwnerService::new(owner_repo.clone(), activity_service.clone());
        let owner_confirmation_service = OwnerConfirmationService::new(
            OwnerConfirmationRepository::new(db_pool.clone()),
            property_repo.clone(),
            owner_repo.clone(),
            activity_service.clone(),
            config.public_site_url.clone(),
        );
        let property_service = PropertyService::new(
            property_repo.clone(),
            owner_repo.clone(),
            user_repo.clone(),
            activity_service.clone(),
        );
        let lead_service = LeadService::new(
            lead_repo,
            property_repo.clone(),
            user_repo,
            tenant_repo.clone(),
            activity_service.clone(),
        );
        let import_service = ImportService::new(
            db_pool.clone(),
            import_repo,
            property_repo,
            owner_repo,
            activity_service.clone(),
        );
        let document_service = DocumentService::new(
            tenant_repo,
            config.fonts_dir.clone(),
            config.public_site_url.clone(),
        );

        let rate_limiter = RateLimiter::new(config.rate_limit.rps, config.rate_limit.burst);
        let strict_rate_limiter = RateLimiter::new(config.strict_rate_limit.rps, config.strict_rate_limit.burst);

        Ok(Self {
            db_pool,
            config: Arc::new(config),
            i18n_store,
            auth_service,
            tenancy_service,
            user_service,
            invitation_service,
            owner_service,
            owner_confirmation_service,
            property_service,
            lead_service,
            import_service,
            activity_service,
            document_service,
            rate_limiter,
            strict_rate_limiter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    const BASE: [(&str, &str); 2] = [("DATABASE_URL", "postgres://localhost/imob"), ("JWT_SECRET", "segredo")];

    #[test]
    fn defaults_apply_when_only_required_vars_are_set() {
        let config = AppConfig::from_lookup(lookup(&BASE)).expect("config");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.port, 8080);
        assert_eq!(config.jwt_ttl_hours, 168);
        assert_eq!(config.rate_limit, RateLimitConfig { rps: 10, burst: 20 });
        assert_eq!(config.strict_rate_limit, RateLimitConfig { rps: 2, burst: 5 });
        assert_eq!(config.allowed_origins.len(), 3);
        assert_eq!(config.import_body_limit(), 20 * 1024 * 1024);
    }

    #[test]
    fn missing_secret_is_an_error() {
        let err = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://x")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("JWT_SECRET")));
    }

    #[test]
    fn invalid_port_is_reported() {
        let mut vars = BASE.to_vec();
        vars.push(("PORT", "abc"));
        let err = AppConfig::from_lookup(lookup(&vars)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));
    }

    #[test]
    fn origins_are_trimmed_and_wildcard_detected() {
        let mut vars = BASE.to_vec();
        vars.push(("ALLOWED_ORIGINS", " https://a.com/ , *"));
        let config = AppConfig::from_lookup(lookup(&vars)).expect("config");
        assert_eq!(config.allowed_origins, vec!["https://a.com", "*"]);
        assert!(config.allows_any_origin());
    }

    #[test]
    fn localhost_resolves_to_loopback() {
        let mut vars = BASE.to_vec();
        vars.push(("HOST", "localhost"));
        vars.push(("PORT", "9000"));
        let config = AppConfig::from_lookup(lookup(&vars)).expect("config");
        assert_eq!(config.socket_addr().expect("addr"), SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 9000));
    }
}
