// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        slug::generate_slug,
        validators::{normalize_cnpj, normalize_cpf, normalize_creci_of_kind, normalize_email, normalize_phone_e164, CreciKind},
    },
    db::{TenantRepository, UserRepository, UserSession},
    models::{
        activity::NewActivity,
        auth::{BrokerSummary, Claims, LoginResponse, MeResponse, SignupPayload, SignupResponse, SignupUser},
        tenancy::{BusinessType, DocumentType, TenantChanges, TenantType},
        user::{permissions, NewUser, UserRole},
    },
    services::activity_service::{events, ActivityService},
};

const SIGNUP_PLAN: &str = "full";
const SIGNUP_SUBSCRIPTION_STATUS: &str = "active";

/// Dados do cadastro depois das regras PF/PJ.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignupPlan {
    pub document: String,
    pub document_type: DocumentType,
    pub business_type: BusinessType,
    pub tenant_creci: Option<String>,
    pub role: UserRole,
    pub user_creci: Option<String>,
    pub phone: String,
}

/// Aplica as regras de pessoa física / jurídica ao payload de cadastro.
pub fn plan_signup(payload: &SignupPayload) -> Result<SignupPlan, AppError> {
    let phone = normalize_phone_e164(&payload.phone, "55")?;
    let non_empty = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);

    match payload.tenant_type {
        TenantType::Pf => {
            let document = normalize_cpf(&payload.document)?;
            let creci = non_empty(&payload.tenant_creci)
                .ok_or_else(|| AppError::InvalidInput("CRECI é obrigatório para pessoa física".into()))?;
            let creci = normalize_creci_of_kind(&creci, CreciKind::F)?;
            Ok(SignupPlan {
                document,
                document_type: DocumentType::Cpf,
                business_type: BusinessType::CorretorAutonomo,
                tenant_creci: Some(creci.clone()),
                role: UserRole::BrokerAdmin,
                user_creci: Some(creci),
                phone,
            })
        }
        TenantType::Pj => {
            let document = normalize_cnpj(&payload.document)?;
            let business_type = payload
                .business_type
                .ok_or_else(|| AppError::InvalidInput("business_type é obrigatório para pessoa jurídica".into()))?;

            let tenant_creci = match non_empty(&payload.tenant_creci) {
                Some(c) => Some(normalize_creci_of_kind(&c, CreciKind::J)?),
                None if business_type == BusinessType::Imobiliaria => {
                    return Err(AppError::InvalidInput("CRECI-J é obrigatório para imobiliárias".into()));
                }
                None => None,
            };

            let (role, user_creci) = if payload.is_user_broker {
                let c = non_empty(&payload.user_creci)
                    .ok_or_else(|| AppError::InvalidInput("CRECI do corretor é obrigatório".into()))?;
                (UserRole::BrokerAdmin, Some(normalize_creci_of_kind(&c, CreciKind::F)?))
            } else {
                (UserRole::Admin, None)
            };

            Ok(SignupPlan {
                document,
                document_type: DocumentType::Cnpj,
                business_type,
                tenant_creci,
                role,
                user_creci,
                phone,
            })
        }
    }
}

pub async fn hash_password(password: &str) -> Result<String, AppError> {
    let password_clone = password.to_owned();
    let hashed = tokio::task::spawn_blocking(move || hash(&password_clone, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;
    Ok(hashed)
}

#[derive(Clone)]
pub struct AuthService {
    pool: PgPool,
    user_repo: UserRepository,
    tenant_repo: TenantRepository,
    activity: ActivityService,
    jwt_secret: String,
    ttl_hours: i64,
}

impl AuthService {
    pub fn new(
        pool: PgPool,
        user_repo: UserRepository,
        tenant_repo: TenantRepository,
        activity: ActivityService,
        jwt_secret: String,
        ttl_hours: i64,
    ) -> Self {
        Self { pool, user_repo, tenant_repo, activity, jwt_secret, ttl_hours }
    }

    /// Cria tenant + primeiro usuário numa única transação.
    pub async fn signup(&self, payload: SignupPayload) -> Result<SignupResponse, AppError> {
        let plan = plan_signup(&payload)?;
        let email = normalize_email(&payload.email)?;

        if self.user_repo.find_by_email(&self.pool, &email).await?.is_some() {
            return Err(AppError::EmailAlreadyExists);
        }

        // Hash fora da transação: não toca no banco.
        let password_hash = hash_password(&payload.password).await?;

        let mut tx = self.pool.begin().await?;

        let mut slug = generate_slug(&payload.tenant_name);
        if slug.is_empty() || self.tenant_repo.slug_exists(&mut *tx, &slug).await? {
            let base = if slug.is_empty() { "imobiliaria".to_string() } else { slug };
            slug = format!("{}-{}", base, Utc::now().timestamp());
        }

        let tenant = self
            .tenant_repo
            .create(
                &mut *tx,
                &TenantChanges {
                    name: Some(payload.tenant_name.trim().to_string()),
                    slug: Some(slug),
                    tenant_type: Some(payload.tenant_type),
                    document: Some(plan.document.clone()),
                    document_type: Some(plan.document_type),
                    business_type: Some(plan.business_type),
                    creci: plan.tenant_creci.clone(),
                    email: Some(email.clone()),
                    phone: Some(plan.phone.clone()),
                    subscription_plan: Some(SIGNUP_PLAN.into()),
                    subscription_status: Some(SIGNUP_SUBSCRIPTION_STATUS.into()),
                    ..Default::default()
                },
            )
            .await?;

        let user = self
            .user_repo
            .create(
                &mut *tx,
                &NewUser {
                    tenant_id: tenant.id,
                    name: payload.name.trim().to_string(),
                    email,
                    password_hash,
                    phone: Some(plan.phone),
                    document: None,
                    document_type: None,
                    creci: plan.user_creci,
                    role: plan.role,
                    permissions: permissions::defaults_for(UserRole::Admin),
                },
            )
            .await?;

        tx.commit().await?;

        tracing::info!(tenant_id = %tenant.id, user_id = %user.id, "🏠 Novo tenant cadastrado");
        self.activity
            .record(NewActivity::by_user(
                tenant.id,
                events::TENANT_SIGNUP,
                user.id,
                json!({ "tenant_type": tenant.tenant_type, "slug": tenant.slug }),
            ))
            .await;

        let token = self.create_token(user.id, tenant.id, user.role)?;
        Ok(SignupResponse {
            tenant_id: tenant.id,
            broker_id: user.id,
            token,
            user: SignupUser { uid: user.id, email: user.email, name: user.name, role: user.role },
        })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, AppError> {
        let email = email.trim().to_lowercase();
        let session = self
            .user_repo
            .find_session_by_email(&email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();
        let password_hash_clone = session.user.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid = tokio::task::spawn_blocking(move || verify(&password_clone, &password_hash_clone))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }
        if !session.user.is_active {
            return Err(AppError::AccountInactive);
        }
        if !session.tenant_active {
            return Err(AppError::TenantInactive);
        }

        let user = &session.user;
        let token = self.create_token(user.id, user.tenant_id, user.role)?;
        Ok(LoginResponse {
            token,
            tenant_id: user.tenant_id,
            is_platform_admin: session.is_platform_admin,
            broker: BrokerSummary::from(user),
        })
    }

    pub async fn refresh(&self, user_id: Uuid) -> Result<String, AppError> {
        let session = self.load_session(user_id).await?;
        if !session.user.is_active {
            return Err(AppError::AccountInactive);
        }
        self.create_token(session.user.id, session.user.tenant_id, session.user.role)
    }

    pub async fn me(&self, user_id: Uuid) -> Result<MeResponse, AppError> {
        let session = self.load_session(user_id).await?;
        let tenant = self
            .tenant_repo
            .find_by_id(session.user.tenant_id)
            .await?
            .ok_or(AppError::TenantNotFound)?;
        Ok(MeResponse { user: session.user, tenant })
    }

    pub async fn load_session(&self, user_id: Uuid) -> Result<UserSession, AppError> {
        self.user_repo
            .find_session(user_id)
            .await?
            .ok_or(AppError::InvalidToken)
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;
        Ok(token_data.claims)
    }

    pub fn create_token(&self, user_id: Uuid, tenant_id: Uuid, role: UserRole) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + Duration::hours(self.ttl_hours);

        let claims = Claims {
            sub: user_id,
            tenant_id,
            role,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pf() -> SignupPayload {
        SignupPayload {
            tenant_type: TenantType::Pf,
            tenant_name: "João Corretor".into(),
            document: "529.982.247-25".into(),
            business_type: None,
            tenant_creci: Some("12345-f".into()),
            name: "João".into(),
            email: "joao@example.com".into(),
            password: "Senha1".into(),
            phone: "(11) 98765-4321".into(),
            is_user_broker: false,
            user_creci: None,
        }
    }

    fn pj(business_type: BusinessType) -> SignupPayload {
        SignupPayload {
            tenant_type: TenantType::Pj,
            document: "11.222.333/0001-81".into(),
            business_type: Some(business_type),
            tenant_creci: None,
            ..pf()
        }
    }

    #[test]
    fn pf_becomes_autonomous_broker_admin() {
        let plan = plan_signup(&pf()).expect("plan");
        assert_eq!(plan.document, "52998224725");
        assert_eq!(plan.business_type, BusinessType::CorretorAutonomo);
        assert_eq!(plan.role, UserRole::BrokerAdmin);
        assert_eq!(plan.user_creci.as_deref(), Some("12345-F"));
        assert_eq!(plan.phone, "+5511987654321");
    }

    #[test]
    fn pf_requires_person_creci() {
        let mut p = pf();
        p.tenant_creci = None;
        assert!(plan_signup(&p).is_err());
        p.tenant_creci = Some("12345-J".into());
        assert!(plan_signup(&p).is_err());
    }

    #[test]
    fn imobiliaria_requires_company_creci() {
        assert!(plan_signup(&pj(BusinessType::Imobiliaria)).is_err());

        let mut p = pj(BusinessType::Imobiliaria);
        p.tenant_creci = Some("9876-J".into());
        let plan = plan_signup(&p).expect("plan");
        assert_eq!(plan.role, UserRole::Admin);
        assert_eq!(plan.tenant_creci.as_deref(), Some("9876-J"));
    }

    #[test]
    fn other_pj_creci_is_optional() {
        assert!(plan_signup(&pj(BusinessType::Incorporadora)).is_ok());
    }

    #[test]
    fn pj_broker_user_needs_person_creci() {
        let mut p = pj(BusinessType::Construtora);
        p.is_user_broker = true;
        assert!(plan_signup(&p).is_err());
        p.user_creci = Some("555-F".into());
        assert_eq!(plan_signup(&p).expect("plan").role, UserRole::BrokerAdmin);
    }

    #[test]
    fn invalid_document_is_rejected() {
        let mut p = pf();
        p.document = "111.111.111-11".into();
        assert!(plan_signup(&p).is_err());
    }

    #[tokio::test]
    async fn token_roundtrip_keeps_claims() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .expect("lazy pool");
        let service = AuthService::new(
            pool.clone(),
            UserRepository::new(pool.clone()),
            TenantRepository::new(pool.clone()),
            ActivityService::new(crate::db::ActivityRepository::new(pool)),
            "segredo".into(),
            1,
        );
        let (user, tenant) = (Uuid::new_v4(), Uuid::new_v4());
        let token = service.create_token(user, tenant, UserRole::Broker).expect("token");
        let claims = service.validate_token(&token).expect("claims");
        assert_eq!(claims.sub, user);
        assert_eq!(claims.tenant_id, tenant);
        assert!(service.validate_token("lixo").is_err());
    }
}
