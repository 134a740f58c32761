// src/services/user_service.rs

use serde_json::json;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        pagination::Pagination,
        validators::{normalize_cnpj, normalize_cpf, normalize_creci, normalize_email, normalize_phone_br},
    },
    db::UserRepository,
    models::{
        activity::NewActivity,
        tenancy::DocumentType,
        user::{permissions, BrokerPublicProfile, CreateUserPayload, NewUser, UpdateUserPayload, User, UserListQuery, UserRole},
    },
    services::{
        activity_service::{events, ActivityService},
        auth::hash_password,
    },
};

const BROKER_ROLES: [UserRole; 2] = [UserRole::Broker, UserRole::BrokerAdmin];

fn trimmed(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// CRECI obrigatório para corretores, normalizado quando presente.
pub fn creci_for_role(role: UserRole, creci: Option<&str>) -> Result<Option<String>, AppError> {
    match trimmed(creci) {
        Some(c) => normalize_creci(c).map(Some),
        None if role.is_broker() => Err(AppError::InvalidInput("CRECI é obrigatório para corretores".into())),
        None => Ok(None),
    }
}

/// Permissões explícitas precisam existir no catálogo; ausentes, vale o padrão do cargo.
pub fn resolve_permissions(role: UserRole, requested: Option<&[String]>) -> Result<Vec<String>, AppError> {
    match requested {
        None => Ok(permissions::defaults_for(role)),
        Some(list) => {
            if let Some(unknown) = list.iter().find(|p| !permissions::is_known(p)) {
                return Err(AppError::InvalidInput(format!("Permissão desconhecida: {}", unknown)));
            }
            let mut list = list.to_vec();
            list.sort();
            list.dedup();
            Ok(list)
        }
    }
}

/// Quem edita não pode mexer no próprio acesso nem conceder mais do que tem.
/// `role`/`permissions` são os valores pedidos; `None` mantém o atual.
pub fn check_access_change(
    actor: &User,
    target_id: Option<Uuid>,
    target_role: Option<UserRole>,
    role: Option<UserRole>,
    permissions: Option<&[String]>,
) -> Result<(), AppError> {
    if role.is_none() && permissions.is_none() {
        return Ok(());
    }
    if target_id == Some(actor.id) {
        return Err(AppError::CannotChangeOwnAccess);
    }
    if actor.role == UserRole::Admin {
        return Ok(());
    }
    // Admin e broker_admin recebem o catálogo inteiro.
    let grants_everything = |r: UserRole| matches!(r, UserRole::Admin | UserRole::BrokerAdmin);
    if target_role.is_some_and(grants_everything) || role.is_some_and(grants_everything) {
        return Err(AppError::AccessEscalation);
    }
    if let Some(list) = permissions {
        if list.iter().any(|p| !actor.has_permission(p)) {
            return Err(AppError::AccessEscalation);
        }
    }
    Ok(())
}

fn normalize_user_document(document: Option<&str>, document_type: Option<DocumentType>) -> Result<Option<String>, AppError> {
    match (trimmed(document), document_type) {
        (None, _) => Ok(None),
        (Some(d), Some(DocumentType::Cnpj)) => normalize_cnpj(d).map(Some),
        // Usuário sem tipo informado é pessoa física.
        (Some(d), _) => normalize_cpf(d).map(Some),
    }
}

#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    activity: ActivityService,
}

impl UserService {
    pub fn new(user_repo: UserRepository, activity: ActivityService) -> Self {
        Self { user_repo, activity }
    }

    pub async fn list(&self, tenant_id: Uuid, query: &UserListQuery) -> Result<Vec<User>, AppError> {
        let pagination = Pagination { limit: query.limit, offset: query.offset };
        let roles = query.role.map(|r| vec![r]);
        self.user_repo
            .list(tenant_id, roles.as_deref(), query.is_active, pagination.limit(), pagination.offset())
            .await
    }

    pub async fn list_brokers(&self, tenant_id: Uuid, pagination: &Pagination) -> Result<Vec<User>, AppError> {
        self.user_repo
            .list(tenant_id, Some(&BROKER_ROLES[..]), Some(true), pagination.limit(), pagination.offset())
            .await
    }

    pub async fn get(&self, tenant_id: Uuid, id: Uuid) -> Result<User, AppError> {
        self.user_repo
            .find_in_tenant(tenant_id, id)
            .await?
            .ok_or(AppError::UserNotFound)
    }

    pub async fn create(&self, tenant_id: Uuid, payload: CreateUserPayload, actor: &User) -> Result<User, AppError> {
        let actor_id = actor.id;
        let creci = creci_for_role(payload.role, payload.creci.as_deref())?;
        let permissions = resolve_permissions(payload.role, payload.permissions.as_deref())?;
        check_access_change(actor, None, None, Some(payload.role), Some(&permissions))?;
        let email = normalize_email(&payload.email)?;
        let phone = trimmed(payload.phone.as_deref()).map(normalize_phone_br).transpose()?;
        let document = normalize_user_document(payload.document.as_deref(), payload.document_type)?;

        if self.user_repo.find_by_email(self.user_repo.pool(), &email).await?.is_some() {
            return Err(AppError::EmailAlreadyExists);
        }

        let password_hash = hash_password(&payload.password).await?;
        let user = self
            .user_repo
            .create(
                self.user_repo.pool(),
                &NewUser {
                    tenant_id,
                    name: payload.name.trim().to_string(),
                    email,
                    password_hash,
                    phone,
                    document,
                    document_type: payload.document_type,
                    creci,
                    role: payload.role,
                    permissions,
                },
            )
            .await?;

        tracing::info!(%tenant_id, user_id = %user.id, role = user.role.as_str(), "Usuário criado");
        self.activity
            .record(NewActivity::by_user(
                tenant_id,
                events::USER_CREATED,
                actor_id,
                json!({ "user_id": user.id, "role": user.role }),
            ))
            .await;
        Ok(user)
    }

    pub async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        mut payload: UpdateUserPayload,
        actor: &User,
    ) -> Result<User, AppError> {
        let actor_id = actor.id;
        let current = self.get(tenant_id, id).await?;
        // Reenviar o mesmo cargo não conta como mudança.
        let requested_role = payload.role.filter(|r| *r != current.role);
        let role = payload.role.unwrap_or(current.role);

        // Virar corretor exige CRECI, seja o novo ou o já cadastrado.
        let creci = match trimmed(payload.creci.as_deref()) {
            Some(c) => Some(normalize_creci(c)?),
            None => {
                creci_for_role(role, current.creci.as_deref())?;
                None
            }
        };
        if let Some(list) = payload.permissions.take() {
            payload.permissions = Some(resolve_permissions(role, Some(&list))?);
        }
        check_access_change(actor, Some(id), Some(current.role), requested_role, payload.permissions.as_deref())?;
        let phone = trimmed(payload.phone.as_deref()).map(normalize_phone_br).transpose()?;
        let document_type = payload.document_type.or(current.document_type);
        let document = normalize_user_document(payload.document.as_deref(), document_type)?;

        let user = self
            .user_repo
            .update(tenant_id, id, &payload, creci, phone, document)
            .await?
            .ok_or(AppError::UserNotFound)?;

        self.activity
            .record(NewActivity::by_user(tenant_id, events::USER_UPDATED, actor_id, json!({ "user_id": id })))
            .await;
        Ok(user)
    }

    pub async fn set_active(&self, tenant_id: Uuid, id: Uuid, active: bool, actor_id: Uuid) -> Result<User, AppError> {
        if !active && id == actor_id {
            return Err(AppError::CannotDeactivateSelf);
        }

        let user = self
            .user_repo
            .set_active(tenant_id, id, active)
            .await?
            .ok_or(AppError::UserNotFound)?;

        let event = if active { events::USER_ACTIVATED } else { events::USER_DEACTIVATED };
        self.activity
            .record(NewActivity::by_user(tenant_id, event, actor_id, json!({ "user_id": id })))
            .await;
        Ok(user)
    }

    /// Perfil público: só corretores ativos de tenants ativos.
    pub async fn public_broker(&self, id: Uuid) -> Result<BrokerPublicProfile, AppError> {
        self.user_repo
            .find_public_broker(id)
            .await?
            .map(BrokerPublicProfile::from)
            .ok_or(AppError::UserNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brokers_need_creci() {
        assert!(creci_for_role(UserRole::Broker, None).is_err());
        assert!(creci_for_role(UserRole::BrokerAdmin, Some("  ")).is_err());
        assert_eq!(
            creci_for_role(UserRole::Broker, Some("123-f")).expect("creci").as_deref(),
            Some("123-F")
        );
        assert_eq!(creci_for_role(UserRole::Manager, None).expect("none"), None);
    }

    #[test]
    fn invalid_creci_is_rejected_for_any_role() {
        assert!(creci_for_role(UserRole::Admin, Some("abc")).is_err());
    }

    #[test]
    fn permissions_default_by_role() {
        let perms = resolve_permissions(UserRole::Broker, None).expect("defaults");
        assert_eq!(perms, permissions::defaults_for(UserRole::Broker));
    }

    #[test]
    fn explicit_permissions_are_checked_and_deduplicated() {
        let requested = vec![
            permissions::LEADS_VIEW.to_string(),
            permissions::LEADS_VIEW.to_string(),
            permissions::IMPORTS_RUN.to_string(),
        ];
        let perms = resolve_permissions(UserRole::Manager, Some(&requested)).expect("perms");
        assert_eq!(perms, vec![permissions::IMPORTS_RUN.to_string(), permissions::LEADS_VIEW.to_string()]);

        let unknown = vec!["reports.export".to_string()];
        assert!(resolve_permissions(UserRole::Manager, Some(&unknown)).is_err());
    }

    fn actor(role: UserRole) -> User {
        User {
            id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            name: "Gestora".into(),
            email: "gestora@imob.com.br".into(),
            password_hash: String::new(),
            phone: None,
            document: None,
            document_type: None,
            creci: None,
            role,
            is_active: true,
            permissions: permissions::defaults_for(role),
            photo_url: None,
            bio: None,
            specialties: vec![],
            languages: vec![],
            experience_years: None,
            company: None,
            website: None,
            social_media: serde_json::json!({}),
            total_sales: 0,
            total_listings: 0,
            average_price: None,
            rating: None,
            review_count: 0,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn nobody_changes_their_own_access() {
        let me = actor(UserRole::Admin);
        let err = check_access_change(&me, Some(me.id), Some(UserRole::Admin), Some(UserRole::Broker), None).unwrap_err();
        assert!(matches!(err, AppError::CannotChangeOwnAccess));

        let perms = vec![permissions::LEADS_VIEW.to_string()];
        assert!(check_access_change(&me, Some(me.id), Some(UserRole::Admin), None, Some(&perms)).is_err());
        // Editar o próprio perfil sem tocar no acesso continua livre.
        assert!(check_access_change(&me, Some(me.id), Some(UserRole::Admin), None, None).is_ok());
    }

    #[test]
    fn manager_cannot_grant_more_than_they_have() {
        let manager = actor(UserRole::Manager);
        let target = Some(Uuid::new_v4());

        let err = check_access_change(&manager, target, Some(UserRole::Broker), Some(UserRole::Admin), None).unwrap_err();
        assert!(matches!(err, AppError::AccessEscalation));
        assert!(check_access_change(&manager, target, Some(UserRole::Admin), Some(UserRole::Broker), None).is_err());

        let beyond = vec![permissions::SETTINGS_EDIT.to_string()];
        assert!(check_access_change(&manager, target, Some(UserRole::Broker), None, Some(&beyond)).is_err());

        let within = vec![permissions::LEADS_VIEW.to_string(), permissions::LEADS_EDIT.to_string()];
        assert!(check_access_change(&manager, target, Some(UserRole::Broker), Some(UserRole::Broker), Some(&within)).is_ok());
    }

    #[test]
    fn admin_may_promote_other_users() {
        let admin = actor(UserRole::Admin);
        assert!(check_access_change(&admin, Some(Uuid::new_v4()), Some(UserRole::Broker), Some(UserRole::Admin), None).is_ok());
    }

    #[test]
    fn user_document_defaults_to_cpf() {
        assert_eq!(
            normalize_user_document(Some("529.982.247-25"), None).expect("cpf").as_deref(),
            Some("52998224725")
        );
        assert!(normalize_user_document(Some("529.982.247-25"), Some(DocumentType::Cnpj)).is_err());
    }
}
