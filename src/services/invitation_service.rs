// src/services/invitation_service.rs

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        validators::{normalize_email, normalize_phone_br},
    },
    db::{InvitationRepository, UserRepository},
    models::{
        activity::NewActivity,
        invitation::{
            expiry_from, generate_token, AcceptInvitationPayload, AcceptInvitationResponse, Invitation,
            InvitationCheck, InvitationList, InvitationStatus, InviteUserPayload, VerifyInvitationResponse,
        },
        user::{permissions, NewUser},
    },
    services::{
        activity_service::{events, ActivityService},
        auth::{hash_password, AuthService},
        mailer::{Mailer, OutgoingMail},
        user_service::creci_for_role,
    },
};

const ACCEPTED_MESSAGE: &str = "Convite aceito com sucesso";

/// Mensagem devolvida pelo `verify` para cada resultado.
pub fn check_message(check: &InvitationCheck) -> Option<String> {
    match check {
        InvitationCheck::Valid => None,
        InvitationCheck::Expired => Some("Invitation has expired".into()),
        InvitationCheck::NotPending(status) => Some(format!("Invitation is {}", status.as_str())),
    }
}

pub fn invitation_link(admin_app_url: &str, token: &str) -> String {
    format!("{}/invite/{}", admin_app_url.trim_end_matches('/'), token)
}

fn invitation_mail(invitation: &Invitation, link: &str) -> OutgoingMail {
    OutgoingMail {
        to: invitation.email.clone(),
        subject: "Você foi convidado para a plataforma".into(),
        body: format!(
            "Olá {},\n\nVocê recebeu um convite para acessar a plataforma como {}.\n\
             Para aceitar, acesse: {}\n\nO convite expira em {}.",
            invitation.name,
            invitation.role.as_str(),
            link,
            invitation.expires_at.format("%d/%m/%Y %H:%M UTC")
        ),
    }
}

#[derive(Clone)]
pub struct InvitationService {
    pool: PgPool,
    invitation_repo: InvitationRepository,
    user_repo: UserRepository,
    auth_service: AuthService,
    mailer: Arc<dyn Mailer>,
    activity: ActivityService,
    admin_app_url: String,
}

impl InvitationService {
    pub fn new(
        pool: PgPool,
        invitation_repo: InvitationRepository,
        user_repo: UserRepository,
        auth_service: AuthService,
        mailer: Arc<dyn Mailer>,
        activity: ActivityService,
        admin_app_url: String,
    ) -> Self {
        Self { pool, invitation_repo, user_repo, auth_service, mailer, activity, admin_app_url }
    }

    pub async fn invite(&self, tenant_id: Uuid, payload: InviteUserPayload, invited_by: Uuid) -> Result<Invitation, AppError> {
        let email = normalize_email(&payload.email)?;
        let creci = creci_for_role(payload.role, payload.creci.as_deref())?;

        if self.user_repo.email_exists_in_tenant(tenant_id, &email).await? {
            return Err(AppError::UserAlreadyInTenant);
        }
        if self.invitation_repo.pending_exists(tenant_id, &email).await? {
            return Err(AppError::PendingInvitationExists);
        }

        let token = generate_token();
        let invitation = self
            .invitation_repo
            .create(
                tenant_id,
                &email,
                payload.name.trim(),
                payload.role,
                creci.as_deref(),
                &token,
                invited_by,
                expiry_from(Utc::now()),
            )
            .await?;

        let link = invitation_link(&self.admin_app_url, &token);
        if let Err(e) = self.mailer.send(invitation_mail(&invitation, &link)).await {
            tracing::warn!(invitation_id = %invitation.id, "Falha ao enviar e-mail de convite: {}", e);
        }

        self.activity
            .record(NewActivity::by_user(
                tenant_id,
                events::USER_INVITED,
                invited_by,
                json!({ "invitation_id": invitation.id, "email": invitation.email, "role": invitation.role }),
            ))
            .await;
        Ok(invitation)
    }

    /// Verifica o token. Um convite vencido tem o status gravado como `expired`.
    pub async fn verify(&self, token: &str) -> Result<VerifyInvitationResponse, AppError> {
        let Some(mut invitation) = self.invitation_repo.find_by_token(token).await? else {
            return Ok(VerifyInvitationResponse {
                valid: false,
                invitation: None,
                message: Some("Invalid invitation token".into()),
            });
        };

        let check = invitation.check(Utc::now());
        if check == InvitationCheck::Expired && invitation.status == InvitationStatus::Pending {
            // Se um aceite chegou antes, o status gravado prevalece.
            if self
                .invitation_repo
                .close_pending(&self.pool, invitation.id, InvitationStatus::Expired)
                .await?
            {
                invitation.status = InvitationStatus::Expired;
            }
        }

        let valid = check == InvitationCheck::Valid;
        Ok(VerifyInvitationResponse {
            valid,
            message: check_message(&check),
            invitation: valid.then_some(invitation),
        })
    }

    pub async fn accept(&self, token: &str, payload: AcceptInvitationPayload) -> Result<AcceptInvitationResponse, AppError> {
        let invitation = self
            .invitation_repo
            .find_by_token(token)
            .await?
            .ok_or(AppError::InvitationNotFound)?;

        match invitation.check(Utc::now()) {
            InvitationCheck::Valid => {}
            InvitationCheck::Expired => return Err(AppError::InvitationExpired),
            InvitationCheck::NotPending(status) => {
                return Err(AppError::InvitationNotPending(status.as_str().to_string()));
            }
        }

        let phone = payload
            .phone
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(normalize_phone_br)
            .transpose()?;
        let password_hash = hash_password(&payload.password).await?;

        let mut tx = self.pool.begin().await?;

        if self.user_repo.find_by_email(&mut *tx, &invitation.email).await?.is_some() {
            return Err(AppError::EmailAlreadyExists);
        }

        let user = self
            .user_repo
            .create(
                &mut *tx,
                &NewUser {
                    tenant_id: invitation.tenant_id,
                    name: invitation.name.clone(),
                    email: invitation.email.clone(),
                    password_hash,
                    phone,
                    document: None,
                    document_type: None,
                    creci: invitation.creci.clone(),
                    role: invitation.role,
                    permissions: permissions::defaults_for(invitation.role),
                },
            )
            .await?;

        // Dois aceites simultâneos: só um encontra o convite ainda pendente.
        if !self.invitation_repo.mark_accepted(&mut *tx, invitation.id, user.id).await? {
            return Err(AppError::InvitationNotPending(InvitationStatus::Accepted.as_str().to_string()));
        }

        tx.commit().await?;

        tracing::info!(tenant_id = %invitation.tenant_id, user_id = %user.id, "Convite aceito");
        self.activity
            .record(NewActivity::by_user(
                invitation.tenant_id,
                events::INVITATION_ACCEPTED,
                user.id,
                json!({ "invitation_id": invitation.id }),
            ))
            .await;

        let token = self.auth_service.create_token(user.id, user.tenant_id, user.role)?;
        Ok(AcceptInvitationResponse {
            user_id: user.id,
            tenant_id: user.tenant_id,
            token,
            message: ACCEPTED_MESSAGE.into(),
        })
    }

    pub async fn list(&self, tenant_id: Uuid, status: Option<InvitationStatus>) -> Result<InvitationList, AppError> {
        let invitations = self.invitation_repo.list(tenant_id, status).await?;
        Ok(InvitationList { count: invitations.len(), invitations })
    }

    pub async fn cancel(&self, tenant_id: Uuid, id: Uuid, actor_id: Uuid) -> Result<(), AppError> {
        let invitation = self
            .invitation_repo
            .find_in_tenant(tenant_id, id)
            .await?
            .ok_or(AppError::InvitationNotFound)?;

        if invitation.status != InvitationStatus::Pending {
            return Err(AppError::InvitationNotPending(invitation.status.as_str().to_string()));
        }

        // Um aceite concorrente pode ter chegado depois da leitura acima.
        if !self
            .invitation_repo
            .close_pending(&self.pool, id, InvitationStatus::Cancelled)
            .await?
        {
            let status = self
                .invitation_repo
                .find_in_tenant(tenant_id, id)
                .await?
                .map_or(InvitationStatus::Cancelled, |i| i.status);
            return Err(AppError::InvitationNotPending(status.as_str().to_string()));
        }
        self.activity
            .record(NewActivity::by_user(
                tenant_id,
                events::INVITATION_CANCELLED,
                actor_id,
                json!({ "invitation_id": id, "email": invitation.email }),
            ))
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_follow_the_check() {
        assert_eq!(check_message(&InvitationCheck::Valid), None);
        assert_eq!(check_message(&InvitationCheck::Expired).as_deref(), Some("Invitation has expired"));
        assert_eq!(
            check_message(&InvitationCheck::NotPending(InvitationStatus::Cancelled)).as_deref(),
            Some("Invitation is cancelled")
        );
    }

    #[test]
    fn link_points_to_the_admin_app() {
        assert_eq!(
            invitation_link("http://localhost:3002/", "abc"),
            "http://localhost:3002/invite/abc"
        );
    }
}
