// src/services/activity_service.rs

use uuid::Uuid;

use crate::{
    common::{error::AppError, pagination::Pagination},
    db::ActivityRepository,
    models::activity::{ActivityLog, NewActivity},
};

// Nomes dos eventos registrados na trilha de auditoria
pub mod events {
    pub const TENANT_SIGNUP: &str = "tenant_signup";
    pub const TENANT_CREATED: &str = "tenant_created";
    pub const TENANT_UPDATED: &str = "tenant_updated";
    pub const TENANT_DELETED: &str = "tenant_deleted";
    pub const TENANT_ACTIVATED: &str = "tenant_activated";
    pub const TENANT_DEACTIVATED: &str = "tenant_deactivated";
    pub const USER_CREATED: &str = "user_created";
    pub const USER_UPDATED: &str = "user_updated";
    pub const USER_ACTIVATED: &str = "user_activated";
    pub const USER_DEACTIVATED: &str = "user_deactivated";
    pub const USER_INVITED: &str = "user_invited";
    pub const INVITATION_ACCEPTED: &str = "invitation_accepted";
    pub const INVITATION_CANCELLED: &str = "invitation_cancelled";
    pub const OWNER_CREATED: &str = "owner_created";
    pub const OWNER_UPDATED: &str = "owner_updated";
    pub const OWNER_ENRICHED: &str = "owner_enriched";
    pub const OWNER_DELETED: &str = "owner_deleted";
    pub const OWNER_CONSENT_REVOKED: &str = "owner_consent_revoked";
    pub const OWNER_ANONYMIZED: &str = "owner_anonymized";
    pub const OWNER_CONFIRMATION_CREATED: &str = "owner_confirmation_created";
    pub const OWNER_CONFIRMED: &str = "owner_confirmed";
    pub const PROPERTY_CREATED: &str = "property_created";
    pub const PROPERTY_UPDATED: &str = "property_updated";
    pub const PROPERTY_DELETED: &str = "property_deleted";
    pub const LEAD_CREATED: &str = "lead_created";
    pub const LEAD_STATUS_CHANGED: &str = "lead_status_changed";
    pub const LEAD_CONSENT_REVOKED: &str = "lead_consent_revoked";
    pub const LEAD_ANONYMIZED: &str = "lead_anonymized";
    pub const IMPORT_COMPLETED: &str = "import_completed";
    pub const IMPORT_FAILED: &str = "import_failed";
}

#[derive(Clone)]
pub struct ActivityService {
    repo: ActivityRepository,
}

impl ActivityService {
    pub fn new(repo: ActivityRepository) -> Self {
        Self { repo }
    }

    /// Best-effort: uma falha aqui nunca derruba a operação principal.
    pub async fn record(&self, event: NewActivity) {
        if let Err(e) = self.repo.insert(&event).await {
            tracing::warn!(
                tenant_id = %event.tenant_id,
                event_type = event.event_type,
                "Falha ao registrar atividade: {}",
                e
            );
        }
    }

    pub async fn list(
        &self,
        tenant_id: Uuid,
        event_type: Option<&str>,
        pagination: &Pagination,
    ) -> Result<Vec<ActivityLog>, AppError> {
        self.repo
            .list(tenant_id, event_type, pagination.limit(), pagination.offset())
            .await
    }
}
