// src/handlers/activity.rs

use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    common::{
        error::ApiError,
        pagination::{Page, Pagination},
    },
    config::AppState,
    middleware::{
        i18n::Locale,
        rbac::{PermSettingsView, RequirePermission},
        tenancy::TenantContext,
    },
    models::activity::{ActivityListQuery, ActivityLog},
};

// GET /api/v1/admin/{tenant_id}/activity-logs
#[utoipa::path(
    get,
    path = "/api/v1/admin/{tenant_id}/activity-logs",
    tag = "Activity",
    params(("tenant_id" = uuid::Uuid, Path, description = "ID do tenant"), ActivityListQuery),
    responses(
        (status = 200, description = "Trilha de auditoria do tenant", body = Page<ActivityLog>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_activity(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermSettingsView>,
    tenant: TenantContext,
    Query(query): Query<ActivityListQuery>,
) -> Result<Json<Page<ActivityLog>>, ApiError> {
    let pagination = Pagination { limit: query.limit, offset: query.offset };
    let logs = app_state
        .activity_service
        .list(tenant.id(), query.event_type.as_deref(), &pagination)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(Page::new(logs, &pagination)))
}
