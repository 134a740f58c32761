// src/handlers/imports.rs

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::{
        error::{ApiError, AppError},
        pagination::{Page, Pagination},
    },
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermImportsRun, RequirePermission},
        tenancy::TenantContext,
    },
    models::import::{ImportBatch, ImportErrorList, ImportFiles, ImportSource, ImportStarted},
};

/// Formulário multipart do upload (somente para a documentação).
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct ImportUploadForm {
    /// Feed XML de anúncios
    #[schema(value_type = Option<String>, format = Binary)]
    xml: Option<Vec<u8>>,
    /// Planilha de proprietários (texto delimitado)
    #[schema(value_type = Option<String>, format = Binary)]
    xls: Option<Vec<u8>>,
    /// union | other
    source: Option<String>,
    created_by: Option<Uuid>,
}

#[derive(Debug, Default)]
struct UploadForm {
    files: ImportFiles,
    source: ImportSource,
    created_by: Option<Uuid>,
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::InvalidInput(format!("Upload inválido: {}", e.body_text()))
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "xml" => {
                let bytes = field.bytes().await.map_err(multipart_error)?;
                if !bytes.is_empty() {
                    form.files.xml = Some(bytes.to_vec());
                }
            }
            "xls" => {
                let bytes = field.bytes().await.map_err(multipart_error)?;
                if !bytes.is_empty() {
                    form.files.xls = Some(bytes.to_vec());
                }
            }
            "source" => {
                let value = field.text().await.map_err(multipart_error)?;
                if !value.trim().is_empty() {
                    form.source = ImportSource::parse(&value)
                        .ok_or_else(|| AppError::InvalidInput(format!("source inválido: {}", value.trim())))?;
                }
            }
            "created_by" => {
                let value = field.text().await.map_err(multipart_error)?;
                if !value.trim().is_empty() {
                    let id = Uuid::parse_str(value.trim())
                        .map_err(|_| AppError::InvalidInput(format!("created_by inválido: {}", value.trim())))?;
                    form.created_by = Some(id);
                }
            }
            other => tracing::debug!(field = other, "Campo de upload ignorado"),
        }
    }

    Ok(form)
}

// POST /api/v1/admin/{tenant_id}/import/properties
#[utoipa::path(
    post,
    path = "/api/v1/admin/{tenant_id}/import/properties",
    tag = "Imports",
    params(("tenant_id" = Uuid, Path, description = "ID do tenant")),
    request_body(content = ImportUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 202, description = "Lote criado; o processamento segue em background", body = ImportStarted),
        (status = 400, description = "Nenhum arquivo enviado, campo inválido ou arquivo acima do limite")
    ),
    security(("api_jwt" = []))
)]
pub async fn upload_import(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermImportsRun>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = read_form(multipart)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let started = app_state
        .import_service
        .start(tenant.id(), form.source, form.created_by.unwrap_or(user.id()), form.files)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::ACCEPTED, Json(started)))
}

// GET /api/v1/admin/{tenant_id}/import/batches
#[utoipa::path(
    get,
    path = "/api/v1/admin/{tenant_id}/import/batches",
    tag = "Imports",
    params(("tenant_id" = Uuid, Path, description = "ID do tenant"), Pagination),
    responses(
        (status = 200, description = "Lotes do tenant, mais recentes primeiro", body = Page<ImportBatch>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_batches(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermImportsRun>,
    tenant: TenantContext,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Page<ImportBatch>>, ApiError> {
    let batches = app_state
        .import_service
        .list(tenant.id(), &pagination)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(Page::new(batches, &pagination)))
}

// GET /api/v1/admin/{tenant_id}/import/batches/{id}
#[utoipa::path(
    get,
    path = "/api/v1/admin/{tenant_id}/import/batches/{id}",
    tag = "Imports",
    params(
        ("tenant_id" = Uuid, Path, description = "ID do tenant"),
        ("id" = Uuid, Path, description = "ID do lote")
    ),
    responses(
        (status = 200, description = "Situação e contadores do lote", body = ImportBatch),
        (status = 404, description = "Lote não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_batch(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermImportsRun>,
    tenant: TenantContext,
    Path((_tenant_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ImportBatch>, ApiError> {
    let batch = app_state
        .import_service
        .get(tenant.id(), id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(batch))
}

// GET /api/v1/admin/{tenant_id}/import/batches/{id}/errors
#[utoipa::path(
    get,
    path = "/api/v1/admin/{tenant_id}/import/batches/{id}/errors",
    tag = "Imports",
    params(
        ("tenant_id" = Uuid, Path, description = "ID do tenant"),
        ("id" = Uuid, Path, description = "ID do lote")
    ),
    responses(
        (status = 200, description = "Erros registrados no lote", body = ImportErrorList),
        (status = 404, description = "Lote não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn batch_errors(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermImportsRun>,
    tenant: TenantContext,
    Path((_tenant_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ImportErrorList>, ApiError> {
    let errors = app_state
        .import_service
        .errors(tenant.id(), id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(errors))
}
