// src/handlers/health.rs

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::config::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: &'static str,
    #[schema(example = "development")]
    pub environment: &'static str,
    #[schema(example = "0.1.0")]
    pub version: &'static str,
}

// GET /api/health
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    responses(
        (status = 200, description = "Serviço no ar", body = HealthResponse)
    )
)]
pub async fn health(State(app_state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        environment: app_state.config.environment.as_str(),
        version: env!("CARGO_PKG_VERSION"),
    })
}
