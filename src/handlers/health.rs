// src/handlers/health.rs

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{common::error::AppError, config::AppState};

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthStatus {
    #[schema(example = "ok")]
    pub status: &'static str,
    #[schema(example = "postgres")]
    pub storage: &'static str,
}

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service and storage are reachable", body = HealthStatus),
        (status = 500, description = "Storage unreachable")
    )
)]
pub async fn health(State(app_state): State<AppState>) -> Result<Json<HealthStatus>, AppError> {
    let storage = match &app_state.db_pool {
        Some(pool) => {
            sqlx::query("SELECT 1").execute(pool).await?;
            "postgres"
        }
        None => "memory",
    };

    Ok(Json(HealthStatus { status: "ok", storage }))
}
