// libs/sync-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::AppError;

use crate::models::ReconcileRequest;
use crate::services::reconcile::ReconciliationService;

/// Reconciliation entry point for the offline scheduling program.
#[axum::debug_handler]
pub async fn reconcile_appointments(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<ReconcileRequest>,
) -> Result<Json<Value>, AppError> {
    let service = ReconciliationService::new(&state);
    let report = service.reconcile(request).await?;

    Ok(Json(json!({
        "success": report.success,
        "conflicts": report.conflicts,
        "errors": report.errors,
    })))
}

#[axum::debug_handler]
pub async fn delete_synced_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(external_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = ReconciliationService::new(&state);
    service.delete_by_external_id(&external_id).await?;

    Ok(Json(json!({
        "success": true,
        "external_id": external_id,
    })))
}

#[axum::debug_handler]
pub async fn get_sync_status(
    State(state): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let service = ReconciliationService::new(&state);
    let status = service.status().await?;

    Ok(Json(json!(status)))
}

#[axum::debug_handler]
pub async fn get_conflict_report(
    State(state): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let service = ReconciliationService::new(&state);
    let conflicts = service.conflict_report().await?;

    Ok(Json(json!({
        "count": conflicts.len(),
        "conflicts": conflicts,
    })))
}
