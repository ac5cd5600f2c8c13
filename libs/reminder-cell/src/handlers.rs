// libs/reminder-cell/src/handlers.rs
use std::sync::Arc;

use axum::{extract::State, Json};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::AppError;

use crate::services::sweeper::ReminderSweepService;

/// Shared state for the reminder routes. The sweep service is the same
/// instance the background loop runs on, so its single-flight guard
/// covers manual triggers too.
#[derive(Clone)]
pub struct ReminderState {
    pub config: Arc<AppConfig>,
    pub sweeper: Arc<ReminderSweepService>,
}

/// Manual sweep trigger, useful in operations and in staging. Runs the
/// same pass the background loop runs, including the single-flight
/// guard, so a trigger during an in-flight sweep answers 409.
#[axum::debug_handler]
pub async fn trigger_sweep(State(state): State<ReminderState>) -> Result<Json<Value>, AppError> {
    let report = state.sweeper.sweep_once().await?;

    Ok(Json(json!({
        "success": true,
        "dispatched": report.dispatched,
        "failed": report.failed,
    })))
}

#[axum::debug_handler]
pub async fn get_reminder_health(
    State(state): State<ReminderState>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(json!({
        "notification_gateway_configured": state.config.is_notification_configured(),
        "sweep_interval_minutes": state.config.reminder_sweep_minutes,
        "retention_interval_hours": state.config.retention_sweep_hours,
    })))
}
