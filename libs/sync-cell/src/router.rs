// libs/sync-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};

use shared_config::AppConfig;

use crate::handlers;

pub fn sync_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/appointments", post(handlers::reconcile_appointments))
        .route(
            "/appointments/{external_id}",
            delete(handlers::delete_synced_appointment),
        )
        .route("/status", get(handlers::get_sync_status))
        .route("/conflict-report", get(handlers::get_conflict_report))
        .with_state(state)
}
