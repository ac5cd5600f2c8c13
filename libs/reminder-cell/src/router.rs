// libs/reminder-cell/src/router.rs
use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{self, ReminderState};

pub fn reminder_routes(state: ReminderState) -> Router {
    Router::new()
        .route("/sweep", post(handlers::trigger_sweep))
        .route("/health", get(handlers::get_reminder_health))
        .with_state(state)
}
