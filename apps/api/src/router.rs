use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use reminder_cell::handlers::ReminderState;
use reminder_cell::router::reminder_routes;
use reminder_cell::services::sweeper::ReminderSweepService;
use scheduling_cell::router::{appointment_routes, availability_routes};
use shared_config::AppConfig;
use sync_cell::router::sync_routes;

pub fn create_router(state: Arc<AppConfig>, sweeper: Arc<ReminderSweepService>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic scheduling API is running!" }))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/availability", availability_routes(state.clone()))
        .nest("/sync", sync_routes(state.clone()))
        .nest(
            "/reminders",
            reminder_routes(ReminderState {
                config: state,
                sweeper,
            }),
        )
}
