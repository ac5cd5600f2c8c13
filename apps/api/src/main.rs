use std::net::SocketAddr;
use std::sync::Arc;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::{self, TraceLayer};
use tracing::{Level, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use reminder_cell::services::retention::RetentionService;
use reminder_cell::services::sweeper::ReminderSweepService;
use shared_config::AppConfig;

#[tokio::main]
async fn main() {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting clinic scheduling API server");

    // Load configuration
    let config = AppConfig::from_env();

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Create shared state
    let state = Arc::new(config);

    // Background loops: reminder sweep and record retention. The sweep
    // service is shared with the router so manual triggers contend on
    // the same single-flight guard as the loop.
    let sweeper = Arc::new(ReminderSweepService::new(&state));
    if state.is_notification_configured() {
        tokio::spawn(Arc::clone(&sweeper).run(state.reminder_sweep_minutes));
    } else {
        warn!("Notification gateway not configured, reminder sweep disabled");
    }

    let retention = Arc::new(RetentionService::new(&state));
    tokio::spawn(retention.run(state.retention_sweep_hours));

    // Build the application router
    let app = router::create_router(state, sweeper)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new()
                    .level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new()
                    .level(Level::INFO)),
        )
        .layer(cors);

    // Run the server
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app)
        .await
        .unwrap();
}
