// libs/scheduling-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::StoreClient;
use shared_models::AppError;

use crate::models::{
    AppointmentSearchQuery, BookAppointmentRequest, BookingResult, DayScheduleQuery,
    RescheduleAppointmentRequest,
};
use crate::services::booking::BookingService;
use crate::services::settings::SettingsService;
use crate::services::slots::SlotProjectionService;

/// Booking entry point: runs the validator and creates the appointment
/// with a status derived from the active mode. Conflicts come back as a
/// structured 409, not an error.
#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = BookingService::new(&state);

    match service.book(request).await? {
        BookingResult::Booked(appointment) => Ok((
            StatusCode::CREATED,
            Json(json!({
                "success": true,
                "appointment": appointment,
            })),
        )),
        BookingResult::Rejected(decision) => Ok((
            StatusCode::CONFLICT,
            Json(json!({
                "success": false,
                "rejection": decision,
            })),
        )),
    }
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);
    let appointment = service.get(appointment_id).await?;

    Ok(Json(json!({ "appointment": appointment })))
}

#[axum::debug_handler]
pub async fn search_appointments(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<AppointmentSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);
    let appointments = service.search(query).await?;

    Ok(Json(json!({
        "count": appointments.len(),
        "appointments": appointments,
    })))
}

#[axum::debug_handler]
pub async fn approve_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);
    let appointment = service.approve(appointment_id).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);
    let appointment = service.cancel(appointment_id).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
    })))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = BookingService::new(&state);

    match service.reschedule(appointment_id, request).await? {
        BookingResult::Booked(appointment) => Ok((
            StatusCode::OK,
            Json(json!({
                "success": true,
                "appointment": appointment,
            })),
        )),
        BookingResult::Rejected(decision) => Ok((
            StatusCode::CONFLICT,
            Json(json!({
                "success": false,
                "rejection": decision,
            })),
        )),
    }
}

/// Availability query entry point: occupied slots for the day plus the
/// hourly unassigned load, under mode-specific visibility rules.
#[axum::debug_handler]
pub async fn get_day_schedule(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<DayScheduleQuery>,
) -> Result<Json<Value>, AppError> {
    let store = Arc::new(StoreClient::new(&state));
    let settings = SettingsService::new(Arc::clone(&store)).get_settings().await?;
    let projector = SlotProjectionService::new(store);

    let occupied = projector
        .occupied_slots(query.clinic_id, query.doctor_id, query.date, &settings)
        .await?;
    let hourly = projector
        .hourly_unassigned_counts(query.clinic_id, query.date, &settings)
        .await?;

    Ok(Json(json!({
        "mode": settings.mode,
        "occupied_slots": occupied,
        "hourly_unassigned": hourly,
    })))
}
